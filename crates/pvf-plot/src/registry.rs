//! First-come assignment of colours and markers to keys.

use std::collections::VecDeque;
use std::fmt::Debug;

use pvf_core::{ErrorInfo, PvfError};

use crate::figure::Marker;
use crate::style::{Colour, PlotStyle};

/// Hands out one property per distinct key, in the order keys are first seen.
#[derive(Debug, Clone)]
pub struct PropRegistry<K, V> {
    potential: VecDeque<V>,
    active: Vec<(K, V)>,
}

impl<K: PartialEq + Debug, V: Clone> PropRegistry<K, V> {
    /// Registry drawing from `values` in order.
    pub fn new(values: impl IntoIterator<Item = V>) -> Self {
        Self {
            potential: values.into_iter().collect(),
            active: Vec::new(),
        }
    }

    /// Property of `key`, assigning the next unused one on first sight.
    pub fn get(&mut self, key: K) -> Result<V, PvfError> {
        if let Some((_, value)) = self.active.iter().find(|(existing, _)| *existing == key) {
            return Ok(value.clone());
        }
        let value = self.potential.pop_front().ok_or_else(|| {
            PvfError::Plot(
                ErrorInfo::new("registry-exhausted", format!("no property left for {key:?}"))
                    .with_context("assigned", self.active.len().to_string()),
            )
        })?;
        self.active.push((key, value.clone()));
        Ok(value)
    }

    /// Keys seen so far with their properties.
    pub fn items(&self) -> impl Iterator<Item = (&K, &V)> {
        self.active.iter().map(|(key, value)| (key, value))
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

impl<K: PartialEq + Debug> PropRegistry<K, Colour> {
    /// Colours of the style palette.
    pub fn colours(style: &PlotStyle) -> Self {
        Self::new(style.palette.iter().copied())
    }
}

impl<K: PartialEq + Debug> PropRegistry<K, Marker> {
    /// Markers written as a string of single-character codes such as `"o^s"`.
    pub fn markers(codes: &str) -> Result<Self, PvfError> {
        let markers = codes
            .chars()
            .map(Marker::from_code)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(markers))
    }
}
