//! Correlators: time series of optional observables.

use std::fmt;
use std::ops::{Div, Mul, Neg, Range};
use std::str::FromStr;

use pvf_core::PvfError;
use serde::{Deserialize, Serialize};

use crate::gamma::GammaOpts;
use crate::obs::{stats_error, Obs};

/// Finite-difference stencil used by [`Corr::deriv`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DerivVariant {
    /// `c(t+1) - c(t)`.
    Forward,
    /// `c(t) - c(t-1)`.
    Backward,
    /// `(c(t+1) - c(t-1)) / 2`.
    #[default]
    Symmetric,
    /// Fourth-order stencil `(c(t-2) - 8c(t-1) + 8c(t+1) - c(t+2)) / 12`.
    Improved,
}

impl DerivVariant {
    fn stencil(self) -> &'static [(isize, f64)] {
        match self {
            DerivVariant::Forward => &[(0, -1.0), (1, 1.0)],
            DerivVariant::Backward => &[(-1, -1.0), (0, 1.0)],
            DerivVariant::Symmetric => &[(-1, -0.5), (1, 0.5)],
            DerivVariant::Improved => &[
                (-2, 1.0 / 12.0),
                (-1, -8.0 / 12.0),
                (1, 8.0 / 12.0),
                (2, -1.0 / 12.0),
            ],
        }
    }
}

impl fmt::Display for DerivVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DerivVariant::Forward => "forward",
            DerivVariant::Backward => "backward",
            DerivVariant::Symmetric => "symmetric",
            DerivVariant::Improved => "improved",
        };
        f.write_str(label)
    }
}

impl FromStr for DerivVariant {
    type Err = PvfError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "forward" => Ok(DerivVariant::Forward),
            "backward" => Ok(DerivVariant::Backward),
            "symmetric" => Ok(DerivVariant::Symmetric),
            "improved" => Ok(DerivVariant::Improved),
            other => Err(stats_error(
                "unknown-derivative",
                format!("unknown derivative variant {other}"),
            )),
        }
    }
}

/// Ordered sequence of optional observables.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Corr {
    content: Vec<Option<Obs>>,
}

impl From<Vec<Obs>> for Corr {
    fn from(values: Vec<Obs>) -> Self {
        Self::new(values.into_iter().map(Some).collect())
    }
}

impl FromIterator<Option<Obs>> for Corr {
    fn from_iter<I: IntoIterator<Item = Option<Obs>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Corr {
    /// Creates a correlator from its entries.
    pub fn new(content: Vec<Option<Obs>>) -> Self {
        Self { content }
    }

    /// Number of time slices, defined or not.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Whether the correlator has no time slices.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Entries in time order.
    pub fn content(&self) -> &[Option<Obs>] {
        &self.content
    }

    /// Consumes the correlator and returns its entries.
    pub fn into_content(self) -> Vec<Option<Obs>> {
        self.content
    }

    /// Entry at time `t`, `None` when undefined or out of range.
    pub fn get(&self, t: usize) -> Option<&Obs> {
        self.content.get(t).and_then(Option::as_ref)
    }

    /// Entry at time `t` or an error naming the slice.
    pub fn require(&self, t: usize) -> Result<&Obs, PvfError> {
        self.get(t).ok_or_else(|| {
            stats_error(
                "undefined-entry",
                format!("correlator entry {t} of {} is undefined", self.len()),
            )
        })
    }

    /// Half-open range from the first to one past the last defined entry.
    pub fn defined_range(&self) -> Result<Range<usize>, PvfError> {
        let start = self
            .content
            .iter()
            .position(Option::is_some)
            .ok_or_else(|| stats_error("all-undefined", "correlator has no defined entries"))?;
        let end = self
            .content
            .iter()
            .rposition(Option::is_some)
            .map_or(start, |last| last + 1);
        Ok(start..end)
    }

    /// Element-wise product of plain numbers with the defined part of the correlator.
    ///
    /// Positions outside the defined range stay undefined and the result has
    /// `array.len()` entries.
    pub fn partial_mult(&self, array: &[f64]) -> Result<Corr, PvfError> {
        let range = self.defined_range()?;
        if array.len() < range.end {
            return Err(stats_error(
                "array-too-short",
                format!(
                    "array of length {} does not cover the defined range {}..{}",
                    array.len(),
                    range.start,
                    range.end
                ),
            ));
        }
        let mut content = Vec::with_capacity(array.len());
        content.extend(std::iter::repeat(None).take(range.start));
        for t in range.clone() {
            content.push(self.content[t].as_ref().map(|obs| obs * array[t]));
        }
        content.extend(std::iter::repeat(None).take(array.len() - range.end));
        Ok(Corr::new(content))
    }

    /// Finite-difference derivative in time.
    ///
    /// Entries whose stencil reaches an undefined or out-of-range slice are
    /// undefined. Fails when no entry survives.
    pub fn deriv(&self, variant: DerivVariant) -> Result<Corr, PvfError> {
        let stencil = variant.stencil();
        let len = self.len() as isize;
        let content: Vec<Option<Obs>> = (0..len)
            .map(|t| {
                let mut terms = Vec::with_capacity(stencil.len());
                for (shift, weight) in stencil {
                    let index = t + shift;
                    if index < 0 || index >= len {
                        return None;
                    }
                    terms.push((self.get(index as usize)?, *weight));
                }
                let inputs: Vec<&Obs> = terms.iter().map(|(obs, _)| *obs).collect();
                let weights: Vec<f64> = terms.iter().map(|(_, weight)| *weight).collect();
                let value = terms.iter().map(|(obs, weight)| obs.value() * weight).sum();
                Some(Obs::linear(&inputs, value, &weights))
            })
            .collect();
        if content.iter().all(Option::is_none) {
            return Err(stats_error(
                "undefined-derivative",
                format!("{variant} derivative is undefined at all time slices"),
            ));
        }
        Ok(Corr::new(content))
    }

    fn zip_with(
        &self,
        other: &Corr,
        op: impl Fn(&Obs, &Obs) -> Obs,
    ) -> Result<Corr, PvfError> {
        if self.len() != other.len() {
            return Err(stats_error(
                "length-mismatch",
                format!(
                    "correlators of length {} and {} cannot be combined",
                    self.len(),
                    other.len()
                ),
            ));
        }
        Ok(self
            .content
            .iter()
            .zip(&other.content)
            .map(|(a, b)| match (a, b) {
                (Some(a), Some(b)) => Some(op(a, b)),
                _ => None,
            })
            .collect())
    }

    /// Element-wise sum.
    pub fn add_corr(&self, other: &Corr) -> Result<Corr, PvfError> {
        self.zip_with(other, |a, b| a + b)
    }

    /// Element-wise difference.
    pub fn sub_corr(&self, other: &Corr) -> Result<Corr, PvfError> {
        self.zip_with(other, |a, b| a - b)
    }

    /// Element-wise product.
    pub fn mul_corr(&self, other: &Corr) -> Result<Corr, PvfError> {
        self.zip_with(other, |a, b| a * b)
    }

    /// Element-wise quotient.
    pub fn div_corr(&self, other: &Corr) -> Result<Corr, PvfError> {
        self.zip_with(other, |a, b| a / b)
    }

    /// Applies `f` to every defined entry.
    pub fn map(&self, f: impl Fn(&Obs) -> Obs) -> Corr {
        self.content
            .iter()
            .map(|entry| entry.as_ref().map(&f))
            .collect()
    }

    /// Runs the error analysis on every defined entry with explicit options.
    pub fn gamma_method_with(&mut self, opts: &GammaOpts) {
        for obs in self.content.iter_mut().flatten() {
            obs.gamma_method_with(opts);
        }
    }

    /// `(t, value, error)` for every defined entry.
    pub fn plottable(&self) -> Vec<(usize, f64, f64)> {
        self.content
            .iter()
            .enumerate()
            .filter_map(|(t, entry)| entry.as_ref().map(|obs| (t, obs.value(), obs.dvalue())))
            .collect()
    }
}

impl Mul<f64> for &Corr {
    type Output = Corr;
    fn mul(self, rhs: f64) -> Corr {
        self.map(|obs| obs * rhs)
    }
}

impl Mul<f64> for Corr {
    type Output = Corr;
    fn mul(self, rhs: f64) -> Corr {
        &self * rhs
    }
}

impl Div<f64> for &Corr {
    type Output = Corr;
    fn div(self, rhs: f64) -> Corr {
        self.map(|obs| obs / rhs)
    }
}

impl Div<f64> for Corr {
    type Output = Corr;
    fn div(self, rhs: f64) -> Corr {
        &self / rhs
    }
}

impl Neg for &Corr {
    type Output = Corr;
    fn neg(self) -> Corr {
        self.map(|obs| -obs)
    }
}

impl Neg for Corr {
    type Output = Corr;
    fn neg(self) -> Corr {
        -&self
    }
}
