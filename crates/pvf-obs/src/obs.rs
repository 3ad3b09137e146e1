use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet};

use pvf_core::{ErrorInfo, PvfError};

use crate::gamma::GammaAnalysis;

/// Minimum number of measurements accepted for a single replica.
pub const MIN_SAMPLES: usize = 5;

/// Separates the ensemble from the replica in a series name (`ensemble|replica`).
pub const REPLICA_SEPARATOR: char = '|';

pub(crate) fn stats_error(code: &str, message: impl Into<String>) -> PvfError {
    PvfError::Stats(ErrorInfo::new(code, message.into()))
}

/// Returns the ensemble part of a series name.
pub fn ensemble_name(name: &str) -> &str {
    name.split(REPLICA_SEPARATOR).next().unwrap_or(name)
}

/// Fluctuations of an observable on one replica.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    idl: Vec<usize>,
    deltas: Vec<f64>,
    offset: f64,
}

impl Series {
    pub(crate) fn new(idl: Vec<usize>, deltas: Vec<f64>, offset: f64) -> Self {
        Self {
            idl,
            deltas,
            offset,
        }
    }

    /// Configuration indices, strictly increasing.
    pub fn idl(&self) -> &[usize] {
        &self.idl
    }

    /// Deviations from the replica mean, one per configuration.
    pub fn deltas(&self) -> &[f64] {
        &self.deltas
    }

    /// Replica mean minus the central value of the observable.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Number of configurations.
    pub fn len(&self) -> usize {
        self.idl.len()
    }

    /// Whether the series holds no configurations.
    pub fn is_empty(&self) -> bool {
        self.idl.is_empty()
    }

    /// Deltas laid out on a superset of the configuration indices.
    ///
    /// Configurations absent from this series contribute zero, and the
    /// remaining deltas are scaled by `target.len() / self.len()` so the
    /// replica average is preserved.
    pub(crate) fn expand_to(&self, target: &[usize]) -> Vec<f64> {
        if target == self.idl.as_slice() {
            return self.deltas.clone();
        }
        let scale = target.len() as f64 / self.idl.len().max(1) as f64;
        let mut expanded = vec![0.0; target.len()];
        let mut cursor = 0;
        for (slot, index) in target.iter().enumerate() {
            while cursor < self.idl.len() && self.idl[cursor] < *index {
                cursor += 1;
            }
            if cursor < self.idl.len() && self.idl[cursor] == *index {
                expanded[slot] = self.deltas[cursor] * scale;
            }
        }
        expanded
    }
}

pub(crate) fn merge_idl<'a>(lists: impl Iterator<Item = &'a [usize]>) -> Vec<usize> {
    let mut merged = BTreeSet::new();
    for list in lists {
        merged.extend(list.iter().copied());
    }
    merged.into_iter().collect()
}

/// Observable with per-configuration fluctuations on one or more ensembles.
///
/// Arithmetic between observables propagates the fluctuations linearly, so
/// correlations through shared configurations survive every operation. The
/// error analysis runs lazily on first use and is cached.
#[derive(Debug, Clone)]
pub struct Obs {
    value: f64,
    series: BTreeMap<String, Series>,
    pub(crate) analysis: OnceCell<GammaAnalysis>,
}

impl PartialEq for Obs {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.series == other.series
    }
}

fn validate_idl(name: &str, idl: &[usize], len: usize) -> Result<(), PvfError> {
    if idl.len() != len {
        return Err(stats_error(
            "idl-length",
            format!(
                "replica {name} has {} configuration indices for {len} samples",
                idl.len()
            ),
        ));
    }
    if idl.windows(2).any(|pair| pair[1] <= pair[0]) {
        return Err(stats_error(
            "idl-order",
            format!("configuration indices of replica {name} are not strictly increasing"),
        ));
    }
    Ok(())
}

impl Obs {
    /// Creates an observable from raw measurements, one sample vector per replica.
    ///
    /// `idl` lists the configuration index of every sample; it defaults to
    /// `1..=N` for each replica.
    pub fn new(
        samples: Vec<Vec<f64>>,
        names: Vec<String>,
        idl: Option<Vec<Vec<usize>>>,
    ) -> Result<Self, PvfError> {
        if samples.is_empty() {
            return Err(stats_error("no-samples", "an observable needs at least one replica"));
        }
        if samples.len() != names.len() {
            return Err(stats_error(
                "names-length",
                format!("{} sample sets but {} names", samples.len(), names.len()),
            ));
        }
        let unique: BTreeSet<&String> = names.iter().collect();
        if unique.len() != names.len() || names.iter().any(|name| name.is_empty()) {
            return Err(stats_error(
                "names-invalid",
                "replica names must be non-empty and unique",
            ));
        }
        let idl = match idl {
            Some(idl) => {
                if idl.len() != samples.len() {
                    return Err(stats_error(
                        "idl-length",
                        format!("{} index sets for {} replicas", idl.len(), samples.len()),
                    ));
                }
                idl
            }
            None => samples.iter().map(|s| (1..=s.len()).collect()).collect(),
        };

        let mut total = 0.0;
        let mut count = 0usize;
        for (name, (sample, indices)) in names.iter().zip(samples.iter().zip(idl.iter())) {
            if sample.len() < MIN_SAMPLES {
                return Err(stats_error(
                    "insufficient-samples",
                    format!(
                        "replica {name} has {} samples, at least {MIN_SAMPLES} are required",
                        sample.len()
                    ),
                ));
            }
            if sample.iter().any(|value| !value.is_finite()) {
                return Err(stats_error(
                    "non-finite-sample",
                    format!("replica {name} contains non-finite samples"),
                ));
            }
            validate_idl(name, indices, sample.len())?;
            total += sample.iter().sum::<f64>();
            count += sample.len();
        }
        let value = total / count as f64;

        let mut series = BTreeMap::new();
        for (name, (sample, indices)) in names.into_iter().zip(samples.into_iter().zip(idl)) {
            let mean = sample.iter().sum::<f64>() / sample.len() as f64;
            let deltas = sample.iter().map(|x| x - mean).collect();
            series.insert(name, Series::new(indices, deltas, mean - value));
        }
        Ok(Self::from_parts(value, series))
    }

    /// Creates an observable from a single replica.
    pub fn from_samples(samples: Vec<f64>, name: impl Into<String>) -> Result<Self, PvfError> {
        Self::new(vec![samples], vec![name.into()], None)
    }

    /// Creates an observable without fluctuations.
    pub fn constant(value: f64) -> Self {
        Self::from_parts(value, BTreeMap::new())
    }

    pub(crate) fn from_parts(value: f64, series: BTreeMap<String, Series>) -> Self {
        Self {
            value,
            series,
            analysis: OnceCell::new(),
        }
    }

    /// Central value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Per-replica fluctuations keyed by series name.
    pub fn series(&self) -> &BTreeMap<String, Series> {
        &self.series
    }

    /// Series names (`ensemble|replica`).
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    /// Ensembles the observable depends on.
    pub fn ensembles(&self) -> BTreeSet<&str> {
        self.series.keys().map(|name| ensemble_name(name)).collect()
    }

    /// Whether the observable carries no fluctuations.
    pub fn is_constant(&self) -> bool {
        self.series.is_empty()
    }

    /// Total number of configurations over all replicas.
    pub fn n_samples(&self) -> usize {
        self.series.values().map(Series::len).sum()
    }

    /// Linear combination `Σ gradient_i δinputs_i` around the given central value.
    ///
    /// `gradient` holds the derivative of the result with respect to each input.
    pub fn linear(inputs: &[&Obs], value: f64, gradient: &[f64]) -> Obs {
        debug_assert_eq!(inputs.len(), gradient.len());
        let names: BTreeSet<&String> = inputs.iter().flat_map(|obs| obs.series.keys()).collect();

        let mut series = BTreeMap::new();
        for name in names {
            let idl = merge_idl(
                inputs
                    .iter()
                    .filter_map(|obs| obs.series.get(name))
                    .map(Series::idl),
            );
            let mut deltas = vec![0.0; idl.len()];
            let mut offset = 0.0;
            for (obs, weight) in inputs.iter().zip(gradient) {
                let Some(own) = obs.series.get(name) else {
                    continue;
                };
                if *weight == 0.0 {
                    continue;
                }
                for (target, delta) in deltas.iter_mut().zip(own.expand_to(&idl)) {
                    *target += weight * delta;
                }
                offset += weight * own.offset;
            }
            series.insert(name.clone(), Series::new(idl, deltas, offset));
        }
        Obs::from_parts(value, series)
    }

    /// Applies a scalar function given its value and derivative at the central value.
    pub fn apply(&self, value: f64, derivative: f64) -> Obs {
        Obs::linear(&[self], value, &[derivative])
    }

    /// Returns `scale * self + shift`.
    pub fn affine(&self, scale: f64, shift: f64) -> Obs {
        self.apply(scale * self.value + shift, scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_combines_replicas_by_size() {
        let obs = Obs::new(
            vec![vec![1.0; 5], vec![2.0; 10]],
            vec!["ens|r0".into(), "ens|r1".into()],
            None,
        )
        .expect("obs");
        assert!((obs.value() - 25.0 / 15.0).abs() < 1e-12);
        let r0 = &obs.series()["ens|r0"];
        assert!((r0.offset() - (1.0 - 25.0 / 15.0)).abs() < 1e-12);
        assert_eq!(obs.ensembles().into_iter().collect::<Vec<_>>(), vec!["ens"]);
    }

    #[test]
    fn short_replicas_are_rejected() {
        let err = Obs::from_samples(vec![1.0, 2.0, 3.0], "ens").unwrap_err();
        assert_eq!(err.info().code, "insufficient-samples");
    }

    #[test]
    fn unordered_indices_are_rejected() {
        let err = Obs::new(
            vec![vec![1.0, 2.0, 3.0, 4.0, 5.0]],
            vec!["ens".into()],
            Some(vec![vec![1, 2, 4, 3, 5]]),
        )
        .unwrap_err();
        assert_eq!(err.info().code, "idl-order");
    }

    #[test]
    fn expansion_preserves_the_replica_sum() {
        let series = Series::new(vec![2, 4, 6], vec![1.0, -2.0, 1.0], 0.0);
        let expanded = series.expand_to(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(expanded, vec![0.0, 2.0, 0.0, -4.0, 0.0, 2.0]);
        assert!(expanded.iter().sum::<f64>().abs() < 1e-12);
    }

    #[test]
    fn linear_merges_distinct_index_sets() {
        let a = Obs::new(
            vec![vec![1.0, 2.0, 3.0, 4.0, 5.0]],
            vec!["ens".into()],
            Some(vec![vec![1, 2, 3, 4, 5]]),
        )
        .expect("a");
        let b = Obs::new(
            vec![vec![5.0, 4.0, 3.0, 2.0, 1.0]],
            vec!["ens".into()],
            Some(vec![vec![4, 5, 6, 7, 8]]),
        )
        .expect("b");
        let sum = Obs::linear(&[&a, &b], a.value() + b.value(), &[1.0, 1.0]);
        assert_eq!(sum.series()["ens"].idl(), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert!((sum.value() - 6.0).abs() < 1e-12);
    }
}
