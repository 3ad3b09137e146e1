use itertools::Itertools;

/// Every index subset of size `min_count..=min(len)` applied to both lists.
///
/// Subsets are produced by increasing size, lexicographically within a size.
/// Lists of different length are truncated to the shorter one.
pub fn zip_combinations<A: Clone, B: Clone>(
    first: &[A],
    second: &[B],
    min_count: usize,
) -> Vec<(Vec<A>, Vec<B>)> {
    let max_count = first.len().min(second.len());
    if first.len() != second.len() {
        tracing::warn!(
            first = first.len(),
            second = second.len(),
            "list lengths are not equal"
        );
    }
    (min_count.max(1)..=max_count)
        .flat_map(|count| (0..max_count).combinations(count))
        .map(|indices| {
            (
                indices.iter().map(|&i| first[i].clone()).collect(),
                indices.iter().map(|&i| second[i].clone()).collect(),
            )
        })
        .collect()
}

/// Akaike information criterion `χ²/dof + 2k + 2 N_cut`.
pub fn aic(chisquare_by_dof: f64, n_params: usize, n_cut: usize) -> f64 {
    chisquare_by_dof + 2.0 * n_params as f64 + 2.0 * n_cut as f64
}
