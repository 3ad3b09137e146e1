use proptest::prelude::*;
use pvf_fit::zip_combinations;

fn binomial(n: usize, k: usize) -> usize {
    (0..k).fold(1, |acc, i| acc * (n - i) / (i + 1))
}

proptest! {
    #[test]
    fn subset_count_matches_binomial_sum(len in 1usize..8, min_count in 1usize..5) {
        let xs: Vec<usize> = (0..len).collect();
        let ys: Vec<f64> = xs.iter().map(|x| *x as f64 * 0.5).collect();
        let subsets = zip_combinations(&xs, &ys, min_count);
        let expected: usize = (min_count..=len).map(|k| binomial(len, k)).sum();
        prop_assert_eq!(subsets.len(), expected);
        for (a, b) in &subsets {
            prop_assert!(a.len() >= min_count);
            prop_assert!(a.windows(2).all(|w| w[0] < w[1]));
            for (x, y) in a.iter().zip(b) {
                prop_assert_eq!(*x as f64 * 0.5, *y);
            }
        }
    }
}
