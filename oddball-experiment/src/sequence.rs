use rand::Rng;
use serde::Serialize;

/// Which trials play the tone. Built once per session and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrialSequence(Vec<bool>);

impl TrialSequence {
    /// Independent Bernoulli draws with probability `p_oddball`, then repaired.
    pub fn generate<R: Rng>(n_trials: usize, p_oddball: f64, rng: &mut R) -> Self {
        let draws = (0..n_trials)
            .map(|_| rng.random::<f64>() < p_oddball)
            .collect();
        Self::from_draws(draws)
    }

    /// Single forward pass over the interior indices `1..=n-2`: an oddball
    /// that follows another is pushed one trial later. The final pair is
    /// never inspected, so a pushed oddball can still land next to a final
    /// oddball.
    pub fn from_draws(mut draws: Vec<bool>) -> Self {
        let n = draws.len();
        for t in 1..n.saturating_sub(1) {
            if draws[t - 1] && draws[t] {
                draws[t + 1] = true;
                draws[t] = false;
            }
        }
        Self(draws)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_oddball(&self, index: usize) -> Option<bool> {
        self.0.get(index).copied()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    pub fn oddball_count(&self) -> usize {
        self.0.iter().filter(|&&odd| odd).count()
    }

    /// Indices `t` where trials `t` and `t + 1` are both oddballs.
    pub fn adjacent_oddballs(&self) -> Vec<usize> {
        self.0
            .windows(2)
            .enumerate()
            .filter(|(_, w)| w[0] && w[1])
            .map(|(t, _)| t)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    const T: bool = true;
    const F: bool = false;

    #[test]
    fn zero_probability_is_all_silence() {
        let mut rng = Pcg64Mcg::seed_from_u64(7);
        let seq = TrialSequence::generate(4, 0.0, &mut rng);
        assert_eq!(seq.as_slice(), &[F, F, F, F]);
    }

    #[test]
    fn certain_oddballs_alternate_after_repair() {
        let mut rng = Pcg64Mcg::seed_from_u64(7);
        let seq = TrialSequence::generate(6, 1.0, &mut rng);
        // The last pair is outside the repair window.
        assert_eq!(seq.as_slice(), &[T, F, T, F, T, T]);
    }

    #[test]
    fn pushed_oddball_can_collide_with_final_trial() {
        // t=1 moves the second oddball to index 2, which now sits next to
        // the untouched final oddball.
        let seq = TrialSequence::from_draws(vec![T, T, F, T]);
        assert_eq!(seq.as_slice(), &[T, F, T, T]);
        assert_eq!(seq.adjacent_oddballs(), vec![2]);
    }

    #[test]
    fn natural_final_pair_is_left_alone() {
        let seq = TrialSequence::from_draws(vec![F, F, T, T]);
        assert_eq!(seq.as_slice(), &[F, F, T, T]);
    }

    #[test]
    fn run_of_oddballs_is_spread_forward() {
        let seq = TrialSequence::from_draws(vec![T, T, T, F, F]);
        assert_eq!(seq.as_slice(), &[T, F, T, F, F]);
    }

    #[test]
    fn short_sequences_pass_through() {
        assert_eq!(TrialSequence::from_draws(vec![]).len(), 0);
        assert_eq!(TrialSequence::from_draws(vec![T]).as_slice(), &[T]);
        assert_eq!(TrialSequence::from_draws(vec![T, T]).as_slice(), &[T, T]);
    }

    #[test]
    fn same_seed_same_sequence() {
        let a = TrialSequence::generate(150, 0.25, &mut Pcg64Mcg::seed_from_u64(99));
        let b = TrialSequence::generate(150, 0.25, &mut Pcg64Mcg::seed_from_u64(99));
        assert_eq!(a, b);
        assert_eq!(a.len(), 150);
    }

    proptest! {
        #[test]
        fn interior_never_has_adjacent_oddballs(
            n in 3usize..200,
            p in 0.0f64..=1.0,
            seed in any::<u64>(),
        ) {
            let seq = TrialSequence::generate(n, p, &mut Pcg64Mcg::seed_from_u64(seed));
            prop_assert_eq!(seq.len(), n);
            let s = seq.as_slice();
            for t in 1..n - 2 {
                prop_assert!(!(s[t] && s[t + 1]), "adjacent oddballs at {} in {:?}", t, s);
            }
            // Only the final pair may survive.
            for t in seq.adjacent_oddballs() {
                prop_assert_eq!(t, n - 2);
            }
        }

        #[test]
        fn repair_never_adds_oddballs(draws in proptest::collection::vec(any::<bool>(), 0..64)) {
            let before = draws.iter().filter(|&&odd| odd).count();
            let seq = TrialSequence::from_draws(draws.clone());
            prop_assert_eq!(seq.len(), draws.len());
            prop_assert!(seq.oddball_count() <= before);
        }
    }
}
