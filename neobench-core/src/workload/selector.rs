//! Weighted script selection
//!
//! Scripts are laid out on a number line, each occupying a segment as long as
//! its weight. For A@2, B@3, C@3:
//!
//! ```text
//!   1 2 3 4 5 6 7 8
//!   [A A][B B B][C C C]
//!      2      5      8   <- cumulative weight (lookup table)
//! ```
//!
//! A draw picks a point in `[1, total]` and binary-searches the lookup table
//! for the first cumulative weight `>= point`. Boundary points belong to the
//! lower-indexed script, and zero-weight scripts are never selected.

use super::script::Script;
use crate::error::{Error, Result};
use rand::Rng;

/// Immutable set of scripts with a cumulative weight index
#[derive(Debug, Clone)]
pub struct Scripts {
    scripts: Vec<Script>,
    /// `lookup[i]` is the sum of weights `0..=i`
    lookup: Vec<u64>,
    total_weight: u64,
}

impl Scripts {
    /// Build the lookup table
    ///
    /// # Returns
    /// Error if there are no scripts or every weight is zero, since no
    /// selection would be possible.
    pub fn new(scripts: Vec<Script>) -> Result<Self> {
        if scripts.is_empty() {
            return Err(Error::Config("workload needs at least one script".to_string()));
        }

        let mut lookup = Vec::with_capacity(scripts.len());
        let mut cumulative = 0u64;
        for script in &scripts {
            cumulative += u64::from(script.weight);
            lookup.push(cumulative);
        }

        if cumulative == 0 {
            let names: Vec<&str> = scripts.iter().map(|s| s.name.as_str()).collect();
            return Err(Error::Config(format!(
                "total script weight is zero (scripts: {})",
                names.join(", ")
            )));
        }

        Ok(Self { scripts, lookup, total_weight: cumulative })
    }

    /// Pick a script proportionally to its weight
    ///
    /// With a single script the randomness stream is not consulted at all.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &Script {
        if self.scripts.len() == 1 {
            return &self.scripts[0];
        }

        let point = rng.random_range(1..=self.total_weight);
        self.pick(point)
    }

    /// The script owning `point` on the cumulative weight line
    ///
    /// # Panics
    /// If `point` is outside `[1, total_weight]`.
    pub fn pick(&self, point: u64) -> &Script {
        assert!(
            (1..=self.total_weight).contains(&point),
            "point {point} outside [1, {}]",
            self.total_weight
        );
        let index = self.lookup.partition_point(|&cumulative| cumulative < point);
        &self.scripts[index]
    }

    pub fn scripts(&self) -> &[Script] {
        &self.scripts
    }

    pub fn lookup(&self) -> &[u64] {
        &self.lookup
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::command::Command;
    use rand::rngs::SmallRng;
    use rand::{RngCore, SeedableRng};
    use std::collections::HashMap;

    fn script(name: &str, weight: u32) -> Script {
        Script::new(name, weight, vec![Command::query(format!("SELECT '{name}'"))])
    }

    /// Randomness source that must never be used
    struct PanickingRng;

    impl RngCore for PanickingRng {
        fn next_u32(&mut self) -> u32 {
            panic!("randomness consulted");
        }

        fn next_u64(&mut self) -> u64 {
            panic!("randomness consulted");
        }

        fn fill_bytes(&mut self, _dst: &mut [u8]) {
            panic!("randomness consulted");
        }
    }

    #[test]
    fn test_lookup_table() {
        let scripts = Scripts::new(vec![script("a", 2), script("b", 3), script("c", 3)]).unwrap();
        assert_eq!(scripts.lookup(), &[2, 5, 8]);
        assert_eq!(scripts.total_weight(), 8);
        assert_eq!(scripts.len(), 3);
    }

    #[test]
    fn test_pick_boundaries() {
        let scripts = Scripts::new(vec![script("a", 2), script("b", 3), script("c", 3)]).unwrap();

        assert_eq!(scripts.pick(1).name, "a");
        assert_eq!(scripts.pick(2).name, "a");
        assert_eq!(scripts.pick(3).name, "b");
        assert_eq!(scripts.pick(5).name, "b");
        assert_eq!(scripts.pick(6).name, "c");
        assert_eq!(scripts.pick(8).name, "c");
    }

    #[test]
    fn test_zero_weight_script_never_picked() {
        let scripts = Scripts::new(vec![script("a", 2), script("idle", 0), script("c", 3)]).unwrap();
        assert_eq!(scripts.lookup(), &[2, 2, 5]);

        for point in 1..=5 {
            assert_ne!(scripts.pick(point).name, "idle", "point {point}");
        }
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn test_pick_rejects_point_past_total() {
        let scripts = Scripts::new(vec![script("a", 1), script("b", 1)]).unwrap();
        scripts.pick(3);
    }

    #[test]
    fn test_single_script_skips_randomness() {
        let scripts = Scripts::new(vec![script("only", 5)]).unwrap();
        let mut rng = PanickingRng;

        for _ in 0..10 {
            assert_eq!(scripts.choose(&mut rng).name, "only");
        }
    }

    #[test]
    fn test_empty_set_rejected() {
        assert!(matches!(Scripts::new(Vec::new()), Err(Error::Config(_))));
    }

    #[test]
    fn test_all_zero_weights_rejected() {
        let result = Scripts::new(vec![script("a", 0), script("b", 0)]);
        match result {
            Err(Error::Config(msg)) => assert!(msg.contains("zero"), "{msg}"),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_choose_distribution() {
        let scripts = Scripts::new(vec![script("a", 1), script("b", 2), script("c", 7)]).unwrap();
        let mut rng = SmallRng::seed_from_u64(42);

        let samples = 100_000;
        let mut counts: HashMap<String, u32> = HashMap::new();
        for _ in 0..samples {
            *counts.entry(scripts.choose(&mut rng).name.clone()).or_insert(0) += 1;
        }

        for (name, expected) in [("a", 0.1), ("b", 0.2), ("c", 0.7)] {
            let ratio = counts.get(name).copied().unwrap_or(0) as f64 / samples as f64;
            assert!(
                (ratio - expected).abs() < 0.01,
                "script {name} ratio {ratio} not close to {expected}"
            );
        }
    }

    #[test]
    fn test_choose_reproducible() {
        let scripts = Scripts::new(vec![script("a", 1), script("b", 1), script("c", 1)]).unwrap();
        let mut rng1 = SmallRng::seed_from_u64(123);
        let mut rng2 = SmallRng::seed_from_u64(123);

        for _ in 0..100 {
            assert_eq!(scripts.choose(&mut rng1).name, scripts.choose(&mut rng2).name);
        }
    }
}
