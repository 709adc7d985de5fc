//! Planner configuration.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerOptions {
    /// Average driving speed used for duration estimates (km/h).
    pub average_speed_kmh: f64,
    /// Minutes spent at each pickup.
    pub stop_minutes: u32,
    /// Upper bound on Lloyd iterations per clustering run.
    pub max_iterations: usize,
    /// Half-width (degrees) of the box an empty cluster is reseeded in.
    pub reseed_jitter_deg: f64,
    /// Maximum trips a vehicle may run in one day. `None` means unlimited.
    pub max_trips_per_vehicle: Option<usize>,
    /// Seed for clustering randomness. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            average_speed_kmh: 20.0,
            stop_minutes: 3,
            max_iterations: 100,
            reseed_jitter_deg: 0.05,
            max_trips_per_vehicle: None,
            seed: None,
        }
    }
}

impl PlannerOptions {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_trips_per_vehicle(mut self, max: usize) -> Self {
        self.max_trips_per_vehicle = Some(max);
        self
    }

    /// Random source for clustering, deterministic when `seed` is set.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    #[test]
    fn test_defaults_match_estimate_constants() {
        let options = PlannerOptions::default();
        assert_eq!(options.average_speed_kmh, 20.0);
        assert_eq!(options.stop_minutes, 3);
        assert_eq!(options.max_iterations, 100);
        assert!(options.max_trips_per_vehicle.is_none());
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let options = PlannerOptions::default().with_seed(7);
        let a: u64 = options.rng().r#gen();
        let b: u64 = options.rng().r#gen();
        assert_eq!(a, b);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let options: PlannerOptions =
            serde_json::from_str(r#"{ "stop_minutes": 5, "seed": 11 }"#).unwrap();
        assert_eq!(options.stop_minutes, 5);
        assert_eq!(options.seed, Some(11));
        assert_eq!(options.average_speed_kmh, 20.0);
    }
}
