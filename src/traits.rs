//! Seams for injecting distance and travel-time estimates.
//!
//! The planner only needs point-to-point distances and a duration estimate for
//! a whole route; hosts may plug in their own metric.

use crate::model::Coordinates;

/// Provides distances between points and travel-time estimates for routes.
pub trait DistanceOracle {
    /// Unrounded distance in kilometres.
    fn distance_km(&self, from: Coordinates, to: Coordinates) -> f64;

    /// Minutes needed to drive `distance_km` and make `stops` pickups.
    fn travel_minutes(&self, distance_km: f64, stops: usize) -> u32;
}

impl<T: DistanceOracle + ?Sized> DistanceOracle for &T {
    fn distance_km(&self, from: Coordinates, to: Coordinates) -> f64 {
        (**self).distance_km(from, to)
    }

    fn travel_minutes(&self, distance_km: f64, stops: usize) -> u32 {
        (**self).travel_minutes(distance_km, stops)
    }
}
