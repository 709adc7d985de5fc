//! Haversine distance oracle.
//!
//! Great-circle distance between coordinates and a flat-speed travel-time
//! estimate. Ignores roads, which is acceptable for ranking nearby pickups.

use crate::model::Coordinates;
use crate::options::PlannerOptions;
use crate::traits::DistanceOracle;

/// Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Average driving speed assumption for time estimation.
const DEFAULT_SPEED_KMH: f64 = 20.0;

/// Dwell time per pickup in minutes.
const DEFAULT_STOP_MINUTES: u32 = 3;

/// Great-circle distance between two points in kilometers.
pub fn haversine_km(from: Coordinates, to: Coordinates) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lng = (to.lng - from.lng).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Rounds kilometres to two decimals, halves rounding up.
pub fn round_km(km: f64) -> f64 {
    (km * 100.0 + 0.5).floor() / 100.0
}

/// Haversine-based oracle with a constant speed and per-stop dwell time.
#[derive(Debug, Clone)]
pub struct HaversineOracle {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
    /// Minutes added per pickup.
    pub stop_minutes: u32,
}

impl Default for HaversineOracle {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
            stop_minutes: DEFAULT_STOP_MINUTES,
        }
    }
}

impl HaversineOracle {
    pub fn new(speed_kmh: f64, stop_minutes: u32) -> Self {
        Self {
            speed_kmh,
            stop_minutes,
        }
    }

    pub fn from_options(options: &PlannerOptions) -> Self {
        Self::new(options.average_speed_kmh, options.stop_minutes)
    }
}

impl DistanceOracle for HaversineOracle {
    fn distance_km(&self, from: Coordinates, to: Coordinates) -> f64 {
        haversine_km(from, to)
    }

    fn travel_minutes(&self, distance_km: f64, stops: usize) -> u32 {
        let driving = distance_km / self.speed_kmh * 60.0;
        let dwell = (stops as f64) * f64::from(self.stop_minutes);
        (driving + dwell).ceil().max(0.0) as u32
    }
}
