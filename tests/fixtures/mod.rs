//! Test fixtures for transport-planner.
//!
//! Provides realistic test data including:
//! - Neighbourhood centroids around a Setagaya day-service centre
//! - Builders for riders, fleets and sessions

#![allow(dead_code)]

pub mod setagaya_locations;

pub use setagaya_locations::*;

use transport_planner::{Facility, PlanningSession, Rider, Vehicle};

/// Rider `id` living at `location`.
pub fn rider_at(id: &str, location: &Location) -> Rider {
    Rider::new(id, location.lat, location.lng).with_name(location.name)
}

/// One rider per location, ids `r00`, `r01`, ...
pub fn riders_from(locations: &[Location]) -> Vec<Rider> {
    locations
        .iter()
        .enumerate()
        .map(|(i, location)| rider_at(&format!("r{i:02}"), location))
        .collect()
}

pub fn day_centre() -> Facility {
    Facility::new(DAY_CENTRE.lat, DAY_CENTRE.lng).with_name(DAY_CENTRE.name)
}

/// A small mixed fleet: one lift van, one sedan, one minibus.
pub fn standard_fleet() -> Vec<Vehicle> {
    vec![
        Vehicle::new("lift-van", 4, 2).with_name("Lift van"),
        Vehicle::new("sedan", 3, 0).with_name("Sedan"),
        Vehicle::new("minibus", 8, 1).with_name("Minibus"),
    ]
}

/// Fresh session at the day centre with every rider unassigned.
pub fn fresh_session(vehicles: Vec<Vehicle>, riders: Vec<Rider>) -> PlanningSession {
    PlanningSession::new(day_centre(), vehicles, riders).expect("valid session")
}
