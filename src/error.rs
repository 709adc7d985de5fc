//! Planner error type.
//!
//! Every error is recoverable: it either rejects a single operation (the
//! input session is left untouched) or is reported per rider through
//! [`crate::model::UnassignedReason`].

use std::fmt;

use crate::model::{RiderId, VehicleId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannerError {
    /// The target trip already holds `capacity` riders.
    CapacityExceeded { vehicle_id: VehicleId, capacity: u32 },
    /// The target trip has no free wheelchair space.
    WheelchairCapacityExceeded {
        vehicle_id: VehicleId,
        wheelchair_capacity: u32,
    },
    /// Auto-assign found no active, unlocked vehicle.
    NoEligibleVehicles,
    MissingCoordinates { rider_id: RiderId },
    RiderNotFound { rider_id: RiderId },
    VehicleNotFound { vehicle_id: VehicleId },
    TripNotFound { vehicle_id: VehicleId, index: usize },
    IndexOutOfRange { index: usize, len: usize },
    /// A vehicle must keep at least one trip.
    LastTrip { vehicle_id: VehicleId },
    /// Malformed session handed in at the boundary.
    InvalidSession(String),
    /// Unparseable location identifier.
    InvalidLocation(String),
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded {
                vehicle_id,
                capacity,
            } => write!(
                f,
                "vehicle {vehicle_id} is full: a trip holds at most {capacity} riders"
            ),
            Self::WheelchairCapacityExceeded {
                vehicle_id,
                wheelchair_capacity,
            } => write!(
                f,
                "vehicle {vehicle_id} has no wheelchair space left: a trip holds at most {wheelchair_capacity} wheelchair riders"
            ),
            Self::NoEligibleVehicles => {
                write!(f, "no active vehicle is available for automatic assignment")
            }
            Self::MissingCoordinates { rider_id } => {
                write!(f, "rider {rider_id} has no resolved coordinates")
            }
            Self::RiderNotFound { rider_id } => {
                write!(f, "rider {rider_id} is not at the given location")
            }
            Self::VehicleNotFound { vehicle_id } => write!(f, "unknown vehicle {vehicle_id}"),
            Self::TripNotFound { vehicle_id, index } => {
                write!(f, "vehicle {vehicle_id} has no trip {index}")
            }
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} is out of range for a trip of {len} riders")
            }
            Self::LastTrip { vehicle_id } => {
                write!(f, "vehicle {vehicle_id} must keep at least one trip")
            }
            Self::InvalidSession(reason) => write!(f, "invalid planning session: {reason}"),
            Self::InvalidLocation(raw) => write!(f, "invalid rider location '{raw}'"),
        }
    }
}

impl std::error::Error for PlannerError {}
