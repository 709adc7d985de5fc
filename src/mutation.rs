//! Manual moves and reorders.
//!
//! Validates a single drag-and-drop action against the target trip's limits
//! before touching anything, then applies it to a copy of the session and
//! recomputes the totals of every trip whose order changed. Trips keep their
//! relative order; nothing is re-optimized here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PlannerError;
use crate::model::{RiderId, VehicleId};
use crate::sequencer::refresh_trip;
use crate::session::PlanningSession;
use crate::traits::DistanceOracle;

/// Where a rider is, or is dropped.
///
/// The text form used by drag-and-drop hosts is `unassigned`,
/// `vehicle-<id>` or `trip-<id>-<index>`; parse it once with [`FromStr`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiderLocation {
    Unassigned,
    /// A vehicle as a whole. As a drop target this means its last trip.
    Vehicle(VehicleId),
    Trip { vehicle_id: VehicleId, index: usize },
}

impl RiderLocation {
    pub fn trip(vehicle_id: impl Into<String>, index: usize) -> Self {
        Self::Trip {
            vehicle_id: VehicleId::new(vehicle_id),
            index,
        }
    }

    pub fn vehicle(vehicle_id: impl Into<String>) -> Self {
        Self::Vehicle(VehicleId::new(vehicle_id))
    }
}

impl FromStr for RiderLocation {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PlannerError::InvalidLocation(s.to_string());
        if s == "unassigned" {
            return Ok(Self::Unassigned);
        }
        if let Some(rest) = s.strip_prefix("trip-") {
            let (vehicle_id, index) = rest.rsplit_once('-').ok_or_else(invalid)?;
            if vehicle_id.is_empty() {
                return Err(invalid());
            }
            let index = index.parse().map_err(|_| invalid())?;
            return Ok(Self::trip(vehicle_id, index));
        }
        match s.strip_prefix("vehicle-") {
            Some(vehicle_id) if !vehicle_id.is_empty() => Ok(Self::vehicle(vehicle_id)),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for RiderLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unassigned => f.write_str("unassigned"),
            Self::Vehicle(vehicle_id) => write!(f, "vehicle-{vehicle_id}"),
            Self::Trip { vehicle_id, index } => write!(f, "trip-{vehicle_id}-{index}"),
        }
    }
}

/// A concrete trip, or `None` for the unassigned list.
type Slot = Option<(VehicleId, usize)>;

/// Moves one rider from `source` to the tail of `target`.
///
/// Fails without changing anything when the target trip is full
/// ([`PlannerError::CapacityExceeded`]) or, for a wheelchair rider, has no
/// wheelchair space left ([`PlannerError::WheelchairCapacityExceeded`]). The
/// unassigned list has no limit. Dropping a rider onto its own trip is a
/// no-op.
pub fn move_rider<O>(
    session: &PlanningSession,
    rider_id: &RiderId,
    source: &RiderLocation,
    target: &RiderLocation,
    oracle: &O,
) -> Result<PlanningSession, PlannerError>
where
    O: DistanceOracle + ?Sized,
{
    let from = source_slot(session, rider_id, source)?;
    let to = target_slot(session, target)?;
    if from == to {
        return Ok(session.clone());
    }

    if let Some((vehicle_id, index)) = &to {
        let rider = session
            .rider(rider_id)
            .ok_or_else(|| PlannerError::RiderNotFound {
                rider_id: rider_id.clone(),
            })?;
        let vehicle = session
            .vehicle(vehicle_id)
            .ok_or_else(|| PlannerError::VehicleNotFound {
                vehicle_id: vehicle_id.clone(),
            })?;
        let trip = &session.trips_of(vehicle_id)?[*index];
        if trip.len() >= vehicle.capacity as usize {
            warn!(rider = %rider_id, vehicle = %vehicle_id, trip = index, "move rejected: trip full");
            return Err(PlannerError::CapacityExceeded {
                vehicle_id: vehicle_id.clone(),
                capacity: vehicle.capacity,
            });
        }
        if rider.wheelchair && trip.wheelchair_count() >= vehicle.wheelchair_capacity as usize {
            warn!(rider = %rider_id, vehicle = %vehicle_id, trip = index, "move rejected: no wheelchair space");
            return Err(PlannerError::WheelchairCapacityExceeded {
                vehicle_id: vehicle_id.clone(),
                wheelchair_capacity: vehicle.wheelchair_capacity,
            });
        }
    }

    let mut next = session.clone();
    let facility = next.facility.clone();
    let not_found = || PlannerError::RiderNotFound {
        rider_id: rider_id.clone(),
    };

    let rider = match &from {
        None => {
            let position = next
                .unassigned
                .iter()
                .position(|r| &r.id == rider_id)
                .ok_or_else(not_found)?;
            next.unassigned.remove(position)
        }
        Some((vehicle_id, index)) => {
            let trip = &mut next.trips_mut(vehicle_id)?[*index];
            let position = trip.position_of(rider_id).ok_or_else(not_found)?;
            let rider = trip.riders.remove(position);
            refresh_trip(&facility, trip, oracle);
            rider
        }
    };

    match &to {
        None => next.unassigned.push(rider),
        Some((vehicle_id, index)) => {
            let trip = &mut next.trips_mut(vehicle_id)?[*index];
            trip.riders.push(rider);
            refresh_trip(&facility, trip, oracle);
        }
    }

    debug!(rider = %rider_id, from = %source, to = %target, "moved rider");
    Ok(next)
}

/// Moves the rider at `old_index` of a trip to `new_index`, shifting the
/// others, and recomputes that trip's totals only.
pub fn reorder_trip<O>(
    session: &PlanningSession,
    vehicle_id: &VehicleId,
    trip_index: usize,
    old_index: usize,
    new_index: usize,
    oracle: &O,
) -> Result<PlanningSession, PlannerError>
where
    O: DistanceOracle + ?Sized,
{
    let mut next = session.clone();
    let facility = next.facility.clone();
    let trip = next
        .trips_mut(vehicle_id)?
        .get_mut(trip_index)
        .ok_or_else(|| PlannerError::TripNotFound {
            vehicle_id: vehicle_id.clone(),
            index: trip_index,
        })?;

    let len = trip.len();
    for index in [old_index, new_index] {
        if index >= len {
            return Err(PlannerError::IndexOutOfRange { index, len });
        }
    }

    let rider = trip.riders.remove(old_index);
    trip.riders.insert(new_index, rider);
    refresh_trip(&facility, trip, oracle);
    Ok(next)
}

fn source_slot(
    session: &PlanningSession,
    rider_id: &RiderId,
    source: &RiderLocation,
) -> Result<Slot, PlannerError> {
    let not_found = || PlannerError::RiderNotFound {
        rider_id: rider_id.clone(),
    };
    match source {
        RiderLocation::Unassigned => {
            if session.unassigned.iter().any(|r| &r.id == rider_id) {
                Ok(None)
            } else {
                Err(not_found())
            }
        }
        RiderLocation::Vehicle(vehicle_id) => session
            .trips_of(vehicle_id)?
            .iter()
            .position(|trip| trip.contains(rider_id))
            .map(|index| Some((vehicle_id.clone(), index)))
            .ok_or_else(not_found),
        RiderLocation::Trip { vehicle_id, index } => {
            let trip = session
                .trips_of(vehicle_id)?
                .get(*index)
                .ok_or_else(|| PlannerError::TripNotFound {
                    vehicle_id: vehicle_id.clone(),
                    index: *index,
                })?;
            if trip.contains(rider_id) {
                Ok(Some((vehicle_id.clone(), *index)))
            } else {
                Err(not_found())
            }
        }
    }
}

fn target_slot(session: &PlanningSession, target: &RiderLocation) -> Result<Slot, PlannerError> {
    match target {
        RiderLocation::Unassigned => Ok(None),
        RiderLocation::Vehicle(vehicle_id) => {
            let trips = session.trips_of(vehicle_id)?;
            let last = trips.len().checked_sub(1).ok_or_else(|| PlannerError::TripNotFound {
                vehicle_id: vehicle_id.clone(),
                index: 0,
            })?;
            Ok(Some((vehicle_id.clone(), last)))
        }
        RiderLocation::Trip { vehicle_id, index } => {
            if *index < session.trips_of(vehicle_id)?.len() {
                Ok(Some((vehicle_id.clone(), *index)))
            } else {
                Err(PlannerError::TripNotFound {
                    vehicle_id: vehicle_id.clone(),
                    index: *index,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_locations() {
        assert_eq!("unassigned".parse::<RiderLocation>().unwrap(), RiderLocation::Unassigned);
        assert_eq!(
            "vehicle-v1".parse::<RiderLocation>().unwrap(),
            RiderLocation::vehicle("v1")
        );
        assert_eq!(
            "trip-van-2-3".parse::<RiderLocation>().unwrap(),
            RiderLocation::trip("van-2", 3)
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for raw in ["", "trip-", "trip-v1", "trip--1", "trip-v1-x", "vehicle-", "bus-1"] {
            assert!(
                matches!(raw.parse::<RiderLocation>(), Err(PlannerError::InvalidLocation(_))),
                "{raw} should not parse"
            );
        }
    }

    #[test]
    fn test_display_parses_back() {
        for location in [
            RiderLocation::Unassigned,
            RiderLocation::vehicle("a-b"),
            RiderLocation::trip("a-b", 0),
        ] {
            assert_eq!(location.to_string().parse::<RiderLocation>().unwrap(), location);
        }
    }
}
