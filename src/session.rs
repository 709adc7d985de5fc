//! The planning session aggregate.
//!
//! A `PlanningSession` owns the facility, the fleet and every rider of the
//! day, each rider sitting either in the unassigned list or in exactly one
//! trip of one vehicle. Sessions are values: every operation takes `&self`
//! and returns a new session, so a failed operation never leaves a half
//! applied change behind and undo is just keeping the previous value.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::PlannerError;
use crate::haversine::{HaversineOracle, round_km};
use crate::model::{Facility, Rider, RiderId, Trip, Vehicle, VehicleId};
use crate::mutation::RiderLocation;
use crate::sequencer::{refresh_trip, sequence_route};
use crate::traits::DistanceOracle;

/// Raw session data as exchanged with persistence. Converted into a
/// [`PlanningSession`] only after validation.
///
/// Deserialising a `PlanningSession` goes through this type and recomputes
/// every trip's totals with [`HaversineOracle::default`]. Callers planning
/// with another oracle should deserialise `SessionParts` and pass it to
/// [`PlanningSession::from_parts`] with their own oracle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionParts {
    pub facility: Option<Facility>,
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
    #[serde(default)]
    pub unassigned: Vec<Rider>,
    #[serde(default)]
    pub assignments: BTreeMap<VehicleId, Vec<Trip>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SessionParts", into = "SessionParts")]
pub struct PlanningSession {
    pub(crate) facility: Facility,
    pub(crate) vehicles: Vec<Vehicle>,
    pub(crate) unassigned: Vec<Rider>,
    pub(crate) assignments: BTreeMap<VehicleId, Vec<Trip>>,
}

/// Per-vehicle totals across all of its trips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSummary {
    pub vehicle_id: VehicleId,
    pub trips: usize,
    pub riders: usize,
    pub wheelchair_riders: usize,
    pub total_distance: f64,
    pub total_duration: u32,
}

impl PlanningSession {
    /// A fresh day: every rider unassigned, every vehicle with one empty trip.
    pub fn new(
        facility: Facility,
        vehicles: Vec<Vehicle>,
        riders: Vec<Rider>,
    ) -> Result<Self, PlannerError> {
        Self::from_parts(
            SessionParts {
                facility: Some(facility),
                vehicles,
                unassigned: riders,
                assignments: BTreeMap::new(),
            },
            &HaversineOracle::default(),
        )
    }

    /// Validates and normalises externally supplied session data.
    ///
    /// Vehicles without trips get one empty trip, and every trip's totals are
    /// recomputed with `oracle`, so stale figures never enter the session.
    pub fn from_parts<O>(parts: SessionParts, oracle: &O) -> Result<Self, PlannerError>
    where
        O: DistanceOracle + ?Sized,
    {
        let facility = parts
            .facility
            .ok_or_else(|| PlannerError::InvalidSession("missing facility".to_string()))?;

        let mut assignments = parts.assignments;
        for vehicle_id in assignments.keys() {
            if !parts.vehicles.iter().any(|v| &v.id == vehicle_id) {
                return Err(PlannerError::InvalidSession(format!(
                    "trips assigned to unknown vehicle {vehicle_id}"
                )));
            }
        }
        for vehicle in &parts.vehicles {
            let trips = assignments.entry(vehicle.id.clone()).or_default();
            if trips.is_empty() {
                trips.push(Trip::new());
            }
            for trip in trips.iter_mut() {
                refresh_trip(&facility, trip, oracle);
            }
        }

        let session = Self {
            facility,
            vehicles: parts.vehicles,
            unassigned: parts.unassigned,
            assignments,
        };
        session.check_invariants()?;
        Ok(session)
    }

    /// Verifies the structural invariants: unique ids, each rider in one
    /// container, every trip within its vehicle's limits.
    pub fn check_invariants(&self) -> Result<(), PlannerError> {
        let mut vehicle_ids = HashSet::new();
        for vehicle in &self.vehicles {
            if !vehicle_ids.insert(&vehicle.id) {
                return Err(PlannerError::InvalidSession(format!(
                    "duplicate vehicle {}",
                    vehicle.id
                )));
            }
            if vehicle.wheelchair_capacity > vehicle.capacity {
                return Err(PlannerError::InvalidSession(format!(
                    "vehicle {} has more wheelchair spaces than seats",
                    vehicle.id
                )));
            }
            let trips = self.assignments.get(&vehicle.id).ok_or_else(|| {
                PlannerError::InvalidSession(format!("vehicle {} has no trips", vehicle.id))
            })?;
            if trips.is_empty() {
                return Err(PlannerError::InvalidSession(format!(
                    "vehicle {} has no trips",
                    vehicle.id
                )));
            }
            if let Some(index) = trips.iter().position(|trip| !trip.fits(vehicle)) {
                return Err(PlannerError::InvalidSession(format!(
                    "trip {index} of vehicle {} exceeds its capacity",
                    vehicle.id
                )));
            }
        }
        if self.assignments.len() != self.vehicles.len() {
            return Err(PlannerError::InvalidSession(
                "trips assigned to unknown vehicle".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for rider in self.riders() {
            if !seen.insert(&rider.id) {
                return Err(PlannerError::InvalidSession(format!(
                    "rider {} appears more than once",
                    rider.id
                )));
            }
        }
        Ok(())
    }

    pub fn facility(&self) -> &Facility {
        &self.facility
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn vehicle(&self, vehicle_id: &VehicleId) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| &v.id == vehicle_id)
    }

    pub fn unassigned(&self) -> &[Rider] {
        &self.unassigned
    }

    pub fn assignments(&self) -> &BTreeMap<VehicleId, Vec<Trip>> {
        &self.assignments
    }

    pub fn trips(&self, vehicle_id: &VehicleId) -> Option<&[Trip]> {
        self.assignments.get(vehicle_id).map(Vec::as_slice)
    }

    pub fn trip(&self, vehicle_id: &VehicleId, index: usize) -> Option<&Trip> {
        self.trips(vehicle_id).and_then(|trips| trips.get(index))
    }

    /// Every rider, unassigned first, then by vehicle and trip.
    pub fn riders(&self) -> impl Iterator<Item = &Rider> {
        self.unassigned.iter().chain(
            self.assignments
                .values()
                .flat_map(|trips| trips.iter().flat_map(|trip| trip.riders.iter())),
        )
    }

    pub fn rider_count(&self) -> usize {
        self.riders().count()
    }

    pub fn rider(&self, rider_id: &RiderId) -> Option<&Rider> {
        self.riders().find(|rider| &rider.id == rider_id)
    }

    /// Where a rider currently sits.
    pub fn locate_rider(&self, rider_id: &RiderId) -> Option<RiderLocation> {
        if self.unassigned.iter().any(|r| &r.id == rider_id) {
            return Some(RiderLocation::Unassigned);
        }
        self.assignments.iter().find_map(|(vehicle_id, trips)| {
            trips
                .iter()
                .position(|trip| trip.contains(rider_id))
                .map(|index| RiderLocation::Trip {
                    vehicle_id: vehicle_id.clone(),
                    index,
                })
        })
    }

    pub fn vehicle_summary(&self, vehicle_id: &VehicleId) -> Result<VehicleSummary, PlannerError> {
        let trips = self.trips_of(vehicle_id)?;
        let distance: f64 = trips.iter().map(|t| t.total_distance).sum();
        Ok(VehicleSummary {
            vehicle_id: vehicle_id.clone(),
            trips: trips.len(),
            riders: trips.iter().map(Trip::len).sum(),
            wheelchair_riders: trips.iter().map(Trip::wheelchair_count).sum(),
            total_distance: round_km(distance),
            total_duration: trips.iter().map(|t| t.total_duration).sum(),
        })
    }

    /// Returns every rider on an unlocked vehicle to the unassigned list.
    /// Locked vehicles keep their trips.
    pub fn reset_all(&self) -> Self {
        let mut next = self.clone();
        for vehicle in self.vehicles.iter().filter(|v| !v.locked) {
            next.clear_vehicle(&vehicle.id);
        }
        next
    }

    /// Explicit reset of one vehicle, locked or not.
    pub fn reset_vehicle(&self, vehicle_id: &VehicleId) -> Result<Self, PlannerError> {
        self.trips_of(vehicle_id)?;
        let mut next = self.clone();
        next.clear_vehicle(vehicle_id);
        Ok(next)
    }

    pub fn add_trip(&self, vehicle_id: &VehicleId) -> Result<Self, PlannerError> {
        let mut next = self.clone();
        next.trips_mut(vehicle_id)?.push(Trip::new());
        Ok(next)
    }

    /// Removes a trip; its riders go back to the unassigned list.
    pub fn remove_trip(&self, vehicle_id: &VehicleId, index: usize) -> Result<Self, PlannerError> {
        let mut next = self.clone();
        let trips = next.trips_mut(vehicle_id)?;
        if index >= trips.len() {
            return Err(PlannerError::TripNotFound {
                vehicle_id: vehicle_id.clone(),
                index,
            });
        }
        if trips.len() == 1 {
            return Err(PlannerError::LastTrip {
                vehicle_id: vehicle_id.clone(),
            });
        }
        let removed = trips.remove(index);
        next.unassigned.extend(removed.riders);
        Ok(next)
    }

    pub fn set_absent(&self, rider_id: &RiderId, absent: bool) -> Result<Self, PlannerError> {
        self.update_rider(rider_id, |rider| rider.absent = absent)
    }

    pub fn set_order_fixed(&self, rider_id: &RiderId, fixed: bool) -> Result<Self, PlannerError> {
        self.update_rider(rider_id, |rider| rider.order_fixed = fixed)
    }

    pub fn set_vehicle_active(&self, vehicle_id: &VehicleId, active: bool) -> Result<Self, PlannerError> {
        self.update_vehicle(vehicle_id, |vehicle| vehicle.active = active)
    }

    pub fn set_vehicle_locked(&self, vehicle_id: &VehicleId, locked: bool) -> Result<Self, PlannerError> {
        self.update_vehicle(vehicle_id, |vehicle| vehicle.locked = locked)
    }

    /// The explicit "optimize" action for one trip.
    pub fn optimize_trip<O>(
        &self,
        vehicle_id: &VehicleId,
        index: usize,
        oracle: &O,
    ) -> Result<Self, PlannerError>
    where
        O: DistanceOracle + ?Sized,
    {
        let mut next = self.clone();
        let facility = next.facility.clone();
        let trip = next
            .trips_mut(vehicle_id)?
            .get_mut(index)
            .ok_or_else(|| PlannerError::TripNotFound {
                vehicle_id: vehicle_id.clone(),
                index,
            })?;
        *trip = sequence_route(&facility, &trip.riders, oracle).into_trip();
        Ok(next)
    }

    /// Optimizes every trip of a vehicle.
    pub fn optimize_vehicle<O>(&self, vehicle_id: &VehicleId, oracle: &O) -> Result<Self, PlannerError>
    where
        O: DistanceOracle + ?Sized,
    {
        let mut next = self.clone();
        let facility = next.facility.clone();
        for trip in next.trips_mut(vehicle_id)? {
            *trip = sequence_route(&facility, &trip.riders, oracle).into_trip();
        }
        Ok(next)
    }

    pub(crate) fn trips_of(&self, vehicle_id: &VehicleId) -> Result<&Vec<Trip>, PlannerError> {
        self.assignments
            .get(vehicle_id)
            .ok_or_else(|| PlannerError::VehicleNotFound {
                vehicle_id: vehicle_id.clone(),
            })
    }

    pub(crate) fn trips_mut(&mut self, vehicle_id: &VehicleId) -> Result<&mut Vec<Trip>, PlannerError> {
        self.assignments
            .get_mut(vehicle_id)
            .ok_or_else(|| PlannerError::VehicleNotFound {
                vehicle_id: vehicle_id.clone(),
            })
    }

    fn clear_vehicle(&mut self, vehicle_id: &VehicleId) {
        if let Some(trips) = self.assignments.get_mut(vehicle_id) {
            let riders = std::mem::replace(trips, vec![Trip::new()])
                .into_iter()
                .flat_map(|trip| trip.riders);
            self.unassigned.extend(riders);
        }
    }

    fn update_rider(
        &self,
        rider_id: &RiderId,
        update: impl FnOnce(&mut Rider),
    ) -> Result<Self, PlannerError> {
        let mut next = self.clone();
        let rider = next
            .unassigned
            .iter_mut()
            .chain(
                next.assignments
                    .values_mut()
                    .flat_map(|trips| trips.iter_mut().flat_map(|trip| trip.riders.iter_mut())),
            )
            .find(|rider| &rider.id == rider_id)
            .ok_or_else(|| PlannerError::RiderNotFound {
                rider_id: rider_id.clone(),
            })?;
        update(rider);
        Ok(next)
    }

    fn update_vehicle(
        &self,
        vehicle_id: &VehicleId,
        update: impl FnOnce(&mut Vehicle),
    ) -> Result<Self, PlannerError> {
        let mut next = self.clone();
        let vehicle = next
            .vehicles
            .iter_mut()
            .find(|v| &v.id == vehicle_id)
            .ok_or_else(|| PlannerError::VehicleNotFound {
                vehicle_id: vehicle_id.clone(),
            })?;
        update(vehicle);
        Ok(next)
    }
}

/// Validation with the default haversine oracle. Used by serde.
impl TryFrom<SessionParts> for PlanningSession {
    type Error = PlannerError;

    fn try_from(parts: SessionParts) -> Result<Self, Self::Error> {
        Self::from_parts(parts, &HaversineOracle::default())
    }
}

impl From<PlanningSession> for SessionParts {
    fn from(session: PlanningSession) -> Self {
        Self {
            facility: Some(session.facility),
            vehicles: session.vehicles,
            unassigned: session.unassigned,
            assignments: session.assignments,
        }
    }
}
