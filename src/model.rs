//! Domain types for transport planning.
//!
//! Riders, vehicles, trips and the facility they start from. All types are
//! plain data with serde support so a host can persist and reload them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PlannerError;

/// A geographic point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<(f64, f64)> for Coordinates {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self { lat, lng }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiderId(pub String);

impl RiderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RiderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub String);

impl VehicleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// A person who needs a pickup.
///
/// `location` is `None` when geocoding has not resolved an address yet; such
/// riders cannot be clustered and end up unassigned by auto-assign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rider {
    pub id: RiderId,
    #[serde(default)]
    pub name: String,
    pub location: Option<Coordinates>,
    #[serde(default)]
    pub wheelchair: bool,
    #[serde(default)]
    pub absent: bool,
    #[serde(default)]
    pub order_fixed: bool,
    #[serde(default)]
    pub pickup_time: String,
    #[serde(default)]
    pub note: String,
}

impl Rider {
    pub fn new(id: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            id: RiderId::new(id),
            name: String::new(),
            location: Some(Coordinates::new(lat, lng)),
            wheelchair: false,
            absent: false,
            order_fixed: false,
            pickup_time: String::new(),
            note: String::new(),
        }
    }

    /// The rider's position, for callers that cannot work without one.
    pub fn require_location(&self) -> Result<Coordinates, PlannerError> {
        self.location.ok_or_else(|| PlannerError::MissingCoordinates {
            rider_id: self.id.clone(),
        })
    }

    /// A rider whose address has not been geocoded.
    pub fn unlocated(id: impl Into<String>) -> Self {
        Self {
            location: None,
            ..Self::new(id, 0.0, 0.0)
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_wheelchair(mut self, wheelchair: bool) -> Self {
        self.wheelchair = wheelchair;
        self
    }

    pub fn with_absent(mut self, absent: bool) -> Self {
        self.absent = absent;
        self
    }

    pub fn with_order_fixed(mut self, fixed: bool) -> Self {
        self.order_fixed = fixed;
        self
    }

    pub fn with_pickup_time(mut self, time: impl Into<String>) -> Self {
        self.pickup_time = time.into();
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }
}

/// A vehicle with seat and wheelchair-space limits per trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    #[serde(default)]
    pub name: String,
    pub capacity: u32,
    #[serde(default)]
    pub wheelchair_capacity: u32,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub driver: String,
}

fn default_true() -> bool {
    true
}

impl Vehicle {
    pub fn new(id: impl Into<String>, capacity: u32, wheelchair_capacity: u32) -> Self {
        Self {
            id: VehicleId::new(id),
            name: String::new(),
            capacity,
            wheelchair_capacity,
            active: true,
            locked: false,
            driver: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = driver.into();
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    /// Active and not locked: the vehicle takes part in auto-assign.
    pub fn is_eligible(&self) -> bool {
        self.active && !self.locked
    }

    pub fn carries_wheelchairs(&self) -> bool {
        self.wheelchair_capacity > 0
    }

    /// Whether `rider` can be added to a trip currently holding `len` riders
    /// of which `wheelchairs` use a wheelchair.
    pub fn admits(&self, len: usize, wheelchairs: usize, rider: &Rider) -> bool {
        len < self.capacity as usize
            && (!rider.wheelchair || wheelchairs < self.wheelchair_capacity as usize)
    }
}

/// The depot every trip starts from and returns to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    #[serde(default)]
    pub name: String,
    pub location: Coordinates,
}

impl Facility {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            name: String::new(),
            location: Coordinates::new(lat, lng),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// One vehicle run: an ordered rider sequence and its totals.
///
/// Totals are only changed together with the order (see
/// [`crate::sequencer::recalculate_route`]), so they never go stale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub riders: Vec<Rider>,
    /// Round-trip distance in km, two decimals.
    pub total_distance: f64,
    /// Estimated duration in whole minutes.
    pub total_duration: u32,
}

impl Trip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.riders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.riders.is_empty()
    }

    pub fn wheelchair_count(&self) -> usize {
        self.riders.iter().filter(|rider| rider.wheelchair).count()
    }

    pub fn contains(&self, rider_id: &RiderId) -> bool {
        self.position_of(rider_id).is_some()
    }

    pub fn position_of(&self, rider_id: &RiderId) -> Option<usize> {
        self.riders.iter().position(|rider| &rider.id == rider_id)
    }

    pub fn rider_ids(&self) -> Vec<RiderId> {
        self.riders.iter().map(|rider| rider.id.clone()).collect()
    }

    /// Whether the trip respects the vehicle's seat and wheelchair limits.
    pub fn fits(&self, vehicle: &Vehicle) -> bool {
        self.len() <= vehicle.capacity as usize
            && self.wheelchair_count() <= vehicle.wheelchair_capacity as usize
    }
}

/// Why auto-assign left a rider unassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnassignedReason {
    /// Marked absent for the day.
    Absent,
    /// No resolved coordinates; cannot be clustered or sequenced.
    MissingCoordinates,
    /// Wheelchair rider but no eligible vehicle has wheelchair space.
    NoWheelchairVehicle,
    /// Every eligible vehicle was out of seats or trips.
    CapacityExhausted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnassignedRider {
    pub rider: Rider,
    pub reason: UnassignedReason,
}
