//! transport-planner
//!
//! Daily transport planning for day-service riders: geographic clustering of
//! riders onto vehicles, capacity-bounded trips, nearest-neighbour pickup
//! ordering, and validated manual edits on an immutable planning session.

pub mod cluster;
pub mod coordinator;
pub mod error;
pub mod haversine;
pub mod model;
pub mod mutation;
pub mod options;
pub mod packer;
pub mod polyline;
pub mod sequencer;
pub mod session;
pub mod traits;

pub use coordinator::{AssignmentPlan, auto_assign};
pub use error::PlannerError;
pub use haversine::HaversineOracle;
pub use model::{
    Coordinates, Facility, Rider, RiderId, Trip, UnassignedReason, UnassignedRider, Vehicle,
    VehicleId,
};
pub use mutation::{RiderLocation, move_rider, reorder_trip};
pub use options::PlannerOptions;
pub use session::{PlanningSession, SessionParts, VehicleSummary};
pub use traits::DistanceOracle;
