//! Automatic assignment of the day's riders to the fleet.
//!
//! One pass:
//!
//! 1. Gather the pool: unassigned riders plus everyone on an unlocked
//!    vehicle. Locked vehicles keep their trips as they are.
//! 2. Absent riders go straight to the unassigned list.
//! 3. Flexible riders are clustered per vehicle ([`crate::cluster`]) and
//!    packed into trips ([`crate::packer`]).
//! 4. Riders a vehicle's packing could not seat are offered to every eligible
//!    vehicle in turn: free seats in existing trips first, then a new trip.
//! 5. Fixed-order riders are dealt round-robin onto the vehicles' last trips,
//!    opening a new trip when the last one is full and falling back to any
//!    earlier trip with a free seat at the trip limit.
//!
//! Trips come out in packing order with fresh totals. Routes are not
//! optimized here; that is the explicit optimize action on the session.

use std::collections::BTreeMap;

use rand::Rng;
use tracing::{info, warn};

use crate::cluster::partition_by_cluster;
use crate::error::PlannerError;
use crate::model::{Rider, Trip, UnassignedReason, UnassignedRider, Vehicle, VehicleId};
use crate::options::PlannerOptions;
use crate::packer::pack_cluster;
use crate::sequencer::build_trip;
use crate::session::PlanningSession;
use crate::traits::DistanceOracle;

/// Outcome of [`auto_assign`].
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentPlan {
    /// The session after assignment.
    pub session: PlanningSession,
    /// Riders left unassigned by this pass and why.
    pub unassigned: Vec<UnassignedRider>,
}

impl AssignmentPlan {
    pub fn assignments(&self) -> &BTreeMap<VehicleId, Vec<Trip>> {
        self.session.assignments()
    }

    pub fn into_session(self) -> PlanningSession {
        self.session
    }
}

/// Runs a full auto-assign pass over `session`.
///
/// Fails with [`PlannerError::NoEligibleVehicles`] when no vehicle is both
/// active and unlocked; the input session is never modified.
#[tracing::instrument(level = "info", skip_all, fields(riders = session.rider_count()))]
pub fn auto_assign<O, R>(
    session: &PlanningSession,
    options: &PlannerOptions,
    oracle: &O,
    rng: &mut R,
) -> Result<AssignmentPlan, PlannerError>
where
    O: DistanceOracle + ?Sized,
    R: Rng + ?Sized,
{
    let eligible: Vec<Vehicle> = session
        .vehicles()
        .iter()
        .filter(|vehicle| vehicle.is_eligible())
        .cloned()
        .collect();
    if eligible.is_empty() {
        warn!("auto-assign aborted: no active, unlocked vehicle");
        return Err(PlannerError::NoEligibleVehicles);
    }

    let mut unassigned: Vec<UnassignedRider> = Vec::new();
    let mut fixed: Vec<Rider> = Vec::new();
    let mut flexible: Vec<Rider> = Vec::new();
    for rider in pool(session) {
        if rider.absent {
            unassigned.push(UnassignedRider {
                rider,
                reason: UnassignedReason::Absent,
            });
        } else if rider.order_fixed {
            fixed.push(rider);
        } else {
            flexible.push(rider);
        }
    }
    let considered = unassigned.len() + fixed.len() + flexible.len();

    let partition = partition_by_cluster(&flexible, &eligible, options, oracle, rng);
    unassigned.extend(partition.unplaced.iter().cloned());

    let mut loads: BTreeMap<VehicleId, Vec<Vec<Rider>>> = BTreeMap::new();
    let mut spilled: Vec<Rider> = Vec::new();
    for vehicle in &eligible {
        let packing = pack_cluster(
            partition.cluster(&vehicle.id),
            vehicle.capacity,
            vehicle.wheelchair_capacity,
            options.max_trips_per_vehicle,
        );
        for entry in packing.overflow {
            if entry.reason == UnassignedReason::CapacityExhausted {
                spilled.push(entry.rider);
            } else {
                unassigned.push(entry);
            }
        }
        loads.insert(vehicle.id.clone(), packing.loads);
    }

    place_spilled(
        spilled,
        &eligible,
        &mut loads,
        options.max_trips_per_vehicle,
        &mut unassigned,
    );

    insert_fixed(
        fixed,
        &eligible,
        &mut loads,
        options.max_trips_per_vehicle,
        &mut unassigned,
    );

    let mut next = session.clone();
    let facility = next.facility.clone();
    for vehicle in session.vehicles().iter().filter(|v| !v.locked) {
        let trips: Vec<Trip> = loads
            .remove(&vehicle.id)
            .unwrap_or_default()
            .into_iter()
            .map(|load| build_trip(&facility, load, oracle))
            .collect();
        let trips = if trips.is_empty() { vec![Trip::new()] } else { trips };
        next.assignments.insert(vehicle.id.clone(), trips);
    }
    next.unassigned = unassigned.iter().map(|entry| entry.rider.clone()).collect();

    info!(
        considered,
        assigned = considered - unassigned.len(),
        unassigned = unassigned.len(),
        vehicles = eligible.len(),
        "auto-assign complete"
    );
    Ok(AssignmentPlan {
        session: next,
        unassigned,
    })
}

impl PlanningSession {
    /// Convenience wrapper: auto-assign with the options' own random source.
    pub fn auto_assign<O>(&self, options: &PlannerOptions, oracle: &O) -> Result<AssignmentPlan, PlannerError>
    where
        O: DistanceOracle + ?Sized,
    {
        auto_assign(self, options, oracle, &mut options.rng())
    }
}

/// Riders up for assignment: the unassigned list, then the riders of every
/// unlocked vehicle in fleet order.
fn pool(session: &PlanningSession) -> Vec<Rider> {
    let mut riders = session.unassigned().to_vec();
    for vehicle in session.vehicles().iter().filter(|v| !v.locked) {
        if let Some(trips) = session.trips(&vehicle.id) {
            riders.extend(trips.iter().flat_map(|trip| trip.riders.iter().cloned()));
        }
    }
    riders
}

/// Seats riders another vehicle's packing could not take.
///
/// Each rider goes to the first vehicle, in fleet order, with a free seat in
/// any existing trip; failing that, to the first vehicle that may still open
/// a trip. Riders no eligible vehicle can take stay unassigned.
fn place_spilled(
    spilled: Vec<Rider>,
    vehicles: &[Vehicle],
    loads: &mut BTreeMap<VehicleId, Vec<Vec<Rider>>>,
    max_trips: Option<usize>,
    unassigned: &mut Vec<UnassignedRider>,
) {
    let max_trips = max_trips.unwrap_or(usize::MAX);

    for rider in spilled {
        let target = vehicles.iter().find_map(|vehicle| {
            let trips = loads.get(&vehicle.id).map(Vec::as_slice).unwrap_or_default();
            free_trip(vehicle, trips, &rider).map(|index| (vehicle, Some(index)))
        });
        let target = target.or_else(|| {
            vehicles
                .iter()
                .find(|vehicle| {
                    let trips = loads.get(&vehicle.id).map(Vec::as_slice).unwrap_or_default();
                    opens_trip(vehicle, trips, &rider, max_trips)
                })
                .map(|vehicle| (vehicle, None))
        });

        let Some((vehicle, index)) = target else {
            let reason = unplaceable(&rider, vehicles);
            warn!(rider = %rider.id, ?reason, "rider could not be placed on any vehicle");
            unassigned.push(UnassignedRider { rider, reason });
            continue;
        };

        seat(loads, &vehicle.id, index, rider);
    }
}

/// Deals fixed-order riders round-robin over `vehicles`.
///
/// A rider joins the target vehicle's last trip when it fits, otherwise a new
/// trip is opened, otherwise any earlier trip with room. When the target
/// cannot take the rider at all (no wheelchair space, trips full and at the
/// limit) the following vehicles are tried in turn. The round-robin pointer
/// advances by one per rider either way.
fn insert_fixed(
    fixed: Vec<Rider>,
    vehicles: &[Vehicle],
    loads: &mut BTreeMap<VehicleId, Vec<Vec<Rider>>>,
    max_trips: Option<usize>,
    unassigned: &mut Vec<UnassignedRider>,
) {
    let max_trips = max_trips.unwrap_or(usize::MAX);
    let mut pointer = 0;

    for rider in fixed {
        if let Err(err) = rider.require_location() {
            warn!(%err, "fixed rider left unassigned");
            unassigned.push(UnassignedRider {
                rider,
                reason: UnassignedReason::MissingCoordinates,
            });
            continue;
        }

        let target = (0..vehicles.len())
            .map(|offset| &vehicles[(pointer + offset) % vehicles.len()])
            .find_map(|vehicle| {
                let trips = loads.get(&vehicle.id).map(Vec::as_slice).unwrap_or_default();
                fixed_slot(vehicle, trips, &rider, max_trips).map(|slot| (vehicle, slot))
            });
        pointer = (pointer + 1) % vehicles.len();

        let Some((vehicle, slot)) = target else {
            let reason = unplaceable(&rider, vehicles);
            warn!(rider = %rider.id, ?reason, "fixed rider could not be placed");
            unassigned.push(UnassignedRider { rider, reason });
            continue;
        };
        seat(loads, &vehicle.id, slot, rider);
    }
}

/// Where a fixed rider goes on `vehicle`: the last trip, a new trip, or
/// failing both any earlier trip with room. `None` for a new trip.
fn fixed_slot(
    vehicle: &Vehicle,
    trips: &[Vec<Rider>],
    rider: &Rider,
    max_trips: usize,
) -> Option<Option<usize>> {
    if fits_last_trip(vehicle, trips, rider) {
        return Some(Some(trips.len() - 1));
    }
    if opens_trip(vehicle, trips, rider, max_trips) {
        return Some(None);
    }
    free_trip(vehicle, trips, rider).map(Some)
}

/// Adds `rider` to trip `slot` of the vehicle, or to a new trip.
fn seat(
    loads: &mut BTreeMap<VehicleId, Vec<Vec<Rider>>>,
    vehicle_id: &VehicleId,
    slot: Option<usize>,
    rider: Rider,
) {
    let trips = loads.entry(vehicle_id.clone()).or_default();
    match slot.and_then(|index| trips.get_mut(index)) {
        Some(trip) => trip.push(rider),
        None => trips.push(vec![rider]),
    }
}

fn unplaceable(rider: &Rider, vehicles: &[Vehicle]) -> UnassignedReason {
    if rider.wheelchair && !vehicles.iter().any(Vehicle::carries_wheelchairs) {
        UnassignedReason::NoWheelchairVehicle
    } else {
        UnassignedReason::CapacityExhausted
    }
}

/// First trip of `vehicle` with room for `rider`.
fn free_trip(vehicle: &Vehicle, trips: &[Vec<Rider>], rider: &Rider) -> Option<usize> {
    trips.iter().position(|trip| {
        let wheelchairs = trip.iter().filter(|r| r.wheelchair).count();
        vehicle.admits(trip.len(), wheelchairs, rider)
    })
}

fn fits_last_trip(vehicle: &Vehicle, trips: &[Vec<Rider>], rider: &Rider) -> bool {
    trips.last().is_some_and(|last| {
        let wheelchairs = last.iter().filter(|r| r.wheelchair).count();
        vehicle.admits(last.len(), wheelchairs, rider)
    })
}

fn opens_trip(vehicle: &Vehicle, trips: &[Vec<Rider>], rider: &Rider, max_trips: usize) -> bool {
    trips.len() < max_trips && vehicle.admits(0, 0, rider)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::haversine::HaversineOracle;
    use crate::model::Facility;

    fn run(session: &PlanningSession, options: &PlannerOptions) -> AssignmentPlan {
        auto_assign(session, options, &HaversineOracle::default(), &mut StdRng::seed_from_u64(17))
            .unwrap()
    }

    #[test]
    fn test_no_eligible_vehicles() {
        let session = PlanningSession::new(
            Facility::new(35.0, 139.0),
            vec![
                Vehicle::new("locked", 4, 0).with_locked(true),
                Vehicle::new("off", 4, 0).with_active(false),
            ],
            vec![Rider::new("r", 35.1, 139.1)],
        )
        .unwrap();
        let err = auto_assign(
            &session,
            &PlannerOptions::default(),
            &HaversineOracle::default(),
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap_err();
        assert_eq!(err, PlannerError::NoEligibleVehicles);
    }

    #[test]
    fn test_absent_riders_stay_unassigned() {
        let session = PlanningSession::new(
            Facility::new(35.0, 139.0),
            vec![Vehicle::new("v", 4, 0)],
            vec![
                Rider::new("here", 35.1, 139.1),
                Rider::new("away", 35.1, 139.1).with_absent(true),
            ],
        )
        .unwrap();
        let plan = run(&session, &PlannerOptions::default());
        assert_eq!(plan.unassigned.len(), 1);
        assert_eq!(plan.unassigned[0].reason, UnassignedReason::Absent);
        assert_eq!(plan.session.unassigned()[0].id.as_str(), "away");
    }

    #[test]
    fn test_fixed_riders_round_robin() {
        let session = PlanningSession::new(
            Facility::new(35.0, 139.0),
            vec![Vehicle::new("a", 4, 0), Vehicle::new("b", 4, 0)],
            vec![
                Rider::new("f1", 35.1, 139.1).with_order_fixed(true),
                Rider::new("f2", 35.1, 139.1).with_order_fixed(true),
                Rider::new("f3", 35.1, 139.1).with_order_fixed(true),
            ],
        )
        .unwrap();
        let plan = run(&session, &PlannerOptions::default());
        let a = plan.session.trip(&VehicleId::new("a"), 0).unwrap().rider_ids();
        let b = plan.session.trip(&VehicleId::new("b"), 0).unwrap().rider_ids();
        assert_eq!(a.iter().map(|id| id.as_str()).collect::<Vec<_>>(), vec!["f1", "f3"]);
        assert_eq!(b.iter().map(|id| id.as_str()).collect::<Vec<_>>(), vec!["f2"]);
    }

    #[test]
    fn test_fixed_rider_opens_new_trip_when_last_is_full() {
        let session = PlanningSession::new(
            Facility::new(35.0, 139.0),
            vec![Vehicle::new("a", 1, 0)],
            vec![
                Rider::new("flex", 35.1, 139.1),
                Rider::new("fixed", 35.2, 139.2).with_order_fixed(true),
            ],
        )
        .unwrap();
        let plan = run(&session, &PlannerOptions::default());
        let trips = plan.session.trips(&VehicleId::new("a")).unwrap();
        assert_eq!(trips.len(), 2);
        assert_eq!(trips[1].riders[0].id.as_str(), "fixed");
        assert!(plan.unassigned.is_empty());
    }

    #[test]
    fn test_fixed_wheelchair_rider_skips_vehicle_without_space() {
        let session = PlanningSession::new(
            Facility::new(35.0, 139.0),
            vec![Vehicle::new("plain", 4, 0), Vehicle::new("lift", 4, 1)],
            vec![Rider::new("w", 35.1, 139.1).with_wheelchair(true).with_order_fixed(true)],
        )
        .unwrap();
        let plan = run(&session, &PlannerOptions::default());
        assert!(plan.unassigned.is_empty());
        assert_eq!(plan.session.trip(&VehicleId::new("lift"), 0).unwrap().len(), 1);
    }

    #[test]
    fn test_fixed_rider_takes_earlier_trip_at_trip_limit() {
        let fixed = |id: &str, wheelchair: bool| {
            Rider::new(id, 35.1, 139.1).with_wheelchair(wheelchair).with_order_fixed(true)
        };
        let session = PlanningSession::new(
            Facility::new(35.0, 139.0),
            vec![Vehicle::new("a", 3, 1)],
            vec![fixed("w1", true), fixed("w2", true), fixed("r1", false), fixed("r2", false), fixed("r3", false)],
        )
        .unwrap();
        let options = PlannerOptions::default().with_max_trips_per_vehicle(2);
        let plan = run(&session, &options);
        assert!(plan.unassigned.is_empty());

        let ids = |index| {
            plan.session
                .trip(&VehicleId::new("a"), index)
                .unwrap()
                .rider_ids()
                .iter()
                .map(|id| id.as_str().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(0), vec!["w1", "r3"]);
        assert_eq!(ids(1), vec!["w2", "r1", "r2"]);
    }

    #[test]
    fn test_trip_limit_leaves_overflow_unassigned() {
        let riders = (0..5)
            .map(|i| Rider::new(format!("r{i}"), 35.1 + i as f64 * 0.001, 139.1))
            .collect();
        let session =
            PlanningSession::new(Facility::new(35.0, 139.0), vec![Vehicle::new("v", 2, 0)], riders)
                .unwrap();
        let options = PlannerOptions::default().with_max_trips_per_vehicle(2);
        let plan = run(&session, &options);
        assert_eq!(plan.session.trips(&VehicleId::new("v")).unwrap().len(), 2);
        assert_eq!(plan.unassigned.len(), 1);
        assert_eq!(plan.unassigned[0].reason, UnassignedReason::CapacityExhausted);
        plan.session.check_invariants().unwrap();
    }

    #[test]
    fn test_seatless_vehicle_does_not_strand_riders() {
        let riders = (0..10)
            .map(|i| Rider::new(format!("r{i}"), 35.0 + i as f64 * 0.01, 139.0 + (i % 3) as f64 * 0.02))
            .collect();
        let session = PlanningSession::new(
            Facility::new(35.0, 139.0),
            vec![Vehicle::new("big", 20, 0), Vehicle::new("empty", 0, 0)],
            riders,
        )
        .unwrap();
        let plan = auto_assign(
            &session,
            &PlannerOptions::default(),
            &HaversineOracle::default(),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();

        assert!(plan.unassigned.is_empty());
        let big = plan.session.trips(&VehicleId::new("big")).unwrap();
        assert_eq!(big.len(), 1);
        assert_eq!(big[0].len(), 10);
        assert!(plan.session.trip(&VehicleId::new("empty"), 0).unwrap().is_empty());
    }

    #[test]
    fn test_trip_limited_overflow_moves_to_vehicle_with_room() {
        // Whatever the clustering, six seats in one trip each cover five riders.
        let riders = (0..5)
            .map(|i| Rider::new(format!("r{i}"), 35.1 + i as f64 * 0.002, 139.1))
            .collect();
        let session = PlanningSession::new(
            Facility::new(35.0, 139.0),
            vec![Vehicle::new("small", 2, 0), Vehicle::new("large", 4, 0)],
            riders,
        )
        .unwrap();
        for seed in 0..8 {
            let options = PlannerOptions::default().with_max_trips_per_vehicle(1);
            let plan = auto_assign(
                &session,
                &options,
                &HaversineOracle::default(),
                &mut StdRng::seed_from_u64(seed),
            )
            .unwrap();
            assert!(plan.unassigned.is_empty(), "seed {seed}: {:?}", plan.unassigned);
            for vehicle in ["small", "large"] {
                assert_eq!(plan.session.trips(&VehicleId::new(vehicle)).unwrap().len(), 1);
            }
            plan.session.check_invariants().unwrap();
        }
    }

    #[test]
    fn test_regular_riders_fill_wheelchair_trips_first() {
        let mut riders = vec![
            Rider::new("w1", 35.10, 139.10).with_wheelchair(true),
            Rider::new("w2", 35.11, 139.11).with_wheelchair(true),
        ];
        riders.extend((0..6).map(|i| Rider::new(format!("r{i}"), 35.1 + i as f64 * 0.001, 139.1)));
        let session =
            PlanningSession::new(Facility::new(35.0, 139.0), vec![Vehicle::new("van", 4, 1)], riders)
                .unwrap();
        let plan = run(&session, &PlannerOptions::default().with_max_trips_per_vehicle(2));

        assert!(plan.unassigned.is_empty());
        let trips = plan.session.trips(&VehicleId::new("van")).unwrap();
        assert_eq!(trips.len(), 2);
        for trip in trips {
            assert_eq!(trip.len(), 4);
            assert_eq!(trip.wheelchair_count(), 1);
        }
    }

    #[test]
    fn test_trips_have_totals_in_packed_order() {
        let session = PlanningSession::new(
            Facility::new(35.0, 139.0),
            vec![Vehicle::new("v", 8, 0)],
            vec![Rider::new("a", 35.1, 139.1), Rider::new("b", 35.2, 139.2)],
        )
        .unwrap();
        let plan = run(&session, &PlannerOptions::default());
        let trip = plan.session.trip(&VehicleId::new("v"), 0).unwrap();
        assert_eq!(trip.len(), 2);
        assert!(trip.total_distance > 0.0);
        assert!(trip.total_duration >= 6);
    }

    #[test]
    fn test_inactive_unlocked_vehicle_is_emptied() {
        let session = PlanningSession::new(
            Facility::new(35.0, 139.0),
            vec![Vehicle::new("on", 4, 0), Vehicle::new("off", 4, 0)],
            vec![Rider::new("r", 35.1, 139.1)],
        )
        .unwrap();
        let moved = crate::mutation::move_rider(
            &session,
            &crate::model::RiderId::new("r"),
            &crate::mutation::RiderLocation::Unassigned,
            &crate::mutation::RiderLocation::trip("off", 0),
            &HaversineOracle::default(),
        )
        .unwrap()
        .set_vehicle_active(&VehicleId::new("off"), false)
        .unwrap();

        let plan = run(&moved, &PlannerOptions::default());
        assert!(plan.session.trip(&VehicleId::new("off"), 0).unwrap().is_empty());
        assert_eq!(plan.session.trip(&VehicleId::new("on"), 0).unwrap().len(), 1);
    }

    #[test]
    fn test_session_wrapper_uses_seed() {
        let riders = (0..12)
            .map(|i| Rider::new(format!("r{i}"), 35.0 + (i % 4) as f64 * 0.05, 139.0 + (i / 4) as f64 * 0.05))
            .collect();
        let session = PlanningSession::new(
            Facility::new(35.1, 139.1),
            vec![Vehicle::new("a", 4, 0), Vehicle::new("b", 4, 0), Vehicle::new("c", 4, 0)],
            riders,
        )
        .unwrap();
        let options = PlannerOptions::default().with_seed(99);
        let oracle = HaversineOracle::default();
        let first = session.auto_assign(&options, &oracle).unwrap();
        let second = session.auto_assign(&options, &oracle).unwrap();
        assert_eq!(first, second);
    }
}
