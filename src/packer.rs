//! Capacity packing of a vehicle's cluster into trips.
//!
//! Walks the cluster in the given order and fills the current trip until the
//! next rider no longer fits (seat count or wheelchair spaces), then starts a
//! new trip with that rider. Order is preserved; sequencing is a separate,
//! explicit step.
//!
//! A vehicle's cluster is packed with [`pack_cluster`]: wheelchair riders
//! first, then regular riders topping up the free seats of those trips
//! before any new trip is opened.

use tracing::warn;

use crate::model::{Facility, Rider, Trip, UnassignedReason, UnassignedRider};
use crate::sequencer::build_trip;
use crate::traits::DistanceOracle;

/// Result of [`pack_into_trips`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Packing {
    /// Rider groups, one per trip, in cluster order.
    pub loads: Vec<Vec<Rider>>,
    /// Riders no trip of this vehicle can take.
    pub overflow: Vec<UnassignedRider>,
}

impl Packing {
    pub fn trip_count(&self) -> usize {
        self.loads.len()
    }

    /// Realises the loads as trips with totals for `facility`.
    pub fn into_trips<O>(self, facility: &Facility, oracle: &O) -> (Vec<Trip>, Vec<UnassignedRider>)
    where
        O: DistanceOracle + ?Sized,
    {
        let trips = self
            .loads
            .into_iter()
            .map(|load| build_trip(facility, load, oracle))
            .collect();
        (trips, self.overflow)
    }
}

/// Splits `riders` into trips of at most `capacity` riders and at most
/// `wheelchair_capacity` wheelchair riders each.
///
/// A rider who cannot ride even an empty trip, or who would need a trip
/// beyond `max_trips`, is reported in [`Packing::overflow`].
pub fn pack_into_trips(
    riders: &[Rider],
    capacity: u32,
    wheelchair_capacity: u32,
    max_trips: Option<usize>,
) -> Packing {
    let capacity = capacity as usize;
    let wheelchair_capacity = wheelchair_capacity as usize;
    let max_trips = max_trips.unwrap_or(usize::MAX);

    let mut packing = Packing::default();
    let mut current: Vec<Rider> = Vec::new();
    let mut wheelchairs = 0;

    for rider in riders {
        if capacity == 0 || (rider.wheelchair && wheelchair_capacity == 0) {
            let reason = if capacity > 0 {
                UnassignedReason::NoWheelchairVehicle
            } else {
                UnassignedReason::CapacityExhausted
            };
            packing.overflow.push(UnassignedRider {
                rider: rider.clone(),
                reason,
            });
            continue;
        }

        let fits = current.len() < capacity && (!rider.wheelchair || wheelchairs < wheelchair_capacity);
        if !fits {
            if packing.loads.len() + 1 >= max_trips {
                packing.overflow.push(UnassignedRider {
                    rider: rider.clone(),
                    reason: UnassignedReason::CapacityExhausted,
                });
                continue;
            }
            packing.loads.push(std::mem::take(&mut current));
            wheelchairs = 0;
        } else if current.is_empty() && packing.loads.len() >= max_trips {
            packing.overflow.push(UnassignedRider {
                rider: rider.clone(),
                reason: UnassignedReason::CapacityExhausted,
            });
            continue;
        }

        if rider.wheelchair {
            wheelchairs += 1;
        }
        current.push(rider.clone());
    }

    if !current.is_empty() {
        packing.loads.push(current);
    }
    if !packing.overflow.is_empty() {
        warn!(overflow = packing.overflow.len(), capacity, "riders did not fit any trip");
    }
    packing
}

/// Packs a vehicle's cluster in two passes.
///
/// Wheelchair riders are packed first. Regular riders then fill the free
/// seats of every wheelchair trip, in trip order, and only the rest open new
/// trips within what is left of `max_trips`.
pub fn pack_cluster(
    riders: &[Rider],
    capacity: u32,
    wheelchair_capacity: u32,
    max_trips: Option<usize>,
) -> Packing {
    let (wheelchair, regular): (Vec<Rider>, Vec<Rider>) =
        riders.iter().cloned().partition(|rider| rider.wheelchair);

    let mut packing = pack_into_trips(&wheelchair, capacity, wheelchair_capacity, max_trips);
    let seats = capacity as usize;
    let mut remaining = regular.into_iter().peekable();
    for load in &mut packing.loads {
        while load.len() < seats {
            match remaining.next() {
                Some(rider) => load.push(rider),
                None => break,
            }
        }
        if remaining.peek().is_none() {
            break;
        }
    }

    let rest: Vec<Rider> = remaining.collect();
    let left = max_trips.map(|max| max.saturating_sub(packing.loads.len()));
    let extra = pack_into_trips(&rest, capacity, wheelchair_capacity, left);
    packing.loads.extend(extra.loads);
    packing.overflow.extend(extra.overflow);
    packing
}
