//! Route sequencing for a single trip.
//!
//! Greedy nearest-neighbour ordering from the facility, with fixed-order
//! riders kept at their input positions. Sequencing is an explicit action;
//! assignment never reorders a trip on its own.

use tracing::debug;

use crate::haversine::round_km;
use crate::model::{Coordinates, Facility, Rider, Trip};
use crate::polyline::Polyline;
use crate::traits::DistanceOracle;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteResult {
    /// Riders in visiting order.
    pub order: Vec<Rider>,
    /// Facility-to-facility distance in km, two decimals.
    pub total_distance: f64,
    /// Estimated minutes including pickups.
    pub total_duration: u32,
    pub geometry: Polyline,
}

impl RouteResult {
    pub fn into_trip(self) -> Trip {
        Trip {
            riders: self.order,
            total_distance: self.total_distance,
            total_duration: self.total_duration,
        }
    }
}

/// Orders `riders` for a round trip from `facility`.
///
/// Riders with `order_fixed` (and riders without coordinates) stay at their
/// input index. The rest are visited nearest-first starting at the facility
/// and fill the remaining slots in that order. Ties go to the rider listed
/// first.
pub fn sequence_route<O>(facility: &Facility, riders: &[Rider], oracle: &O) -> RouteResult
where
    O: DistanceOracle + ?Sized,
{
    if riders.is_empty() {
        return RouteResult::default();
    }

    let mut slots: Vec<Option<&Rider>> = Vec::with_capacity(riders.len());
    let mut flexible: Vec<(&Rider, Coordinates)> = Vec::new();
    for rider in riders {
        match rider.location {
            Some(location) if !rider.order_fixed => {
                slots.push(None);
                flexible.push((rider, location));
            }
            _ => slots.push(Some(rider)),
        }
    }

    if flexible.is_empty() {
        return recalculate_route(facility, riders, oracle);
    }

    let mut visiting = nearest_neighbor(facility.location, &flexible, oracle).into_iter();
    let mut order = Vec::with_capacity(riders.len());
    for slot in slots {
        match slot {
            Some(pinned) => order.push(pinned.clone()),
            None => {
                if let Some(next) = visiting.next() {
                    order.push(next.clone());
                }
            }
        }
    }

    let result = recalculate_route(facility, &order, oracle);
    debug!(
        riders = result.order.len(),
        pinned = riders.len() - flexible.len(),
        distance_km = result.total_distance,
        "sequenced route"
    );
    result
}

/// Totals for `riders` in the given order, without reordering.
pub fn recalculate_route<O>(facility: &Facility, riders: &[Rider], oracle: &O) -> RouteResult
where
    O: DistanceOracle + ?Sized,
{
    if riders.is_empty() {
        return RouteResult::default();
    }
    let (total_distance, total_duration) = route_totals(facility, riders, oracle);
    RouteResult {
        order: riders.to_vec(),
        total_distance,
        total_duration,
        geometry: Polyline::round_trip(facility.location, riders),
    }
}

/// Rounded distance and duration of facility → riders → facility.
///
/// Riders without coordinates add no hop but still count as a stop.
pub fn route_totals<O>(facility: &Facility, riders: &[Rider], oracle: &O) -> (f64, u32)
where
    O: DistanceOracle + ?Sized,
{
    if riders.is_empty() {
        return (0.0, 0);
    }
    let mut distance = 0.0;
    let mut current = facility.location;
    for location in riders.iter().filter_map(|rider| rider.location) {
        distance += oracle.distance_km(current, location);
        current = location;
    }
    distance += oracle.distance_km(current, facility.location);

    (round_km(distance), oracle.travel_minutes(distance, riders.len()))
}

/// Builds a trip from riders in the given order with fresh totals.
pub fn build_trip<O>(facility: &Facility, riders: Vec<Rider>, oracle: &O) -> Trip
where
    O: DistanceOracle + ?Sized,
{
    let (total_distance, total_duration) = route_totals(facility, &riders, oracle);
    Trip {
        riders,
        total_distance,
        total_duration,
    }
}

/// Recomputes a trip's totals after its rider order changed.
pub fn refresh_trip<O>(facility: &Facility, trip: &mut Trip, oracle: &O)
where
    O: DistanceOracle + ?Sized,
{
    let (total_distance, total_duration) = route_totals(facility, &trip.riders, oracle);
    trip.total_distance = total_distance;
    trip.total_duration = total_duration;
}

fn nearest_neighbor<'a, O>(
    start: Coordinates,
    candidates: &[(&'a Rider, Coordinates)],
    oracle: &O,
) -> Vec<&'a Rider>
where
    O: DistanceOracle + ?Sized,
{
    let mut visited = vec![false; candidates.len()];
    let mut order = Vec::with_capacity(candidates.len());
    let mut current = start;

    for _ in 0..candidates.len() {
        let mut best: Option<(usize, f64)> = None;
        for (i, (_, location)) in candidates.iter().enumerate() {
            if visited[i] {
                continue;
            }
            let d = oracle.distance_km(current, *location);
            if best.is_none_or(|(_, best_d)| d < best_d) {
                best = Some((i, d));
            }
        }

        let Some((next, _)) = best else { break };
        visited[next] = true;
        order.push(candidates[next].0);
        current = candidates[next].1;
    }

    order
}
