//! Geographic partitioning of riders across vehicles.
//!
//! # Algorithm
//!
//! K-means with K-means++ seeding and Lloyd iterations, using the distance
//! oracle as the metric and the arithmetic mean of lat/lng as centroid. One
//! cluster per vehicle; capacity is not considered here (see
//! [`crate::packer`]).
//!
//! Wheelchair riders are clustered separately, and only against vehicles that
//! carry wheelchairs, so they never land on a vehicle that cannot take them.
//!
//! # Complexity
//!
//! O(iterations × n × k) distance evaluations.

use std::collections::BTreeMap;

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use tracing::{debug, warn};

use crate::model::{Coordinates, Rider, UnassignedReason, UnassignedRider, Vehicle, VehicleId};
use crate::options::PlannerOptions;
use crate::traits::DistanceOracle;

/// Result of [`partition_by_cluster`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    /// Unordered riders per vehicle. Every candidate vehicle has an entry.
    pub clusters: BTreeMap<VehicleId, Vec<Rider>>,
    /// Riders that cannot be clustered onto any of the vehicles.
    pub unplaced: Vec<UnassignedRider>,
}

impl Partition {
    pub fn cluster(&self, vehicle_id: &VehicleId) -> &[Rider] {
        self.clusters
            .get(vehicle_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn placed_count(&self) -> usize {
        self.clusters.values().map(Vec::len).sum()
    }
}

/// Distributes `riders` over `vehicles` by proximity.
///
/// `vehicles` are taken as given; callers filter for eligibility. Vehicles
/// without seats get an empty cluster. Riders without coordinates and
/// wheelchair riders with no wheelchair-capable vehicle end up in
/// [`Partition::unplaced`].
pub fn partition_by_cluster<O, R>(
    riders: &[Rider],
    vehicles: &[Vehicle],
    options: &PlannerOptions,
    oracle: &O,
    rng: &mut R,
) -> Partition
where
    O: DistanceOracle + ?Sized,
    R: Rng + ?Sized,
{
    let mut partition = Partition {
        clusters: vehicles
            .iter()
            .map(|vehicle| (vehicle.id.clone(), Vec::new()))
            .collect(),
        unplaced: Vec::new(),
    };

    let mut wheelchair = Vec::new();
    let mut regular = Vec::new();
    for rider in riders {
        if let Err(err) = rider.require_location() {
            warn!(%err, "left out of clustering");
            partition.unplaced.push(UnassignedRider {
                rider: rider.clone(),
                reason: UnassignedReason::MissingCoordinates,
            });
        } else if rider.wheelchair {
            wheelchair.push(rider);
        } else {
            regular.push(rider);
        }
    }

    let candidates: Vec<&Vehicle> = vehicles.iter().filter(|v| v.capacity > 0).collect();
    if candidates.is_empty() {
        partition
            .unplaced
            .extend(wheelchair.into_iter().chain(regular).map(|rider| UnassignedRider {
                rider: rider.clone(),
                reason: UnassignedReason::CapacityExhausted,
            }));
        return partition;
    }

    let wheelchair_vehicles: Vec<&Vehicle> = candidates
        .iter()
        .copied()
        .filter(|v| v.carries_wheelchairs())
        .collect();
    if wheelchair_vehicles.is_empty() {
        for rider in wheelchair {
            warn!(rider = %rider.id, "no wheelchair-capable vehicle for rider");
            partition.unplaced.push(UnassignedRider {
                rider: rider.clone(),
                reason: UnassignedReason::NoWheelchairVehicle,
            });
        }
    } else {
        assign_clusters(&mut partition, &wheelchair, &wheelchair_vehicles, options, oracle, rng);
    }

    assign_clusters(&mut partition, &regular, &candidates, options, oracle, rng);

    debug!(
        placed = partition.placed_count(),
        unplaced = partition.unplaced.len(),
        vehicles = vehicles.len(),
        "partitioned riders"
    );
    partition
}

fn assign_clusters<O, R>(
    partition: &mut Partition,
    riders: &[&Rider],
    vehicles: &[&Vehicle],
    options: &PlannerOptions,
    oracle: &O,
    rng: &mut R,
) where
    O: DistanceOracle + ?Sized,
    R: Rng + ?Sized,
{
    let located: Vec<(&Rider, Coordinates)> = riders
        .iter()
        .filter_map(|rider| rider.location.map(|location| (*rider, location)))
        .collect();
    if located.is_empty() {
        return;
    }

    let points: Vec<Coordinates> = located.iter().map(|(_, location)| *location).collect();
    let labels = kmeans(
        &points,
        vehicles.len(),
        options.max_iterations,
        options.reseed_jitter_deg,
        oracle,
        rng,
    );

    for ((rider, _), label) in located.into_iter().zip(labels) {
        let vehicle_id = &vehicles[label].id;
        partition
            .clusters
            .entry(vehicle_id.clone())
            .or_default()
            .push(rider.clone());
    }
}

/// Clusters `points` into at most `k` groups and returns a cluster label per
/// point (labels are `< min(k, points.len())`).
///
/// Stops when memberships stop changing or after `max_iterations` rounds. An
/// empty cluster's centroid is reseeded uniformly within `jitter_deg` of the
/// population mean.
pub fn kmeans<O, R>(
    points: &[Coordinates],
    k: usize,
    max_iterations: usize,
    jitter_deg: f64,
    oracle: &O,
    rng: &mut R,
) -> Vec<usize>
where
    O: DistanceOracle + ?Sized,
    R: Rng + ?Sized,
{
    if points.is_empty() || k == 0 {
        return Vec::new();
    }
    let k = k.min(points.len());
    let mean = mean_of(points.iter().copied()).unwrap_or(points[0]);

    let mut centroids = seed_centroids(points, k, oracle, rng);
    let mut labels = nearest_labels(points, &centroids, oracle);

    for iteration in 0..max_iterations {
        centroids = update_centroids(points, &labels, k, mean, jitter_deg, rng);
        let next = nearest_labels(points, &centroids, oracle);
        let converged = next == labels;
        labels = next;
        if converged {
            debug!(iteration, k, points = points.len(), "k-means converged");
            break;
        }
    }

    labels
}

/// K-means++ seeding: the first centroid is a uniformly drawn point, each
/// following one is drawn with probability proportional to the squared
/// distance to the nearest centroid chosen so far.
fn seed_centroids<O, R>(points: &[Coordinates], k: usize, oracle: &O, rng: &mut R) -> Vec<Coordinates>
where
    O: DistanceOracle + ?Sized,
    R: Rng + ?Sized,
{
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())]);

    while centroids.len() < k {
        let weights: Vec<f64> = points
            .iter()
            .map(|point| {
                let nearest = centroids
                    .iter()
                    .map(|centroid| oracle.distance_km(*point, *centroid))
                    .fold(f64::INFINITY, f64::min);
                nearest * nearest
            })
            .collect();

        // All weights zero: every point sits on a centroid already.
        let index = match WeightedIndex::new(&weights) {
            Ok(dist) => dist.sample(rng),
            Err(_) => rng.gen_range(0..points.len()),
        };
        centroids.push(points[index]);
    }

    centroids
}

fn nearest_labels<O>(points: &[Coordinates], centroids: &[Coordinates], oracle: &O) -> Vec<usize>
where
    O: DistanceOracle + ?Sized,
{
    points
        .iter()
        .map(|point| {
            let mut best = 0;
            let mut best_distance = f64::INFINITY;
            for (index, centroid) in centroids.iter().enumerate() {
                let d = oracle.distance_km(*point, *centroid);
                if d < best_distance {
                    best = index;
                    best_distance = d;
                }
            }
            best
        })
        .collect()
}

fn update_centroids<R>(
    points: &[Coordinates],
    labels: &[usize],
    k: usize,
    mean: Coordinates,
    jitter_deg: f64,
    rng: &mut R,
) -> Vec<Coordinates>
where
    R: Rng + ?Sized,
{
    let spread = jitter_deg.abs();
    (0..k)
        .map(|cluster| {
            let members = points
                .iter()
                .zip(labels)
                .filter(|(_, label)| **label == cluster)
                .map(|(point, _)| *point);
            mean_of(members).unwrap_or_else(|| Coordinates {
                lat: mean.lat + rng.gen_range(-spread..=spread),
                lng: mean.lng + rng.gen_range(-spread..=spread),
            })
        })
        .collect()
}

fn mean_of(points: impl Iterator<Item = Coordinates>) -> Option<Coordinates> {
    let (count, lat, lng) = points.fold((0usize, 0.0, 0.0), |(n, lat, lng), p| {
        (n + 1, lat + p.lat, lng + p.lng)
    });
    (count > 0).then(|| Coordinates {
        lat: lat / count as f64,
        lng: lng / count as f64,
    })
}
