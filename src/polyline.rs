//! Route geometry.
//!
//! A trip's path as decoded coordinates: facility, each located rider in
//! visiting order, then back to the facility. Encoding for map display
//! happens at the host boundary.

use serde::{Deserialize, Serialize};

use crate::model::{Coordinates, Rider};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<Coordinates>,
}

impl Polyline {
    pub fn new(points: Vec<Coordinates>) -> Self {
        Self { points }
    }

    /// Closed path facility → riders → facility. Riders without coordinates
    /// are skipped; an empty rider list yields an empty polyline.
    pub fn round_trip(facility: Coordinates, riders: &[Rider]) -> Self {
        if riders.is_empty() {
            return Self::default();
        }
        let mut points = Vec::with_capacity(riders.len() + 2);
        points.push(facility);
        points.extend(riders.iter().filter_map(|rider| rider.location));
        points.push(facility);
        Self { points }
    }

    pub fn points(&self) -> &[Coordinates] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Coordinates> {
        self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of straight segments.
    pub fn segments(&self) -> usize {
        self.points.len().saturating_sub(1)
    }
}
