//! Neighbourhood centroids in and around Setagaya, Tokyo.
//!
//! Coordinates are approximate station-area centroids, good to a few hundred
//! metres. Enough to give clustering real geography to work with.

use transport_planner::Coordinates;

#[derive(Debug, Clone, Copy)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn coords(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lng)
    }
}

pub const DAY_CENTRE: Location = Location::new("Sakurashinmachi Day Centre", 35.6284, 139.6489);

/// North: along the Keio and Odakyu lines.
pub const NORTH: &[Location] = &[
    Location::new("Shimokitazawa", 35.6617, 139.6680),
    Location::new("Umegaoka", 35.6556, 139.6536),
    Location::new("Gotokuji", 35.6539, 139.6463),
    Location::new("Meidaimae", 35.6685, 139.6502),
    Location::new("Kamikitazawa", 35.6687, 139.6232),
    Location::new("Hachimanyama", 35.6698, 139.6148),
];

/// West: Seijo and the Odakyu line towards Kitami.
pub const WEST: &[Location] = &[
    Location::new("Seijo", 35.6403, 139.5997),
    Location::new("Soshigaya-Okura", 35.6432, 139.6097),
    Location::new("Chitose-Funabashi", 35.6477, 139.6243),
    Location::new("Kyodo", 35.6494, 139.6358),
    Location::new("Kitami", 35.6367, 139.5876),
];

/// South: Tama river side and Oimachi line.
pub const SOUTH: &[Location] = &[
    Location::new("Futako-Tamagawa", 35.6115, 139.6268),
    Location::new("Kaminoge", 35.6117, 139.6373),
    Location::new("Todoroki", 35.6083, 139.6490),
    Location::new("Okusawa", 35.6058, 139.6719),
    Location::new("Jiyugaoka", 35.6076, 139.6688),
];

/// Close to the centre.
pub const NEARBY: &[Location] = &[
    Location::new("Yoga", 35.6266, 139.6332),
    Location::new("Komazawa-Daigaku", 35.6326, 139.6617),
    Location::new("Sangenjaya", 35.6436, 139.6708),
    Location::new("Setagaya Ward Office", 35.6464, 139.6532),
];

/// Every location above, north to south.
pub fn all_locations() -> Vec<Location> {
    NORTH
        .iter()
        .chain(WEST)
        .chain(NEARBY)
        .chain(SOUTH)
        .copied()
        .collect()
}
