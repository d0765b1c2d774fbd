use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use rayon::prelude::*;

use crate::geo::{Aabb, Coordinate, QuadTree, radius_box};

use super::entities::{Stop, Transfer};

/// Padding around the observed extents so boundary stops stay strictly
/// inside the index's root box.
const EXTENT_PAD: f64 = 1e-6;

/// Keyed stop storage. Tracks the geographic extents of everything inserted
/// and builds a quadtree over them on the first spatial query.
#[derive(Debug)]
pub struct StopCollection {
    stops: Vec<Stop>,
    lookup: HashMap<Arc<str>, u32>,
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
    quadtree: OnceLock<QuadTree>,
}

impl Default for StopCollection {
    fn default() -> Self {
        Self {
            stops: Vec::new(),
            lookup: HashMap::new(),
            min_lat: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
            min_lon: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
            quadtree: OnceLock::new(),
        }
    }
}

impl StopCollection {
    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub(crate) fn insert(&mut self, mut stop: Stop) -> u32 {
        let index = self.stops.len() as u32;
        stop.index = index;
        self.min_lat = self.min_lat.min(stop.latitude);
        self.max_lat = self.max_lat.max(stop.latitude);
        self.min_lon = self.min_lon.min(stop.longitude);
        self.max_lon = self.max_lon.max(stop.longitude);
        self.lookup.insert(stop.id.clone(), index);
        self.stops.push(stop);
        index
    }

    pub(crate) fn attach_stop_time(&mut self, stop_index: u32, stop_time_index: u32) {
        self.stops[stop_index as usize].stop_times.push(stop_time_index);
    }

    pub(crate) fn install_transfer(&mut self, stop_index: u32, transfer: Transfer) {
        let stop = &mut self.stops[stop_index as usize];
        stop.transfers.insert(transfer.to_stop_id.clone(), transfer);
    }

    pub fn get(&self, id: &str) -> Option<&Stop> {
        self.index_of(id).map(|index| &self.stops[index as usize])
    }

    pub fn index_of(&self, id: &str) -> Option<u32> {
        self.lookup.get(id).copied()
    }

    pub fn by_index(&self, index: u32) -> &Stop {
        &self.stops[index as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stop> {
        self.stops.iter()
    }

    pub fn as_slice(&self) -> &[Stop] {
        &self.stops
    }

    /// (min latitude, max latitude, min longitude, max longitude) over all
    /// inserted stops.
    pub fn extents(&self) -> (f64, f64, f64, f64) {
        (self.min_lat, self.max_lat, self.min_lon, self.max_lon)
    }

    /// Exact-name matches, in insertion order.
    pub fn by_name(&self, name: &str) -> Vec<&Stop> {
        self.stops.iter().filter(|stop| &*stop.name == name).collect()
    }

    /// All stops inside the equirectangular bounding box of the radius.
    pub fn by_proximity(&self, latitude: f64, longitude: f64, radius_m: f64) -> Vec<&Stop> {
        self.quadtree()
            .query_area(&radius_box(latitude, longitude, radius_m))
            .into_iter()
            .map(|index| &self.stops[index as usize])
            .collect()
    }

    /// Like [`by_proximity`](Self::by_proximity), each stop annotated with
    /// its great-circle distance to the query point, closest first.
    pub fn distances_by_proximity(
        &self,
        latitude: f64,
        longitude: f64,
        radius_m: f64,
    ) -> Vec<(&Stop, f64)> {
        let origin = Coordinate {
            latitude,
            longitude,
        };
        let mut results: Vec<(&Stop, f64)> = self
            .by_proximity(latitude, longitude, radius_m)
            .into_iter()
            .map(|stop| {
                let distance = stop.coordinate().distance_m(&origin);
                (stop, distance)
            })
            .collect();
        results.par_sort_unstable_by(|(_, a), (_, b)| a.total_cmp(b));
        results
    }

    fn quadtree(&self) -> &QuadTree {
        self.quadtree.get_or_init(|| {
            let boundary = if self.stops.is_empty() {
                Aabb::new(0.0, 0.0, 0.0, 0.0)
            } else {
                Aabb::from_extents(
                    self.min_lat - EXTENT_PAD,
                    self.max_lat + EXTENT_PAD,
                    self.min_lon - EXTENT_PAD,
                    self.max_lon + EXTENT_PAD,
                )
            };
            let mut tree = QuadTree::new(boundary);
            for stop in &self.stops {
                tree.insert(stop.coordinate(), stop.index);
            }
            tree
        })
    }
}
