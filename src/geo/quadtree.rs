use super::{Coordinate, radius_box};

/// Points stored per node before it subdivides.
const NODE_CAPACITY: usize = 4;

/// Boxes narrower than this on either axis no longer subdivide; they take
/// overflow points instead, so stacks of identical coordinates stay finite.
const MIN_HALF_DIM: f64 = 1e-9;

/// Axis-aligned bounding box: center plus half dimensions, in degrees.
/// Containment is inclusive on all four edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    center_lon: f64,
    center_lat: f64,
    half_lon: f64,
    half_lat: f64,
}

impl Aabb {
    pub const fn new(center_lon: f64, center_lat: f64, half_lon: f64, half_lat: f64) -> Self {
        Self {
            center_lon,
            center_lat,
            half_lon,
            half_lat,
        }
    }

    pub fn from_extents(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        let half_lon = (max_lon - min_lon) / 2.0;
        let half_lat = (max_lat - min_lat) / 2.0;
        Self {
            center_lon: min_lon + half_lon,
            center_lat: min_lat + half_lat,
            half_lon,
            half_lat,
        }
    }

    pub fn contains(&self, point: &Coordinate) -> bool {
        point.longitude >= self.center_lon - self.half_lon
            && point.longitude <= self.center_lon + self.half_lon
            && point.latitude >= self.center_lat - self.half_lat
            && point.latitude <= self.center_lat + self.half_lat
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        other.center_lon + other.half_lon >= self.center_lon - self.half_lon
            && other.center_lat + other.half_lat >= self.center_lat - self.half_lat
            && other.center_lon - other.half_lon <= self.center_lon + self.half_lon
            && other.center_lat - other.half_lat <= self.center_lat + self.half_lat
    }
}

/// A quadtree over point payloads (`u32` handles into some external store).
#[derive(Debug)]
pub struct QuadTree {
    boundary: Aabb,
    points: Vec<(Coordinate, u32)>,
    /// NW, NE, SW, SE once subdivided.
    children: Option<Box<[QuadTree; 4]>>,
}

impl QuadTree {
    pub fn new(boundary: Aabb) -> Self {
        Self {
            boundary,
            points: Vec::with_capacity(NODE_CAPACITY),
            children: None,
        }
    }

    /// Inserts a point, subdividing on overflow. Returns false when the
    /// point lies outside this node's boundary.
    pub fn insert(&mut self, point: Coordinate, item: u32) -> bool {
        if !self.boundary.contains(&point) {
            return false;
        }

        if self.children.is_none()
            && (self.points.len() < NODE_CAPACITY
                || self.boundary.half_lon < MIN_HALF_DIM
                || self.boundary.half_lat < MIN_HALF_DIM)
        {
            self.points.push((point, item));
            return true;
        }

        if self.children.is_none() {
            self.subdivide();
        }
        if let Some(children) = self.children.as_mut() {
            for child in children.iter_mut() {
                if child.insert(point, item) {
                    return true;
                }
            }
        }

        // Contained here but claimed by no quadrant (the point sits on a
        // rounding seam between children); keep it on this node.
        self.points.push((point, item));
        true
    }

    fn subdivide(&mut self) {
        let Aabb {
            center_lon,
            center_lat,
            half_lon,
            half_lat,
        } = self.boundary;
        let (half_lon, half_lat) = (half_lon / 2.0, half_lat / 2.0);

        let children = Box::new([
            QuadTree::new(Aabb::new(
                center_lon - half_lon,
                center_lat + half_lat,
                half_lon,
                half_lat,
            )),
            QuadTree::new(Aabb::new(
                center_lon + half_lon,
                center_lat + half_lat,
                half_lon,
                half_lat,
            )),
            QuadTree::new(Aabb::new(
                center_lon - half_lon,
                center_lat - half_lat,
                half_lon,
                half_lat,
            )),
            QuadTree::new(Aabb::new(
                center_lon + half_lon,
                center_lat - half_lat,
                half_lon,
                half_lat,
            )),
        ]);
        self.children = Some(children);

        let points = std::mem::take(&mut self.points);
        for (point, item) in points {
            self.insert(point, item);
        }
    }

    /// All stored items whose point lies inside `area`.
    pub fn query_area(&self, area: &Aabb) -> Vec<u32> {
        let mut out = Vec::with_capacity(NODE_CAPACITY);
        self.collect_area(area, &mut out);
        out
    }

    fn collect_area(&self, area: &Aabb, out: &mut Vec<u32>) {
        if !self.boundary.intersects(area) {
            return;
        }
        for (point, item) in &self.points {
            if area.contains(point) {
                out.push(*item);
            }
        }
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.collect_area(area, out);
            }
        }
    }

    /// Bounding-box approximation of a radius search; see [`radius_box`].
    pub fn query_radius(&self, latitude: f64, longitude: f64, radius_m: f64) -> Vec<u32> {
        self.query_area(&radius_box(latitude, longitude, radius_m))
    }
}
