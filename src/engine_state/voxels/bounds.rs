//! Axis-aligned bounding boxes for chunks and mesh buckets.

use cgmath::Point3;

/// An axis-aligned box in world space. An empty box has `min > max`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    /// Smallest corner
    pub min: Point3<f32>,
    /// Largest corner
    pub max: Point3<f32>,
}

impl Aabb {
    /// A box that contains nothing and grows to fit the first point added.
    pub fn empty() -> Self {
        Aabb {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    /// A box spanning the two given corners.
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Aabb { min, max }
    }

    /// `true` if nothing has been added yet.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grows the box to contain `point`.
    pub fn add_point(&mut self, point: Point3<f32>) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.min.z = self.min.z.min(point.z);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self.max.z = self.max.z.max(point.z);
    }

    /// `true` if `point` is inside the box, boundary included.
    pub fn contains(&self, point: Point3<f32>) -> bool {
        (self.min.x..=self.max.x).contains(&point.x)
            && (self.min.y..=self.max.y).contains(&point.y)
            && (self.min.z..=self.max.z).contains(&point.z)
    }

    /// Squared distance from `point` to the closest point of the box.
    pub fn distance_squared(&self, point: Point3<f32>) -> f32 {
        let dx = (self.min.x - point.x).max(0.0).max(point.x - self.max.x);
        let dy = (self.min.y - point.y).max(0.0).max(point.y - self.max.y);
        let dz = (self.min.z - point.z).max(0.0).max(point.z - self.max.z);
        dx * dx + dy * dy + dz * dz
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Aabb::empty()
    }
}
