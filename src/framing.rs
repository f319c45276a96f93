use crate::config::FramingConfig;
use glam::{Mat4, Vec3};

/// Axis-aligned bounding box in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min: min.min(max), max: max.max(min) }
    }

    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self { min: center - half, max: center + half }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb { min: self.min.min(other.min), max: self.max.max(other.max) }
    }

    /// Bounds of this box after an affine transform, taken over all eight corners.
    pub fn transformed(&self, matrix: &Mat4) -> Aabb {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            let world = matrix.transform_point3(corner);
            min = min.min(world);
            max = max.max(world);
        }
        Aabb { min, max }
    }
}

/// Initial orbit pose for a freshly loaded asset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Framing {
    pub camera: Vec3,
    pub target: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoFramer {
    pub min_distance: f32,
    pub depth_scale: f32,
    pub lateral_scale: f32,
}

impl AutoFramer {
    pub fn from_config(config: &FramingConfig) -> Self {
        Self {
            min_distance: config.min_distance,
            depth_scale: config.depth_scale,
            lateral_scale: config.lateral_scale,
        }
    }

    /// Targets the box center and backs the camera off toward -Y and up +Z.
    /// The height offset never drops below `min_distance`, so thin assets are not clipped.
    pub fn frame(&self, bounds: &Aabb) -> Framing {
        let center = bounds.center();
        let size = bounds.size();
        let offset = Vec3::new(
            0.0,
            -size.y * self.lateral_scale,
            self.min_distance.max(size.z * self.depth_scale),
        );
        Framing { camera: center + offset, target: center }
    }
}

impl Default for AutoFramer {
    fn default() -> Self {
        Self::from_config(&FramingConfig::default())
    }
}
