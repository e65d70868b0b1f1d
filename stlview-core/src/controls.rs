/// Orbit controls: rotate around and zoom toward a fixed target
use std::f32::consts::PI;

use nalgebra::{Point3, Vector3};

use crate::projection::Camera;

/// Keeps the camera off the poles, where `look_at` degenerates
const POLAR_MARGIN: f32 = 1e-3;

#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    pub target: Point3<f32>,
    distance: f32,
    /// Angle around +y, 0 on the +z axis
    azimuth: f32,
    /// Angle from +y
    polar: f32,
    min_distance: f32,
    max_distance: f32,
}

impl OrbitControls {
    /// Pick up the camera's current placement relative to its target
    pub fn from_camera(camera: &Camera, min_distance: f32, max_distance: f32) -> Self {
        let offset = camera.position - camera.target;
        let distance = offset.norm();
        let (azimuth, polar) = if distance > f32::EPSILON {
            (
                offset.x.atan2(offset.z),
                (offset.y / distance).clamp(-1.0, 1.0).acos(),
            )
        } else {
            (0.0, PI / 2.0)
        };

        Self {
            target: camera.target,
            distance: distance.clamp(min_distance, max_distance),
            azimuth,
            polar: polar.clamp(POLAR_MARGIN, PI - POLAR_MARGIN),
            min_distance,
            max_distance,
        }
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn azimuth(&self) -> f32 {
        self.azimuth
    }

    pub fn polar(&self) -> f32 {
        self.polar
    }

    pub fn rotate(&mut self, d_azimuth: f32, d_polar: f32) {
        self.azimuth = (self.azimuth + d_azimuth).rem_euclid(2.0 * PI);
        self.polar = (self.polar + d_polar).clamp(POLAR_MARGIN, PI - POLAR_MARGIN);
    }

    /// Scale the distance; factors above 1 move away from the target
    pub fn zoom(&mut self, factor: f32) {
        if factor > 0.0 {
            self.distance = (self.distance * factor).clamp(self.min_distance, self.max_distance);
        }
    }

    pub fn offset(&self) -> Vector3<f32> {
        let (sin_polar, cos_polar) = self.polar.sin_cos();
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        Vector3::new(sin_polar * sin_az, cos_polar, sin_polar * cos_az) * self.distance
    }

    pub fn apply(&self, camera: &mut Camera) {
        camera.target = self.target;
        camera.position = self.target + self.offset();
    }
}
