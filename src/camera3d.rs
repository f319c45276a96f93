use crate::config::LensConfig;
use glam::{Mat4, Vec3};
use winit::dpi::PhysicalSize;

/// Height axis of every model the viewer loads.
pub const WORLD_UP: Vec3 = Vec3::Z;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraLens {
    pub fov_y_radians: f32,
    pub near: f32,
    pub far: f32,
}

impl CameraLens {
    pub fn from_config(config: &LensConfig) -> Self {
        Self { fov_y_radians: config.fov_y_degrees.to_radians(), near: config.near, far: config.far }
    }
}

impl Default for CameraLens {
    fn default() -> Self {
        Self::from_config(&LensConfig::default())
    }
}

/// Camera pose handed to the renderer each frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera3D {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub lens: CameraLens,
}

impl Camera3D {
    pub fn new(position: Vec3, target: Vec3, lens: CameraLens) -> Self {
        Self { position, target, up: WORLD_UP, lens }
    }

    /// Unit look direction, or zero when position and target coincide.
    pub fn look_direction(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh_gl(self.lens.fov_y_radians, aspect.max(0.0001), self.lens.near, self.lens.far)
    }

    pub fn view_projection(&self, viewport: PhysicalSize<u32>) -> Mat4 {
        let aspect = if viewport.height > 0 { viewport.width as f32 / viewport.height as f32 } else { 1.0 };
        self.projection_matrix(aspect) * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_projection_is_finite() {
        let camera = Camera3D::new(Vec3::new(10.0, -14.0, 3.2), Vec3::new(20.0, 10.0, 2.2), CameraLens::default());
        let vp = camera.view_projection(PhysicalSize::new(1280, 720));
        assert!(!vp.to_cols_array().iter().any(|v| v.is_nan() || v.is_infinite()));
    }

    #[test]
    fn target_projects_to_screen_center() {
        let camera = Camera3D::new(Vec3::new(0.0, -5.0, 2.0), Vec3::ZERO, CameraLens::default());
        let clip = camera.view_projection(PhysicalSize::new(800, 600)) * camera.target.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!((camera.look_direction().length() - 1.0).abs() < 1e-5);
    }
}
