pub mod app;
pub mod camera3d;
pub mod cli;
pub mod config;
pub mod error;
pub mod framing;
pub mod input;
pub mod loader;
pub mod navigation;
pub mod orbit;
pub mod overlay;
pub mod scene;
pub mod time;
pub mod viewer;
pub mod walk;

pub use app::run;
pub use viewer::{Viewer, ViewerCommand};

pub(crate) fn wrap_angle(mut radians: f32) -> f32 {
    let two_pi = 2.0 * std::f32::consts::PI;
    while radians > std::f32::consts::PI {
        radians -= two_pi;
    }
    while radians < -std::f32::consts::PI {
        radians += two_pi;
    }
    radians
}
