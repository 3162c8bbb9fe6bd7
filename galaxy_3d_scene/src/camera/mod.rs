//! Camera module: the scene camera and frustum culling volumes.

mod camera;
mod frustum;

pub use camera::{Camera, CameraInfo};
pub use frustum::{
    Frustum, FrustumTest,
    PLANE_LEFT, PLANE_RIGHT, PLANE_BOTTOM, PLANE_TOP, PLANE_NEAR, PLANE_FAR,
};
