/// Camera: the scene's point of view.
///
/// Owned by the `Scene`. The camera derives its view and projection from
/// a position, a yaw/pitch look direction and perspective parameters,
/// and tracks the window size for its aspect ratio and viewport.
///
/// Depth conventions follow the device: a zero-to-one depth range uses
/// reverse Z (near maps to 1, far to 0), matching the depth clear value
/// chosen by the scene.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use crate::device::{Viewport, Rect2D};
use super::frustum::Frustum;

/// Uniform block written to the scene context's camera buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraInfo {
    pub position: [f32; 3],
    pub near_distance: f32,
    pub look_direction: [f32; 3],
    pub far_distance: f32,
}

#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    yaw: f32,
    pitch: f32,
    fov_y: f32,
    near_distance: f32,
    far_distance: f32,
    width: u32,
    height: u32,
    reverse_depth: bool,
}

impl Camera {
    /// Camera at (0, 3, 0) looking down -Z, 60 degree vertical FOV.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: Vec3::new(0.0, 3.0, 0.0),
            yaw: 0.0,
            pitch: 0.0,
            fov_y: std::f32::consts::FRAC_PI_3,
            near_distance: 1.0,
            far_distance: 1000.0,
            width: width.max(1),
            height: height.max(1),
            reverse_depth: true,
        }
    }

    // ===== GETTERS =====

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn near_distance(&self) -> f32 {
        self.near_distance
    }

    pub fn far_distance(&self) -> f32 {
        self.far_distance
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Unit look direction from yaw (around +Y) and pitch.
    pub fn look_direction(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        Vec3::new(-sin_yaw * cos_pitch, sin_pitch, -cos_yaw * cos_pitch).normalize()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.look_direction(), Vec3::Y)
    }

    /// Perspective projection; near/far swapped when reverse depth is on.
    pub fn projection_matrix(&self) -> Mat4 {
        if self.reverse_depth {
            Mat4::perspective_rh(self.fov_y, self.aspect_ratio(), self.far_distance, self.near_distance)
        } else {
            Mat4::perspective_rh(self.fov_y, self.aspect_ratio(), self.near_distance, self.far_distance)
        }
    }

    /// Combined view-projection matrix (projection * view).
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Culling frustum for the current view.
    pub fn frustum(&self) -> Frustum {
        Frustum::from_view_projection(&self.view_projection_matrix())
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::full(self.width, self.height)
    }

    pub fn scissor(&self) -> Rect2D {
        Rect2D::full(self.width, self.height)
    }

    pub fn camera_info(&self) -> CameraInfo {
        CameraInfo {
            position: self.position.to_array(),
            near_distance: self.near_distance,
            look_direction: self.look_direction().to_array(),
            far_distance: self.far_distance,
        }
    }

    // ===== SETTERS =====

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Set yaw and pitch; pitch is clamped just short of straight up/down.
    pub fn set_rotation(&mut self, yaw: f32, pitch: f32) {
        let limit = std::f32::consts::FRAC_PI_2 - 0.01;
        self.yaw = yaw;
        self.pitch = pitch.clamp(-limit, limit);
    }

    pub fn set_perspective(&mut self, fov_y: f32, near_distance: f32, far_distance: f32) {
        self.fov_y = fov_y;
        self.near_distance = near_distance;
        self.far_distance = far_distance;
    }

    /// Pick reverse Z to match the device's depth range.
    pub fn set_reverse_depth(&mut self, reverse_depth: bool) {
        self.reverse_depth = reverse_depth;
    }

    /// Update aspect ratio and viewport after a window resize.
    pub fn window_resized(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
