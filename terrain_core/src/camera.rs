//! Orbit camera: a distance from a target point plus two angles in degrees.
//! The five scalars are the only state; eye position and matrices are
//! recomputed on every call.

use glam::{Mat4, Vec3};

use crate::config::CameraSettings;

/// Pitch limit in degrees; keeps the eye off the poles.
pub const MAX_PITCH: f32 = 89.0;

/// Values the camera returns to on `reset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub distance: f32,
    pub rotation_x: f32,
    pub rotation_y: f32,
    pub target_x: f32,
    pub target_y: f32,
}

impl CameraPose {
    /// Startup pose from configuration.
    pub fn initial(settings: &CameraSettings) -> Self {
        Self {
            distance: settings.distance,
            rotation_x: settings.rotation_x,
            rotation_y: settings.rotation_y,
            target_x: 0.0,
            target_y: 0.0,
        }
    }

    /// Pose used once terrain has been loaded: pulled back further, same angles.
    pub fn loaded(settings: &CameraSettings) -> Self {
        Self {
            distance: settings.loaded_distance,
            ..Self::initial(settings)
        }
    }
}

/// Perspective parameters for the projection matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl From<&CameraSettings> for Projection {
    fn from(settings: &CameraSettings) -> Self {
        Self {
            fov_y_degrees: settings.fov_y_degrees,
            near: settings.near,
            far: settings.far,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub distance: f32,
    pub rotation_x: f32,
    pub rotation_y: f32,
    pub target_x: f32,
    pub target_y: f32,
    min_distance: f32,
    max_distance: f32,
    home: CameraPose,
    projection: Projection,
}

impl OrbitCamera {
    pub fn new(settings: &CameraSettings) -> Self {
        let home = CameraPose::initial(settings);
        let mut camera = Self {
            distance: home.distance,
            rotation_x: home.rotation_x,
            rotation_y: home.rotation_y,
            target_x: home.target_x,
            target_y: home.target_y,
            min_distance: settings.min_distance,
            max_distance: settings.max_distance,
            home,
            projection: Projection::from(settings),
        };
        camera.reset();
        camera
    }

    pub fn distance_bounds(&self) -> (f32, f32) {
        (self.min_distance, self.max_distance)
    }

    pub fn home(&self) -> CameraPose {
        self.home
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose {
            distance: self.distance,
            rotation_x: self.rotation_x,
            rotation_y: self.rotation_y,
            target_x: self.target_x,
            target_y: self.target_y,
        }
    }

    /// Return to the startup pose. Loading terrain never changes it.
    pub fn reset(&mut self) {
        self.move_to(self.home);
    }

    /// Jump to `pose`, clamped to the camera limits. `reset` still returns
    /// to the startup pose afterwards.
    pub fn move_to(&mut self, pose: CameraPose) {
        self.distance = pose.distance.clamp(self.min_distance, self.max_distance);
        self.rotation_x = pose.rotation_x.clamp(-MAX_PITCH, MAX_PITCH);
        self.rotation_y = pose.rotation_y;
        self.target_x = pose.target_x;
        self.target_y = pose.target_y;
    }

    /// Yaw by `dx * sensitivity`, pitch by `dy * sensitivity`; pitch clamps
    /// to `[-89, 89]`, yaw is left to wrap through the trig functions.
    pub fn rotate(&mut self, dx: f32, dy: f32, sensitivity: f32) {
        let yaw = self.rotation_y + dx * sensitivity;
        let pitch = self.rotation_x + dy * sensitivity;
        if yaw.is_finite() {
            self.rotation_y = yaw;
        }
        if !pitch.is_nan() {
            self.rotation_x = pitch.clamp(-MAX_PITCH, MAX_PITCH);
        }
    }

    pub fn pan(&mut self, dx: f32, dy: f32, speed: f32) {
        let x = self.target_x - dx * speed;
        let y = self.target_y + dy * speed;
        if x.is_finite() && y.is_finite() {
            self.target_x = x;
            self.target_y = y;
        }
    }

    pub fn zoom(&mut self, wheel_delta: f32, speed: f32) {
        let distance = self.distance - wheel_delta * speed;
        if !distance.is_nan() {
            self.distance = distance.clamp(self.min_distance, self.max_distance);
        }
    }

    pub fn eye_position(&self) -> Vec3 {
        let pitch = self.rotation_x.to_radians();
        let yaw = self.rotation_y.to_radians();
        Vec3::new(
            self.distance * yaw.cos() * pitch.cos() + self.target_x,
            self.distance * pitch.sin() + self.target_y,
            self.distance * yaw.sin() * pitch.cos(),
        )
    }

    /// Point the camera looks at.
    pub fn look_at(&self) -> Vec3 {
        Vec3::new(self.target_x, self.target_y, 0.0)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye_position(), self.look_at(), Vec3::Y)
    }

    /// Perspective for a `width x height` frame; a zero height counts as 1.
    pub fn projection_matrix(&self, width: u32, height: u32) -> Mat4 {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        Mat4::perspective_rh(
            self.projection.fov_y_degrees.to_radians(),
            aspect,
            self.projection.near,
            self.projection.far,
        )
    }

    pub fn view_projection(&self, width: u32, height: u32) -> Mat4 {
        self.projection_matrix(width, height) * self.view_matrix()
    }
}
