use glam::{Mat4, Vec3};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

/// Free-flying perspective camera. Movement is along world axes; yaw and pitch
/// turn the world around the eye rather than the eye through the world.
pub struct FlyCamera {
    pub position: Vec3,
    /// Horizontal view angle in radians (rotation about +Y).
    pub yaw: f32,
    /// Vertical view angle in radians (rotation about +X).
    pub pitch: f32,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub viewport: (u32, u32),
}

impl FlyCamera {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 50.0),
            yaw: 0.0,
            pitch: 0.0,
            fov_y: 55f32.to_radians(),
            near: 0.1,
            far: 100.0,
            viewport: (viewport_width, viewport_height),
        }
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    pub fn turn(&mut self, d_yaw: f32, d_pitch: f32) {
        self.yaw += d_yaw;
        self.pitch += d_pitch;
    }

    pub fn view(&self) -> Mat4 {
        Mat4::from_rotation_x(self.pitch)
            * Mat4::from_rotation_y(self.yaw)
            * Mat4::from_translation(-self.position)
    }

    pub fn projection(&self) -> Mat4 {
        let aspect = cks_platform::window::aspect_ratio(self.viewport.0, self.viewport.1);
        Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far)
    }

    pub fn build_uniform(&self) -> CameraUniform {
        CameraUniform {
            view_proj: (self.projection() * self.view()).to_cols_array_2d(),
        }
    }
}
