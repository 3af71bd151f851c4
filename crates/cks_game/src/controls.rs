use cks_core::input::{Action, InputState};
use cks_render::FlyCamera;
use glam::Vec3;

use crate::config::CameraSettings;

/// Place the camera at its configured starting pose.
pub fn reset_camera(camera: &mut FlyCamera, settings: &CameraSettings) {
    camera.position = settings.start_position();
    camera.yaw = settings.start_yaw;
    camera.pitch = settings.start_pitch;
}

/// Integrate held movement and look actions over `dt` seconds.
///
/// Movement is along world axes, so "forward" is always -Z regardless of yaw.
pub fn update_camera(
    camera: &mut FlyCamera,
    input: &InputState,
    settings: &CameraSettings,
    dt: f32,
) {
    let mut move_step = settings.move_speed * dt;
    if input.is_held(Action::SpeedModifier) {
        move_step *= settings.speed_multiplier;
    }
    let look_step = settings.look_speed * dt;

    let delta = Vec3::new(
        input.axis(Action::MoveLeft, Action::MoveRight),
        input.axis(Action::MoveDown, Action::MoveUp),
        input.axis(Action::MoveForward, Action::MoveBack),
    ) * move_step;
    if delta != Vec3::ZERO {
        camera.translate(delta);
    }

    let d_yaw = input.axis(Action::LookLeft, Action::LookRight) * look_step;
    let d_pitch = input.axis(Action::LookUp, Action::LookDown) * look_step;
    if d_yaw != 0.0 || d_pitch != 0.0 {
        camera.turn(d_yaw, d_pitch);
    }
}
