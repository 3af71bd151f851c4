use cks_core::AnimationTuning;
use glam::Vec3;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Startup tuning read from `assets/config/game.json`. Every field is optional
/// in the file; a missing file means all defaults.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct GameConfig {
    /// Board file to load and watch. `None` uses the built-in sample board.
    #[serde(default)]
    pub board_path: Option<String>,
    #[serde(default)]
    pub animation: AnimationSettings,
    #[serde(default)]
    pub pieces: PieceStyle,
    #[serde(default)]
    pub camera: CameraSettings,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct AnimationSettings {
    #[serde(default = "default_slide_rate")]
    pub slide_rate: f32,
    #[serde(default = "default_stop_threshold")]
    pub stop_threshold: f32,
}

/// Vertical scale of pieces at rest and while selected.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct PieceStyle {
    #[serde(default = "default_rest_scale")]
    pub rest_scale: f32,
    #[serde(default = "default_raised_scale")]
    pub raised_scale: f32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct CameraSettings {
    /// World units per second.
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
    /// Radians per second.
    #[serde(default = "default_look_speed")]
    pub look_speed: f32,
    /// Applied to movement while the speed modifier is held.
    #[serde(default = "default_speed_multiplier")]
    pub speed_multiplier: f32,
    #[serde(default = "default_start_position")]
    pub start_position: [f32; 3],
    #[serde(default)]
    pub start_yaw: f32,
    #[serde(default = "default_start_pitch")]
    pub start_pitch: f32,
}

impl GameConfig {
    pub fn tuning(&self) -> AnimationTuning {
        AnimationTuning {
            slide_rate: self.animation.slide_rate,
            stop_threshold: self.animation.stop_threshold,
        }
    }
}

impl CameraSettings {
    pub fn start_position(&self) -> Vec3 {
        Vec3::from_array(self.start_position)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_path: None,
            animation: AnimationSettings::default(),
            pieces: PieceStyle::default(),
            camera: CameraSettings::default(),
        }
    }
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            slide_rate: default_slide_rate(),
            stop_threshold: default_stop_threshold(),
        }
    }
}

impl Default for PieceStyle {
    fn default() -> Self {
        Self {
            rest_scale: default_rest_scale(),
            raised_scale: default_raised_scale(),
        }
    }
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            move_speed: default_move_speed(),
            look_speed: default_look_speed(),
            speed_multiplier: default_speed_multiplier(),
            start_position: default_start_position(),
            start_yaw: 0.0,
            start_pitch: default_start_pitch(),
        }
    }
}

pub fn load_config_from_path(path: &Path) -> Result<GameConfig, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let config: GameConfig = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse config JSON {}: {e}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Load the config if the file exists; otherwise fall back to defaults.
/// A file that exists but fails to parse or validate is still an error.
pub fn load_config_or_default(path: &Path) -> Result<GameConfig, String> {
    if !path.exists() {
        log::warn!(
            "Config '{}' not found, using defaults.",
            path.display()
        );
        return Ok(GameConfig::default());
    }
    load_config_from_path(path)
}

fn validate_config(config: &GameConfig) -> Result<(), String> {
    let anim = &config.animation;
    if !(anim.slide_rate > 0.0) {
        return Err("Config validation failed: animation.slide_rate must be > 0".to_string());
    }
    if !(anim.stop_threshold >= 0.0) {
        return Err("Config validation failed: animation.stop_threshold must be >= 0".to_string());
    }

    let pieces = &config.pieces;
    if !(pieces.rest_scale > 0.0) || !(pieces.raised_scale > 0.0) {
        return Err("Config validation failed: piece scales must be > 0".to_string());
    }
    if pieces.raised_scale == pieces.rest_scale {
        return Err(
            "Config validation failed: pieces.raised_scale must differ from rest_scale".to_string(),
        );
    }
    if pieces.raised_scale < pieces.rest_scale {
        log::warn!(
            "Raised scale {} is below rest scale {}; the selected piece will sink instead of rise.",
            pieces.raised_scale,
            pieces.rest_scale
        );
    }

    let camera = &config.camera;
    if camera.move_speed < 0.0 || camera.look_speed < 0.0 || camera.speed_multiplier < 0.0 {
        return Err("Config validation failed: camera speeds must be >= 0".to_string());
    }
    if config.board_path.as_deref() == Some("") {
        return Err("Config validation failed: board_path is empty".to_string());
    }
    Ok(())
}

const fn default_slide_rate() -> f32 {
    5.0
}

const fn default_stop_threshold() -> f32 {
    0.03
}

const fn default_rest_scale() -> f32 {
    1.0
}

const fn default_raised_scale() -> f32 {
    3.0
}

const fn default_move_speed() -> f32 {
    1.0
}

const fn default_look_speed() -> f32 {
    0.5
}

const fn default_speed_multiplier() -> f32 {
    5.0
}

const fn default_start_position() -> [f32; 3] {
    [0.0, 12.0, 16.0]
}

const fn default_start_pitch() -> f32 {
    0.65
}
