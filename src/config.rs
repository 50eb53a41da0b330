//! Scene description: which assets to load, where the camera and light are and how to render.
//!
//! A scene starts from one of the built-in presets and can be replaced by a RON file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::color::{Color, WHITE};
use crate::error::ConfigError;
use crate::math::{Mat4, Vec3f};
use crate::shader::{InterpolationMode, Light, ShaderKind};
use crate::transform::{model_matrix, Camera};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub mesh_path: PathBuf,
    pub albedo_path: PathBuf,
    /// Multiplies every albedo texel.
    pub albedo_tint: Color,
    pub normal_path: Option<PathBuf>,
    pub specular_path: Option<PathBuf>,
    pub camera_position: [f32; 3],
    pub camera_target: [f32; 3],
    pub light_position: [f32; 3],
    pub light_color: [f32; 3],
    pub model_scale: f32,
    pub model_position: [f32; 3],
    /// Rotation of the model around the world up axis, in radians.
    pub model_yaw: f32,
    pub near_plane: f32,
    pub far_plane: f32,
    pub output_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub shader: ShaderKind,
    pub interpolation: InterpolationMode,
    pub cull_backfaces: bool,
    /// Run-length encode `.tga` output.
    pub rle: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        return ScenePreset::Head.config();
    }
}

impl SceneConfig {
    /// Reads a RON scene file. Fields missing from the file keep their default values.
    pub fn load(path: impl AsRef<Path>) -> Result<SceneConfig, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let config: SceneConfig = ron::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        config.validate()?;
        log::info!("scene loaded from {}", path.display());
        return Ok(config);
    }

    pub fn to_ron(&self) -> Result<String, ron::Error> {
        return ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default());
    }

    /// Rejects values the pipeline can't render with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "frame size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if !(self.near_plane > 0.0 && self.far_plane > self.near_plane) {
            return Err(ConfigError::Invalid(format!(
                "need 0 < near < far, got near {} and far {}",
                self.near_plane, self.far_plane
            )));
        }
        if !(self.model_scale.is_finite() && self.model_scale != 0.0) {
            return Err(ConfigError::Invalid(format!(
                "model scale must be finite and non-zero, got {}",
                self.model_scale
            )));
        }
        if self.camera_position == self.camera_target {
            return Err(ConfigError::Invalid(
                "camera position and target coincide".to_string(),
            ));
        }
        return Ok(());
    }

    pub fn camera(&self) -> Camera {
        return Camera {
            position: Vec3f::from(self.camera_position),
            target: Vec3f::from(self.camera_target),
            near: self.near_plane,
            far: self.far_plane,
        };
    }

    pub fn light(&self) -> Light {
        return Light {
            position: Vec3f::from(self.light_position),
            color: Vec3f::from(self.light_color),
        };
    }

    /// Object to world transform, with an extra yaw on top of the configured one.
    pub fn model_matrix(&self, extra_yaw: f32) -> Mat4 {
        return model_matrix(
            self.model_scale,
            Vec3f::from(self.model_position),
            self.model_yaw + extra_yaw,
        );
    }
}

/// Built-in scenes over the meshes shipped under `assets/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum ScenePreset {
    /// African head, per-pixel diffuse.
    Head,
    /// African head, posterized.
    HeadToon,
    /// African head with tangent space normal map and specular map.
    HeadNormalMapped,
    /// Diablo pose with tangent space normal map and specular map.
    Diablo,
}

impl ScenePreset {
    pub fn config(self) -> SceneConfig {
        let head = SceneConfig {
            mesh_path: PathBuf::from("assets/african_head/african_head.obj"),
            albedo_path: PathBuf::from("assets/african_head/african_head_diffuse.tga"),
            albedo_tint: WHITE,
            normal_path: None,
            specular_path: None,
            camera_position: [1.0, 1.0, 3.0],
            camera_target: [0.0, 0.0, 0.0],
            light_position: [1.0, 1.0, 5.0],
            light_color: [1.0, 1.0, 1.0],
            model_scale: 1.0,
            model_position: [0.0, 0.0, 0.0],
            model_yaw: 0.0,
            near_plane: 1.0,
            far_plane: 10.0,
            output_path: PathBuf::from("output.tga"),
            width: 800,
            height: 800,
            shader: ShaderKind::Lambert,
            interpolation: InterpolationMode::ScreenSpace,
            cull_backfaces: true,
            rle: true,
        };

        match self {
            ScenePreset::Head => head,
            ScenePreset::HeadToon => SceneConfig {
                shader: ShaderKind::Toon {
                    levels: 4,
                    tint: Color::rgb(255, 155, 0),
                },
                ..head
            },
            ScenePreset::HeadNormalMapped => SceneConfig {
                normal_path: Some(PathBuf::from("assets/african_head/african_head_nm_tangent.tga")),
                specular_path: Some(PathBuf::from("assets/african_head/african_head_spec.tga")),
                shader: ShaderKind::NormalMapped { shininess: 32.0 },
                interpolation: InterpolationMode::PerspectiveCorrect,
                ..head
            },
            ScenePreset::Diablo => SceneConfig {
                mesh_path: PathBuf::from("assets/diablo3_pose/diablo3_pose.obj"),
                albedo_path: PathBuf::from("assets/diablo3_pose/diablo3_pose_diffuse.tga"),
                normal_path: Some(PathBuf::from("assets/diablo3_pose/diablo3_pose_nm_tangent.tga")),
                specular_path: Some(PathBuf::from("assets/diablo3_pose/diablo3_pose_spec.tga")),
                camera_position: [0.0, 0.5, 3.0],
                light_position: [-2.0, 3.0, 4.0],
                shader: ShaderKind::NormalMapped { shininess: 24.0 },
                interpolation: InterpolationMode::PerspectiveCorrect,
                ..head
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::vector;

    #[test]
    fn presets_are_valid() {
        for preset in [
            ScenePreset::Head,
            ScenePreset::HeadToon,
            ScenePreset::HeadNormalMapped,
            ScenePreset::Diablo,
        ] {
            preset.config().validate().unwrap();
        }
    }

    #[test]
    fn ron_round_trip() {
        let config = ScenePreset::Diablo.config();
        let text = config.to_ron().unwrap();
        let back: SceneConfig = ron::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.ron");
        fs::write(
            &path,
            "(width: 320, height: 240, shader: Toon(levels: 2, tint: (r: 255, g: 0, b: 0, a: 255)))",
        )
        .unwrap();
        let config = SceneConfig::load(&path).unwrap();
        assert_eq!((config.width, config.height), (320, 240));
        assert!(matches!(config.shader, ShaderKind::Toon { levels: 2, .. }));
        assert_eq!(config.mesh_path, SceneConfig::default().mesh_path);
        assert_eq!(config.albedo_tint, WHITE);
    }

    #[test]
    fn invalid_values_are_reported() {
        let mut config = SceneConfig::default();
        config.near_plane = 5.0;
        config.far_plane = 1.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = SceneConfig {
            width: 0,
            ..SceneConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_and_malformed_files() {
        assert!(matches!(
            SceneConfig::load("no/such/scene.ron"),
            Err(ConfigError::Io { .. })
        ));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ron");
        fs::write(&path, "(width: \"wide\")").unwrap();
        assert!(matches!(SceneConfig::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn camera_and_light_from_arrays() {
        let config = SceneConfig::default();
        assert_eq!(config.camera().position, vector![1.0, 1.0, 3.0]);
        assert_eq!(config.light().color, Vec3f::repeat(1.0));
    }
}
