//! Build configuration.

use serde::{Deserialize, Serialize};
use wray_math::{vector, Camera, DVec3};

/// Look-from point of the default viewer.
pub const DEFAULT_LOOK_FROM: DVec3 = DVec3::new(0.0, 3.5, 7.0);

/// Look-at point of the default viewer.
pub const DEFAULT_LOOK_AT: DVec3 = DVec3::ZERO;

/// Parameters of a single BVH build.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Triangles whose geometric normal has a strictly positive dot product
    /// with this vector are culled at build time.
    pub view_direction: DVec3,
}

impl BuildConfig {
    /// A zero view direction never yields a positive dot product.
    pub const NO_CULLING: BuildConfig = BuildConfig {
        view_direction: DVec3::ZERO,
    };

    pub fn new(view_direction: DVec3) -> Self {
        Self { view_direction }
    }

    /// Cull relative to a viewer at `look_from` looking at `look_at`.
    pub fn from_look_at(look_from: DVec3, look_at: DVec3) -> Self {
        Self::new(vector::sub(look_at, look_from))
    }

    pub fn from_camera(camera: &Camera) -> Self {
        Self::new(camera.view_direction())
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::from_look_at(DEFAULT_LOOK_FROM, DEFAULT_LOOK_AT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_view_direction() {
        let config = BuildConfig::default();
        assert_eq!(config.view_direction, DVec3::new(0.0, -3.5, -7.0));
    }

    #[test]
    fn test_from_camera_matches_look_at() {
        let camera = Camera::default();
        assert_eq!(
            BuildConfig::from_camera(&camera),
            BuildConfig::from_look_at(camera.look_from, camera.look_at)
        );
    }

    #[test]
    fn test_deserialize_partial_json_uses_defaults() {
        let config: BuildConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, BuildConfig::default());

        let config: BuildConfig =
            serde_json::from_str(r#"{ "view_direction": [0.0, 0.0, -1.0] }"#).unwrap();
        assert_eq!(config.view_direction, DVec3::NEG_Z);
    }
}
