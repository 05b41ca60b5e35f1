//! Visual materials
//!
//! Materials live in the world's material arena and are referenced from
//! shapes by [`MaterialKey`](crate::MaterialKey).

use serde::{Deserialize, Serialize};

/// Surface appearance of a visual shape
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisualMaterial {
    /// Optional name (for diagnostics)
    #[serde(default)]
    pub name: Option<String>,
    /// Diffuse color as RGB (each component 0.0-1.0)
    pub diffuse: [f32; 3],
    /// Ambient color as RGB
    #[serde(default = "default_ambient")]
    pub ambient: [f32; 3],
    /// Optional diffuse texture path
    #[serde(default)]
    pub kd_texture: Option<String>,
    /// Opacity (1.0 = opaque)
    #[serde(default = "default_opacity")]
    pub opacity: f32,
}

fn default_ambient() -> [f32; 3] {
    [0.1, 0.1, 0.1]
}

fn default_opacity() -> f32 {
    1.0
}

impl Default for VisualMaterial {
    fn default() -> Self {
        Self::default_white()
    }
}

impl VisualMaterial {
    /// White diffuse with a dim ambient term, used when a shape has no material
    pub fn default_white() -> Self {
        Self::from_rgb(1.0, 1.0, 1.0)
    }

    /// Create an opaque material with the given diffuse color
    pub fn from_rgb(r: f32, g: f32, b: f32) -> Self {
        Self {
            name: None,
            diffuse: [r, g, b],
            ambient: default_ambient(),
            kd_texture: None,
            opacity: 1.0,
        }
    }

    /// Set the material name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach a diffuse texture
    pub fn with_kd_texture(mut self, path: impl Into<String>) -> Self {
        self.kd_texture = Some(path.into());
        self
    }

    /// Whether the diffuse texture is a cube texture (rendered as a dice)
    pub fn is_cube_texture(&self) -> bool {
        self.kd_texture
            .as_deref()
            .map(|t| t.contains("cubetexture"))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_white() {
        let m = VisualMaterial::default_white();
        assert_eq!(m.diffuse, [1.0, 1.0, 1.0]);
        assert_eq!(m.ambient, [0.1, 0.1, 0.1]);
        assert!(m.kd_texture.is_none());
    }

    #[test]
    fn test_cube_texture_detection() {
        let plain = VisualMaterial::from_rgb(0.5, 0.5, 0.5).with_kd_texture("textures/wood.png");
        let dice = VisualMaterial::default_white().with_kd_texture("textures/cubetexture_dice.png");

        assert!(!plain.is_cube_texture());
        assert!(dice.is_cube_texture());
        assert!(!VisualMaterial::default().is_cube_texture());
    }
}
