//! Scene lights as seen by the passes
//!
//! The first light of a scene is its primary light: the shadow pass renders
//! from its point of view and the geometry pass shades with it.

use crate::foundation::math::{Vec3, Vec4};

/// Light type enumeration
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightType {
    /// Infinitely distant light shining along `direction`
    Directional {
        /// Direction the light travels in (from light to scene)
        direction: Vec3,
    },
    /// Omnidirectional light at `position`
    Point {
        /// World position
        position: Vec3,
        /// Attenuation range, also the shadow far plane
        range: f32,
    },
}

/// A light source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    /// Light type and placement
    pub light_type: LightType,
    /// Linear RGB color
    pub color: Vec3,
    /// Intensity multiplier
    pub intensity: f32,
}

impl Light {
    /// Create a directional light
    pub fn directional(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            light_type: LightType::Directional { direction: direction.normalize() },
            color,
            intensity,
        }
    }

    /// Create a point light
    pub fn point(position: Vec3, range: f32, color: Vec3, intensity: f32) -> Self {
        Self {
            light_type: LightType::Point { position, range },
            color,
            intensity,
        }
    }

    /// Position for point lights, `None` for directional ones
    pub fn position(&self) -> Option<Vec3> {
        match self.light_type {
            LightType::Point { position, .. } => Some(position),
            LightType::Directional { .. } => None,
        }
    }

    /// Shader-facing vector: xyz = direction (w = 0) or position (w = 1)
    pub fn shader_vector(&self) -> Vec4 {
        match self.light_type {
            LightType::Directional { direction } => Vec4::new(direction.x, direction.y, direction.z, 0.0),
            LightType::Point { position, .. } => Vec4::new(position.x, position.y, position.z, 1.0),
        }
    }

    /// Premultiplied color (rgb * intensity, a = 1)
    pub fn radiance(&self) -> [f32; 4] {
        let c = self.color * self.intensity;
        [c.x, c.y, c.z, 1.0]
    }
}
