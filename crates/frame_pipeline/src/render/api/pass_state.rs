//! Fixed-function state applied at pass entry
//!
//! Every pass declares the complete state it needs as one value. The
//! orchestrator applies it before `execute` and restores
//! [`PassState::default`] afterwards, so no toggle survives into the next pass.

use serde::{Deserialize, Serialize};

/// Depth comparison used by a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthTest {
    /// No depth testing
    Disabled,
    /// Pass when closer
    #[default]
    Less,
    /// Pass when closer or equal (skybox at the far plane)
    LessEqual,
}

/// Blending modes for different rendering effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Blending disabled
    #[default]
    Opaque,
    /// Standard alpha blending
    Alpha,
    /// Additive blending for particles and glows
    Additive,
}

/// Face culling modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullMode {
    /// No culling
    None,
    /// Cull front faces
    Front,
    /// Cull back faces
    #[default]
    Back,
}

/// Constant plus slope-scaled depth bias
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthBias {
    /// Constant depth bias factor
    pub constant: f32,
    /// Slope-scaled depth bias factor
    pub slope: f32,
}

impl Default for DepthBias {
    fn default() -> Self {
        Self { constant: 2.0, slope: 4.0 }
    }
}

/// Complete fixed-function state of one pass
///
/// The default is the neutral state restored between passes: nothing is written.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PassState {
    /// Depth comparison
    pub depth_test: DepthTest,
    /// Write to the depth attachment
    pub depth_write: bool,
    /// Color blending
    pub blend: BlendMode,
    /// Face culling
    pub cull: CullMode,
    /// Polygon offset, if any
    pub depth_bias: Option<DepthBias>,
    /// Write to color attachments
    pub color_write: bool,
}

impl PassState {
    /// Opaque geometry: depth test and write, back-face culling
    pub fn opaque() -> Self {
        Self {
            depth_test: DepthTest::Less,
            depth_write: true,
            blend: BlendMode::Opaque,
            cull: CullMode::Back,
            depth_bias: None,
            color_write: true,
        }
    }

    /// Depth-only rendering with front faces culled and the given bias
    pub fn shadow_depth(bias: DepthBias) -> Self {
        Self {
            depth_test: DepthTest::Less,
            depth_write: true,
            blend: BlendMode::Opaque,
            cull: CullMode::Front,
            depth_bias: Some(bias),
            color_write: false,
        }
    }

    /// Fullscreen or overlay drawing with no depth interaction
    pub fn overlay(blend: BlendMode) -> Self {
        Self {
            depth_test: DepthTest::Disabled,
            depth_write: false,
            blend,
            cull: CullMode::None,
            depth_bias: None,
            color_write: true,
        }
    }

    /// Depth-tested but read-only drawing (transparent or additive geometry)
    pub fn depth_read_only(blend: BlendMode, depth_test: DepthTest) -> Self {
        Self {
            depth_test,
            depth_write: false,
            blend,
            cull: CullMode::None,
            depth_bias: None,
            color_write: true,
        }
    }
}
