use std::path::Path;

use anyhow::Context as _;

use crate::{
    core::Canvas,
    error::{PoseoverError, PoseoverResult},
};

/// Tunable coefficients of the rule solver. Process-lifetime constants for one
/// run.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RuleParams {
    pub scale_base: f64,
    pub scale_per_bbox: f64,
    pub rot_gain_yaw: f64,
    pub rot_gain_roll: f64,
    pub transl_gain: f64,
}

impl Default for RuleParams {
    fn default() -> Self {
        Self {
            scale_base: 1.0,
            scale_per_bbox: 0.80,
            rot_gain_yaw: 0.9,
            rot_gain_roll: 1.0,
            transl_gain: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SyncParams {
    /// Output frame rate, and the rate used to synthesize timestamps for
    /// records that carry none.
    pub demo_fps: u32,
    /// When set, the background is seeked to the frame index matching each
    /// record's timestamp instead of being played sequentially.
    pub strict_bg_sync: bool,
    pub bg_fps: f64,
    pub bg_start_ms: i64,
}

impl Default for SyncParams {
    fn default() -> Self {
        Self {
            demo_fps: 25,
            strict_bg_sync: true,
            bg_fps: 25.0,
            bg_start_ms: 0,
        }
    }
}

impl SyncParams {
    pub fn validate(&self) -> PoseoverResult<()> {
        if self.demo_fps == 0 {
            return Err(PoseoverError::validation("sync demo_fps must be > 0"));
        }
        if !self.bg_fps.is_finite() || self.bg_fps <= 0.0 {
            return Err(PoseoverError::validation("sync bg_fps must be > 0"));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BlendParams {
    /// Feather radius in pixels; the blur kernel is `2*feather_px+1` wide.
    pub feather_px: u32,
    /// Global multiplier on the sprite's alpha, clamped to [0,1] after
    /// application.
    pub alpha_bias: f64,
    pub color_match: bool,
    /// 0 = no change, 1 = full statistical match against the background.
    pub color_match_strength: f64,
}

impl Default for BlendParams {
    fn default() -> Self {
        Self {
            feather_px: 5,
            alpha_bias: 1.0,
            color_match: true,
            color_match_strength: 0.5,
        }
    }
}

impl BlendParams {
    pub fn validate(&self) -> PoseoverResult<()> {
        if !self.alpha_bias.is_finite() || self.alpha_bias < 0.0 {
            return Err(PoseoverError::validation("blend alpha_bias must be >= 0"));
        }
        if !(0.0..=1.0).contains(&self.color_match_strength) {
            return Err(PoseoverError::validation(
                "blend color_match_strength must be within [0,1]",
            ));
        }
        Ok(())
    }
}

/// Fully resolved run parameters. The CLI merges a JSON file of this shape
/// with flag overrides; the core only ever sees the resolved struct.
#[derive(Clone, Copy, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    pub canvas: Canvas,
    pub sync: SyncParams,
    pub rule: RuleParams,
    pub blend: BlendParams,
}

impl ComposeConfig {
    pub fn validate(&self) -> PoseoverResult<()> {
        self.canvas.validate()?;
        self.sync.validate()?;
        self.blend.validate()?;
        Ok(())
    }

    pub fn load(path: &Path) -> PoseoverResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))
            .map_err(|e| PoseoverError::resource(format!("{e:#}")))?;
        let cfg: Self = serde_json::from_str(&text)
            .map_err(|e| PoseoverError::config(format!("parse config '{}': {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
