//! Render settings file (RON) merged under the command-line flags.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Maximum trace recursion depth.
    pub depth: u32,
    /// Output image path; the extension selects the format.
    pub output: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            depth: tracer::DEFAULT_TRACE_DEPTH,
            output: "render.bmp".to_string(),
        }
    }
}

impl RenderSettings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(ron::from_str(&text)?)
    }
}
