// rdepth-pipeline/src/config.rs

use crate::controls::ToggleSnapshot;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for a preview session.
///
/// All fields default, so a partial JSON file (or none at all) works.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Capture resolution requested from the source.
    pub capture_width: u32,
    pub capture_height: u32,
    /// Capture frame rate.
    pub fps: u32,
    /// Initial drawable size of the render surface.
    pub drawable_width: u32,
    pub drawable_height: u32,
    /// Initial state of the per-frame depth toggles.
    pub use_disparity: bool,
    pub equalize: bool,
    /// Initial state of the source-side smoothing filter.
    pub depth_filter: bool,
    /// Where captured stills land.
    pub capture_dir: PathBuf,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            capture_width: 640,
            capture_height: 480,
            fps: 30,
            drawable_width: 640,
            drawable_height: 480,
            use_disparity: false,
            equalize: false,
            depth_filter: true,
            capture_dir: PathBuf::from("./captures"),
        }
    }
}

impl PreviewConfig {
    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn initial_toggles(&self) -> ToggleSnapshot {
        ToggleSnapshot {
            use_disparity: self.use_disparity,
            equalize: self.equalize,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_json_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "fps": 15, "use_disparity": true }}"#).unwrap();

        let cfg = PreviewConfig::load(file.path()).unwrap();
        assert_eq!(cfg.fps, 15);
        assert!(cfg.use_disparity);
        assert_eq!(cfg.capture_width, 640);
        assert!(cfg.initial_toggles().use_disparity);
        assert!(!cfg.initial_toggles().equalize);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(PreviewConfig::load("/definitely/not/here.json").is_err());
    }
}
