//! Immutable render configuration.
//!
//! An [`AnimationConfig`] is built once (from CLI flags or a JSON file), validated, and then passed
//! by value into every component. Nothing in the crate reads ambient state.

use std::{fs::File, io::BufReader, path::Path, str::FromStr};

use anyhow::Context as _;

use crate::foundation::core::{Resolution, Rgba8};
use crate::foundation::error::{FolioError, FolioResult};

/// Upper bound on the frames of one render, about 92 hours at 30 fps.
pub const MAX_FRAMES: u64 = 10_000_000;

/// How pages are animated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationStyle {
    /// Stack all pages into one tall canvas and slide the viewport over it.
    Scroll,
    /// Hold each page for a fixed number of frames.
    Sequence,
}

impl FromStr for AnimationStyle {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scroll" => Ok(Self::Scroll),
            "sequence" => Ok(Self::Sequence),
            other => Err(FolioError::config(format!(
                "invalid animation style '{other}' (expected 'scroll' or 'sequence')"
            ))),
        }
    }
}

impl std::fmt::Display for AnimationStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Scroll => "scroll",
            Self::Sequence => "sequence",
        })
    }
}

/// On-disk encoding of individual frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    /// Baseline JPEG at quality 100.
    #[default]
    Jpg,
    /// Lossless PNG.
    Png,
}

impl FrameFormat {
    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
        }
    }
}

impl FromStr for FrameFormat {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpg),
            "png" => Ok(Self::Png),
            other => Err(FolioError::config(format!(
                "invalid frame format '{other}' (expected 'jpg' or 'png')"
            ))),
        }
    }
}

fn default_fps() -> u32 {
    30
}

fn default_seconds_per_page() -> f64 {
    6.0
}

/// Render configuration shared by every stage of a pass.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnimationConfig {
    /// Output resolution; also the viewport size.
    #[serde(default)]
    pub resolution: Resolution,
    /// Output frames per second.
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// How long each page is on screen, in seconds.
    #[serde(default = "default_seconds_per_page")]
    pub seconds_per_page: f64,
    /// Animation style. Required: there is no sensible default.
    pub style: AnimationStyle,
    /// Frame file encoding.
    #[serde(default)]
    pub frame_format: FrameFormat,
    /// Colour used wherever no page content is visible.
    #[serde(default)]
    pub background: Rgba8,
}

impl AnimationConfig {
    /// Defaults for everything except the required `style`.
    pub fn new(style: AnimationStyle) -> Self {
        Self {
            resolution: Resolution::default(),
            fps: default_fps(),
            seconds_per_page: default_seconds_per_page(),
            style,
            frame_format: FrameFormat::default(),
            background: Rgba8::default(),
        }
    }

    /// Load a config from a JSON file and validate it.
    pub fn from_path(path: &Path) -> FolioResult<Self> {
        let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| FolioError::config(format!("parse '{}': {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check every field; called before any rendering starts.
    pub fn validate(&self) -> FolioResult<()> {
        self.resolution.validate()?;
        if self.fps == 0 {
            return Err(FolioError::config("fps must be > 0"));
        }
        if !self.seconds_per_page.is_finite() || self.seconds_per_page <= 0.0 {
            return Err(FolioError::config(format!(
                "seconds-per-page must be a positive number, got {}",
                self.seconds_per_page
            )));
        }
        Ok(())
    }

    /// Frames each page occupies in sequence mode: `round(fps * seconds_per_page)`.
    pub fn hold_frames(&self) -> FolioResult<u64> {
        let hold = (f64::from(self.fps) * self.seconds_per_page).round();
        if hold < 1.0 {
            return Err(FolioError::config(format!(
                "{} fps x {}s per page rounds to zero frames",
                self.fps, self.seconds_per_page
            )));
        }
        if hold > MAX_FRAMES as f64 {
            return Err(FolioError::config(format!(
                "{} fps x {}s per page needs more than {MAX_FRAMES} frames per page",
                self.fps, self.seconds_per_page
            )));
        }
        Ok(hold as u64)
    }

    /// Frames for `pages` held pages, bounded by [`MAX_FRAMES`].
    pub fn sequence_frame_total(&self, pages: usize) -> FolioResult<u64> {
        let hold = self.hold_frames()?;
        u64::try_from(pages)
            .ok()
            .and_then(|n| n.checked_mul(hold))
            .filter(|total| *total <= MAX_FRAMES)
            .ok_or_else(|| {
                FolioError::config(format!(
                    "{pages} pages x {hold} frames each exceeds {MAX_FRAMES} frames"
                ))
            })
    }

    /// Target frame count for a scroll over `pages` pages: `round(fps * seconds_per_page * pages)`.
    pub fn scroll_frame_target(&self, pages: usize) -> FolioResult<u64> {
        let target = (f64::from(self.fps) * self.seconds_per_page * pages as f64).round();
        if target < 1.0 {
            return Err(FolioError::config(format!(
                "{} fps x {}s per page x {pages} pages rounds to zero frames",
                self.fps, self.seconds_per_page
            )));
        }
        if target > MAX_FRAMES as f64 {
            return Err(FolioError::config(format!(
                "{} fps x {}s per page x {pages} pages exceeds {MAX_FRAMES} frames",
                self.fps, self.seconds_per_page
            )));
        }
        Ok(target as u64)
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
