use std::{
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
    time::Duration,
};

use crate::config::FrameFormat;
use crate::encode::frame_writer::frame_pattern;
use crate::foundation::core::{Resolution, Rgba8};
use crate::foundation::error::{FolioError, FolioResult};
use crate::tools::executor::{ToolCommand, ToolExecutor};

/// Encoder binary name.
pub const FFMPEG: &str = "ffmpeg";

/// Output container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoFormat {
    /// MPEG-4 Part 14.
    #[default]
    Mp4,
    /// QuickTime.
    Mov,
    /// Audio Video Interleave.
    Avi,
    /// Matroska.
    Mkv,
}

impl VideoFormat {
    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mov => "mov",
            Self::Avi => "avi",
            Self::Mkv => "mkv",
        }
    }
}

impl FromStr for VideoFormat {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "mp4" => Ok(Self::Mp4),
            "mov" => Ok(Self::Mov),
            "avi" => Ok(Self::Avi),
            "mkv" => Ok(Self::Mkv),
            other => Err(FolioError::config(format!(
                "unsupported video format '{other}' (expected mp4, mov, avi or mkv)"
            ))),
        }
    }
}

/// Everything ffmpeg needs to turn a frames directory into a video.
#[derive(Clone, Debug)]
pub struct EncodeConfig {
    /// Directory holding `NNNNN.<ext>` frames.
    pub frames_dir: PathBuf,
    /// Extension of the frame files.
    pub frame_format: FrameFormat,
    /// Input and output frame rate.
    pub fps: u32,
    /// Output resolution. Smaller frames are centred on it, never stretched.
    pub resolution: Resolution,
    /// Fill around frames narrower or shorter than `resolution`.
    pub background: Rgba8,
    /// Output file.
    pub out_path: PathBuf,
    /// Output container.
    pub format: VideoFormat,
    /// Overwrite `out_path` if it already exists.
    pub overwrite: bool,
}

impl EncodeConfig {
    /// Reject settings ffmpeg would fail on.
    pub fn validate(&self) -> FolioResult<()> {
        self.resolution.validate()?;
        if self.fps == 0 {
            return Err(FolioError::config("encode fps must be non-zero"));
        }
        if !self.resolution.is_even() {
            // yuv420p output for maximum player compatibility.
            return Err(FolioError::config(format!(
                "encode resolution must be even (required for yuv420p output), got {}",
                self.resolution
            )));
        }
        Ok(())
    }

    /// Filter graph fitting every frame into `resolution` without changing its aspect.
    ///
    /// Held sequence pages are only as wide as their scaled height allows; they are centred on
    /// the background colour. Full-size scroll frames pass through unchanged.
    pub fn letterbox_filter(&self) -> String {
        let Resolution { width, height } = self.resolution;
        let Rgba8 { r, g, b, .. } = self.background;
        format!(
            "scale={width}:{height}:force_original_aspect_ratio=decrease,\
             pad={width}:{height}:(ow-iw)/2:(oh-ih)/2:color=0x{r:02x}{g:02x}{b:02x}"
        )
    }
}

/// Encodes a frames directory through the system `ffmpeg`.
#[derive(Clone)]
pub struct FfmpegEncoder {
    executor: Arc<dyn ToolExecutor>,
    timeout: Option<Duration>,
}

impl FfmpegEncoder {
    /// Encoder running `ffmpeg` through `executor`.
    pub fn new(executor: Arc<dyn ToolExecutor>, timeout: Option<Duration>) -> Self {
        Self { executor, timeout }
    }

    /// Build the image2 → video invocation.
    pub fn command(&self, cfg: &EncodeConfig) -> ToolCommand {
        ToolCommand::new(FFMPEG)
            .arg(if cfg.overwrite { "-y" } else { "-n" })
            .args(["-loglevel", "error", "-f", "image2", "-framerate"])
            .arg(cfg.fps.to_string())
            .arg("-i")
            .arg(cfg.frames_dir.join(frame_pattern(cfg.frame_format)))
            .arg("-vf")
            .arg(cfg.letterbox_filter())
            .args(["-pix_fmt", "yuv420p"])
            .arg(&cfg.out_path)
            .timeout(self.timeout)
    }

    /// Encode the frames described by `cfg`.
    #[tracing::instrument(skip(self, cfg), fields(out = %cfg.out_path.display()))]
    pub fn encode(&self, cfg: &EncodeConfig) -> FolioResult<()> {
        cfg.validate()?;
        if !cfg.overwrite && cfg.out_path.exists() {
            return Err(FolioError::config(format!(
                "output file '{}' already exists",
                cfg.out_path.display()
            )));
        }
        create_output_parent(&cfg.out_path)?;

        tracing::info!(format = cfg.format.extension(), fps = cfg.fps, "encoding video");
        self.executor.run(&self.command(cfg))?.check(FFMPEG)?;
        Ok(())
    }

    /// First line of `ffmpeg -version`; fails when the encoder cannot be run.
    pub fn version(&self) -> FolioResult<String> {
        let cmd = ToolCommand::new(FFMPEG).arg("-version").timeout(self.timeout);
        let out = self.executor.run(&cmd)?.check(FFMPEG)?;
        let stdout = String::from_utf8_lossy(&out.stdout);
        match stdout.lines().next().map(str::trim) {
            Some(line) if !line.is_empty() => Ok(line.to_string()),
            _ => Err(FolioError::tool(FFMPEG, "-version printed nothing")),
        }
    }
}

impl std::fmt::Debug for FfmpegEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegEncoder")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// First free variant of `path`, inserting `+` before the extension while the name is taken.
///
/// `doc.mp4` → `doc+.mp4` → `doc++.mp4` ...
pub fn unique_output_path(path: &Path) -> PathBuf {
    let mut candidate = path.to_path_buf();
    while candidate.exists() {
        let stem = candidate
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = match candidate.extension() {
            Some(ext) => format!("{stem}+.{}", ext.to_string_lossy()),
            None => format!("{stem}+"),
        };
        candidate.set_file_name(name);
    }
    candidate
}

// The encoder refuses to create directories itself.
fn create_output_parent(out: &Path) -> FolioResult<()> {
    let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    std::fs::create_dir_all(parent).map_err(|e| {
        FolioError::config(format!(
            "cannot create the directory for video '{}': {e}",
            out.display()
        ))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
