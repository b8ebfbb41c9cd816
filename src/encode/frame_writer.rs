use std::{
    fs::OpenOptions,
    io::{Cursor, Write as _},
    path::{Path, PathBuf},
};

use image::{ImageEncoder as _, RgbImage, RgbaImage, buffer::ConvertBuffer as _};

use crate::config::FrameFormat;
use crate::encode::sink::FrameSink;
use crate::foundation::core::{FrameIndex, FrameRange};
use crate::foundation::error::{FolioError, FolioResult};

/// Minimum zero-padded width of a frame file name.
pub const FRAME_NAME_WIDTH: usize = 5;

/// File name for frame `idx`: zero-padded to at least five digits, never truncated.
pub fn frame_name(idx: FrameIndex, format: FrameFormat) -> String {
    format!(
        "{:0width$}.{}",
        idx.0,
        format.extension(),
        width = FRAME_NAME_WIDTH
    )
}

/// `printf`-style input pattern matching [`frame_name`], as consumed by ffmpeg's image2 demuxer.
pub fn frame_pattern(format: FrameFormat) -> String {
    format!("%0{FRAME_NAME_WIDTH}d.{}", format.extension())
}

/// Writes frames into one directory using [`frame_name`].
///
/// Never overwrites: an existing file with the derived name is reported as a collision.
#[derive(Clone, Debug)]
pub struct FrameWriter {
    dir: PathBuf,
    format: FrameFormat,
}

impl FrameWriter {
    /// Writer into an existing directory.
    pub fn new(dir: impl Into<PathBuf>, format: FrameFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
        }
    }

    /// Target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Frame file encoding.
    pub fn format(&self) -> FrameFormat {
        self.format
    }

    /// Full path for frame `idx`.
    pub fn path_for(&self, idx: FrameIndex) -> PathBuf {
        self.dir.join(frame_name(idx, self.format))
    }

    /// Encode `frame` in the configured file format.
    pub fn encode(&self, idx: FrameIndex, frame: &RgbaImage) -> FolioResult<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        let (w, h) = frame.dimensions();
        let res = match self.format {
            FrameFormat::Jpg => {
                // JPEG has no alpha channel.
                let rgb: RgbImage = frame.convert();
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, 100).write_image(
                    rgb.as_raw(),
                    w,
                    h,
                    image::ExtendedColorType::Rgb8,
                )
            }
            FrameFormat::Png => image::codecs::png::PngEncoder::new(&mut out).write_image(
                frame.as_raw(),
                w,
                h,
                image::ExtendedColorType::Rgba8,
            ),
        };
        res.map_err(|e| FolioError::frame_write(idx.0, format!("encode failed: {e}")))?;
        Ok(out.into_inner())
    }

    /// Write already-encoded bytes for frame `idx`.
    pub fn persist(&self, idx: FrameIndex, bytes: &[u8]) -> FolioResult<()> {
        let path = self.path_for(idx);
        let mut f = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                let msg = if e.kind() == std::io::ErrorKind::AlreadyExists {
                    format!("name collision: '{}' already exists", path.display())
                } else {
                    format!("create '{}': {e}", path.display())
                };
                FolioError::frame_write(idx.0, msg)
            })?;
        f.write_all(bytes)
            .map_err(|e| FolioError::frame_write(idx.0, format!("write '{}': {e}", path.display())))
    }
}

impl FrameSink for FrameWriter {
    fn write_frame(&self, idx: FrameIndex, frame: &RgbaImage) -> FolioResult<()> {
        let bytes = self.encode(idx, frame)?;
        self.persist(idx, &bytes)
    }

    fn write_held(&self, range: FrameRange, frame: &RgbaImage) -> FolioResult<u64> {
        if range.is_empty() {
            return Ok(0);
        }
        let bytes = self.encode(range.start, frame)?;
        for idx in range.iter() {
            self.persist(idx, &bytes)?;
        }
        Ok(1)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/frame_writer.rs"]
mod tests;
