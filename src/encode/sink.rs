use std::{collections::BTreeMap, sync::Mutex};

use image::RgbaImage;

use crate::foundation::core::{FrameIndex, FrameRange};
use crate::foundation::error::{FolioError, FolioResult};

/// Destination for generated frames.
///
/// Frames may arrive from several workers at once and in any order; each index is delivered
/// exactly once. Ordering is re-established by the index alone.
pub trait FrameSink: Send + Sync {
    /// Persist one frame.
    fn write_frame(&self, idx: FrameIndex, frame: &RgbaImage) -> FolioResult<()>;

    /// Persist the same frame under every index in `range` (a held page).
    ///
    /// Returns the number of times the frame was actually encoded; sinks that can reuse one
    /// encoding for the whole range return 1.
    fn write_held(&self, range: FrameRange, frame: &RgbaImage) -> FolioResult<u64> {
        for idx in range.iter() {
            self.write_frame(idx, frame)?;
        }
        Ok(range.len_frames())
    }
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    frames: Mutex<BTreeMap<FrameIndex, RgbaImage>>,
}

impl InMemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the captured frames, ordered by index.
    pub fn into_frames(self) -> Vec<(FrameIndex, RgbaImage)> {
        self.frames
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .into_iter()
            .collect()
    }

    /// Number of frames captured so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// `true` when nothing has been captured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<FrameIndex, RgbaImage>> {
        self.frames
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FrameSink for InMemorySink {
    fn write_frame(&self, idx: FrameIndex, frame: &RgbaImage) -> FolioResult<()> {
        let mut frames = self.lock();
        if frames.contains_key(&idx) {
            return Err(FolioError::frame_write(idx.0, "frame delivered twice"));
        }
        frames.insert(idx, frame.clone());
        Ok(())
    }
}
