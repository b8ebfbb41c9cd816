use rayon::prelude::*;

use crate::config::AnimationConfig;
use crate::encode::sink::FrameSink;
use crate::foundation::core::{FrameIndex, FrameRange};
use crate::foundation::error::{FolioError, FolioResult};
use crate::pages::loader::PageSet;
use crate::render::RenderStats;
use crate::render::threading::{CancelToken, RenderThreading};

/// Holds each scaled page on screen for `round(fps * seconds_per_page)` frames.
#[derive(Clone, Debug)]
pub struct SequenceAnimator {
    cfg: AnimationConfig,
}

impl SequenceAnimator {
    /// Animator for one pass.
    pub fn new(cfg: AnimationConfig) -> Self {
        Self { cfg }
    }

    /// Frames per page.
    pub fn hold_frames(&self) -> FolioResult<u64> {
        self.cfg.hold_frames()
    }

    /// Frame indices occupied by the page at position `page_pos` (0-based, in page order).
    pub fn page_range(&self, page_pos: usize) -> FolioResult<FrameRange> {
        let hold = self.hold_frames()?;
        let start = u64::try_from(page_pos)
            .ok()
            .and_then(|pos| pos.checked_mul(hold))
            .ok_or_else(|| {
                FolioError::config(format!(
                    "page {page_pos} starts past the last representable frame"
                ))
            })?;
        Ok(FrameRange::with_len(FrameIndex(start), hold))
    }

    /// Emit every page's hold frames into `sink`.
    ///
    /// Each page's range is split into chunks of `threading.chunk_size` frames; a chunk is the
    /// unit handed to a worker, so a sink can encode a page once per chunk.
    #[tracing::instrument(skip_all, fields(pages = pages.len()))]
    pub fn animate(
        &self,
        pages: &PageSet,
        sink: &dyn FrameSink,
        threading: &RenderThreading,
        pool: &rayon::ThreadPool,
        cancel: &CancelToken,
    ) -> FolioResult<RenderStats> {
        let hold = self.hold_frames()?;
        let frames_total = self.cfg.sequence_frame_total(pages.len())?;
        let chunk = threading.chunk_size.max(1) as u64;

        let mut work = Vec::new();
        for pos in 0..pages.len() {
            let range = self.page_range(pos)?;
            let mut start = range.start.0;
            while start < range.end.0 {
                let len = chunk.min(range.end.0 - start);
                work.push((pos, FrameRange::with_len(FrameIndex(start), len)));
                start += len;
            }
        }
        tracing::info!(hold_frames = hold, frames_total, "animating sequence");

        let write = |(pos, range): &(usize, FrameRange)| -> FolioResult<u64> {
            cancel.check()?;
            sink.write_held(*range, &pages.pages()[*pos].pixels)
        };
        let encodes: u64 = if threading.parallel {
            pool.install(|| {
                work.par_iter()
                    .map(write)
                    .collect::<FolioResult<Vec<u64>>>()
            })?
            .into_iter()
            .sum()
        } else {
            let mut n = 0;
            for item in &work {
                n += write(item)?;
            }
            n
        };

        Ok(RenderStats {
            frames_total,
            frames_rendered: encodes,
            frames_reused: frames_total.saturating_sub(encodes),
            translation_per_frame: None,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/sequence.rs"]
mod tests;
