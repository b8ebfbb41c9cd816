//! Frame generation: canvas composition, viewport scrolling, page holding.

/// Composite canvas for scroll mode.
pub mod canvas;
/// Scroll-mode animator.
pub mod scroll;
/// Sequence-mode animator.
pub mod sequence;
/// Worker pool and cancellation.
pub mod threading;
/// Viewport buffer.
pub mod viewport;

/// Counters reported by a render pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Frames emitted.
    pub frames_total: u64,
    /// Frames that were composited or encoded from scratch.
    pub frames_rendered: u64,
    /// Frames written by reusing an earlier encoding (held pages).
    pub frames_reused: u64,
    /// Scroll mode only: pixels advanced per frame.
    pub translation_per_frame: Option<u32>,
}
