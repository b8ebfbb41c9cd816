//! Folio turns document pages into video frames.
//!
//! Pages come from a rasterized PDF or a directory of images. They are scaled to the output
//! viewport and then animated in one of two styles:
//!
//! - **scroll**: all pages are stacked into one tall canvas that slides up through the viewport
//! - **sequence**: each page is held on screen for a fixed number of frames
//!
//! Frames are written as zero-padded image files and can be encoded into a video with `ffmpeg`.
//! The entry point is [`RenderSession`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Animation configuration.
pub mod config;
/// Frame sinks, the on-disk frame writer and the video encoder.
pub mod encode;
/// Page discovery, decoding and scaling.
pub mod pages;
/// Frame generation.
pub mod render;
/// End-to-end render sessions.
pub mod session;
/// External program execution.
pub mod tools;

pub use crate::foundation::core::{FrameIndex, FrameRange, PageIndex, Resolution, Rgba8};
pub use crate::foundation::error::{FolioError, FolioResult};

pub use crate::config::{AnimationConfig, AnimationStyle, FrameFormat};
pub use crate::encode::ffmpeg::{EncodeConfig, FfmpegEncoder, VideoFormat};
pub use crate::encode::frame_writer::{FrameWriter, frame_name};
pub use crate::encode::sink::{FrameSink, InMemorySink};
pub use crate::pages::loader::{PageImage, PageRef, PageSet};
pub use crate::render::RenderStats;
pub use crate::render::canvas::{Canvas, CompositeCanvasBuilder};
pub use crate::render::scroll::{ScrollPhase, ScrollPlan, ViewportAnimator};
pub use crate::render::sequence::SequenceAnimator;
pub use crate::render::threading::{CancelToken, RenderThreading};
pub use crate::session::render_session::{
    RenderOutcome, RenderSession, RenderSessionOpts, VideoOutcome, VideoTarget,
};
pub use crate::tools::executor::{SystemExecutor, ToolCommand, ToolExecutor, ToolOutput};
