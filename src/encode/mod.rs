//! Frame persistence and video encoding.

/// `ffmpeg` image2 encoder.
pub mod ffmpeg;
/// On-disk frame writer and naming.
pub mod frame_writer;
/// Frame sink trait and built-in sinks.
pub mod sink;
