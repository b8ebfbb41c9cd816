//! End-to-end orchestration of a render pass.

/// Render session and its options.
pub mod render_session;
