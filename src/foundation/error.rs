/// Convenience result alias used across the crate.
pub type FolioResult<T> = Result<T, FolioError>;

/// Errors produced by a render pass.
///
/// Every variant is fatal for the pass that raised it: the session aborts and removes any frames
/// directory it created.
#[derive(thiserror::Error, Debug)]
pub enum FolioError {
    /// Invalid or incomplete [`AnimationConfig`](crate::AnimationConfig) or session options.
    #[error("config error: {0}")]
    Config(String),

    /// The page directory is empty, unreadable, or does not describe a contiguous page order.
    #[error("page set error: {0}")]
    PageSet(String),

    /// An external collaborator (rasterizer, scaler, encoder) failed or timed out.
    #[error("external tool '{tool}' failed: {message}")]
    ExternalTool {
        /// Program name as invoked.
        tool: String,
        /// Exit status, captured stderr, or I/O failure description.
        message: String,
    },

    /// A frame could not be persisted.
    #[error("frame write error at frame {index}: {message}")]
    FrameWrite {
        /// Zero-based index of the offending frame.
        index: u64,
        /// Underlying failure (I/O error, encode error, name collision).
        message: String,
    },

    /// Internal invariant violation or degenerate render geometry.
    #[error("render error: {0}")]
    Render(String),

    /// The caller's [`CancelToken`](crate::CancelToken) fired during the pass.
    #[error("render cancelled")]
    Cancelled,

    /// I/O or decode failure carried with context.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FolioError {
    /// Build a [`FolioError::Config`].
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`FolioError::PageSet`].
    pub fn page_set(msg: impl Into<String>) -> Self {
        Self::PageSet(msg.into())
    }

    /// Build a [`FolioError::ExternalTool`].
    pub fn tool(tool: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ExternalTool {
            tool: tool.into(),
            message: msg.into(),
        }
    }

    /// Build a [`FolioError::FrameWrite`] for frame `index`.
    pub fn frame_write(index: u64, msg: impl Into<String>) -> Self {
        Self::FrameWrite {
            index,
            message: msg.into(),
        }
    }

    /// Build a [`FolioError::Render`].
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Offending frame index, when the error is tied to one.
    pub fn frame_index(&self) -> Option<u64> {
        match self {
            Self::FrameWrite { index, .. } => Some(*index),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
