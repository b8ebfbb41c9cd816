//! Page discovery, decoding and scaling.

/// Page discovery and the ordered page set.
pub mod loader;
/// Scale ratio and page resizing.
pub mod scale;
