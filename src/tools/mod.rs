/// Process executor seam with timeouts.
pub mod executor;
/// `pdftoppm` page rasterizer.
pub mod rasterizer;
/// ImageMagick in-place resizer.
pub mod scaler;
