use image::RgbaImage;

use crate::foundation::core::Rgba8;
use crate::foundation::error::{FolioError, FolioResult};
use crate::pages::loader::PageSet;

/// Tall composite of every scaled page, used by scroll mode.
///
/// Invariants: `height()` is the exact sum of the page heights, and page `i` starts at
/// `page_offsets()[i]`, the sum of the heights of pages `0..i`. Read-only once built.
#[derive(Clone, Debug)]
pub struct Canvas {
    pixels: RgbaImage,
    page_offsets: Vec<u32>,
}

impl Canvas {
    /// Canvas width (the viewport width).
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Canvas height (sum of page heights).
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Top edge of each page, in page order.
    pub fn page_offsets(&self) -> &[u32] {
        &self.page_offsets
    }

    /// Composited pixels.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// Stacks scaled pages top-to-bottom into one [`Canvas`].
#[derive(Clone, Copy, Debug)]
pub struct CompositeCanvasBuilder {
    width: u32,
    background: Rgba8,
}

impl CompositeCanvasBuilder {
    /// Builder for a canvas `width` pixels wide; uncovered area is filled with `background`.
    pub fn new(width: u32, background: Rgba8) -> Self {
        Self { width, background }
    }

    /// Sum the actual page heights, rejecting canvases that cannot be addressed.
    pub fn canvas_height(heights: &[u32]) -> FolioResult<u32> {
        let total: u64 = heights.iter().map(|&h| u64::from(h)).sum();
        u32::try_from(total).map_err(|_| {
            FolioError::render(format!("composite canvas height {total} exceeds u32::MAX"))
        })
    }

    /// Draw every page at its cumulative offset with no gap and no overlap.
    ///
    /// Pages wider than the canvas are clipped on the right; narrower pages leave background.
    #[tracing::instrument(skip(self, pages), fields(pages = pages.len()))]
    pub fn build(&self, pages: &PageSet) -> FolioResult<Canvas> {
        if self.width == 0 {
            return Err(FolioError::render("canvas width must be non-zero"));
        }
        let height = Self::canvas_height(&pages.heights())?;
        if height == 0 {
            return Err(FolioError::render("composite canvas has zero height"));
        }
        let bytes = u64::from(self.width) * u64::from(height) * 4;
        if usize::try_from(bytes).is_err() {
            return Err(FolioError::render(format!(
                "composite canvas {}x{height} does not fit in memory",
                self.width
            )));
        }

        let mut pixels = RgbaImage::from_pixel(self.width, height, self.background.to_pixel());
        let mut page_offsets = Vec::with_capacity(pages.len());
        let mut offset = 0u32;
        for page in pages.pages() {
            page_offsets.push(offset);
            image::imageops::replace(&mut pixels, &page.pixels, 0, i64::from(offset));
            offset += page.height();
        }
        debug_assert_eq!(offset, height);

        tracing::info!(width = self.width, height, "built composite canvas");
        Ok(Canvas {
            pixels,
            page_offsets,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/canvas.rs"]
mod tests;
