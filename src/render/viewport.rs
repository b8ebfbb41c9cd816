use image::RgbaImage;

use crate::foundation::core::{Resolution, Rgba8};
use crate::render::canvas::Canvas;

/// Fixed-size output window, reused in place across scroll frames.
#[derive(Clone, Debug)]
pub struct Viewport {
    pixels: RgbaImage,
    background: image::Rgba<u8>,
}

impl Viewport {
    /// Viewport of the output resolution, initially cleared.
    pub fn new(resolution: Resolution, background: Rgba8) -> Self {
        let background = background.to_pixel();
        Self {
            pixels: RgbaImage::from_pixel(resolution.width, resolution.height, background),
            background,
        }
    }

    /// Fill with the background colour.
    pub fn clear(&mut self) {
        for px in self.pixels.pixels_mut() {
            *px = self.background;
        }
    }

    /// Clear, then copy the canvas window whose top edge is at canvas row `pos_y`.
    ///
    /// Rows outside the canvas (negative or past the bottom) stay background.
    pub fn composite(&mut self, canvas: &Canvas, pos_y: i64) {
        self.clear();

        let vw = self.pixels.width() as usize;
        let vh = i64::from(self.pixels.height());
        let cw = canvas.width() as usize;
        let ch = i64::from(canvas.height());
        let copy_px = vw.min(cw);

        let first = (-pos_y).clamp(0, vh);
        let last = (ch - pos_y).clamp(0, vh);
        if first >= last {
            return;
        }

        let src = canvas.pixels().as_raw();
        let dst: &mut [u8] = &mut self.pixels;
        for v in first..last {
            let c = (pos_y + v) as usize;
            let s = c * cw * 4;
            let d = v as usize * vw * 4;
            dst[d..d + copy_px * 4].copy_from_slice(&src[s..s + copy_px * 4]);
        }
    }

    /// Current pixels.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}
