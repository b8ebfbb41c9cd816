use super::*;
use crate::foundation::core::PageIndex;
use crate::pages::loader::PageImage;

fn page(i: u32, w: u32, h: u32, shade: u8) -> PageImage {
    PageImage {
        index: PageIndex(i),
        pixels: RgbaImage::from_pixel(w, h, image::Rgba([shade, shade, shade, 255])),
    }
}

#[test]
fn height_is_sum_of_actual_heights() {
    let pages = PageSet::new(vec![page(1, 8, 10, 10), page(2, 8, 3, 20), page(3, 8, 7, 30)]).unwrap();
    let canvas = CompositeCanvasBuilder::new(8, Rgba8::BLACK)
        .build(&pages)
        .unwrap();
    assert_eq!(canvas.height(), 20);
    assert_eq!(canvas.width(), 8);
    assert_eq!(canvas.page_offsets(), &[0, 10, 13]);
}

#[test]
fn pages_are_drawn_in_order_without_gap_or_overlap() {
    let pages = PageSet::new(vec![page(1, 4, 2, 10), page(2, 4, 3, 20), page(3, 4, 1, 30)]).unwrap();
    let canvas = CompositeCanvasBuilder::new(4, Rgba8::BLACK)
        .build(&pages)
        .unwrap();
    let column: Vec<u8> = (0..canvas.height())
        .map(|y| canvas.pixels().get_pixel(2, y)[0])
        .collect();
    assert_eq!(column, vec![10, 10, 20, 20, 20, 30]);
}

#[test]
fn narrow_pages_leave_background_and_wide_pages_clip() {
    let bg = Rgba8 {
        r: 1,
        g: 2,
        b: 3,
        a: 255,
    };
    let pages = PageSet::new(vec![page(1, 2, 1, 50), page(2, 9, 1, 60)]).unwrap();
    let canvas = CompositeCanvasBuilder::new(4, bg).build(&pages).unwrap();
    assert_eq!(canvas.pixels().get_pixel(1, 0)[0], 50);
    assert_eq!(*canvas.pixels().get_pixel(3, 0), bg.to_pixel());
    assert_eq!(canvas.pixels().get_pixel(3, 1)[0], 60);
}

#[test]
fn overflowing_height_is_rejected() {
    assert!(CompositeCanvasBuilder::canvas_height(&[u32::MAX, 1]).is_err());
    assert_eq!(
        CompositeCanvasBuilder::canvas_height(&[1080, 1080, 1080]).unwrap(),
        3240
    );
}
