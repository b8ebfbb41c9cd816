use std::collections::BTreeMap;
use std::sync::Mutex;

use image::RgbaImage;

use super::*;
use crate::config::AnimationStyle;
use crate::encode::sink::InMemorySink;
use crate::foundation::core::{PageIndex, Resolution, Rgba8};
use crate::pages::loader::PageImage;

/// Records only whether each frame is entirely background.
#[derive(Default)]
struct BlankRecorder {
    blank: Mutex<BTreeMap<u64, bool>>,
}

impl FrameSink for BlankRecorder {
    fn write_frame(&self, idx: FrameIndex, frame: &RgbaImage) -> FolioResult<()> {
        let bg = Rgba8::BLACK.to_pixel();
        // Pages are solid, so both edge columns are representative.
        let right = frame.width() - 1;
        let all_bg = (0..frame.height())
            .all(|y| *frame.get_pixel(0, y) == bg && *frame.get_pixel(right, y) == bg);
        self.blank.lock().unwrap().insert(idx.0, all_bg);
        Ok(())
    }
}

fn page(i: u32, w: u32, h: u32, shade: u8) -> PageImage {
    PageImage {
        index: PageIndex(i),
        pixels: RgbaImage::from_pixel(w, h, image::Rgba([shade, 255 - shade, 9, 255])),
    }
}

fn cfg(w: u32, h: u32, fps: u32, spp: f64) -> AnimationConfig {
    let mut cfg = AnimationConfig::new(AnimationStyle::Scroll);
    cfg.resolution = Resolution::new(w, h).unwrap();
    cfg.fps = fps;
    cfg.seconds_per_page = spp;
    cfg
}

fn composited(cfg: AnimationConfig, pages: &PageSet) -> ViewportAnimator {
    let mut anim = ViewportAnimator::new(cfg);
    anim.mark_scaled().unwrap();
    anim.composite(pages).unwrap();
    anim
}

#[test]
fn full_hd_scroll_moves_thirty_pixels_per_frame() {
    let plan = ScrollPlan::new(3240, 1080, 180).unwrap();
    assert_eq!(plan.translation_per_frame, 30);
    assert_eq!(plan.position(FrameIndex(0)), -1080);
    assert_eq!(plan.frames, 146);
    assert_eq!(plan.last_position(), 3270);
}

#[test]
fn full_hd_scroll_starts_and_ends_blank() {
    let pages = PageSet::new(vec![
        page(1, 1920, 1080, 40),
        page(2, 1920, 1080, 80),
        page(3, 1920, 1080, 120),
    ])
    .unwrap();
    let mut anim = composited(cfg(1920, 1080, 30, 2.0), &pages);
    assert_eq!(anim.canvas().unwrap().height(), 3240);

    let threading = RenderThreading::default();
    let pool = threading.build_pool().unwrap();
    let recorder = BlankRecorder::default();
    let stats = anim
        .animate(&recorder, &threading, &pool, &CancelToken::new())
        .unwrap();

    assert_eq!(stats.translation_per_frame, Some(30));
    assert_eq!(stats.frames_total, 146);
    let blank = recorder.blank.into_inner().unwrap();
    assert_eq!(blank.len(), 146);
    assert_eq!(blank.keys().copied().collect::<Vec<_>>(), (0..146).collect::<Vec<_>>());
    assert!(blank[&0]);
    assert!(blank[&145]);
    assert!(blank[&144]);
    assert!(!blank[&1]);
    assert!(!blank[&72]);
    assert_eq!(anim.phase(), ScrollPhase::Done);
}

#[test]
fn frames_match_canvas_windows() {
    let pages = PageSet::new(vec![page(1, 6, 5, 10), page(2, 6, 9, 20), page(3, 6, 2, 30)]).unwrap();
    let config = cfg(6, 4, 2, 1.5);
    let mut anim = composited(config.clone(), &pages);
    let canvas = anim.canvas().unwrap().clone();
    let plan = anim.plan().unwrap();
    // travel = 16 + 8 = 24, target = round(2 * 1.5 * 3) = 9, t = 2
    assert_eq!(plan.translation_per_frame, 2);

    let sink = InMemorySink::new();
    let threading = RenderThreading {
        parallel: true,
        threads: Some(3),
        chunk_size: 4,
    };
    let pool = threading.build_pool().unwrap();
    anim.animate(&sink, &threading, &pool, &CancelToken::new())
        .unwrap();

    let frames = sink.into_frames();
    assert_eq!(frames.len() as u64, plan.frames);
    for (k, (idx, frame)) in frames.iter().enumerate() {
        assert_eq!(idx.0, k as u64);
        let pos = plan.position(*idx);
        for y in 0..4i64 {
            let row = pos + y;
            let expected = if (0..16).contains(&row) {
                *canvas.pixels().get_pixel(0, row as u32)
            } else {
                config.background.to_pixel()
            };
            assert_eq!(*frame.get_pixel(3, y as u32), expected, "frame {k} row {y}");
        }
    }
}

#[test]
fn plan_is_deterministic_and_positive() {
    let pages = PageSet::new(vec![page(1, 4, 7, 1), page(2, 4, 3, 2)]).unwrap();
    let a = composited(cfg(4, 2, 30, 6.0), &pages).plan().unwrap();
    let b = composited(cfg(4, 2, 30, 6.0), &pages).plan().unwrap();
    assert_eq!(a, b);
    // 360 frames over 14 pixels of travel still advance one pixel per frame.
    assert_eq!(a.translation_per_frame, 1);
}

#[test]
fn phases_must_run_in_order() {
    let pages = PageSet::new(vec![page(1, 4, 4, 1)]).unwrap();
    let mut anim = ViewportAnimator::new(cfg(4, 4, 1, 1.0));
    assert_eq!(anim.phase(), ScrollPhase::Init);
    assert!(anim.composite(&pages).is_err());

    let threading = RenderThreading::sequential();
    let pool = threading.build_pool().unwrap();
    let sink = InMemorySink::new();
    assert!(
        anim.animate(&sink, &threading, &pool, &CancelToken::new())
            .is_err()
    );

    anim.mark_scaled().unwrap();
    assert!(anim.mark_scaled().is_err());
    anim.composite(&pages).unwrap();
    assert_eq!(anim.phase(), ScrollPhase::Composited);
    anim.animate(&sink, &threading, &pool, &CancelToken::new())
        .unwrap();
    assert!(
        anim.animate(&sink, &threading, &pool, &CancelToken::new())
            .is_err()
    );
}

#[test]
fn cancelled_scroll_stops_early() {
    let pages = PageSet::new(vec![page(1, 4, 40, 1)]).unwrap();
    let mut anim = composited(cfg(4, 4, 30, 6.0), &pages);
    let threading = RenderThreading::sequential();
    let pool = threading.build_pool().unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();
    let sink = InMemorySink::new();
    let err = anim.animate(&sink, &threading, &pool, &cancel).unwrap_err();
    assert!(matches!(err, FolioError::Cancelled));
    assert!(sink.is_empty());
}

#[test]
fn degenerate_plans_are_rejected() {
    assert!(ScrollPlan::new(0, 1080, 10).is_err());
    assert!(ScrollPlan::new(10, 0, 10).is_err());
    assert!(ScrollPlan::new(10, 10, 0).is_err());
}
