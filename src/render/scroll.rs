use crate::config::AnimationConfig;
use crate::encode::sink::FrameSink;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{FolioError, FolioResult};
use crate::pages::loader::PageSet;
use crate::render::RenderStats;
use crate::render::canvas::{Canvas, CompositeCanvasBuilder};
use crate::render::threading::{CancelToken, RenderThreading, for_each_frame};
use crate::render::viewport::Viewport;

/// Frame geometry for one scroll render.
///
/// The canvas starts fully below the viewport (`pos_y = -viewport_height`) and moves up by
/// `translation_per_frame` each frame until it has passed fully above it. Frame `k` reads the
/// canvas window whose top edge is at `pos_y(k) = -viewport_height + k * translation_per_frame`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScrollPlan {
    /// Exact composite canvas height.
    pub canvas_height: u32,
    /// Output height.
    pub viewport_height: u32,
    /// `round(fps * seconds_per_page * pages)`; the timing target, not the emitted count.
    pub frame_target: u64,
    /// Vertical pixels the viewport advances per frame. Always >= 1.
    pub translation_per_frame: u32,
    /// Number of frames actually emitted.
    pub frames: u64,
}

impl ScrollPlan {
    /// Derive the plan from canvas and viewport heights and the frame target.
    pub fn new(canvas_height: u32, viewport_height: u32, frame_target: u64) -> FolioResult<Self> {
        if canvas_height == 0 || viewport_height == 0 {
            return Err(FolioError::render(
                "scroll needs a non-empty canvas and viewport",
            ));
        }
        if frame_target == 0 {
            return Err(FolioError::render("scroll frame target must be > 0"));
        }

        let ch = u64::from(canvas_height);
        let vh = u64::from(viewport_height);
        let travel = ch + 2 * vh;
        // Integer pixels per frame; tall targets on short canvases still move.
        let t = (travel / frame_target).max(1);
        let translation_per_frame = u32::try_from(t)
            .map_err(|_| FolioError::render("translation per frame exceeds u32::MAX"))?;

        // Positions run from -vh while pos_y <= canvas_height + t.
        let frames = (ch + vh + t) / t + 1;

        Ok(Self {
            canvas_height,
            viewport_height,
            frame_target,
            translation_per_frame,
            frames,
        })
    }

    /// Top edge of the canvas window shown by frame `idx`.
    pub fn position(&self, idx: FrameIndex) -> i64 {
        -i64::from(self.viewport_height) + idx.0 as i64 * i64::from(self.translation_per_frame)
    }

    /// Position of the last emitted frame.
    pub fn last_position(&self) -> i64 {
        self.position(FrameIndex(self.frames - 1))
    }
}

/// Lifecycle of a scroll render.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollPhase {
    /// Created, pages not yet scaled.
    Init,
    /// Pages scaled to the viewport width.
    Scaled,
    /// Canvas built and read-only.
    Composited,
    /// Frames being emitted.
    Animating,
    /// All frames emitted.
    Done,
}

/// Slides the viewport over the composite canvas and emits one frame per position.
#[derive(Debug)]
pub struct ViewportAnimator {
    cfg: AnimationConfig,
    phase: ScrollPhase,
    canvas: Option<Canvas>,
    page_count: usize,
}

impl ViewportAnimator {
    /// Animator in [`ScrollPhase::Init`].
    pub fn new(cfg: AnimationConfig) -> Self {
        Self {
            cfg,
            phase: ScrollPhase::Init,
            canvas: None,
            page_count: 0,
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> ScrollPhase {
        self.phase
    }

    /// Built canvas, once composited.
    pub fn canvas(&self) -> Option<&Canvas> {
        self.canvas.as_ref()
    }

    fn advance(&mut self, from: ScrollPhase, to: ScrollPhase) -> FolioResult<()> {
        if self.phase != from {
            return Err(FolioError::render(format!(
                "scroll animator expected phase {from:?}, found {:?}",
                self.phase
            )));
        }
        tracing::debug!(?from, ?to, "scroll phase");
        self.phase = to;
        Ok(())
    }

    /// Record that the pages have been scaled.
    pub fn mark_scaled(&mut self) -> FolioResult<()> {
        self.advance(ScrollPhase::Init, ScrollPhase::Scaled)
    }

    /// Stack the scaled pages into the canvas.
    pub fn composite(&mut self, pages: &PageSet) -> FolioResult<&Canvas> {
        if self.phase != ScrollPhase::Scaled {
            return Err(FolioError::render(format!(
                "scroll animator expected phase Scaled, found {:?}",
                self.phase
            )));
        }
        let canvas = CompositeCanvasBuilder::new(self.cfg.resolution.width, self.cfg.background)
            .build(pages)?;
        self.page_count = pages.len();
        self.advance(ScrollPhase::Scaled, ScrollPhase::Composited)?;
        Ok(self.canvas.insert(canvas))
    }

    /// Frame geometry; deterministic for a given canvas and config.
    pub fn plan(&self) -> FolioResult<ScrollPlan> {
        let canvas = self
            .canvas
            .as_ref()
            .ok_or_else(|| FolioError::render("scroll plan requested before compositing"))?;
        let target = self.cfg.scroll_frame_target(self.page_count)?;
        ScrollPlan::new(canvas.height(), self.cfg.resolution.height, target)
    }

    /// Emit every frame of the plan into `sink`.
    #[tracing::instrument(skip_all)]
    pub fn animate(
        &mut self,
        sink: &dyn FrameSink,
        threading: &RenderThreading,
        pool: &rayon::ThreadPool,
        cancel: &CancelToken,
    ) -> FolioResult<RenderStats> {
        let plan = self.plan()?;
        self.advance(ScrollPhase::Composited, ScrollPhase::Animating)?;
        tracing::info!(
            frame_target = plan.frame_target,
            frames = plan.frames,
            translation_per_frame = plan.translation_per_frame,
            "animating scroll"
        );

        let canvas = self
            .canvas
            .as_ref()
            .ok_or_else(|| FolioError::render("scroll canvas missing while animating"))?;
        let resolution = self.cfg.resolution;
        let background = self.cfg.background;

        for_each_frame(
            threading,
            pool,
            plan.frames,
            cancel,
            || Viewport::new(resolution, background),
            |viewport, idx| {
                viewport.composite(canvas, plan.position(idx));
                sink.write_frame(idx, viewport.pixels())
            },
        )?;

        self.advance(ScrollPhase::Animating, ScrollPhase::Done)?;
        Ok(RenderStats {
            frames_total: plan.frames,
            frames_rendered: plan.frames,
            frames_reused: 0,
            translation_per_frame: Some(plan.translation_per_frame),
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/scroll.rs"]
mod tests;
