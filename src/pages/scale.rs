use rayon::prelude::*;

use crate::config::{AnimationConfig, AnimationStyle};
use crate::foundation::error::{FolioError, FolioResult};
use crate::pages::loader::PageRef;
use crate::render::threading::CancelToken;
use crate::tools::scaler::MagickScaler;

/// Single ratio normalising every page to the viewport along the animation axis.
///
/// Sequence mode fills the output height, scroll mode fills the output width. The ratio is
/// derived from the first page and applied to all pages so relative page sizes are preserved.
pub fn scale_ratio(cfg: &AnimationConfig, first_page: (u32, u32)) -> FolioResult<f64> {
    let (src_w, src_h) = first_page;
    let (target, source) = match cfg.style {
        AnimationStyle::Sequence => (cfg.resolution.height, src_h),
        AnimationStyle::Scroll => (cfg.resolution.width, src_w),
    };
    if source == 0 {
        return Err(FolioError::page_set("first page has a zero dimension"));
    }
    Ok(f64::from(target) / f64::from(source))
}

/// Resize argument that leaves a page untouched.
pub const IDENTITY_PERCENT: &str = "100.0000%";

/// ImageMagick `-resize` argument for `ratio`, with four decimals of percentage precision.
pub fn percent_arg(ratio: f64) -> String {
    format!("{:.4}%", ratio * 100.0)
}

/// Computes the scale ratio and drives the external resize of every page.
#[derive(Debug)]
pub struct ScaleCoordinator {
    cfg: AnimationConfig,
    scaler: MagickScaler,
}

impl ScaleCoordinator {
    /// Coordinator for one render pass.
    pub fn new(cfg: AnimationConfig, scaler: MagickScaler) -> Self {
        Self { cfg, scaler }
    }

    /// Resize every page in place by `ratio`.
    ///
    /// Pages are independent, so resizes run on `pool`. The first failure aborts the pass.
    #[tracing::instrument(skip(self, refs, pool, cancel), fields(pages = refs.len()))]
    pub fn scale_pages(
        &self,
        refs: &[PageRef],
        ratio: f64,
        pool: &rayon::ThreadPool,
        cancel: &CancelToken,
    ) -> FolioResult<()> {
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(FolioError::render(format!("invalid scale ratio {ratio}")));
        }
        let percent = percent_arg(ratio);
        if percent == IDENTITY_PERCENT {
            tracing::info!(style = %self.cfg.style, "pages already fit the viewport, skipping resize");
            return cancel.check();
        }
        tracing::info!(style = %self.cfg.style, ratio, %percent, "scaling pages");

        pool.install(|| {
            refs.par_iter().try_for_each(|page| {
                cancel.check()?;
                self.scaler.resize_in_place(&page.path, &percent)
            })
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pages/scale.rs"]
mod tests;
