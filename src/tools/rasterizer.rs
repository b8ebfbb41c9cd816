use std::{path::Path, sync::Arc, time::Duration};

use crate::foundation::error::{FolioError, FolioResult};
use crate::tools::executor::{ToolCommand, ToolExecutor};

/// Default poppler rasterizer binary.
pub const PDFTOPPM: &str = "pdftoppm";

/// File-name prefix for rasterized pages (`page-01.jpg`, `page-02.jpg`, ...).
pub const PAGE_PREFIX: &str = "page";

/// Renders each PDF page to a JPEG with poppler's `pdftoppm`.
#[derive(Clone)]
pub struct PdfRasterizer {
    executor: Arc<dyn ToolExecutor>,
    dpi: u32,
    timeout: Option<Duration>,
}

impl PdfRasterizer {
    /// Rasterizer at 150 dpi.
    pub fn new(executor: Arc<dyn ToolExecutor>, timeout: Option<Duration>) -> Self {
        Self {
            executor,
            dpi: 150,
            timeout,
        }
    }

    /// Override the render resolution.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Build the `pdftoppm` invocation writing into `out_dir`.
    pub fn command(&self, pdf: &Path, out_dir: &Path) -> ToolCommand {
        ToolCommand::new(PDFTOPPM)
            .args(["-aa", "yes", "-aaVector", "yes", "-jpeg", "-r"])
            .arg(self.dpi.to_string())
            .arg(pdf)
            .arg(out_dir.join(PAGE_PREFIX))
            .timeout(self.timeout)
    }

    /// Rasterize every page of `pdf` into `out_dir`.
    pub fn rasterize(&self, pdf: &Path, out_dir: &Path) -> FolioResult<()> {
        if self.dpi == 0 {
            return Err(FolioError::config("rasterizer dpi must be > 0"));
        }
        tracing::info!(pdf = %pdf.display(), dpi = self.dpi, "rasterizing pdf");
        self.executor
            .run(&self.command(pdf, out_dir))?
            .check(PDFTOPPM)?;
        Ok(())
    }
}

impl std::fmt::Debug for PdfRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfRasterizer")
            .field("dpi", &self.dpi)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
