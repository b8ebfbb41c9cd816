use std::{path::Path, sync::Arc, time::Duration};

use crate::foundation::error::FolioResult;
use crate::tools::executor::{ToolCommand, ToolExecutor};

/// Default ImageMagick entry point.
pub const MAGICK: &str = "magick";

/// Resizes page files in place through ImageMagick.
#[derive(Clone)]
pub struct MagickScaler {
    executor: Arc<dyn ToolExecutor>,
    program: String,
    timeout: Option<Duration>,
}

impl MagickScaler {
    /// Scaler invoking `magick` through `executor`.
    pub fn new(executor: Arc<dyn ToolExecutor>, timeout: Option<Duration>) -> Self {
        Self {
            executor,
            program: MAGICK.to_string(),
            timeout,
        }
    }

    /// Use a different binary (e.g. `convert` on ImageMagick 6).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Build the in-place resize command for one page.
    pub fn command(&self, page: &Path, percent: &str) -> ToolCommand {
        ToolCommand::new(&self.program)
            .arg(page)
            .args(["-resize", percent])
            .arg(page)
            .timeout(self.timeout)
    }

    /// Resize `page` by `percent` (e.g. `"50.0000%"`), overwriting the file.
    pub fn resize_in_place(&self, page: &Path, percent: &str) -> FolioResult<()> {
        let cmd = self.command(page, percent);
        self.executor.run(&cmd)?.check(&self.program)?;
        Ok(())
    }
}

impl std::fmt::Debug for MagickScaler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MagickScaler")
            .field("program", &self.program)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
