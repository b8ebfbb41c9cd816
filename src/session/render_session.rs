use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;

use crate::config::{AnimationConfig, AnimationStyle};
use crate::encode::ffmpeg::{EncodeConfig, FfmpegEncoder, VideoFormat, unique_output_path};
use crate::encode::frame_writer::FrameWriter;
use crate::encode::sink::FrameSink;
use crate::foundation::error::{FolioError, FolioResult};
use crate::pages::loader::{PageRef, PageSet, first_page_dimensions, is_page_image, scan_pages};
use crate::pages::scale::{ScaleCoordinator, scale_ratio};
use crate::render::RenderStats;
use crate::render::scroll::ViewportAnimator;
use crate::render::sequence::SequenceAnimator;
use crate::render::threading::{CancelToken, RenderThreading};
use crate::tools::executor::{SystemExecutor, ToolExecutor};
use crate::tools::rasterizer::PdfRasterizer;
use crate::tools::scaler::MagickScaler;

/// Sub-directory of the working directory that receives the frames.
pub const FRAMES_DIR: &str = "frames";

const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(600);

/// Options controlling how a `RenderSession` runs, independent of the animation itself.
#[derive(Clone, Debug)]
pub struct RenderSessionOpts {
    /// Worker pool and chunking.
    pub threading: RenderThreading,
    /// Per-page timeout for the external resize.
    pub scale_timeout: Option<Duration>,
    /// Timeout for PDF rasterization.
    pub rasterize_timeout: Option<Duration>,
    /// Timeout for the video encode.
    pub encode_timeout: Option<Duration>,
    /// Keep the working directory (pages and frames) after a successful encode.
    pub keep_intermediate: bool,
}

impl Default for RenderSessionOpts {
    fn default() -> Self {
        Self {
            threading: RenderThreading::default(),
            scale_timeout: Some(DEFAULT_TOOL_TIMEOUT),
            rasterize_timeout: Some(DEFAULT_TOOL_TIMEOUT),
            encode_timeout: Some(DEFAULT_TOOL_TIMEOUT),
            keep_intermediate: false,
        }
    }
}

/// Result of writing a complete frame sequence to disk.
#[derive(Clone, Debug)]
pub struct RenderOutcome {
    /// Directory holding `00000.<ext>`, `00001.<ext>`, ...
    pub frames_dir: PathBuf,
    /// Counters for the pass.
    pub stats: RenderStats,
}

/// Where and how to write the encoded video.
#[derive(Clone, Debug, Default)]
pub struct VideoTarget {
    /// Output file; defaults to the input name with the container extension, next to the input.
    pub out_path: Option<PathBuf>,
    /// Output container.
    pub format: VideoFormat,
    /// Replace an existing file instead of picking a free `+` name.
    pub overwrite: bool,
}

/// Result of a full input-to-video run.
#[derive(Clone, Debug)]
pub struct VideoOutcome {
    /// The encoded file.
    pub out_path: PathBuf,
    /// Working directory, when it was kept.
    pub work_dir: Option<PathBuf>,
    /// Counters for the frame pass.
    pub stats: RenderStats,
}

/// Drives one document through scaling, frame generation and encoding.
///
/// The session owns the configuration and the external tool seam; each call is an independent
/// pass over a working directory.
pub struct RenderSession {
    cfg: AnimationConfig,
    opts: RenderSessionOpts,
    executor: Arc<dyn ToolExecutor>,
}

impl RenderSession {
    /// Validate `cfg` and bind the session to `executor`.
    pub fn new(
        cfg: AnimationConfig,
        opts: RenderSessionOpts,
        executor: Arc<dyn ToolExecutor>,
    ) -> FolioResult<Self> {
        cfg.validate()?;
        if opts.threading.chunk_size == 0 {
            return Err(FolioError::config("chunk size must be > 0"));
        }
        Ok(Self {
            cfg,
            opts,
            executor,
        })
    }

    /// Session running the real `magick`, `pdftoppm` and `ffmpeg` binaries.
    pub fn with_system_tools(cfg: AnimationConfig, opts: RenderSessionOpts) -> FolioResult<Self> {
        Self::new(cfg, opts, Arc::new(SystemExecutor::new()))
    }

    /// Animation settings for this session.
    pub fn config(&self) -> &AnimationConfig {
        &self.cfg
    }

    /// Session options.
    pub fn opts(&self) -> &RenderSessionOpts {
        &self.opts
    }

    /// Scale the pages in `work_dir` in place and stream every frame into `sink`.
    ///
    /// The page images in `work_dir` are overwritten by the resize.
    #[tracing::instrument(skip(self, sink, cancel), fields(style = %self.cfg.style))]
    pub fn render_with_sink(
        &self,
        work_dir: &Path,
        sink: &dyn FrameSink,
        cancel: &CancelToken,
    ) -> FolioResult<RenderStats> {
        let refs = scan_pages(work_dir)?;
        let pool = self.opts.threading.build_pool()?;
        self.generate(&refs, sink, &pool, cancel)
    }

    /// Scale the pages in `work_dir` in place and write the frames to `work_dir/frames`.
    ///
    /// Pages are discovered before the frames directory is created, so an unusable page set
    /// leaves no trace. Any later failure removes the frames directory again.
    #[tracing::instrument(skip(self, cancel), fields(style = %self.cfg.style))]
    pub fn render_frames(&self, work_dir: &Path, cancel: &CancelToken) -> FolioResult<RenderOutcome> {
        let refs = scan_pages(work_dir)?;
        let pool = self.opts.threading.build_pool()?;

        let frames_dir = work_dir.join(FRAMES_DIR);
        let mut guard = DirGuard::create(&frames_dir)?;
        let writer = FrameWriter::new(&frames_dir, self.cfg.frame_format);
        let stats = self.generate(&refs, &writer, &pool, cancel)?;
        guard.disarm();

        tracing::info!(
            frames = stats.frames_total,
            reused = stats.frames_reused,
            dir = %frames_dir.display(),
            "frames written"
        );
        Ok(RenderOutcome { frames_dir, stats })
    }

    /// Turn `input` into a working directory of page images.
    ///
    /// A `doc.pdf` is rasterized into a sibling `doc_pdf/`; a page directory `dir/` is copied into
    /// a sibling `dir_folio/` so the in-place resize never touches the caller's files.
    #[tracing::instrument(skip(self))]
    pub fn prepare_input(&self, input: &Path) -> FolioResult<PathBuf> {
        let work_dir = work_dir_for(input)?;
        let mut guard = DirGuard::create(&work_dir)?;
        if is_pdf(input) {
            PdfRasterizer::new(self.executor.clone(), self.opts.rasterize_timeout)
                .rasterize(input, &work_dir)?;
        } else {
            stage_pages(input, &work_dir)?;
        }
        guard.disarm();
        Ok(work_dir)
    }

    /// Full run: prepare `input`, write frames, encode the video.
    ///
    /// Unless `keep_intermediate` is set, the working directory is removed when the run ends,
    /// whether it succeeded or not.
    #[tracing::instrument(skip(self, target, cancel))]
    pub fn render_video(
        &self,
        input: &Path,
        target: &VideoTarget,
        cancel: &CancelToken,
    ) -> FolioResult<VideoOutcome> {
        let requested = match &target.out_path {
            Some(p) => p.clone(),
            None => default_output_path(input, target.format)?,
        };
        let out_path = if target.overwrite {
            requested
        } else {
            unique_output_path(&requested)
        };
        let mut encode = EncodeConfig {
            frames_dir: PathBuf::new(),
            frame_format: self.cfg.frame_format,
            fps: self.cfg.fps,
            resolution: self.cfg.resolution,
            background: self.cfg.background,
            out_path,
            format: target.format,
            overwrite: target.overwrite,
        };
        // Reject odd resolutions before any work is done.
        encode.validate()?;

        let work_dir = self.prepare_input(input)?;
        let mut work_guard = DirGuard(Some(work_dir.clone()));
        if self.opts.keep_intermediate {
            work_guard.disarm();
        }

        let outcome = self.render_frames(&work_dir, cancel)?;
        cancel.check()?;
        encode.frames_dir = outcome.frames_dir;
        FfmpegEncoder::new(self.executor.clone(), self.opts.encode_timeout).encode(&encode)?;
        tracing::info!(out = %encode.out_path.display(), "video written");

        // Dropping the armed guard removes the working directory.
        drop(work_guard);
        Ok(VideoOutcome {
            out_path: encode.out_path,
            work_dir: self.opts.keep_intermediate.then_some(work_dir),
            stats: outcome.stats,
        })
    }

    fn generate(
        &self,
        refs: &[PageRef],
        sink: &dyn FrameSink,
        pool: &rayon::ThreadPool,
        cancel: &CancelToken,
    ) -> FolioResult<RenderStats> {
        cancel.check()?;
        let ratio = scale_ratio(&self.cfg, first_page_dimensions(refs)?)?;
        let scaler = MagickScaler::new(self.executor.clone(), self.opts.scale_timeout);
        ScaleCoordinator::new(self.cfg.clone(), scaler).scale_pages(refs, ratio, pool, cancel)?;

        cancel.check()?;
        let pages = pool.install(|| PageSet::load(refs))?;

        let threading = &self.opts.threading;
        match self.cfg.style {
            AnimationStyle::Scroll => {
                let mut animator = ViewportAnimator::new(self.cfg.clone());
                animator.mark_scaled()?;
                animator.composite(&pages)?;
                animator.animate(sink, threading, pool, cancel)
            }
            AnimationStyle::Sequence => {
                SequenceAnimator::new(self.cfg.clone()).animate(&pages, sink, threading, pool, cancel)
            }
        }
    }
}

impl std::fmt::Debug for RenderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSession")
            .field("cfg", &self.cfg)
            .field("opts", &self.opts)
            .finish_non_exhaustive()
    }
}

fn is_pdf(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false)
}

/// Sibling working directory for `input`: `doc.pdf` → `doc_pdf/`, `dir/` → `dir_folio/`.
pub fn work_dir_for(input: &Path) -> FolioResult<PathBuf> {
    let suffix = if is_pdf(input) {
        "pdf"
    } else if input.is_dir() {
        "folio"
    } else {
        return Err(FolioError::config(format!(
            "input '{}' is neither a .pdf file nor a directory of page images",
            input.display()
        )));
    };
    let stem = if suffix == "pdf" {
        input.file_stem()
    } else {
        input.file_name()
    };
    let stem = stem.ok_or_else(|| {
        FolioError::config(format!(
            "cannot derive a working directory name from '{}'",
            input.display()
        ))
    })?;
    Ok(input.with_file_name(format!("{}_{suffix}", stem.to_string_lossy())))
}

/// `<input stem>.<ext>` next to the input.
pub fn default_output_path(input: &Path, format: VideoFormat) -> FolioResult<PathBuf> {
    let stem = input.file_stem().ok_or_else(|| {
        FolioError::config(format!(
            "cannot derive an output name from '{}'",
            input.display()
        ))
    })?;
    Ok(input.with_file_name(format!(
        "{}.{}",
        stem.to_string_lossy(),
        format.extension()
    )))
}

fn stage_pages(src: &Path, dst: &Path) -> FolioResult<()> {
    let entries = std::fs::read_dir(src).map_err(|e| {
        FolioError::page_set(format!("cannot read page directory '{}': {e}", src.display()))
    })?;
    let mut copied = 0usize;
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to list '{}'", src.display()))?
            .path();
        if !path.is_file() || !is_page_image(&path) {
            continue;
        }
        let Some(name) = path.file_name() else {
            continue;
        };
        std::fs::copy(&path, dst.join(name))
            .with_context(|| format!("failed to stage page '{}'", path.display()))?;
        copied += 1;
    }
    tracing::debug!(copied, work_dir = %dst.display(), "staged pages");
    Ok(())
}

/// Remove `dir` and everything in it, warning instead of failing.
///
/// Returns `false` when something was left behind. A directory that is already gone counts as
/// removed.
pub fn remove_dir_logged(dir: &Path) -> bool {
    tracing::debug!(dir = %dir.display(), "removing directory");
    match std::fs::remove_dir_all(dir) {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "failed to remove directory");
            false
        }
    }
}

/// Removes a directory this session created unless disarmed.
struct DirGuard(Option<PathBuf>);

impl DirGuard {
    fn create(path: &Path) -> FolioResult<Self> {
        match std::fs::create_dir(path) {
            Ok(()) => Ok(Self(Some(path.to_path_buf()))),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(FolioError::config(format!(
                    "'{}' already exists; remove it or render elsewhere",
                    path.display()
                )))
            }
            Err(e) => Err(FolioError::Other(anyhow::Error::new(e).context(format!(
                "failed to create directory '{}'",
                path.display()
            )))),
        }
    }

    fn disarm(&mut self) {
        self.0 = None;
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            remove_dir_logged(&path);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/render_session.rs"]
mod tests;
