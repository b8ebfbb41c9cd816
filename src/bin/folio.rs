use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{ArgAction, Parser};
use folio::session::render_session::remove_dir_logged;
use folio::{
    AnimationConfig, AnimationStyle, CancelToken, FfmpegEncoder, FrameFormat, RenderSession,
    RenderSessionOpts, RenderThreading, Resolution, SystemExecutor, VideoFormat, VideoTarget,
};

#[derive(Parser, Debug)]
#[command(
    name = "folio",
    version,
    about = "Turn PDF pages into scrolling or slideshow videos"
)]
struct Cli {
    /// Input PDF, or a directory of numbered page images.
    input: PathBuf,

    /// JSON animation config. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output resolution as WIDTHxHEIGHT.
    #[arg(short = 'r', long)]
    resolution: Option<Resolution>,

    /// Frames per second.
    #[arg(long)]
    fps: Option<u32>,

    /// Seconds each page stays on screen (scroll: average over the whole document).
    #[arg(short = 's', long)]
    seconds_per_page: Option<f64>,

    /// Animation style: scroll or sequence. Required unless set in --config.
    #[arg(long)]
    style: Option<AnimationStyle>,

    /// Video container.
    #[arg(long, default_value = "mp4")]
    format: VideoFormat,

    /// Frame image format: jpg or png.
    #[arg(long)]
    frame_format: Option<FrameFormat>,

    /// Output video path. Defaults to the input name next to the input.
    #[arg(short = 'o', long)]
    out: Option<PathBuf>,

    /// Overwrite the output instead of picking a free name.
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Keep the working directory (scaled pages and frames).
    #[arg(long, default_value_t = false)]
    keep: bool,

    /// Stop after writing frames; do not encode.
    #[arg(long, default_value_t = false)]
    frames_only: bool,

    /// Render on a single thread.
    #[arg(long, default_value_t = false)]
    sequential: bool,

    /// Override worker threads.
    #[arg(long)]
    threads: Option<usize>,

    /// Frames per scheduling chunk.
    #[arg(long, default_value_t = 64)]
    chunk_size: usize,

    /// Timeout for each external tool invocation, in seconds (0 disables).
    #[arg(long, default_value_t = 600)]
    tool_timeout_secs: u64,

    /// More logging (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, default_value_t = false)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let cfg = build_config(&cli)?;
    let timeout = (cli.tool_timeout_secs > 0).then(|| Duration::from_secs(cli.tool_timeout_secs));
    let opts = RenderSessionOpts {
        threading: RenderThreading {
            parallel: !cli.sequential,
            threads: cli.threads,
            chunk_size: cli.chunk_size,
        },
        scale_timeout: timeout,
        rasterize_timeout: timeout,
        encode_timeout: timeout,
        keep_intermediate: cli.keep,
    };
    let session = RenderSession::with_system_tools(cfg, opts)?;
    let cancel = CancelToken::new();
    cancel_on_ctrl_c(cancel.clone());

    if cli.frames_only {
        cmd_frames(&cli, &session, &cancel)
    } else {
        cmd_video(&cli, &session, &cancel)
    }
}

fn cmd_frames(cli: &Cli, session: &RenderSession, cancel: &CancelToken) -> anyhow::Result<()> {
    let work_dir = session.prepare_input(&cli.input)?;
    match session.render_frames(&work_dir, cancel) {
        Ok(outcome) => {
            eprintln!(
                "wrote {} frames to {}",
                outcome.stats.frames_total,
                outcome.frames_dir.display()
            );
            Ok(())
        }
        Err(e) => {
            if !cli.keep {
                remove_dir_logged(&work_dir);
            }
            Err(e.into())
        }
    }
}

fn cmd_video(cli: &Cli, session: &RenderSession, cancel: &CancelToken) -> anyhow::Result<()> {
    let ffmpeg = FfmpegEncoder::new(
        Arc::new(SystemExecutor::new()),
        Some(Duration::from_secs(10)),
    );
    match ffmpeg.version() {
        Ok(version) => tracing::debug!(%version, "found ffmpeg"),
        Err(e) => anyhow::bail!("ffmpeg is not usable ({e}); install it or pass --frames-only"),
    }
    let target = VideoTarget {
        out_path: cli.out.clone(),
        format: cli.format,
        overwrite: cli.overwrite,
    };
    let outcome = session.render_video(&cli.input, &target, cancel)?;
    eprintln!(
        "wrote {} ({} frames)",
        outcome.out_path.display(),
        outcome.stats.frames_total
    );
    if let Some(dir) = outcome.work_dir {
        eprintln!("kept {}", dir.display());
    }
    Ok(())
}

fn build_config(cli: &Cli) -> anyhow::Result<AnimationConfig> {
    let mut cfg = match &cli.config {
        Some(path) => AnimationConfig::from_path(path)
            .with_context(|| format!("load config '{}'", path.display()))?,
        None => {
            let style = cli
                .style
                .context("--style is required unless --config is given")?;
            AnimationConfig::new(style)
        }
    };
    if let Some(style) = cli.style {
        cfg.style = style;
    }
    if let Some(resolution) = cli.resolution {
        cfg.resolution = resolution;
    }
    if let Some(fps) = cli.fps {
        cfg.fps = fps;
    }
    if let Some(spp) = cli.seconds_per_page {
        cfg.seconds_per_page = spp;
    }
    if let Some(format) = cli.frame_format {
        cfg.frame_format = format;
    }
    Ok(cfg)
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        tracing::Level::WARN
    } else {
        match verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// First Ctrl-C cancels the render so partial output is removed; a second one exits at once.
fn cancel_on_ctrl_c(cancel: CancelToken) {
    let spawned = std::thread::Builder::new()
        .name("folio-ctrl-c".into())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    tracing::warn!(error = %e, "cannot listen for Ctrl-C");
                    return;
                }
            };
            rt.block_on(async {
                if cancel_on(tokio::signal::ctrl_c(), &cancel).await
                    && tokio::signal::ctrl_c().await.is_ok()
                {
                    std::process::exit(130);
                }
            });
        });
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C");
    }
}

async fn cancel_on(
    signal: impl Future<Output = std::io::Result<()>>,
    cancel: &CancelToken,
) -> bool {
    match signal.await {
        Ok(()) => {
            tracing::warn!("interrupted; removing partial output (Ctrl-C again to quit now)");
            cancel.cancel();
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "cannot listen for Ctrl-C");
            false
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/bin/folio.rs"]
mod tests;
