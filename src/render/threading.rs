use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use rayon::prelude::*;

use crate::foundation::core::FrameIndex;
use crate::foundation::error::{FolioError, FolioResult};

/// Threading and chunking controls for frame generation.
#[derive(Clone, Debug)]
pub struct RenderThreading {
    /// Render frames concurrently when `true`.
    pub parallel: bool,
    /// Worker count; `None` uses one worker per available core.
    pub threads: Option<usize>,
    /// Frames per scheduling chunk. Cancellation is observed at least once per chunk.
    pub chunk_size: usize,
}

impl Default for RenderThreading {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
            chunk_size: 64,
        }
    }
}

impl RenderThreading {
    /// Strictly sequential rendering on the calling thread.
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    /// Build the worker pool described by these settings.
    pub fn build_pool(&self) -> FolioResult<rayon::ThreadPool> {
        let threads = if self.parallel { self.threads } else { Some(1) };
        build_thread_pool(threads)
    }
}

/// Cooperative cancellation flag shared between the caller and a render pass.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that has not fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// `true` once [`cancel`](Self::cancel) has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once the token has fired.
    pub fn check(&self) -> FolioResult<()> {
        if self.is_cancelled() {
            Err(FolioError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Run `frame` for every index in `0..total`.
///
/// `init` builds per-worker scratch state (e.g. a private viewport). Work is scheduled in chunks;
/// the token is checked before every chunk and every frame, and the first error stops the pass.
pub(crate) fn for_each_frame<S, I, F>(
    threading: &RenderThreading,
    pool: &rayon::ThreadPool,
    total: u64,
    cancel: &CancelToken,
    init: I,
    frame: F,
) -> FolioResult<()>
where
    I: Fn() -> S + Sync + Send,
    F: Fn(&mut S, FrameIndex) -> FolioResult<()> + Sync + Send,
{
    let chunk_size = normalized_chunk_size(threading.chunk_size);

    if !threading.parallel {
        let mut state = init();
        for i in 0..total {
            cancel.check()?;
            frame(&mut state, FrameIndex(i))?;
        }
        return Ok(());
    }

    let mut chunk_start = 0u64;
    while chunk_start < total {
        cancel.check()?;
        let chunk_end = chunk_start.saturating_add(chunk_size).min(total);
        pool.install(|| {
            (chunk_start..chunk_end)
                .into_par_iter()
                .try_for_each_init(&init, |state, i| {
                    cancel.check()?;
                    frame(state, FrameIndex(i))
                })
        })?;
        chunk_start = chunk_end;
    }
    Ok(())
}

fn build_thread_pool(threads: Option<usize>) -> FolioResult<rayon::ThreadPool> {
    if threads == Some(0) {
        return Err(FolioError::config(
            "render threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| FolioError::render(format!("failed to build rayon thread pool: {e}")))
}

fn normalized_chunk_size(chunk_size: usize) -> u64 {
    if chunk_size == 0 {
        1
    } else {
        chunk_size as u64
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/threading.rs"]
mod tests;
