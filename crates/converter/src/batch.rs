//! Rate-limit aware batch execution
//!
//! Items are split into consecutive chunks and processed strictly one at a time, with
//! a cooldown between chunks. Sequential execution is what keeps a run under the
//! remote rate limit, and it lets an action stop and prompt the operator without any
//! other request being in flight.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::api::QuotaSource;
use crate::core::{BatchCallback, BatchEvent};

/// How long to wait between two chunks
#[derive(Clone)]
pub enum Pacing {
    /// Unconditional pause, regardless of observed headroom
    Fixed(Duration),
    /// Wait for the window to reset only when the remaining budget cannot cover the
    /// next chunk. `fallback` is used when no rate-limit information is known yet.
    QuotaAware {
        source: Arc<dyn QuotaSource>,
        fallback: Duration,
    },
}

impl Pacing {
    fn delay_before(&self, next_chunk_len: usize) -> Duration {
        match self {
            Pacing::Fixed(duration) => *duration,
            Pacing::QuotaAware { source, fallback } => match source.rate_limit_status() {
                Some(status) if status.remaining as usize >= next_chunk_len => Duration::ZERO,
                Some(status) => status.reset_in,
                None => *fallback,
            },
        }
    }
}

impl std::fmt::Debug for Pacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pacing::Fixed(duration) => f.debug_tuple("Fixed").field(duration).finish(),
            Pacing::QuotaAware { fallback, .. } => f
                .debug_struct("QuotaAware")
                .field("fallback", fallback)
                .finish(),
        }
    }
}

/// Sequential chunked executor
#[derive(Clone)]
pub struct BatchScheduler {
    chunk_size: usize,
    pacing: Pacing,
    phase: &'static str,
    progress: Option<BatchCallback>,
}

impl BatchScheduler {
    /// `chunk_size` of zero is treated as one
    pub fn new(chunk_size: usize, pacing: Pacing) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            pacing,
            phase: "batch",
            progress: None,
        }
    }

    /// Label used in logs and progress events
    pub fn with_phase(mut self, phase: &'static str) -> Self {
        self.phase = phase;
        self
    }

    pub fn with_progress(mut self, progress: Option<BatchCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Number of chunks `len` items are split into
    pub fn chunk_count(&self, len: usize) -> usize {
        len.div_ceil(self.chunk_size)
    }

    fn emit(&self, event: BatchEvent) {
        if let Some(ref callback) = self.progress {
            callback(event);
        }
    }

    /// Run `action` over every item and collect the results in input order
    ///
    /// The first `Err` aborts the remaining items and is returned as is. Callers that
    /// want to keep going convert failures into values inside `action`.
    pub async fn run<T, R, E, F>(&self, items: Vec<T>, mut action: F) -> Result<Vec<R>, E>
    where
        F: AsyncFnMut(T) -> Result<R, E>,
    {
        let total = items.len();
        let chunks = self.chunk_count(total);
        let mut results = Vec::with_capacity(total);
        let mut items = items.into_iter().enumerate().peekable();

        info!("{}: {} items in {} chunk(s) of up to {}", self.phase, total, chunks, self.chunk_size);

        for chunk in 0..chunks {
            for (index, item) in items.by_ref().take(self.chunk_size) {
                self.emit(BatchEvent::ItemStarted { phase: self.phase, index, total });
                let result = action(item).await?;
                results.push(result);
                self.emit(BatchEvent::ItemCompleted { phase: self.phase, index, total });
            }

            self.emit(BatchEvent::ChunkCompleted { phase: self.phase, chunk, chunks });

            if items.peek().is_none() {
                break;
            }

            let remaining = total - results.len();
            let delay = self.pacing.delay_before(remaining.min(self.chunk_size));
            if delay.is_zero() {
                debug!("{}: quota allows next chunk without waiting", self.phase);
                continue;
            }

            info!("{}: rate limit cooldown, waiting {}s", self.phase, delay.as_secs());
            self.emit(BatchEvent::CooldownStarted { phase: self.phase, duration: delay });
            tokio::time::sleep(delay).await;
        }

        Ok(results)
    }
}

impl std::fmt::Debug for BatchScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScheduler")
            .field("chunk_size", &self.chunk_size)
            .field("pacing", &self.pacing)
            .field("phase", &self.phase)
            .finish()
    }
}
