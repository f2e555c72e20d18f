//! Progress tracking and reporting for batched API work

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Progress callback for batch operations
pub type BatchCallback = Arc<dyn Fn(BatchEvent) + Send + Sync>;

/// Events emitted by the batch scheduler
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    ItemStarted {
        phase: &'static str,
        index: usize,
        total: usize,
    },
    ItemCompleted {
        phase: &'static str,
        index: usize,
        total: usize,
    },
    ChunkCompleted {
        phase: &'static str,
        chunk: usize,
        chunks: usize,
    },
    CooldownStarted {
        phase: &'static str,
        duration: Duration,
    },
}

/// Trait for progress reporting with more granular control
pub trait ProgressReporter: Send + Sync {
    fn on_item_started(&self, _phase: &str, _index: usize, _total: usize) {}
    fn on_item_completed(&self, _phase: &str, _index: usize, _total: usize) {}
    fn on_chunk_completed(&self, _phase: &str, _chunk: usize, _chunks: usize) {}
    fn on_cooldown(&self, _phase: &str, _duration: Duration) {}
}

/// Extension trait to convert ProgressReporter to BatchCallback
pub trait IntoBatchCallback {
    fn into_callback(self) -> BatchCallback;
}

impl<T: ProgressReporter + 'static> IntoBatchCallback for T {
    fn into_callback(self) -> BatchCallback {
        Arc::new(move |event| match event {
            BatchEvent::ItemStarted { phase, index, total } => {
                self.on_item_started(phase, index, total);
            }
            BatchEvent::ItemCompleted { phase, index, total } => {
                self.on_item_completed(phase, index, total);
            }
            BatchEvent::ChunkCompleted { phase, chunk, chunks } => {
                self.on_chunk_completed(phase, chunk, chunks);
            }
            BatchEvent::CooldownStarted { phase, duration } => {
                self.on_cooldown(phase, duration);
            }
        })
    }
}

/// Simple console progress reporter
///
/// Prints a `[current/total]` line per finished item; the per-item line is only
/// printed in verbose mode, chunk boundaries and cooldowns always are.
#[derive(Debug, Default)]
pub struct ConsoleProgressReporter {
    pub verbose: bool,
    completed: AtomicUsize,
}

impl ConsoleProgressReporter {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            completed: AtomicUsize::new(0),
        }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn on_item_completed(&self, phase: &str, index: usize, total: usize) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        if self.verbose {
            let percent = ((index + 1) as f64 / total.max(1) as f64) * 100.0;
            println!("[{}] {:.0}% {}/{}", phase, percent, index + 1, total);
        }
    }

    fn on_chunk_completed(&self, phase: &str, chunk: usize, chunks: usize) {
        println!(
            "📦 {}: chunk {}/{} done ({} requests so far)",
            phase,
            chunk + 1,
            chunks,
            self.completed.load(Ordering::Relaxed)
        );
    }

    fn on_cooldown(&self, phase: &str, duration: Duration) {
        println!("⏳ {}: rate limit, waiting {}s", phase, duration.as_secs());
    }
}

/// Null progress reporter that does nothing
#[derive(Debug, Default)]
pub struct NullProgressReporter;

impl ProgressReporter for NullProgressReporter {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        cooldowns: Mutex<Vec<Duration>>,
    }

    impl ProgressReporter for Arc<Recorder> {
        fn on_cooldown(&self, _phase: &str, duration: Duration) {
            self.cooldowns.lock().unwrap().push(duration);
        }
    }

    #[test]
    fn test_reporter_receives_cooldown_events() {
        let recorder = Arc::new(Recorder::default());
        let callback = recorder.clone().into_callback();

        callback(BatchEvent::ItemStarted { phase: "search", index: 0, total: 1 });
        callback(BatchEvent::CooldownStarted {
            phase: "search",
            duration: Duration::from_secs(60),
        });

        assert_eq!(*recorder.cooldowns.lock().unwrap(), vec![Duration::from_secs(60)]);
    }

    #[test]
    fn test_null_reporter_accepts_everything() {
        let callback = NullProgressReporter.into_callback();
        callback(BatchEvent::ChunkCompleted { phase: "resolve", chunk: 0, chunks: 2 });
    }
}
