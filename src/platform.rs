//! Platform collaborators: display ticks, the script-execution thread and
//! error reporting.
//!
//! Two platform contexts ship with the crate:
//! - [`TokioPlatform`] runs the script thread as a single worker fed by an
//!   mpsc queue and drives draw loops from tokio intervals.
//! - [`ManualPlatform`] queues everything and lets the host (or a test)
//!   decide when tasks run and when ticks fire.

use std::sync::{Mutex, PoisonError};

mod manual;
mod runtime;

pub use manual::ManualPlatform;
pub use runtime::TokioPlatform;

/// Identifies a running draw loop.
pub type LoopId = u64;

/// Closure executed on the script thread.
pub type ScriptTask = Box<dyn FnOnce() + Send>;

/// Called on every display refresh with the frame timestamp in seconds.
pub type TickCallback = Box<dyn Fn(f64) + Send + Sync>;

pub trait PlatformContext: Send + Sync {
    /// Starts calling `on_tick` on every display refresh until
    /// [`end_draw_loop`](Self::end_draw_loop) is called with the returned id.
    fn begin_draw_loop(&self, on_tick: TickCallback) -> LoopId;

    /// Stops a draw loop. Unknown ids are ignored.
    fn end_draw_loop(&self, id: LoopId);

    /// Queues `task` on the script thread. Tasks run one at a time, in order.
    /// Returns false when the task was dropped without being queued.
    fn run_on_script_thread(&self, task: ScriptTask) -> bool;

    fn pixel_density(&self) -> f32;
}

/// Receives failures surfaced from draw callbacks, actions and malformed
/// arguments.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, message: &str, detail: Option<&anyhow::Error>);
}

/// Forwards reports to `log::error!`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, message: &str, detail: Option<&anyhow::Error>) {
        match detail {
            Some(err) => log::error!("{message}: {err:#}"),
            None => log::error!("{message}"),
        }
    }
}

/// Keeps every report in memory.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    reports: Mutex<Vec<String>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<String> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ErrorReporter for CollectingReporter {
    fn report(&self, message: &str, detail: Option<&anyhow::Error>) {
        let entry = match detail {
            Some(err) => format!("{message}: {err:#}"),
            None => message.to_string(),
        };
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}
