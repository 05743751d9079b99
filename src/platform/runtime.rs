use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::PlatformConfig;
use crate::platform::{LoopId, PlatformContext, ScriptTask, TickCallback};

/// Platform context backed by a tokio runtime.
///
/// The script thread is one blocking worker draining an unbounded queue.
/// Every draw loop is an interval task cancelled through its own token.
pub struct TokioPlatform {
    config: PlatformConfig,
    handle: Handle,
    script_tx: Mutex<Option<mpsc::UnboundedSender<ScriptTask>>>,
    loops: Mutex<HashMap<LoopId, CancellationToken>>,
    next_loop: AtomicU64,
    epoch: Instant,
    shutdown: CancellationToken,
}

impl TokioPlatform {
    /// Spawns the script worker on `handle`.
    pub fn new(config: PlatformConfig, handle: Handle) -> Self {
        let (script_tx, mut script_rx) = mpsc::unbounded_channel::<ScriptTask>();

        handle.spawn_blocking(move || {
            log::debug!("script worker started");
            while let Some(task) = script_rx.blocking_recv() {
                if catch_unwind(AssertUnwindSafe(task)).is_err() {
                    log::error!("script task panicked");
                }
            }
            log::debug!("script worker stopped");
        });

        Self {
            config,
            handle,
            script_tx: Mutex::new(Some(script_tx)),
            loops: Mutex::new(HashMap::new()),
            next_loop: AtomicU64::new(1),
            epoch: Instant::now(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Uses the runtime the caller is running on.
    pub fn current(config: PlatformConfig) -> Self {
        Self::new(config, Handle::current())
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    pub fn active_loops(&self) -> usize {
        self.loops.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Stops every loop and lets the script worker finish its queue.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.loops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.script_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl PlatformContext for TokioPlatform {
    fn begin_draw_loop(&self, on_tick: TickCallback) -> LoopId {
        let id = self.next_loop.fetch_add(1, Ordering::Relaxed);
        let token = self.shutdown.child_token();
        let period = self.config.frame_interval();
        let epoch = self.epoch;

        self.loops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, token.clone());

        self.handle.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => on_tick(epoch.elapsed().as_secs_f64()),
                }
            }
            log::debug!("draw loop {id} ended");
        });

        id
    }

    fn end_draw_loop(&self, id: LoopId) {
        if let Some(token) = self
            .loops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
        {
            token.cancel();
        }
    }

    fn run_on_script_thread(&self, task: ScriptTask) -> bool {
        let sender = self.script_tx.lock().unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            Some(tx) => {
                let queued = tx.send(task).is_ok();
                if !queued {
                    log::warn!("script worker gone, task dropped");
                }
                queued
            }
            None => {
                log::warn!("platform shut down, task dropped");
                false
            }
        }
    }

    fn pixel_density(&self) -> f32 {
        self.config.pixel_density
    }
}

impl Drop for TokioPlatform {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
