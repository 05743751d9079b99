use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::platform::{LoopId, PlatformContext, ScriptTask, TickCallback};

type SharedTick = Arc<dyn Fn(f64) + Send + Sync>;

#[derive(Default)]
struct State {
    tasks: VecDeque<ScriptTask>,
    loops: BTreeMap<LoopId, SharedTick>,
    next_loop: LoopId,
    begin_calls: usize,
}

/// Deterministic platform: tasks wait until [`run_pending`](Self::run_pending),
/// loops only tick on [`tick`](Self::tick).
pub struct ManualPlatform {
    state: Mutex<State>,
    pixel_density: f32,
}

impl ManualPlatform {
    pub fn new(pixel_density: f32) -> Self {
        Self {
            state: Mutex::new(State {
                next_loop: 1,
                ..State::default()
            }),
            pixel_density,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs queued tasks, including those queued while running, until the
    /// queue is empty. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let Some(task) = self.lock().tasks.pop_front() else {
                return ran;
            };
            task();
            ran += 1;
        }
    }

    pub fn pending_tasks(&self) -> usize {
        self.lock().tasks.len()
    }

    /// Fires every active loop once with `timestamp`.
    pub fn tick(&self, timestamp: f64) {
        let ticks: Vec<SharedTick> = self.lock().loops.values().cloned().collect();
        for tick in ticks {
            tick(timestamp);
        }
    }

    pub fn active_loops(&self) -> usize {
        self.lock().loops.len()
    }

    /// Total number of `begin_draw_loop` calls so far.
    pub fn begin_calls(&self) -> usize {
        self.lock().begin_calls
    }
}

impl Default for ManualPlatform {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl PlatformContext for ManualPlatform {
    fn begin_draw_loop(&self, on_tick: TickCallback) -> LoopId {
        let mut state = self.lock();
        let id = state.next_loop;
        state.next_loop += 1;
        state.begin_calls += 1;
        state.loops.insert(id, Arc::from(on_tick));
        id
    }

    fn end_draw_loop(&self, id: LoopId) {
        self.lock().loops.remove(&id);
    }

    fn run_on_script_thread(&self, task: ScriptTask) -> bool {
        self.lock().tasks.push_back(task);
        true
    }

    fn pixel_density(&self) -> f32 {
        self.pixel_density
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn tasks_run_in_order_including_nested() {
        let platform = Arc::new(ManualPlatform::default());
        let order = Arc::new(Mutex::new(Vec::new()));

        let (p, o) = (platform.clone(), order.clone());
        platform.run_on_script_thread(Box::new(move || {
            o.lock().unwrap().push(1);
            let o = o.clone();
            p.run_on_script_thread(Box::new(move || o.lock().unwrap().push(3)));
        }));
        let o = order.clone();
        platform.run_on_script_thread(Box::new(move || o.lock().unwrap().push(2)));

        assert_eq!(platform.run_pending(), 3);
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn ended_loops_stop_ticking() {
        let platform = ManualPlatform::default();
        let ticks = Arc::new(AtomicUsize::new(0));
        let t = ticks.clone();

        let id = platform.begin_draw_loop(Box::new(move |_| {
            t.fetch_add(1, Ordering::SeqCst);
        }));
        platform.tick(0.0);
        platform.end_draw_loop(id);
        platform.tick(1.0);

        assert_eq!(ticks.load(Ordering::SeqCst), 1);
        assert_eq!(platform.active_loops(), 0);
    }
}
