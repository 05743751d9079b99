use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::Instant;

use anyhow::anyhow;
use serde::Serialize;

use crate::config::ViewConfig;
use crate::dom::{SceneNode, SharedScene};
use crate::errors::{PropertyError, ViewError};
use crate::platform::{ErrorReporter, LoopId, PlatformContext};
use crate::props::{names, PropId, PropertyContainer, PropertyValue};
use crate::registry::ViewId;
use crate::render::{Canvas, Color, Paint, RenderTarget};
use crate::view::{overlay_text, DrawCallback, DrawingMode, DurationRing, FrameInfo, FrameTiming};

/// Continuous loop bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LoopSlot {
    Idle,
    /// `begin_draw_loop` is being called, no id yet.
    Starting,
    Running(LoopId),
}

struct ViewState {
    mode: DrawingMode,
    callback: Option<DrawCallback>,
    /// Bumped whenever the callback is replaced or cleared.
    callback_generation: u64,
    timing: FrameTiming,
    durations: DurationRing,
    show_debug: bool,
    native_id: Option<ViewId>,
}

/// Counters exposed through `getFrameStats`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameStats {
    pub frames: u64,
    pub dropped_ticks: u64,
    pub errors: u64,
    pub discarded: u64,
    pub average_duration_ms: Option<f64>,
    pub mode: DrawingMode,
}

/// Clears a flag when dropped, so no exit path can leave it set.
struct FlagGuard<'a>(&'a AtomicBool);

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Draws one scene into one render target, on demand or continuously.
///
/// All drawing happens in tasks queued on the platform's script thread.
/// The view is shared behind an `Arc`; queued tasks and loop ticks only
/// hold weak references, so dropping the last strong reference ends
/// everything.
pub struct DrawView {
    me: Weak<DrawView>,
    config: ViewConfig,
    platform: RwLock<Option<Arc<dyn PlatformContext>>>,
    reporter: Arc<dyn ErrorReporter>,

    is_drawing: AtomicBool,
    tick_queued: AtomicBool,
    draw_loop: Mutex<LoopSlot>,
    /// Incremented on every loop start and end; ticks carrying an older
    /// generation are ignored.
    loop_generation: AtomicU64,

    state: Mutex<ViewState>,
    target: Mutex<Option<Box<dyn RenderTarget>>>,
    /// Bumped by every `set_surface`, so a frame can tell whether its
    /// target was replaced while it was out of the slot.
    surface_generation: AtomicU64,

    frames: AtomicU64,
    dropped_ticks: AtomicU64,
    errors: AtomicU64,
    discarded: AtomicU64,
}

impl DrawView {
    pub fn new(
        config: ViewConfig,
        platform: Arc<dyn PlatformContext>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            platform: RwLock::new(Some(platform)),
            reporter,
            is_drawing: AtomicBool::new(false),
            tick_queued: AtomicBool::new(false),
            draw_loop: Mutex::new(LoopSlot::Idle),
            loop_generation: AtomicU64::new(0),
            state: Mutex::new(ViewState {
                mode: config.drawing_mode,
                callback: None,
                callback_generation: 0,
                timing: FrameTiming::default(),
                durations: DurationRing::new(config.duration_samples),
                show_debug: config.show_debug_overlay,
                native_id: None,
            }),
            target: Mutex::new(None),
            surface_generation: AtomicU64::new(0),
            frames: AtomicU64::new(0),
            dropped_ticks: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
            config,
        })
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn target(&self) -> MutexGuard<'_, Option<Box<dyn RenderTarget>>> {
        self.target.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn draw_loop(&self) -> MutexGuard<'_, LoopSlot> {
        self.draw_loop.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn platform(&self) -> Option<Arc<dyn PlatformContext>> {
        self.platform
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn mode(&self) -> DrawingMode {
        self.state().mode
    }

    pub fn native_id(&self) -> Option<ViewId> {
        self.state().native_id
    }

    pub fn set_native_id(&self, id: ViewId) {
        self.state().native_id = Some(id);
    }

    pub fn is_drawing(&self) -> bool {
        self.is_drawing.load(Ordering::Acquire)
    }

    pub fn shows_debug_overlay(&self) -> bool {
        self.state().show_debug
    }

    pub fn has_draw_callback(&self) -> bool {
        self.state().callback.is_some()
    }

    /// Id of the running continuous loop.
    pub fn loop_id(&self) -> Option<LoopId> {
        match *self.draw_loop() {
            LoopSlot::Running(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_loop_running(&self) -> bool {
        *self.draw_loop() != LoopSlot::Idle
    }

    pub fn frame_stats(&self) -> FrameStats {
        let state = self.state();
        FrameStats {
            frames: self.frames.load(Ordering::Relaxed),
            dropped_ticks: self.dropped_ticks.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            average_duration_ms: state.durations.average(),
            mode: state.mode,
        }
    }

    // ---------- Scheduling ----------

    /// True when a platform and a draw callback are present, a surface is
    /// attached and no frame is in flight. A missing platform or callback
    /// also ends the continuous loop.
    pub fn is_ready_to_draw(&self) -> bool {
        if self.is_drawing() {
            return false;
        }
        if self.platform().is_none() || !self.has_draw_callback() {
            self.end_drawing_loop();
            return false;
        }
        self.target().is_some()
    }

    /// Schedules a frame on the script thread.
    ///
    /// On demand: draws exactly one untimed frame. Continuous: starts the
    /// draw loop if it is not running yet. No-op while a frame is in flight.
    pub fn request_redraw(&self) {
        if !self.is_ready_to_draw() {
            return;
        }
        let Some(platform) = self.platform() else {
            return;
        };
        if self
            .is_drawing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let me = self.me.clone();
        let queued = platform.run_on_script_thread(Box::new(move || {
            if let Some(view) = me.upgrade() {
                view.perform_redraw();
            }
        }));
        if !queued {
            self.is_drawing.store(false, Ordering::Release);
        }
    }

    fn perform_redraw(&self) {
        let guard = FlagGuard(&self.is_drawing);

        if self.mode() == DrawingMode::Continuous {
            drop(guard);
            self.begin_drawing_loop();
            return;
        }

        self.draw_frame(None);
    }

    /// Starts the continuous loop unless one is already running.
    pub fn begin_drawing_loop(&self) {
        let Some(platform) = self.platform() else {
            return;
        };

        let generation = {
            let mut slot = self.draw_loop();
            if *slot != LoopSlot::Idle {
                return;
            }
            *slot = LoopSlot::Starting;
            self.loop_generation.fetch_add(1, Ordering::AcqRel) + 1
        };

        let me = self.me.clone();
        let id = platform.begin_draw_loop(Box::new(move |timestamp| {
            if let Some(view) = me.upgrade() {
                view.on_tick(generation, timestamp);
            }
        }));

        let stale = {
            let mut slot = self.draw_loop();
            let current = self.loop_generation.load(Ordering::Acquire) == generation;
            if current && *slot == LoopSlot::Starting {
                *slot = LoopSlot::Running(id);
                false
            } else {
                true
            }
        };

        if stale {
            // Ended while starting
            platform.end_draw_loop(id);
        } else {
            log::debug!("draw loop {id} started");
        }
    }

    /// Ends the continuous loop. Safe to call repeatedly and from any thread.
    pub fn end_drawing_loop(&self) {
        let previous = {
            let mut slot = self.draw_loop();
            if *slot == LoopSlot::Idle {
                return;
            }
            self.loop_generation.fetch_add(1, Ordering::AcqRel);
            std::mem::replace(&mut *slot, LoopSlot::Idle)
        };

        if let LoopSlot::Running(id) = previous {
            if let Some(platform) = self.platform() {
                platform.end_draw_loop(id);
            }
            log::debug!("draw loop {id} ended");
        }
    }

    /// Handles one display refresh of the loop started at `generation`.
    fn on_tick(&self, generation: u64, timestamp: f64) {
        if self.loop_generation.load(Ordering::Acquire) != generation {
            return;
        }
        let Some(platform) = self.platform() else {
            return;
        };
        if self.tick_queued.swap(true, Ordering::AcqRel) {
            self.dropped_ticks.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let me = self.me.clone();
        let queued = platform.run_on_script_thread(Box::new(move || {
            let Some(view) = me.upgrade() else {
                return;
            };
            let _queued = FlagGuard(&view.tick_queued);

            if view.loop_generation.load(Ordering::Acquire) != generation || !view.is_ready_to_draw() {
                return;
            }
            if view
                .is_drawing
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }
            let _drawing = FlagGuard(&view.is_drawing);
            view.draw_frame(Some(timestamp));
        }));
        if !queued {
            self.tick_queued.store(false, Ordering::Release);
        }
    }

    // ---------- Drawing ----------

    /// Draws one frame into the attached target and presents it.
    ///
    /// The target is taken out of its slot for the duration of the frame,
    /// so the draw callback may call back into the view. While drawing,
    /// [`with_surface`](Self::with_surface) sees no surface.
    ///
    /// Failures and panics of the draw callback are reported and abort the
    /// frame. Returns whether a frame was presented.
    pub fn draw_frame(&self, timestamp: Option<f64>) -> bool {
        let (callback, generation, delta, fps, show_debug, mode) = {
            let mut state = self.state();
            let Some(callback) = state.callback.clone() else {
                return false;
            };
            let (delta, fps) = state.timing.advance(timestamp);
            (callback, state.callback_generation, delta, fps, state.show_debug, state.mode)
        };
        let pd = self.platform().map_or(1.0, |p| p.pixel_density());

        let (surface_generation, target) = {
            let mut slot = self.target();
            (self.surface_generation.load(Ordering::Acquire), slot.take())
        };
        let Some(mut target) = target else {
            log::debug!("no surface attached, frame skipped");
            return false;
        };

        let size = target.size();
        let info = FrameInfo {
            width: size.width as f32 / pd,
            height: size.height as f32 / pd,
            timestamp,
            delta,
            fps,
        };

        let start = Instant::now();
        let canvas = target.canvas();
        let mut outcome = canvas.save();
        if outcome.is_ok() {
            outcome = canvas
                .scale(pd, pd)
                .and_then(|_| invoke_guarded(&callback, &mut *canvas, &info));

            if outcome.is_ok() {
                let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
                let average = {
                    let mut state = self.state();
                    state.durations.push(elapsed_ms);
                    state.durations.average().unwrap_or(elapsed_ms)
                };
                if show_debug {
                    let (x, y) = self.config.overlay_origin;
                    outcome = canvas.draw_text(
                        &overlay_text(average, fps, mode),
                        x,
                        y,
                        self.config.overlay_font_size,
                        &Paint::fill(Color::RED),
                    );
                }
            }

            let restored = canvas.restore();
            outcome = outcome.and(restored);
        }
        let outcome = outcome.and_then(|_| canvas.flush());

        let presented = if self.state().callback_generation != generation {
            // Callback replaced or cleared while drawing
            target.discard();
            self.discarded.fetch_add(1, Ordering::Relaxed);
            Ok(false)
        } else {
            match outcome.and_then(|_| target.present()) {
                Ok(()) => Ok(true),
                Err(err) => {
                    target.discard();
                    Err(err)
                }
            }
        };
        self.put_back_target(target, surface_generation);

        match presented {
            Ok(presented) => {
                if presented {
                    self.frames.fetch_add(1, Ordering::Relaxed);
                }
                presented
            }
            Err(err) => {
                self.on_draw_error(err);
                false
            }
        }
    }

    /// Returns a target taken by [`draw_frame`](Self::draw_frame) unless
    /// `set_surface` ran in the meantime.
    fn put_back_target(&self, target: Box<dyn RenderTarget>, surface_generation: u64) {
        let mut slot = self.target();
        if self.surface_generation.load(Ordering::Acquire) == surface_generation && slot.is_none() {
            *slot = Some(target);
        } else {
            log::debug!("surface replaced while drawing, old target released");
        }
    }

    fn on_draw_error(&self, err: anyhow::Error) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        let err = anyhow::Error::new(ViewError::DrawFailed(format!("{err:#}")));
        self.reporter
            .report("An error occurred while rendering the view", Some(&err));

        if !self.config.retain_callback_on_error {
            {
                let mut state = self.state();
                state.callback = None;
                state.callback_generation += 1;
            }
            self.end_drawing_loop();
        }
    }

    // ---------- Configuration ----------

    /// Installs or clears the draw routine. Clearing ends the loop.
    pub fn set_draw_callback(&self, callback: Option<DrawCallback>) {
        let installed = callback.is_some();
        {
            let mut state = self.state();
            state.callback = callback;
            state.callback_generation += 1;
            state.timing.reset();
            state.durations.clear();
        }

        if installed {
            self.request_redraw();
        } else {
            self.end_drawing_loop();
        }
    }

    /// Installs a draw routine rendering `scene`, returning the shared root
    /// for later updates.
    pub fn set_scene(&self, scene: SceneNode) -> SharedScene {
        let shared: SharedScene = Arc::new(Mutex::new(scene));
        self.set_draw_callback(Some(DrawCallback::from_scene(shared.clone())));
        shared
    }

    /// Mutates `scene` and requests a redraw.
    pub fn update_scene<R>(&self, scene: &SharedScene, f: impl FnOnce(&mut SceneNode) -> R) -> R {
        let result = {
            let mut root = scene.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut root)
        };
        self.request_redraw();
        result
    }

    /// Switches modes. Ends the current loop and restarts timing.
    pub fn set_drawing_mode(&self, mode: DrawingMode) {
        self.end_drawing_loop();
        {
            let mut state = self.state();
            state.mode = mode;
            state.timing.reset();
        }
        self.request_redraw();
    }

    pub fn set_show_debug_overlay(&self, on: bool) {
        self.state().show_debug = on;
        self.request_redraw();
    }

    /// Attaches or detaches the drawing surface.
    pub fn set_surface(&self, target: Option<Box<dyn RenderTarget>>) {
        let attached = target.is_some();
        {
            let mut slot = self.target();
            self.surface_generation.fetch_add(1, Ordering::AcqRel);
            *slot = target;
        }
        if attached {
            self.request_redraw();
        }
    }

    /// Runs `f` on the attached surface.
    pub fn with_surface<R>(&self, f: impl FnOnce(&mut dyn RenderTarget) -> R) -> Option<R> {
        let mut target = self.target();
        target.as_mut().map(|t| f(t.as_mut()))
    }

    /// Handles one of the custom properties `drawCallback`, `mode` and
    /// `debug`. Other names are ignored.
    pub fn set_custom_property(&self, name: &str, value: &PropertyValue) -> Result<(), ViewError> {
        match name {
            names::DRAW_CALLBACK => match value {
                PropertyValue::Null => self.set_draw_callback(None),
                other => {
                    let callback = other
                        .downcast_host::<DrawCallback>()
                        .ok_or_else(|| unexpected(name, "draw callback"))?;
                    self.set_draw_callback(Some(callback.clone()));
                }
            },
            names::MODE => {
                let mode = match value {
                    PropertyValue::Null => DrawingMode::OnDemand,
                    other => other
                        .as_str()
                        .and_then(DrawingMode::from_name)
                        .ok_or_else(|| unexpected(name, "\"continuous\" or \"default\""))?,
                };
                self.set_drawing_mode(mode);
            }
            names::DEBUG => {
                let on = match value {
                    PropertyValue::Null => false,
                    other => other.as_bool().ok_or_else(|| unexpected(name, "bool"))?,
                };
                self.set_show_debug_overlay(on);
            }
            other => log::debug!("ignoring custom property {other}"),
        }
        Ok(())
    }

    /// Applies every property of `props` in order. Failures are reported
    /// and do not stop the remaining properties.
    pub fn apply_custom_properties(&self, props: &PropertyContainer) {
        let null = PropertyValue::Null;
        for prop in props.iter() {
            let value = prop.shared_value().map_or(&null, |v| v.as_ref());
            if let Err(err) = self.set_custom_property(prop.name().as_str(), value) {
                let err = anyhow::Error::new(err);
                self.reporter.report("setCustomProperty", Some(&err));
            }
        }
    }

    /// Dispatches a scripting-side action.
    pub fn call_custom_action(&self, name: &str, args: &[PropertyValue]) -> Result<PropertyValue, ViewError> {
        match name {
            "redraw" => {
                self.request_redraw();
                Ok(PropertyValue::Null)
            }
            "setDrawingMode" => {
                let mode = args
                    .first()
                    .and_then(PropertyValue::as_str)
                    .and_then(DrawingMode::from_name)
                    .ok_or_else(|| {
                        ViewError::invalid_argument(
                            "setDrawingMode",
                            "expected \"continuous\" or \"default\" as first argument",
                        )
                    })?;
                self.set_drawing_mode(mode);
                Ok(PropertyValue::Null)
            }
            "getFrameStats" => {
                let stats = self.frame_stats();
                Ok(PropertyValue::object([
                    ("frames", PropertyValue::Number(stats.frames as f64)),
                    ("droppedTicks", PropertyValue::Number(stats.dropped_ticks as f64)),
                    ("errors", PropertyValue::Number(stats.errors as f64)),
                    (
                        "averageDurationMs",
                        stats.average_duration_ms.map_or(PropertyValue::Null, PropertyValue::Number),
                    ),
                    ("mode", PropertyValue::from(stats.mode.name())),
                ]))
            }
            "makeImageSnapshot" => Ok(self
                .with_surface(|t| t.snapshot())
                .flatten()
                .unwrap_or(PropertyValue::Null)),
            other => Err(ViewError::UnknownAction(other.to_string())),
        }
    }

    /// Ends the loop and releases platform, callback and surface.
    pub fn teardown(&self) {
        self.end_drawing_loop();
        {
            let mut state = self.state();
            state.callback = None;
            state.callback_generation += 1;
        }
        self.set_surface(None);
        *self.platform.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl Drop for DrawView {
    fn drop(&mut self) {
        self.end_drawing_loop();
    }
}

impl std::fmt::Debug for DrawView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawView")
            .field("mode", &self.mode())
            .field("is_drawing", &self.is_drawing())
            .field("loop_id", &self.loop_id())
            .finish()
    }
}

fn unexpected(name: &str, expected: &'static str) -> ViewError {
    ViewError::Property(PropertyError::UnexpectedType {
        name: PropId::new(name),
        expected,
    })
}

fn invoke_guarded(callback: &DrawCallback, canvas: &mut dyn Canvas, info: &FrameInfo) -> anyhow::Result<()> {
    catch_unwind(AssertUnwindSafe(|| callback.invoke(canvas, info))).unwrap_or_else(|panic| {
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(anyhow!("draw callback panicked: {message}"))
    })
}
