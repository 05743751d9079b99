use std::sync::Arc;
use std::time::Duration;

use canvas_dom::config::{init_logging, LogLevel};
use canvas_dom::render::RecordingBackend;
use canvas_dom::render::RenderBackend;
use canvas_dom::{
    create_node, DrawView, DrawingMode, LogReporter, PlatformConfig, PropertyValue, SharedValue,
    TokioPlatform, ViewConfig, ViewId, ViewRegistry,
};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(LogLevel::Debug);

    // The platform drives the draw loop at the display refresh rate and runs every frame on its
    // script worker.
    let platform_cfg = PlatformConfig::builder()
        .refresh_rate(60)
        .pixel_density(2.0)
        .build()?;
    let platform = Arc::new(TokioPlatform::current(platform_cfg));

    // Views start on demand. We enable the debug overlay so the recorded frames carry the timing
    // text as well.
    let view_cfg = ViewConfig::builder().show_debug_overlay(true).build()?;
    let view = DrawView::new(view_cfg, platform.clone(), Arc::new(LogReporter));

    // The recording backend does not rasterize anything, it keeps the display list of every
    // presented frame.
    let backend = RecordingBackend::new();
    view.set_surface(Some(backend.create_target(canvas_dom::render::SurfaceSize::new(400, 300))?));

    // Build a small tree: a half transparent group with a rect and a rounded
    // rect stroked with the paint declared before it.
    let mut group = create_node("GroupNode", &[PropertyValue::from(json!({ "opacity": 0.5 }))])?;
    group.append_child(create_node(
        "RectNode",
        &[PropertyValue::from(json!({ "x": 10, "y": 10, "width": 100, "height": 50, "color": "#3366ff" }))],
    )?)?;
    group.append_child(create_node(
        "PaintNode",
        &[PropertyValue::from(json!({ "color": "#ff9900", "style": "stroke", "strokeWidth": 3 }))],
    )?)?;
    group.append_child(create_node(
        "RRectNode",
        &[PropertyValue::from(json!({ "x": 40, "y": 80, "width": 120, "height": 60, "r": 12 }))],
    )?)?;

    // Register the view so scripting-side properties and actions can reach it by id.
    let registry = ViewRegistry::new(Arc::new(LogReporter));
    let id = ViewId(1);
    registry.register_view(id, view.clone());
    let scene = view.set_scene(group);

    // A shared value standing in for an animation driver. Every change requests a redraw.
    let progress = SharedValue::new(0.0);
    let _unsubscribe = registry.register_values_in_view(id, &[progress.clone()]);
    for step in 1..=3 {
        view.update_scene(&scene, |root| root.set_property("opacity", PropertyValue::from(step as f64 / 3.0)))?;
        progress.set(step as f64);
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    // Switch to continuous mode for a moment, then back.
    registry.set_custom_property(id, "mode", DrawingMode::Continuous.name())?;
    tokio::time::sleep(Duration::from_millis(250)).await;
    registry.call_custom_action(id, "setDrawingMode", &[PropertyValue::from("default")])?;

    let stats = registry.call_custom_action(id, "getFrameStats", &[])?;
    println!("frame stats: {stats:?}");
    println!("{}", serde_json::to_string_pretty(&view.frame_stats())?);

    registry.invalidate();
    Ok(())
}
