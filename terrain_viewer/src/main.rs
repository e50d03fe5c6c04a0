mod app;
mod cli;
mod input;
mod renderer;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use pollster::FutureExt;
use terrain_core::pipeline::DrawCommand;
use terrain_core::{TerrainPipeline, ViewerConfig};
use terrain_fetch::loader::{LoadEvent, TerrainRequest, spawn_terrain_load};
use wgpu::SurfaceError;
use winit::{
    dpi::PhysicalSize,
    event::{Event, KeyEvent, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};

use app::{TerrainApp, apply_load_event, build_sources};
use cli::Args;
use input::{KeyAction, PointerTracker};
use terrain_core::input::InputEvent;

fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.load_config()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.app.log_level.as_str()),
    )
    .init();

    let centre = args.centre()?;
    let request = TerrainRequest {
        centre,
        size: config.render.terrain_size,
        tile_zoom: (!args.offline).then_some(config.render.tile_zoom),
    };
    let sources = Arc::new(build_sources(&config, args.offline));
    log::info!(
        "[terrain_viewer] centre ({:.4}, {:.4}), {:?} quality, elevation from {}",
        centre.lat,
        centre.lon,
        config.render.quality,
        sources.elevation.name()
    );

    if args.headless {
        return run_headless(&config, request, sources);
    }

    let event_loop = EventLoop::new().context("creating winit event loop")?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.app.window_title.as_str())
            .with_inner_size(PhysicalSize::new(
                config.app.window_width,
                config.app.window_height,
            ))
            .build(&event_loop)
            .context("creating viewer window")?,
    );

    let mut app = TerrainApp::new(window, &config, sources, request).block_on()?;
    let mut pointer = PointerTracker::default();
    let frame_interval = Duration::from_secs_f64(1.0 / f64::from(config.app.fps_target.max(1)));

    event_loop
        .run(move |event, target| match event {
            Event::WindowEvent { window_id, event } if window_id == app.window().id() => {
                match event {
                    WindowEvent::CloseRequested => target.exit(),
                    WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                logical_key,
                                state,
                                ..
                            },
                        ..
                    } => match input::key_action(&logical_key, state) {
                        Some(KeyAction::Quit) => target.exit(),
                        Some(KeyAction::Viewer(key)) => app.handle_input(InputEvent::Key(key)),
                        None => {}
                    },
                    WindowEvent::CursorMoved { position, .. } => {
                        app.handle_input(pointer.cursor_moved(position))
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        if let Some(event) = pointer.mouse_button(button, state) {
                            app.handle_input(event);
                        }
                    }
                    WindowEvent::MouseWheel { delta, .. } => app.handle_input(input::wheel(delta)),
                    WindowEvent::Resized(new_size) => app.resize(new_size),
                    WindowEvent::RedrawRequested => match app.render() {
                        Ok(_) => {}
                        Err(SurfaceError::Lost) => app.resize(app.size()),
                        Err(SurfaceError::OutOfMemory) => target.exit(),
                        Err(err) => log::warn!("[terrain_viewer] render error: {err:?}"),
                    },
                    _ => {}
                }
            }
            Event::AboutToWait => {
                app.poll_load();
                app.window().request_redraw();
                target.set_control_flow(ControlFlow::WaitUntil(Instant::now() + frame_interval));
            }
            _ => {}
        })
        .context("running viewer application")?;
    Ok(())
}

/// Load and compile the terrain once without opening a window, then print
/// what a frame would contain.
fn run_headless(
    config: &ViewerConfig,
    request: TerrainRequest,
    sources: Arc<terrain_fetch::TerrainSources>,
) -> Result<()> {
    let mut pipeline = TerrainPipeline::new(config);
    let event = spawn_terrain_load(request, sources).wait();
    if let LoadEvent::Failed(reason) = &event {
        bail!("terrain load failed: {reason}");
    }
    if apply_load_event(&mut pipeline, event).is_none() {
        bail!("terrain could not be compiled");
    }
    let Some(mesh) = pipeline.mesh() else {
        bail!("no terrain mesh after load");
    };

    let range = mesh.height_range();
    println!("Terrain around ({:.4}, {:.4})", request.centre.lat, request.centre.lon);
    println!("  grid: {}x{}", mesh.rows(), mesh.cols());
    println!("  vertices: {}", mesh.vertices().len());
    println!("  triangles: {}", mesh.triangle_count());
    println!(
        "  height range: {:.1} .. {:.1}{}",
        range.min,
        range.max,
        if range.is_flat() { " (flat)" } else { "" }
    );
    match pipeline.texture() {
        Some(texture) => println!("  texture: {}x{}", texture.width(), texture.height()),
        None => println!("  texture: none"),
    }

    let plan = pipeline.frame(config.app.window_width, config.app.window_height);
    let steps: Vec<&str> = plan
        .commands
        .iter()
        .map(|command| match command {
            DrawCommand::Clear { .. } => "clear",
            DrawCommand::PositionCamera(_) => "camera",
            DrawCommand::DrawReferenceGrid => "grid",
            DrawCommand::DrawTerrain { .. } => "terrain",
            DrawCommand::DrawPlaceholder => "placeholder",
        })
        .collect();
    println!(
        "  frame plan (generation {}): {}",
        plan.terrain_generation().unwrap_or_default(),
        steps.join(" -> ")
    );
    Ok(())
}
