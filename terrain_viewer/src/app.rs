//! Runtime state behind the window: the core pipeline and input controller,
//! the GPU renderer, and the background load currently in flight.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use terrain_core::input::{HostRequest, InputEvent};
use terrain_core::pipeline::LoadOutcome;
use terrain_core::{InteractionController, TerrainPipeline, ViewerConfig};
use terrain_fetch::loader::{LoadEvent, PendingLoad, TerrainRequest, TerrainSources, spawn_terrain_load};
use terrain_fetch::tiles;
use terrain_fetch::{
    FallbackElevation, HttpTileSource, OpenElevationClient, SyntheticElevation, TileCache,
    TileProvider, TileSource,
};
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::renderer::TerrainRenderer;

/// Elevation and tile sources for the given mode. Offline runs use synthetic
/// terrain only; online runs fall back to it when the lookup fails.
pub fn build_sources(config: &ViewerConfig, offline: bool) -> TerrainSources {
    if offline {
        return TerrainSources::new(Box::new(SyntheticElevation::default()));
    }

    let elevation = FallbackElevation::new(
        OpenElevationClient::from_settings(&config.api),
        SyntheticElevation::default(),
    );
    let cache = open_tile_cache(Path::new(&config.app.cache_dir), config.app.cache_max_age_days);
    let source: Box<dyn TileSource> = Box::new(HttpTileSource::from_settings(&config.api));
    TerrainSources::new(Box::new(elevation)).with_tiles(TileProvider::new(source, cache))
}

fn open_tile_cache(dir: &Path, max_age_days: u64) -> Option<TileCache> {
    let cache = match TileCache::open(dir) {
        Ok(cache) => cache,
        Err(err) => {
            log::warn!(
                "[terrain_viewer] tile cache {} unavailable, continuing without: {err}",
                dir.display()
            );
            return None;
        }
    };
    if let Err(err) = cache.prune(tiles::max_age_days(max_age_days)) {
        log::warn!("[terrain_viewer] pruning tile cache failed: {err}");
    }
    Some(cache)
}

/// Apply a finished load to the pipeline. Failures keep whatever terrain
/// (or placeholder) was showing.
pub fn apply_load_event(pipeline: &mut TerrainPipeline, event: LoadEvent) -> Option<LoadOutcome> {
    match event {
        LoadEvent::Loaded(data) => {
            let centre = data.centre;
            match pipeline.load_data(data.elevation, data.texture) {
                Ok(outcome) => {
                    log::info!(
                        "[terrain_viewer] terrain for ({:.4}, {:.4}) ready: {outcome:?}",
                        centre.lat,
                        centre.lon
                    );
                    Some(outcome)
                }
                Err(err) => {
                    log::error!("[terrain_viewer] could not build terrain mesh: {err}");
                    None
                }
            }
        }
        LoadEvent::Failed(reason) => {
            log::error!("[terrain_viewer] terrain load failed: {reason}");
            None
        }
        LoadEvent::Progress(_) => None,
    }
}

pub struct TerrainApp {
    pipeline: TerrainPipeline,
    controller: InteractionController,
    renderer: TerrainRenderer,
    sources: Arc<TerrainSources>,
    request: TerrainRequest,
    pending: Option<PendingLoad>,
}

impl TerrainApp {
    pub async fn new(
        window: Arc<Window>,
        config: &ViewerConfig,
        sources: Arc<TerrainSources>,
        request: TerrainRequest,
    ) -> Result<Self> {
        let pipeline = TerrainPipeline::new(config);
        let renderer = TerrainRenderer::new(window, &pipeline).await?;
        let mut app = Self {
            pipeline,
            controller: InteractionController::new(&config.camera),
            renderer,
            sources,
            request,
            pending: None,
        };
        app.start_load();
        Ok(app)
    }

    pub fn window(&self) -> &Window {
        self.renderer.window()
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.renderer.size()
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.renderer.resize(new_size);
    }

    /// Start a fresh load for the current request. A load already in
    /// flight is abandoned; its result is never applied.
    pub fn start_load(&mut self) {
        log::info!(
            "[terrain_viewer] loading terrain around ({:.4}, {:.4}), {} samples per edge",
            self.request.centre.lat,
            self.request.centre.lon,
            self.request.size
        );
        self.pending = Some(spawn_terrain_load(self.request, Arc::clone(&self.sources)));
    }

    /// Called once per frame. Returns true when new terrain was applied.
    pub fn poll_load(&mut self) -> bool {
        let Some(pending) = self.pending.as_mut() else {
            return false;
        };
        let Some(event) = pending.poll() else {
            return false;
        };
        self.pending = None;
        apply_load_event(&mut self.pipeline, event).is_some()
    }

    pub fn handle_input(&mut self, event: InputEvent) {
        match self.controller.handle(event, &mut self.pipeline) {
            Some(HostRequest::Reload) => self.start_load(),
            Some(HostRequest::Redraw) => self.window().request_redraw(),
            None => {}
        }
    }

    pub fn render(&mut self) -> Result<(), SurfaceError> {
        let size = self.renderer.size();
        let plan = self.pipeline.frame(size.width, size.height);
        self.renderer.render(&plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrain_core::ElevationGrid;
    use terrain_core::geo::GeoPoint;
    use terrain_core::pipeline::DrawCommand;
    use terrain_fetch::loader::TerrainData;

    fn loaded(grid: ElevationGrid) -> LoadEvent {
        LoadEvent::Loaded(TerrainData {
            centre: GeoPoint::new(0.0, 0.0),
            elevation: Arc::new(grid),
            texture: None,
        })
    }

    #[test]
    fn loaded_event_replaces_placeholder() {
        let mut pipeline = TerrainPipeline::new(&ViewerConfig::default());
        let grid = ElevationGrid::new(3, 3, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]).unwrap();
        let outcome = apply_load_event(&mut pipeline, loaded(grid));
        assert!(matches!(outcome, Some(LoadOutcome::Rebuilt { generation: 1, .. })));
        assert!(matches!(
            pipeline.frame(100, 100).commands.last(),
            Some(DrawCommand::DrawTerrain { .. })
        ));
    }

    #[test]
    fn failed_event_keeps_previous_state() {
        let mut pipeline = TerrainPipeline::new(&ViewerConfig::default());
        assert!(apply_load_event(&mut pipeline, LoadEvent::Failed("offline".into())).is_none());
        assert!(pipeline.mesh().is_none());
    }

    #[test]
    fn offline_sources_have_no_tiles() {
        let sources = build_sources(&ViewerConfig::default(), true);
        assert!(sources.tiles.is_none());
        assert_eq!(sources.elevation.name(), "synthetic");
    }

    #[test]
    fn unusable_cache_dir_is_skipped() {
        let dir = tempfile::TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        assert!(open_tile_cache(&blocker, 7).is_none());
        assert!(open_tile_cache(&dir.path().join("tiles"), 7).is_some());
        assert!(open_tile_cache(&dir.path().join("tiles"), u64::MAX).is_some());
    }
}
