//! One-shot background terrain load. A worker thread fetches the elevation
//! grid (and optionally a map texture) and posts progress followed by
//! exactly one terminal event; the render loop polls once per frame.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use terrain_core::geo::GeoPoint;
use terrain_core::{ElevationGrid, TextureImage};

use crate::elevation::ElevationProvider;
use crate::tiles::{TileProvider, TileSource};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainRequest {
    pub centre: GeoPoint,
    /// Samples per grid edge.
    pub size: usize,
    /// Map tile zoom; `None` skips the texture entirely.
    pub tile_zoom: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct TerrainData {
    pub centre: GeoPoint,
    pub elevation: Arc<ElevationGrid>,
    pub texture: Option<TextureImage>,
}

#[derive(Debug, Clone)]
pub enum LoadEvent {
    /// Percent complete.
    Progress(u8),
    Loaded(TerrainData),
    Failed(String),
}

/// Where a load gets its data. Shared between successive loads.
pub struct TerrainSources {
    pub elevation: Box<dyn ElevationProvider>,
    pub tiles: Option<TileProvider<Box<dyn TileSource>>>,
}

impl TerrainSources {
    pub fn new(elevation: Box<dyn ElevationProvider>) -> Self {
        Self {
            elevation,
            tiles: None,
        }
    }

    pub fn with_tiles(mut self, tiles: TileProvider<Box<dyn TileSource>>) -> Self {
        self.tiles = Some(tiles);
        self
    }
}

pub fn spawn_terrain_load(request: TerrainRequest, sources: Arc<TerrainSources>) -> PendingLoad {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("terrain_load".to_string())
        .spawn(move || load_worker(request, &sources, tx))
        .expect("spawn terrain load thread");
    PendingLoad::new(rx)
}

fn load_worker(request: TerrainRequest, sources: &TerrainSources, tx: Sender<LoadEvent>) {
    let _ = tx.send(LoadEvent::Progress(25));
    let elevation = match sources.elevation.elevation_grid(request.centre, request.size) {
        Ok(grid) => grid,
        Err(err) => {
            let _ = tx.send(LoadEvent::Failed(format!(
                "elevation from {} failed: {err}",
                sources.elevation.name()
            )));
            return;
        }
    };
    let _ = tx.send(LoadEvent::Progress(50));

    let texture = match (request.tile_zoom, sources.tiles.as_ref()) {
        (Some(zoom), Some(provider)) => match provider.texture(request.centre, zoom) {
            Ok(texture) => Some(texture),
            Err(err) => {
                log::warn!("[terrain_fetch] map texture dropped: {err}");
                None
            }
        },
        _ => None,
    };
    let _ = tx.send(LoadEvent::Progress(100));

    let _ = tx.send(LoadEvent::Loaded(TerrainData {
        centre: request.centre,
        elevation: Arc::new(elevation),
        texture,
    }));
}

/// Receiving end of an in-flight load.
pub struct PendingLoad {
    rx: Receiver<LoadEvent>,
    progress: u8,
    finished: bool,
}

impl PendingLoad {
    fn new(rx: Receiver<LoadEvent>) -> Self {
        Self {
            rx,
            progress: 0,
            finished: false,
        }
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Drain whatever the worker has posted. Returns the terminal event the
    /// first time one is seen and `None` before and after that.
    pub fn poll(&mut self) -> Option<LoadEvent> {
        if self.finished {
            return None;
        }
        loop {
            match self.rx.try_recv() {
                Ok(LoadEvent::Progress(percent)) => {
                    self.progress = percent;
                    log::debug!("[terrain_fetch] load progress {percent}%");
                }
                Ok(event) => {
                    self.finished = true;
                    return Some(event);
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    self.finished = true;
                    return Some(LoadEvent::Failed(
                        "terrain load worker exited without a result".to_string(),
                    ));
                }
            }
        }
    }

    /// Block until the terminal event arrives. Used by headless runs.
    pub fn wait(mut self) -> LoadEvent {
        loop {
            match self.rx.recv() {
                Ok(LoadEvent::Progress(percent)) => self.progress = percent,
                Ok(event) => return event,
                Err(_) => {
                    return LoadEvent::Failed(
                        "terrain load worker exited without a result".to_string(),
                    );
                }
            }
        }
    }
}
