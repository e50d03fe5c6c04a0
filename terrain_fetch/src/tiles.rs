//! Slippy-map tiles: download, on-disk cache and mosaic composition.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgb, RgbImage};
use terrain_core::config::ApiSettings;
use terrain_core::geo::{self, GeoPoint, TileCoord};
use terrain_core::TextureImage;

use crate::error::Result;
use crate::http::HttpClient;

pub const TILE_SIZE: u32 = 256;
/// Tiles per mosaic edge.
pub const MOSAIC_TILES: u32 = 3;
pub const GRADIENT_SIZE: u32 = 512;
const MISSING_TILE: Rgb<u8> = Rgb([200, 200, 200]);
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Cache age limit for a day count taken from config or the command line.
/// Saturates instead of overflowing on absurd values.
pub fn max_age_days(days: u64) -> Duration {
    Duration::from_secs(days.saturating_mul(SECONDS_PER_DAY))
}

/// Anything that can hand back the encoded bytes of one tile.
pub trait TileSource: Send + Sync {
    fn fetch_tile(&self, tile: TileCoord) -> Result<Vec<u8>>;
}

impl<T: TileSource + ?Sized> TileSource for Box<T> {
    fn fetch_tile(&self, tile: TileCoord) -> Result<Vec<u8>> {
        (**self).fetch_tile(tile)
    }
}

pub struct HttpTileSource {
    http: HttpClient,
    template: String,
}

impl HttpTileSource {
    /// `template` uses `{z}`, `{x}` and `{y}` placeholders.
    pub fn new(http: HttpClient, template: impl Into<String>) -> Self {
        Self {
            http,
            template: template.into(),
        }
    }

    pub fn from_settings(api: &ApiSettings) -> Self {
        let http = HttpClient::new(
            Duration::from_secs(api.tile_timeout_secs),
            api.max_retries,
            &api.user_agent,
        );
        Self::new(http, api.tile_url.clone())
    }

    pub fn url_for(&self, tile: TileCoord) -> String {
        self.template
            .replace("{z}", &tile.z.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
    }
}

impl TileSource for HttpTileSource {
    fn fetch_tile(&self, tile: TileCoord) -> Result<Vec<u8>> {
        self.http.get_bytes(&self.url_for(tile))
    }
}

/// Flat directory of `tile_{z}_{x}_{y}.png` files.
#[derive(Debug, Clone)]
pub struct TileCache {
    dir: PathBuf,
}

impl TileCache {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, tile: TileCoord) -> PathBuf {
        self.dir
            .join(format!("tile_{}_{}_{}.png", tile.z, tile.x, tile.y))
    }

    pub fn contains(&self, tile: TileCoord) -> bool {
        self.path_for(tile).is_file()
    }

    /// Cached tile, if present and decodable. Undecodable entries are
    /// deleted so the next lookup refetches them.
    pub fn load(&self, tile: TileCoord) -> Option<RgbImage> {
        let path = self.path_for(tile);
        if !path.is_file() {
            return None;
        }
        match image::open(&path) {
            Ok(image) => Some(image.to_rgb8()),
            Err(err) => {
                log::warn!(
                    "[terrain_fetch] removing corrupt cache entry {}: {err}",
                    path.display()
                );
                if let Err(err) = fs::remove_file(&path) {
                    log::warn!("[terrain_fetch] could not remove {}: {err}", path.display());
                }
                None
            }
        }
    }

    pub fn store(&self, tile: TileCoord, bytes: &[u8]) -> Result<()> {
        fs::write(self.path_for(tile), bytes)?;
        Ok(())
    }

    /// Delete cached tiles older than `max_age`. Returns how many went.
    pub fn prune(&self, max_age: Duration) -> Result<usize> {
        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        self.prune_modified_before(cutoff)
    }

    pub fn prune_modified_before(&self, cutoff: SystemTime) -> Result<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if !is_tile_file(&path) {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            if modified < cutoff {
                match fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                    Err(err) => return Err(err.into()),
                }
            }
        }
        if removed > 0 {
            log::info!(
                "[terrain_fetch] pruned {removed} cached tile(s) from {}",
                self.dir.display()
            );
        }
        Ok(removed)
    }
}

fn is_tile_file(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("tile_") && name.ends_with(".png"))
}

/// Fetches tiles through an optional cache and stitches them together.
pub struct TileProvider<S> {
    source: S,
    cache: Option<TileCache>,
}

impl<S: TileSource> TileProvider<S> {
    pub fn new(source: S, cache: Option<TileCache>) -> Self {
        Self { source, cache }
    }

    pub fn cache(&self) -> Option<&TileCache> {
        self.cache.as_ref()
    }

    /// One decoded tile, scaled to `TILE_SIZE` if the server sent another
    /// size. `None` when neither cache nor source can supply it.
    pub fn tile(&self, tile: TileCoord) -> Option<RgbImage> {
        if let Some(image) = self.cache.as_ref().and_then(|cache| cache.load(tile)) {
            log::debug!("[terrain_fetch] tile cache hit {tile:?}");
            return Some(fit_tile(image));
        }

        let bytes = match self.source.fetch_tile(tile) {
            Ok(bytes) => bytes,
            Err(err) => {
                log::warn!("[terrain_fetch] tile {tile:?} unavailable: {err}");
                return None;
            }
        };
        let image = match decode_png(&bytes) {
            Ok(image) => image,
            Err(err) => {
                log::warn!("[terrain_fetch] tile {tile:?} did not decode: {err}");
                return None;
            }
        };
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.store(tile, &bytes) {
                log::warn!("[terrain_fetch] could not cache tile {tile:?}: {err}");
            }
        }
        Some(fit_tile(image))
    }

    /// `MOSAIC_TILES x MOSAIC_TILES` tiles around `centre`, north-west tile
    /// in the top-left corner. Missing tiles are painted light grey; if
    /// none arrive at all the result is [`gradient_texture`].
    pub fn mosaic(&self, centre: GeoPoint, zoom: u32) -> RgbImage {
        let edge = MOSAIC_TILES * TILE_SIZE;
        let mut mosaic = RgbImage::from_pixel(edge, edge, MISSING_TILE);
        let mut found = 0usize;

        let neighbourhood = geo::tile_neighbourhood(centre, zoom, MOSAIC_TILES);
        for (row, tiles) in neighbourhood.iter().enumerate() {
            for (col, &tile) in tiles.iter().enumerate() {
                if let Some(image) = self.tile(tile) {
                    let x = (col as u32 * TILE_SIZE) as i64;
                    let y = (row as u32 * TILE_SIZE) as i64;
                    imageops::replace(&mut mosaic, &image, x, y);
                    found += 1;
                }
            }
        }

        if found == 0 {
            log::warn!("[terrain_fetch] no map tiles available; using gradient texture");
            return gradient_texture(GRADIENT_SIZE);
        }
        log::info!(
            "[terrain_fetch] composed {found}/{} tiles at zoom {zoom}",
            MOSAIC_TILES * MOSAIC_TILES
        );
        mosaic
    }

    pub fn texture(&self, centre: GeoPoint, zoom: u32) -> Result<TextureImage> {
        into_texture(self.mosaic(centre, zoom))
    }
}

fn fit_tile(image: RgbImage) -> RgbImage {
    if image.dimensions() == (TILE_SIZE, TILE_SIZE) {
        image
    } else {
        imageops::resize(&image, TILE_SIZE, TILE_SIZE, FilterType::Triangle)
    }
}

/// Stand-in map texture: a soft green-brown ramp across the image.
pub fn gradient_texture(size: u32) -> RgbImage {
    let extent = size.max(1) as f32;
    RgbImage::from_fn(size, size, |x, y| {
        let (x, y) = (x as f32, y as f32);
        Rgb([
            (100.0 + x / extent * 100.0) as u8,
            (150.0 + y / extent * 50.0) as u8,
            (80.0 + (x + y) / (2.0 * extent) * 100.0) as u8,
        ])
    })
}

pub fn into_texture(image: RgbImage) -> Result<TextureImage> {
    let (width, height) = image.dimensions();
    Ok(TextureImage::new(width, height, image.into_raw())?)
}

/// Decode PNG bytes; used to sanity-check downloads before they are cached.
pub fn decode_png(bytes: &[u8]) -> Result<RgbImage> {
    Ok(image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_rgb8())
}
