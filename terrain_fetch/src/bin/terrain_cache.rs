use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail, ensure};
use clap::{Args, Parser, Subcommand};
use image::ColorType;
use terrain_core::config::{ViewerConfig, location_coordinates};
use terrain_core::geo::{self, GeoPoint};
use terrain_core::{BandPalette, heightmap_texture};
use terrain_fetch::{
    ElevationProvider, FallbackElevation, HttpTileSource, OpenElevationClient, SyntheticElevation,
    TileCache, TileProvider, max_age_days,
};

/// Maintain the on-disk map tile cache and inspect elevation data.
#[derive(Parser, Debug)]
struct Cli {
    /// Optional JSON config overriding the built-in defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Cache directory (defaults to the configured one)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download the tiles around a location into the cache
    Prefetch {
        #[command(flatten)]
        location: LocationArgs,
        /// Tile zoom level (defaults to the configured one)
        #[arg(long)]
        zoom: Option<u32>,
        /// Tiles per edge of the square to fetch
        #[arg(long, default_value_t = 3)]
        count: u32,
    },
    /// Delete cached tiles older than the given age
    Clean {
        #[arg(long)]
        max_age_days: Option<u64>,
    },
    /// Write a height-banded PNG of a location's elevation grid
    Heightmap {
        #[command(flatten)]
        location: LocationArgs,
        /// Samples per grid edge (defaults to the configured terrain size)
        #[arg(long)]
        size: Option<usize>,
        /// Use synthetic elevation instead of the lookup service
        #[arg(long)]
        offline: bool,
        /// Destination PNG
        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(Args, Debug)]
struct LocationArgs {
    /// Named location (Istanbul, Ankara, Everest, ...)
    #[arg(long, conflicts_with_all = ["lat", "lon"])]
    location: Option<String>,
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,
}

impl LocationArgs {
    fn resolve(&self) -> Result<GeoPoint> {
        let (lat, lon) = match (self.lat, self.lon, self.location.as_deref()) {
            (Some(lat), Some(lon), _) => (lat, lon),
            (_, _, Some(name)) => location_coordinates(name),
            _ => location_coordinates("Istanbul"),
        };
        ensure!(
            geo::validate_coordinates(lat, lon),
            "coordinates out of range: lat {lat}, lon {lon}"
        );
        Ok(GeoPoint::new(lat, lon))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ViewerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ViewerConfig::default(),
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.app.log_level))
        .init();

    let cache_dir = cli
        .cache_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.app.cache_dir));

    match cli.command {
        Command::Prefetch {
            location,
            zoom,
            count,
        } => prefetch(&config, &cache_dir, location.resolve()?, zoom, count),
        Command::Clean { max_age_days: days } => {
            clean(&cache_dir, days.unwrap_or(config.app.cache_max_age_days))
        }
        Command::Heightmap {
            location,
            size,
            offline,
            output,
        } => heightmap(&config, location.resolve()?, size, offline, &output),
    }
}

fn prefetch(
    config: &ViewerConfig,
    cache_dir: &Path,
    centre: GeoPoint,
    zoom: Option<u32>,
    count: u32,
) -> Result<()> {
    ensure!(count > 0, "--count must be positive");
    let zoom = zoom.unwrap_or(config.render.tile_zoom);
    let cache = TileCache::open(cache_dir)
        .with_context(|| format!("opening cache {}", cache_dir.display()))?;
    let provider = TileProvider::new(HttpTileSource::from_settings(&config.api), Some(cache));

    let (mut cached, mut fetched, mut failed) = (0, 0, 0);
    for tile in geo::tile_neighbourhood(centre, zoom, count).into_iter().flatten() {
        let already = provider.cache().is_some_and(|cache| cache.contains(tile));
        match provider.tile(tile) {
            Some(_) if already => cached += 1,
            Some(_) => fetched += 1,
            None => failed += 1,
        }
    }

    println!("zoom {zoom}: {fetched} fetched, {cached} already cached, {failed} failed");
    if fetched + cached == 0 {
        bail!("no tiles could be fetched");
    }
    Ok(())
}

fn clean(cache_dir: &Path, days: u64) -> Result<()> {
    let cache = TileCache::open(cache_dir)
        .with_context(|| format!("opening cache {}", cache_dir.display()))?;
    let removed = cache
        .prune(max_age_days(days))
        .context("pruning tile cache")?;
    println!("removed {removed} tile(s) older than {days} day(s)");
    Ok(())
}

fn heightmap(
    config: &ViewerConfig,
    centre: GeoPoint,
    size: Option<usize>,
    offline: bool,
    output: &Path,
) -> Result<()> {
    let size = size.unwrap_or(config.render.terrain_size);
    let grid = if offline {
        SyntheticElevation::default().elevation_grid(centre, size)
    } else {
        FallbackElevation::new(
            OpenElevationClient::from_settings(&config.api),
            SyntheticElevation::default(),
        )
        .elevation_grid(centre, size)
    }
    .context("fetching elevation grid")?;

    let range = grid.height_range();
    let texture = heightmap_texture(&grid, &config.thresholds, &BandPalette::from(&config.colors))
        .context("colouring heightmap")?;
    image::save_buffer(
        output,
        texture.rgb(),
        texture.width(),
        texture.height(),
        ColorType::Rgb8,
    )
    .with_context(|| format!("writing {}", output.display()))?;

    println!(
        "{}x{} heightmap ({:.1}..{:.1}) -> {}",
        grid.cols(),
        grid.rows(),
        range.min,
        range.max,
        output.display()
    );
    Ok(())
}
