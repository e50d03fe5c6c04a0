use std::path::PathBuf;

use anyhow::{Context, Result, ensure};
use clap::Parser;
use terrain_core::config::{TerrainQuality, ViewerConfig, location_coordinates};
use terrain_core::geo::{self, GeoPoint};

#[derive(Parser, Debug)]
#[command(about = "Interactive 3D terrain viewer", version)]
pub struct Args {
    /// Latitude of the area to show (needs --lon)
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude of the area to show (needs --lat)
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// Named preset location (Istanbul, Ankara, Everest, Grand_Canyon, ...)
    #[arg(long, conflicts_with_all = ["lat", "lon"])]
    pub location: Option<String>,

    /// Optional JSON config overriding the built-in defaults
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Quality preset: low, medium or high
    #[arg(long, value_parser = parse_quality)]
    pub quality: Option<TerrainQuality>,

    /// Use synthetic elevation and skip map tiles entirely
    #[arg(long)]
    pub offline: bool,

    /// Map tile zoom level (overrides the quality preset)
    #[arg(long)]
    pub zoom: Option<u32>,

    /// Fetch and compile the terrain, print a summary and exit without a window
    #[arg(long)]
    pub headless: bool,
}

fn parse_quality(value: &str) -> Result<TerrainQuality, String> {
    TerrainQuality::parse(value).ok_or_else(|| format!("unknown quality '{value}' (low, medium, high)"))
}

impl Args {
    /// Defaults, then the config file, then command-line overrides.
    pub fn load_config(&self) -> Result<ViewerConfig> {
        let mut config = match &self.config {
            Some(path) => ViewerConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => ViewerConfig::default(),
        };
        if let Some(quality) = self.quality {
            config = config.with_quality(quality);
        }
        if let Some(zoom) = self.zoom {
            ensure!(zoom <= 19, "tile zoom must be at most 19 (got {zoom})");
            config.render.tile_zoom = zoom;
        }
        config.validate().context("validating configuration")?;
        Ok(config)
    }

    pub fn centre(&self) -> Result<GeoPoint> {
        let (lat, lon) = match (self.lat, self.lon, self.location.as_deref()) {
            (Some(lat), Some(lon), _) => (lat, lon),
            (_, _, Some(name)) => location_coordinates(name),
            _ => location_coordinates("Istanbul"),
        };
        ensure!(
            geo::validate_coordinates(lat, lon),
            "coordinates out of range: lat {lat} must be within [-90, 90], lon {lon} within [-180, 180]"
        );
        Ok(GeoPoint::new(lat, lon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("terrain_viewer").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn explicit_coordinates_win() {
        let args = parse(&["--lat", "-33.9", "--lon", "18.4"]);
        assert_eq!(args.centre().unwrap(), GeoPoint::new(-33.9, 18.4));
    }

    #[test]
    fn named_and_default_locations() {
        assert_eq!(
            parse(&["--location", "everest"]).centre().unwrap(),
            GeoPoint::new(27.9881, 86.9250)
        );
        assert_eq!(parse(&[]).centre().unwrap(), GeoPoint::new(41.0082, 28.9784));
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        assert!(parse(&["--lat", "95", "--lon", "0"]).centre().is_err());
        assert!(Args::try_parse_from(["terrain_viewer", "--lat", "10"]).is_err());
    }

    #[test]
    fn quality_and_zoom_override_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"render": {{"terrain_size": 64}}, "camera": {{"distance": 7.5}}}}"#).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = parse(&["--config", &path]).load_config().unwrap();
        assert_eq!(config.render.terrain_size, 64);
        assert_eq!(config.camera.distance, 7.5);

        let config = parse(&["--config", &path, "--quality", "high", "--zoom", "15"])
            .load_config()
            .unwrap();
        assert_eq!(config.render.terrain_size, 100);
        assert_eq!(config.render.height_scale, 0.2);
        assert_eq!(config.render.tile_zoom, 15);
    }

    #[test]
    fn unknown_quality_is_a_parse_error() {
        assert!(Args::try_parse_from(["terrain_viewer", "--quality", "ultra"]).is_err());
    }
}
