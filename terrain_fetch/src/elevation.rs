//! Elevation sources. The live client queries an Open-Elevation style
//! lookup service; the synthetic source produces a deterministic rolling
//! landscape that stands in whenever the service is unavailable.

use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use terrain_core::config::ApiSettings;
use terrain_core::geo::{self, GeoPoint};
use terrain_core::ElevationGrid;

use crate::error::{FetchError, Result};
use crate::http::HttpClient;

/// Produces a `size x size` grid of heights centred on a location. Rows
/// follow latitude (south to north), columns longitude (west to east).
pub trait ElevationProvider: Send + Sync {
    fn name(&self) -> &str;
    fn elevation_grid(&self, centre: GeoPoint, size: usize) -> Result<ElevationGrid>;
}

#[derive(Debug, Serialize)]
struct LookupRequest {
    locations: Vec<LookupLocation>,
}

#[derive(Debug, Serialize)]
struct LookupLocation {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    results: Vec<LookupResult>,
}

#[derive(Debug, Deserialize)]
struct LookupResult {
    #[serde(default)]
    elevation: Option<f64>,
}

pub struct OpenElevationClient {
    http: HttpClient,
    url: String,
    batch_size: usize,
    rate_limit_delay: Duration,
}

impl OpenElevationClient {
    pub fn new(http: HttpClient, url: impl Into<String>, batch_size: usize) -> Self {
        Self {
            http,
            url: url.into(),
            batch_size: batch_size.max(1),
            rate_limit_delay: Duration::ZERO,
        }
    }

    pub fn from_settings(api: &ApiSettings) -> Self {
        let http = HttpClient::new(
            Duration::from_secs(api.request_timeout_secs),
            api.max_retries,
            &api.user_agent,
        );
        Self::new(http, api.elevation_url.clone(), api.batch_size)
            .with_rate_limit_delay(Duration::from_secs_f32(api.rate_limit_delay_secs.max(0.0)))
    }

    /// Pause inserted between consecutive batch requests.
    pub fn with_rate_limit_delay(mut self, delay: Duration) -> Self {
        self.rate_limit_delay = delay;
        self
    }

    fn lookup_batch(&self, batch: &[(f64, f64)]) -> Result<Vec<f32>> {
        let request = LookupRequest {
            locations: batch
                .iter()
                .map(|&(latitude, longitude)| LookupLocation {
                    latitude,
                    longitude,
                })
                .collect(),
        };
        let response: LookupResponse = self.http.post_json(&self.url, &request)?;
        if response.results.len() != batch.len() {
            return Err(FetchError::Decode(format!(
                "asked for {} elevations, got {}",
                batch.len(),
                response.results.len()
            )));
        }
        Ok(response
            .results
            .into_iter()
            .map(|result| result.elevation.unwrap_or(0.0) as f32)
            .collect())
    }
}

impl ElevationProvider for OpenElevationClient {
    fn name(&self) -> &str {
        "open-elevation"
    }

    fn elevation_grid(&self, centre: GeoPoint, size: usize) -> Result<ElevationGrid> {
        let (lats, lons) = geo::sample_lattice(centre, size);
        let points: Vec<(f64, f64)> = lats
            .iter()
            .flat_map(|&lat| lons.iter().map(move |&lon| (lat, lon)))
            .collect();

        let mut samples = Vec::with_capacity(points.len());
        for (index, batch) in points.chunks(self.batch_size).enumerate() {
            if index > 0 && !self.rate_limit_delay.is_zero() {
                thread::sleep(self.rate_limit_delay);
            }
            samples.extend(self.lookup_batch(batch)?);
        }
        log::debug!(
            "[terrain_fetch] fetched {} elevations around ({:.4}, {:.4})",
            samples.len(),
            centre.lat,
            centre.lon
        );

        Ok(ElevationGrid::new(size, size, samples)?)
    }
}

/// Deterministic stand-in terrain: a few octaves of sine ridges over a base
/// height of 100 with seeded noise, never below zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticElevation {
    seed: u64,
}

impl SyntheticElevation {
    const NOISE_STDDEV: f64 = 5.0;

    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn grid(&self, size: usize) -> Result<ElevationGrid> {
        let extent = size as f64;
        Ok(ElevationGrid::from_fn(size, size, |i, j| {
            let x = i as f64 / extent * 4.0;
            let y = j as f64 / extent * 4.0;
            let ridges = 50.0 * (2.0 * x).sin() * (2.0 * y).cos()
                + 25.0 * (4.0 * x).sin() * (4.0 * y).cos()
                + 10.0 * (8.0 * x).sin() * (8.0 * y).cos();
            let noise = gaussian(self.seed, i as u64, j as u64) * Self::NOISE_STDDEV;
            (100.0 + ridges + noise).max(0.0) as f32
        })?)
    }
}

impl ElevationProvider for SyntheticElevation {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn elevation_grid(&self, _centre: GeoPoint, size: usize) -> Result<ElevationGrid> {
        self.grid(size)
    }
}

/// Uses `primary` and substitutes synthetic terrain on any failure.
pub struct FallbackElevation<P> {
    primary: P,
    fallback: SyntheticElevation,
}

impl<P: ElevationProvider> FallbackElevation<P> {
    pub fn new(primary: P, fallback: SyntheticElevation) -> Self {
        Self { primary, fallback }
    }
}

impl<P: ElevationProvider> ElevationProvider for FallbackElevation<P> {
    fn name(&self) -> &str {
        self.primary.name()
    }

    fn elevation_grid(&self, centre: GeoPoint, size: usize) -> Result<ElevationGrid> {
        match self.primary.elevation_grid(centre, size) {
            Ok(grid) => Ok(grid),
            Err(err) => {
                log::warn!(
                    "[terrain_fetch] {} lookup failed ({err}); using synthetic terrain",
                    self.primary.name()
                );
                self.fallback.grid(size)
            }
        }
    }
}

fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Uniform in (0, 1], never zero so the log below stays finite.
fn unit(bits: u64) -> f64 {
    ((bits >> 11) as f64 + 1.0) / (1u64 << 53) as f64
}

/// Standard normal sample keyed by `(seed, i, j)` via Box-Muller.
fn gaussian(seed: u64, i: u64, j: u64) -> f64 {
    let key = splitmix64(seed ^ splitmix64(i.wrapping_mul(0x1_0000_0001) ^ splitmix64(j)));
    let u1 = unit(key);
    let u2 = unit(splitmix64(key));
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_server::{CannedResponse, TestServer};

    struct Broken;

    impl ElevationProvider for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn elevation_grid(&self, _centre: GeoPoint, _size: usize) -> Result<ElevationGrid> {
            Err(FetchError::Decode("no data".to_string()))
        }
    }

    fn client(url: String, batch: usize) -> OpenElevationClient {
        let http = HttpClient::new(Duration::from_secs(5), 1, "terrain-test");
        OpenElevationClient::new(http, url, batch)
    }

    #[test]
    fn synthetic_is_deterministic_and_non_negative() {
        let a = SyntheticElevation::new(7).grid(20).unwrap();
        let b = SyntheticElevation::new(7).grid(20).unwrap();
        let c = SyntheticElevation::new(8).grid(20).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!((a.rows(), a.cols()), (20, 20));
        assert!(a.samples().iter().all(|&h| h >= 0.0 && h.is_finite()));
    }

    #[test]
    fn synthetic_tracks_ridge_formula() {
        let grid = SyntheticElevation::default().grid(50).unwrap();
        // Cell (0, 0) sits on the base height; only noise moves it.
        assert!((grid.get(0, 0) - 100.0).abs() < 30.0);
        let range = grid.height_range();
        assert!(range.span() > 80.0, "{range:?}");
    }

    #[test]
    fn batches_requests_and_zeroes_nulls() {
        let server = TestServer::start(vec![
            CannedResponse::new(
                200,
                "application/json",
                r#"{"results":[{"elevation":10.0},{"elevation":null},{"elevation":30.5}]}"#,
            ),
            CannedResponse::new(200, "application/json", r#"{"results":[{"elevation":40}]}"#),
        ]);
        let grid = client(format!("{}/lookup", server.base_url), 3)
            .elevation_grid(GeoPoint::new(41.0, 29.0), 2)
            .unwrap();
        assert_eq!(grid.samples(), &[10.0, 0.0, 30.5, 40.0]);

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].starts_with("POST /lookup"));
        assert_eq!(requests[0].matches("latitude").count(), 3);
        assert_eq!(requests[1].matches("latitude").count(), 1);
    }

    #[test]
    fn short_response_is_rejected() {
        let server = TestServer::start(vec![CannedResponse::new(
            200,
            "application/json",
            r#"{"results":[{"elevation":1.0}]}"#,
        )]);
        let err = client(format!("{}/lookup", server.base_url), 100)
            .elevation_grid(GeoPoint::new(0.0, 0.0), 2)
            .unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn fallback_substitutes_synthetic_grid() {
        let synthetic = SyntheticElevation::new(3);
        let provider = FallbackElevation::new(Broken, synthetic);
        let grid = provider.elevation_grid(GeoPoint::new(0.0, 0.0), 10).unwrap();
        assert_eq!(grid, synthetic.grid(10).unwrap());
    }
}
