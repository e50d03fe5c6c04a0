//! Minimal geographic helpers: coordinate checks, great-circle distance and
//! Web Mercator slippy-map tile addressing.

use std::f64::consts::PI;

const EARTH_RADIUS_KM: f64 = 6371.0;
/// Degrees between neighbouring elevation samples (roughly 1 km).
pub const SAMPLE_SPACING_DEG: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        validate_coordinates(self.lat, self.lon)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: i64,
    pub y: i64,
    pub z: u32,
}

pub fn validate_coordinates(lat: f64, lon: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

/// Haversine distance in kilometres.
pub fn haversine_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

pub fn lat_lon_to_tile(point: GeoPoint, zoom: u32) -> TileCoord {
    let n = 2f64.powi(zoom as i32);
    let lat_rad = point.lat.to_radians();
    let x = ((point.lon + 180.0) / 360.0 * n).floor() as i64;
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n).floor() as i64;
    TileCoord { x, y, z: zoom }
}

/// North-west corner of a tile.
pub fn tile_to_lat_lon(tile: TileCoord) -> GeoPoint {
    let n = 2f64.powi(tile.z as i32);
    let lon = tile.x as f64 / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * tile.y as f64 / n)).sinh().atan().to_degrees();
    GeoPoint { lat, lon }
}

/// `count x count` tiles centred on `point` (row-major, north first).
/// Even counts are rounded up to the next odd number.
pub fn tile_neighbourhood(point: GeoPoint, zoom: u32, count: u32) -> Vec<Vec<TileCoord>> {
    let centre = lat_lon_to_tile(point, zoom);
    let half = (count / 2) as i64;
    (-half..=half)
        .map(|dy| {
            (-half..=half)
                .map(|dx| TileCoord {
                    x: centre.x + dx,
                    y: centre.y + dy,
                    z: zoom,
                })
                .collect()
        })
        .collect()
}

/// Latitudes and longitudes of a `size x size` sampling lattice centred on
/// `centre`, `SAMPLE_SPACING_DEG` apart, endpoints included.
pub fn sample_lattice(centre: GeoPoint, size: usize) -> (Vec<f64>, Vec<f64>) {
    let half = SAMPLE_SPACING_DEG * size as f64 / 2.0;
    (
        linspace(centre.lat - half, centre.lat + half, size),
        linspace(centre.lon - half, centre.lon + half, size),
    )
}

fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count).map(|i| start + step * i as f64).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_ranges() {
        assert!(validate_coordinates(90.0, -180.0));
        assert!(!validate_coordinates(90.1, 0.0));
        assert!(!validate_coordinates(0.0, 180.5));
        assert!(!validate_coordinates(f64::NAN, 0.0));
    }

    #[test]
    fn haversine_istanbul_to_ankara() {
        let km = haversine_distance(GeoPoint::new(41.0082, 28.9784), GeoPoint::new(39.9334, 32.8597));
        assert!((km - 350.0).abs() < 5.0, "{km}");
        assert_eq!(haversine_distance(GeoPoint::new(1.0, 2.0), GeoPoint::new(1.0, 2.0)), 0.0);
    }

    #[test]
    fn tile_math_round_trips_to_corner() {
        let tile = lat_lon_to_tile(GeoPoint::new(0.0, 0.0), 1);
        assert_eq!(tile, TileCoord { x: 1, y: 1, z: 1 });

        let istanbul = lat_lon_to_tile(GeoPoint::new(41.0082, 28.9784), 14);
        assert_eq!((istanbul.x, istanbul.y), (9510, 6142));
        let corner = tile_to_lat_lon(istanbul);
        assert!(corner.lat >= 41.0082 && corner.lon <= 28.9784);
    }

    #[test]
    fn neighbourhood_is_centred() {
        let tiles = tile_neighbourhood(GeoPoint::new(41.0082, 28.9784), 14, 3);
        assert_eq!(tiles.len(), 3);
        assert!(tiles.iter().all(|row| row.len() == 3));
        assert_eq!(tiles[1][1], lat_lon_to_tile(GeoPoint::new(41.0082, 28.9784), 14));
        assert_eq!(tiles[0][0].x + 1, tiles[1][1].x);
        assert_eq!(tiles[0][0].y + 1, tiles[1][1].y);
    }

    #[test]
    fn lattice_spans_half_size_each_way() {
        let (lats, lons) = sample_lattice(GeoPoint::new(10.0, 20.0), 5);
        assert_eq!(lats.len(), 5);
        assert!((lats[0] - 9.975).abs() < 1e-9);
        assert!((lats[4] - 10.025).abs() < 1e-9);
        assert!((lons[2] - 20.0).abs() < 1e-9);
    }
}
