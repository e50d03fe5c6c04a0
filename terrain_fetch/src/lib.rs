//! Data-fetch side of the terrain viewer: elevation lookups, map tiles and
//! the background loader that hands finished data to the render loop.

pub mod elevation;
pub mod error;
pub mod http;
pub mod loader;
pub mod tiles;

pub use elevation::{ElevationProvider, FallbackElevation, OpenElevationClient, SyntheticElevation};
pub use error::{FetchError, Result};
pub use http::HttpClient;
pub use loader::{LoadEvent, PendingLoad, TerrainData, TerrainRequest, TerrainSources, spawn_terrain_load};
pub use tiles::{HttpTileSource, TileCache, TileProvider, TileSource, max_age_days};
