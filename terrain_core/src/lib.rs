//! Core of the terrain viewer: elevation grids, mesh construction, the
//! orbit camera, the per-frame draw plan and input mapping.
//!
//! Nothing in here touches a GPU, a window or the network. The viewer binary
//! executes the [`FramePlan`]s produced by [`TerrainPipeline`] and forwards
//! window input through [`InteractionController`]; the fetch crate produces
//! the [`ElevationGrid`]s that feed it.

pub mod bands;
pub mod camera;
pub mod config;
pub mod error;
pub mod geo;
pub mod grid;
pub mod input;
pub mod mesh;
pub mod pipeline;
pub mod scenery;

pub use bands::{BandPalette, HeightBand, heightmap_texture};
pub use camera::{CameraPose, OrbitCamera};
pub use config::{HeightThresholds, TerrainQuality, ViewerConfig};
pub use error::{Result, TerrainError};
pub use geo::{GeoPoint, TileCoord};
pub use grid::{ElevationGrid, HeightRange, TextureImage};
pub use input::{HostRequest, InputEvent, InteractionController, PointerButtons, ViewerKey};
pub use mesh::{MeshParams, TerrainMesh, TerrainVertex};
pub use pipeline::{DrawCommand, FramePlan, LoadOutcome, RenderMode, TerrainPipeline};
pub use scenery::LineVertex;
