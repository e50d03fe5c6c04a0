//! Per-frame draw sequencing and the compiled-mesh cache.
//!
//! The pipeline lives on the render thread. It owns at most one compiled
//! mesh, replaced only through [`TerrainPipeline::load_data`]; every frame
//! it emits the same ordered plan (clear, camera, reference grid, then
//! terrain or placeholder) for a GPU backend to execute. Backends key their
//! uploaded buffers on the `generation` carried by `DrawTerrain`, so the
//! expensive work happens once per load rather than once per frame.

use std::sync::Arc;

use glam::{Mat4, Vec3};

use crate::bands::BandPalette;
use crate::camera::{CameraPose, OrbitCamera};
use crate::config::{LightingSettings, Rgba, ViewerConfig};
use crate::error::Result;
use crate::grid::{ElevationGrid, TextureImage};
use crate::mesh::{self, MeshParams, TerrainMesh, TerrainVertex};
use crate::scenery::{self, LineVertex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    #[default]
    Solid,
    Wireframe,
}

/// Directional light plus ambient term, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lighting {
    /// Unit vector pointing towards the light.
    pub direction: Vec3,
    pub ambient: f32,
    pub diffuse: f32,
}

impl From<&LightingSettings> for Lighting {
    fn from(settings: &LightingSettings) -> Self {
        let direction = Vec3::from(settings.direction).normalize_or_zero();
        Self {
            direction: if direction == Vec3::ZERO {
                Vec3::Z
            } else {
                direction
            },
            ambient: settings.ambient,
            diffuse: settings.diffuse,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameCamera {
    pub view_projection: Mat4,
    pub eye: Vec3,
}

#[derive(Debug, Clone)]
pub enum DrawCommand {
    Clear { color: Rgba },
    PositionCamera(FrameCamera),
    DrawReferenceGrid,
    DrawTerrain {
        mesh: Arc<TerrainMesh>,
        generation: u64,
        mode: RenderMode,
    },
    DrawPlaceholder,
}

/// Ordered commands for one frame.
#[derive(Debug, Clone)]
pub struct FramePlan {
    pub commands: Vec<DrawCommand>,
    pub lighting: Lighting,
}

impl FramePlan {
    pub fn terrain_generation(&self) -> Option<u64> {
        self.commands.iter().find_map(|command| match command {
            DrawCommand::DrawTerrain { generation, .. } => Some(*generation),
            _ => None,
        })
    }
}

/// What `load_data` did with the grid it was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Rebuilt { generation: u64, vertex_count: usize },
    /// Same grid instance as the cached one; nothing recompiled.
    Unchanged { generation: u64 },
}

struct CompiledTerrain {
    source: Arc<ElevationGrid>,
    mesh: Arc<TerrainMesh>,
    texture: Option<Arc<TextureImage>>,
    generation: u64,
}

pub struct TerrainPipeline {
    camera: OrbitCamera,
    loaded_pose: CameraPose,
    mesh_params: MeshParams,
    background: Rgba,
    lighting: Lighting,
    reference_grid: Vec<LineVertex>,
    placeholder: Vec<TerrainVertex>,
    compiled: Option<CompiledTerrain>,
    last_generation: u64,
    mode: RenderMode,
}

impl TerrainPipeline {
    pub fn new(config: &ViewerConfig) -> Self {
        let colors = &config.colors;
        Self {
            camera: OrbitCamera::new(&config.camera),
            loaded_pose: CameraPose::loaded(&config.camera),
            mesh_params: MeshParams {
                height_scale: config.render.height_scale,
                span: config.render.world_span,
                thresholds: config.thresholds,
                palette: BandPalette::from(colors),
            },
            background: colors.background,
            lighting: Lighting::from(&config.lighting),
            reference_grid: scenery::reference_grid(colors.grid),
            placeholder: scenery::placeholder_hill(colors.placeholder),
            compiled: None,
            last_generation: 0,
            mode: RenderMode::default(),
        }
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn render_mode(&self) -> RenderMode {
        self.mode
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) {
        if self.mode != mode {
            log::debug!("[terrain_core] render mode -> {mode:?}");
        }
        self.mode = mode;
    }

    pub fn mesh(&self) -> Option<&Arc<TerrainMesh>> {
        self.compiled.as_ref().map(|compiled| &compiled.mesh)
    }

    pub fn texture(&self) -> Option<&Arc<TextureImage>> {
        self.compiled.as_ref().and_then(|compiled| compiled.texture.as_ref())
    }

    pub fn generation(&self) -> Option<u64> {
        self.compiled.as_ref().map(|compiled| compiled.generation)
    }

    pub fn reference_grid_vertices(&self) -> &[LineVertex] {
        &self.reference_grid
    }

    pub fn placeholder_vertices(&self) -> &[TerrainVertex] {
        &self.placeholder
    }

    /// Compile `grid` and swap it in as the only cached mesh, then move the
    /// camera to the loaded pose. An invalid grid leaves the previous mesh
    /// (or the placeholder state) in place and returns the error.
    pub fn load_data(
        &mut self,
        grid: Arc<ElevationGrid>,
        texture: Option<TextureImage>,
    ) -> Result<LoadOutcome> {
        if let Some(compiled) = self.compiled.as_mut() {
            if Arc::ptr_eq(&compiled.source, &grid) {
                compiled.texture = texture.map(Arc::new);
                self.camera.move_to(self.loaded_pose);
                return Ok(LoadOutcome::Unchanged {
                    generation: compiled.generation,
                });
            }
        }

        let mesh = match mesh::build(&grid, &self.mesh_params) {
            Ok(mesh) => mesh,
            Err(err) => {
                log::warn!("[terrain_core] rejected elevation grid, keeping previous terrain: {err}");
                return Err(err);
            }
        };

        self.last_generation += 1;
        let generation = self.last_generation;
        let vertex_count = mesh.vertices().len();
        log::info!(
            "[terrain_core] compiled terrain mesh #{generation}: {}x{} grid, {vertex_count} vertices, {} triangles{}",
            mesh.rows(),
            mesh.cols(),
            mesh.triangle_count(),
            if mesh.height_range().is_flat() {
                " (flat)"
            } else {
                ""
            }
        );

        self.compiled = Some(CompiledTerrain {
            source: grid,
            mesh: Arc::new(mesh),
            texture: texture.map(Arc::new),
            generation,
        });
        self.camera.move_to(self.loaded_pose);

        Ok(LoadOutcome::Rebuilt {
            generation,
            vertex_count,
        })
    }

    /// Draw plan for a `width x height` frame.
    pub fn frame(&self, width: u32, height: u32) -> FramePlan {
        let mut commands = Vec::with_capacity(4);
        commands.push(DrawCommand::Clear {
            color: self.background,
        });
        commands.push(DrawCommand::PositionCamera(FrameCamera {
            view_projection: self.camera.view_projection(width, height),
            eye: self.camera.eye_position(),
        }));
        commands.push(DrawCommand::DrawReferenceGrid);
        commands.push(match self.compiled.as_ref() {
            Some(compiled) => DrawCommand::DrawTerrain {
                mesh: Arc::clone(&compiled.mesh),
                generation: compiled.generation,
                mode: self.mode,
            },
            None => DrawCommand::DrawPlaceholder,
        });

        FramePlan {
            commands,
            lighting: self.lighting,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TerrainError;

    fn pipeline() -> TerrainPipeline {
        TerrainPipeline::new(&ViewerConfig::default())
    }

    fn grid(value: f32) -> Arc<ElevationGrid> {
        Arc::new(ElevationGrid::new(3, 3, vec![value; 9]).unwrap())
    }

    #[test]
    fn empty_pipeline_draws_placeholder() {
        let plan = pipeline().frame(800, 600);
        assert!(matches!(plan.commands[0], DrawCommand::Clear { .. }));
        assert!(matches!(plan.commands[1], DrawCommand::PositionCamera(_)));
        assert!(matches!(plan.commands[2], DrawCommand::DrawReferenceGrid));
        assert!(matches!(plan.commands[3], DrawCommand::DrawPlaceholder));
        assert_eq!(plan.terrain_generation(), None);
    }

    #[test]
    fn load_moves_camera_to_loaded_pose() {
        let mut pipeline = pipeline();
        assert_eq!(pipeline.camera().distance, 5.0);
        pipeline.camera_mut().rotate(30.0, 30.0, 0.5);
        pipeline.load_data(grid(1.0), None).unwrap();
        assert_eq!(pipeline.camera().distance, 8.0);
        assert_eq!(pipeline.camera().rotation_x, -30.0);
        assert_eq!(pipeline.camera().rotation_y, 0.0);
    }

    #[test]
    fn reloading_same_grid_skips_rebuild() {
        let mut pipeline = pipeline();
        let source = grid(2.0);
        let first = pipeline.load_data(Arc::clone(&source), None).unwrap();
        let second = pipeline.load_data(Arc::clone(&source), None).unwrap();
        assert_eq!(
            first,
            LoadOutcome::Rebuilt {
                generation: 1,
                vertex_count: 9
            }
        );
        assert_eq!(second, LoadOutcome::Unchanged { generation: 1 });

        // An equal-valued but distinct grid is a new source.
        let third = pipeline.load_data(grid(2.0), None).unwrap();
        assert!(matches!(third, LoadOutcome::Rebuilt { generation: 2, .. }));
    }

    #[test]
    fn invalid_scale_keeps_previous_state() {
        let mut config = ViewerConfig::default();
        config.render.height_scale = 0.0;
        let mut pipeline = TerrainPipeline::new(&config);
        let err = pipeline.load_data(grid(1.0), None).unwrap_err();
        assert!(matches!(err, TerrainError::InvalidScale(_)));
        assert!(pipeline.mesh().is_none());
        assert!(matches!(
            pipeline.frame(10, 10).commands[3],
            DrawCommand::DrawPlaceholder
        ));
        assert_eq!(pipeline.camera().distance, 5.0);
    }

    #[test]
    fn render_mode_flows_into_terrain_command() {
        let mut pipeline = pipeline();
        pipeline.load_data(grid(0.0), None).unwrap();
        pipeline.set_render_mode(RenderMode::Wireframe);
        match &pipeline.frame(640, 480).commands[3] {
            DrawCommand::DrawTerrain { mode, .. } => assert_eq!(*mode, RenderMode::Wireframe),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn texture_is_kept_beside_mesh() {
        let mut pipeline = pipeline();
        let texture = TextureImage::new(1, 1, vec![1, 2, 3]).unwrap();
        pipeline.load_data(grid(0.0), Some(texture)).unwrap();
        assert_eq!(pipeline.texture().map(|t| t.rgb().to_vec()), Some(vec![1, 2, 3]));
    }

    #[test]
    fn lighting_direction_is_normalized() {
        let plan = pipeline().frame(1, 1);
        assert!((plan.lighting.direction.length() - 1.0).abs() < 1e-6);
        assert_eq!(plan.lighting.ambient, 0.3);
    }
}
