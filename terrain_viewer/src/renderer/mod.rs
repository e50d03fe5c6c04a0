//! wgpu backend for the terrain pipeline. Owns the device, surface and GPU
//! buffers and replays each `FramePlan` the core hands it. Submodules: `init`
//! for device and pipeline setup, `render` for executing a frame, `shaders`
//! for WGSL and the uniform block.

use std::sync::Arc;

use anyhow::Result;
use terrain_core::pipeline::FramePlan;
use terrain_core::TerrainPipeline;
use wgpu::SurfaceError;
use winit::{dpi::PhysicalSize, window::Window};

mod init;
mod render;
mod shaders;

/// Uploaded copy of one compiled terrain mesh.
struct GpuTerrain {
    generation: u64,
    vertex_buffer: wgpu::Buffer,
    strip_index_buffer: wgpu::Buffer,
    strips: Vec<(u32, u32)>,
    wireframe_index_buffer: wgpu::Buffer,
    wireframe_index_count: u32,
}

pub struct TerrainRenderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    solid_pipeline: wgpu::RenderPipeline,
    wireframe_pipeline: wgpu::RenderPipeline,
    placeholder_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    grid_vertex_buffer: wgpu::Buffer,
    grid_vertex_count: u32,
    placeholder_vertex_buffer: wgpu::Buffer,
    placeholder_vertex_count: u32,
    _depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
    terrain: Option<GpuTerrain>,
}

impl TerrainRenderer {
    pub async fn new(window: Arc<Window>, pipeline: &TerrainPipeline) -> Result<Self> {
        init::new(window, pipeline).await
    }

    pub fn window(&self) -> &Window {
        self.window.as_ref()
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        let (texture, view) = init::create_depth_texture(&self.device, new_size);
        self._depth_texture = texture;
        self.depth_view = view;
    }

    pub fn render(&mut self, plan: &FramePlan) -> Result<(), SurfaceError> {
        render::render(self, plan)
    }
}
