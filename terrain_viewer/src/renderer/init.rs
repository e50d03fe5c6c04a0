use std::{borrow::Cow, sync::Arc};

use anyhow::{Context, Result};
use bytemuck::cast_slice;
use terrain_core::mesh::TerrainVertex;
use terrain_core::scenery::LineVertex;
use terrain_core::TerrainPipeline;
use wgpu::util::DeviceExt;
use winit::{dpi::PhysicalSize, window::Window};

use super::shaders::{FrameUniforms, TERRAIN_SHADER_SOURCE};
use super::TerrainRenderer;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Bundles the wgpu objects tied to the viewer window.
struct WgpuBootstrap {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    present_mode: wgpu::PresentMode,
    alpha_mode: wgpu::CompositeAlphaMode,
}

/// The four pipelines the frame plan can ask for.
struct Pipelines {
    solid: wgpu::RenderPipeline,
    wireframe: wgpu::RenderPipeline,
    placeholder: wgpu::RenderPipeline,
    line: wgpu::RenderPipeline,
}

/// Brings up the device and surface, builds every pipeline and uploads the
/// static scenery (reference grid, placeholder hill). Terrain buffers are
/// created later, the first time a frame plan references a new mesh.
pub(super) async fn new(window: Arc<Window>, pipeline: &TerrainPipeline) -> Result<TerrainRenderer> {
    let size = window.inner_size();
    let wgpu = bootstrap_wgpu(window.clone()).await?;
    let device = &wgpu.device;

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("frame-uniform-layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(
                    std::mem::size_of::<FrameUniforms>() as u64
                ),
            },
            count: None,
        }],
    });

    let lighting = pipeline.frame(size.width, size.height).lighting;
    let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("frame-uniform-buffer"),
        contents: cast_slice(&[FrameUniforms::identity(&lighting)]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("frame-uniform-bind-group"),
        layout: &bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform_buffer.as_entire_binding(),
        }],
    });

    let pipelines = create_pipelines(device, &bind_group_layout, wgpu.surface_format);

    let grid_vertices = pipeline.reference_grid_vertices();
    let grid_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("reference-grid-vertex-buffer"),
        contents: cast_slice(grid_vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let placeholder_vertices = pipeline.placeholder_vertices();
    let placeholder_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("placeholder-vertex-buffer"),
        contents: cast_slice(placeholder_vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });

    let (depth_texture, depth_view) = create_depth_texture(device, size);

    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: wgpu.surface_format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: wgpu.present_mode,
        desired_maximum_frame_latency: 2,
        alpha_mode: wgpu.alpha_mode,
        view_formats: vec![],
    };
    wgpu.surface.configure(&wgpu.device, &config);

    log::info!(
        "[terrain_viewer] renderer ready: {}x{} {:?}, {} grid vertices",
        size.width,
        size.height,
        wgpu.surface_format,
        grid_vertices.len()
    );

    Ok(TerrainRenderer {
        window,
        surface: wgpu.surface,
        device: wgpu.device,
        queue: wgpu.queue,
        config,
        size,
        solid_pipeline: pipelines.solid,
        wireframe_pipeline: pipelines.wireframe,
        placeholder_pipeline: pipelines.placeholder,
        line_pipeline: pipelines.line,
        uniform_buffer,
        uniform_bind_group,
        grid_vertex_buffer,
        grid_vertex_count: grid_vertices.len() as u32,
        placeholder_vertex_buffer,
        placeholder_vertex_count: placeholder_vertices.len() as u32,
        _depth_texture: depth_texture,
        depth_view,
        terrain: None,
    })
}

async fn bootstrap_wgpu(window: Arc<Window>) -> Result<WgpuBootstrap> {
    let instance = wgpu::Instance::default();
    let surface = instance
        .create_surface(window.clone())
        .context("creating wgpu surface")?;

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: Some(&surface),
        })
        .await
        .context("requesting wgpu adapter")?;

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("terrain-viewer-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        )
        .await
        .context("requesting wgpu device")?;

    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = surface_caps
        .formats
        .iter()
        .copied()
        .find(|format| format.is_srgb())
        .or_else(|| surface_caps.formats.first().copied())
        .context("surface reports no texture formats")?;
    let present_mode = surface_caps
        .present_modes
        .iter()
        .copied()
        .find(|mode| *mode == wgpu::PresentMode::Mailbox)
        .unwrap_or(wgpu::PresentMode::Fifo);
    let alpha_mode = surface_caps
        .alpha_modes
        .first()
        .copied()
        .unwrap_or(wgpu::CompositeAlphaMode::Opaque);

    Ok(WgpuBootstrap {
        surface,
        device,
        queue,
        surface_format,
        present_mode,
        alpha_mode,
    })
}

fn create_pipelines(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    surface_format: wgpu::TextureFormat,
) -> Pipelines {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("terrain-shader"),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(TERRAIN_SHADER_SOURCE)),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("terrain-pipeline-layout"),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    let terrain_attributes = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x3];
    let terrain_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<TerrainVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &terrain_attributes,
    };
    let line_attributes = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
    let line_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<LineVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &line_attributes,
    };

    let terrain_entry = ("terrain_vs_main", "terrain_fs_main");
    let line_entry = ("line_vs_main", "line_fs_main");
    let build = |label, entry, vertex_layout, primitive| {
        build_pipeline(
            device,
            &layout,
            &shader,
            surface_format,
            label,
            entry,
            vertex_layout,
            primitive,
        )
    };

    Pipelines {
        solid: build(
            "terrain-solid-pipeline",
            terrain_entry,
            &terrain_layout,
            wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: Some(wgpu::IndexFormat::Uint32),
                ..wgpu::PrimitiveState::default()
            },
        ),
        wireframe: build(
            "terrain-wireframe-pipeline",
            terrain_entry,
            &terrain_layout,
            wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                ..wgpu::PrimitiveState::default()
            },
        ),
        placeholder: build(
            "placeholder-pipeline",
            terrain_entry,
            &terrain_layout,
            wgpu::PrimitiveState::default(),
        ),
        line: build(
            "reference-grid-pipeline",
            line_entry,
            &line_layout,
            wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                ..wgpu::PrimitiveState::default()
            },
        ),
    }
}

#[allow(clippy::too_many_arguments)]
fn build_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    surface_format: wgpu::TextureFormat,
    label: &str,
    (vs_entry, fs_entry): (&str, &str),
    vertex_layout: &wgpu::VertexBufferLayout,
    primitive: wgpu::PrimitiveState,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: vs_entry,
            buffers: std::slice::from_ref(vertex_layout),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: fs_entry,
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive,
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}

pub(super) fn create_depth_texture(
    device: &wgpu::Device,
    size: PhysicalSize<u32>,
) -> (wgpu::Texture, wgpu::TextureView) {
    let extent = wgpu::Extent3d {
        width: size.width.max(1),
        height: size.height.max(1),
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("terrain-depth-texture"),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}
