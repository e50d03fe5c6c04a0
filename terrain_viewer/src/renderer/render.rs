use bytemuck::cast_slice;
use terrain_core::TerrainMesh;
use terrain_core::pipeline::{DrawCommand, FramePlan, RenderMode};
use wgpu::SurfaceError;
use wgpu::util::DeviceExt;

use super::shaders::FrameUniforms;
use super::{GpuTerrain, TerrainRenderer};

/// Replays one frame plan. Uniform writes and mesh uploads happen before the
/// pass opens; the pass then issues draws in plan order.
pub(super) fn render(state: &mut TerrainRenderer, plan: &FramePlan) -> Result<(), SurfaceError> {
    let mut clear = wgpu::Color::BLACK;
    for command in &plan.commands {
        match command {
            DrawCommand::Clear { color } => clear = to_wgpu_color(*color),
            DrawCommand::PositionCamera(camera) => {
                let uniforms = FrameUniforms::new(camera, &plan.lighting);
                state
                    .queue
                    .write_buffer(&state.uniform_buffer, 0, cast_slice(&[uniforms]));
            }
            DrawCommand::DrawTerrain {
                mesh, generation, ..
            } => ensure_terrain_uploaded(state, mesh, *generation),
            DrawCommand::DrawReferenceGrid | DrawCommand::DrawPlaceholder => {}
        }
    }

    let frame = state.surface.get_current_texture()?;
    let view = frame
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());
    let mut encoder = state
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("terrain-viewer-encoder"),
        });

    {
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("terrain-viewer-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &state.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        rpass.set_bind_group(0, &state.uniform_bind_group, &[]);

        for command in &plan.commands {
            match command {
                DrawCommand::DrawReferenceGrid => {
                    rpass.set_pipeline(&state.line_pipeline);
                    rpass.set_vertex_buffer(0, state.grid_vertex_buffer.slice(..));
                    rpass.draw(0..state.grid_vertex_count, 0..1);
                }
                DrawCommand::DrawPlaceholder => {
                    rpass.set_pipeline(&state.placeholder_pipeline);
                    rpass.set_vertex_buffer(0, state.placeholder_vertex_buffer.slice(..));
                    rpass.draw(0..state.placeholder_vertex_count, 0..1);
                }
                DrawCommand::DrawTerrain { mode, .. } => {
                    let Some(terrain) = state.terrain.as_ref() else {
                        continue;
                    };
                    rpass.set_vertex_buffer(0, terrain.vertex_buffer.slice(..));
                    match mode {
                        RenderMode::Solid => {
                            rpass.set_pipeline(&state.solid_pipeline);
                            rpass.set_index_buffer(
                                terrain.strip_index_buffer.slice(..),
                                wgpu::IndexFormat::Uint32,
                            );
                            for &(start, count) in &terrain.strips {
                                rpass.draw_indexed(start..start + count, 0, 0..1);
                            }
                        }
                        RenderMode::Wireframe => {
                            rpass.set_pipeline(&state.wireframe_pipeline);
                            rpass.set_index_buffer(
                                terrain.wireframe_index_buffer.slice(..),
                                wgpu::IndexFormat::Uint32,
                            );
                            rpass.draw_indexed(0..terrain.wireframe_index_count, 0, 0..1);
                        }
                    }
                }
                DrawCommand::Clear { .. } | DrawCommand::PositionCamera(_) => {}
            }
        }
    }

    state.queue.submit(std::iter::once(encoder.finish()));
    frame.present();
    Ok(())
}

/// Upload `mesh` unless the buffers for `generation` are already resident.
fn ensure_terrain_uploaded(state: &mut TerrainRenderer, mesh: &TerrainMesh, generation: u64) {
    if state
        .terrain
        .as_ref()
        .is_some_and(|terrain| terrain.generation == generation)
    {
        return;
    }

    let vertex_buffer = state
        .device
        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("terrain-vertex-buffer"),
            contents: cast_slice(mesh.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });
    let strip_index_buffer = state
        .device
        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("terrain-strip-index-buffer"),
            contents: cast_slice(mesh.strip_indices()),
            usage: wgpu::BufferUsages::INDEX,
        });
    let wireframe_index_buffer = state
        .device
        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("terrain-wireframe-index-buffer"),
            contents: cast_slice(mesh.wireframe_indices()),
            usage: wgpu::BufferUsages::INDEX,
        });

    log::info!(
        "[terrain_viewer] uploaded terrain #{generation}: {} vertices, {} strips",
        mesh.vertices().len(),
        mesh.strips().len()
    );
    state.terrain = Some(GpuTerrain {
        generation,
        vertex_buffer,
        strip_index_buffer,
        strips: mesh
            .strips()
            .iter()
            .map(|strip| (strip.start, strip.count))
            .collect(),
        wireframe_index_buffer,
        wireframe_index_count: mesh.wireframe_indices().len() as u32,
    });
}

fn to_wgpu_color([r, g, b, a]: [f32; 4]) -> wgpu::Color {
    wgpu::Color {
        r: r as f64,
        g: g as f64,
        b: b as f64,
        a: a as f64,
    }
}
