use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use terrain_core::pipeline::{FrameCamera, Lighting};

/// Lit terrain (solid strips, wireframe lines and the placeholder hill all
/// share it) plus the unlit reference-grid line shader.
pub(super) const TERRAIN_SHADER_SOURCE: &str = r#"
struct FrameUniforms {
    view_projection: mat4x4<f32>,
    light_direction: vec4<f32>,
    light_terms: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> frame: FrameUniforms;

struct TerrainIn {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec3<f32>,
};

struct TerrainOut {
    @builtin(position) position: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) color: vec3<f32>,
};

@vertex
fn terrain_vs_main(input: TerrainIn) -> TerrainOut {
    var out: TerrainOut;
    out.position = frame.view_projection * vec4<f32>(input.position, 1.0);
    out.normal = input.normal;
    out.color = input.color;
    return out;
}

@fragment
fn terrain_fs_main(input: TerrainOut) -> @location(0) vec4<f32> {
    let normal = normalize(input.normal);
    let lambert = max(dot(normal, frame.light_direction.xyz), 0.0);
    let shade = min(frame.light_terms.x + frame.light_terms.y * lambert, 1.0);
    return vec4<f32>(input.color * shade, 1.0);
}

struct LineIn {
    @location(0) position: vec3<f32>,
    @location(1) color: vec3<f32>,
};

struct LineOut {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec3<f32>,
};

@vertex
fn line_vs_main(input: LineIn) -> LineOut {
    var out: LineOut;
    out.position = frame.view_projection * vec4<f32>(input.position, 1.0);
    out.color = input.color;
    return out;
}

@fragment
fn line_fs_main(input: LineOut) -> @location(0) vec4<f32> {
    return vec4<f32>(input.color, 1.0);
}
"#;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(super) struct FrameUniforms {
    pub view_projection: [[f32; 4]; 4],
    /// xyz towards the light, w unused.
    pub light_direction: [f32; 4],
    /// x ambient, y diffuse.
    pub light_terms: [f32; 4],
}

impl FrameUniforms {
    pub fn new(camera: &FrameCamera, lighting: &Lighting) -> Self {
        Self {
            view_projection: camera.view_projection.to_cols_array_2d(),
            light_direction: lighting.direction.extend(0.0).to_array(),
            light_terms: [lighting.ambient, lighting.diffuse, 0.0, 0.0],
        }
    }

    pub fn identity(lighting: &Lighting) -> Self {
        Self {
            view_projection: Mat4::IDENTITY.to_cols_array_2d(),
            light_direction: lighting.direction.extend(0.0).to_array(),
            light_terms: [lighting.ambient, lighting.diffuse, 0.0, 0.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn uniforms_match_wgsl_layout() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 96);
        assert_eq!(std::mem::size_of::<FrameUniforms>() % 16, 0);
    }

    #[test]
    fn uniforms_carry_camera_and_light() {
        let lighting = Lighting {
            direction: Vec3::Z,
            ambient: 0.3,
            diffuse: 0.8,
        };
        let camera = FrameCamera {
            view_projection: Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
            eye: Vec3::ZERO,
        };
        let uniforms = FrameUniforms::new(&camera, &lighting);
        assert_eq!(uniforms.view_projection[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(uniforms.light_direction, [0.0, 0.0, 1.0, 0.0]);
        assert_eq!(uniforms.light_terms[..2], [0.3, 0.8]);
    }
}
