//! Fixed geometry drawn regardless of terrain data: the reference line grid
//! on the z = 0 plane and the low-poly hill shown while nothing is loaded.

use std::f32::consts::PI;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::mesh::TerrainVertex;

const GRID_HALF_LINES: i32 = 10;
const GRID_SPACING: f32 = 0.5;
const GRID_EXTENT: f32 = 5.0;
const PLACEHOLDER_SEGMENTS: usize = 8;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

/// Line-list vertices: for each offset `i * 0.5` with `i` in `-10..=10`, one
/// line parallel to y and one parallel to x, both spanning `[-5, 5]`.
pub fn reference_grid(color: [f32; 3]) -> Vec<LineVertex> {
    let mut lines = Vec::with_capacity(((2 * GRID_HALF_LINES + 1) * 4) as usize);
    for i in -GRID_HALF_LINES..=GRID_HALF_LINES {
        let offset = i as f32 * GRID_SPACING;
        for position in [
            [offset, -GRID_EXTENT, 0.0],
            [offset, GRID_EXTENT, 0.0],
            [-GRID_EXTENT, offset, 0.0],
            [GRID_EXTENT, offset, 0.0],
        ] {
            lines.push(LineVertex { position, color });
        }
    }
    lines
}

/// Triangle-list cone: apex at `(0, 0, 1)`, unit-radius base ring on z = 0.
pub fn placeholder_hill(color: [f32; 3]) -> Vec<TerrainVertex> {
    let mut vertices = Vec::with_capacity(PLACEHOLDER_SEGMENTS * 3);
    for i in 0..PLACEHOLDER_SEGMENTS {
        let a0 = i as f32 * 2.0 * PI / PLACEHOLDER_SEGMENTS as f32;
        let a1 = (i + 1) as f32 * 2.0 * PI / PLACEHOLDER_SEGMENTS as f32;

        vertices.push(TerrainVertex {
            position: [0.0, 0.0, 1.0],
            normal: [0.0, 0.0, 1.0],
            color,
        });
        for angle in [a0, a1] {
            let (sin, cos) = angle.sin_cos();
            vertices.push(TerrainVertex {
                position: [cos, sin, 0.0],
                normal: Vec3::new(cos, sin, 0.5).normalize().to_array(),
                color,
            });
        }
    }
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_has_two_lines_per_offset() {
        let lines = reference_grid([0.3; 3]);
        assert_eq!(lines.len(), 21 * 4);
        assert_eq!(lines[0].position, [-5.0, -5.0, 0.0]);
        assert_eq!(lines[1].position, [-5.0, 5.0, 0.0]);
        assert!(lines.iter().all(|v| v.position[2] == 0.0));
        assert!(lines
            .iter()
            .all(|v| v.position[0].abs() <= 5.0 && v.position[1].abs() <= 5.0));
    }

    #[test]
    fn placeholder_is_eight_triangles_around_apex() {
        let hill = placeholder_hill([0.6, 0.8, 0.6]);
        assert_eq!(hill.len(), 24);
        for triangle in hill.chunks(3) {
            assert_eq!(triangle[0].position, [0.0, 0.0, 1.0]);
            for base in &triangle[1..] {
                let radius = Vec3::from(base.position).truncate().length();
                assert!((radius - 1.0).abs() < 1e-5);
                assert!((Vec3::from(base.normal).length() - 1.0).abs() < 1e-5);
            }
        }
    }
}
