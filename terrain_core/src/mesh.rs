//! Turns an elevation grid into a lit, coloured triangle mesh.
//!
//! Cell `(row, col)` becomes one vertex. Rows are stretched across a square
//! of `span` world units centred on the origin, heights go up the z axis.
//! Connectivity is one triangle strip per adjacent row pair, each strip
//! alternating between the upper and lower row for every column; the strips
//! are drawn independently so no restart or degenerate joins are needed.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::bands::{BandPalette, HeightBand};
use crate::config::HeightThresholds;
use crate::error::{Result, TerrainError};
use crate::grid::{ElevationGrid, HeightRange};

pub const DEFAULT_WORLD_SPAN: f32 = 4.0;
pub const FLAT_NORMAL: [f32; 3] = [0.0, 0.0, 1.0];
/// Wireframe indices per grid cell: two triangles, three edges each, two
/// indices per edge. The largest index buffer the mesh produces.
const WIREFRAME_INDICES_PER_CELL: usize = 12;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

/// Inputs of a mesh build that do not come from the grid itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshParams {
    pub height_scale: f32,
    pub span: f32,
    pub thresholds: HeightThresholds,
    pub palette: BandPalette,
}

impl Default for MeshParams {
    fn default() -> Self {
        Self {
            height_scale: 0.1,
            span: DEFAULT_WORLD_SPAN,
            thresholds: HeightThresholds::default(),
            palette: BandPalette::default(),
        }
    }
}

/// Index range of one strip inside [`TerrainMesh::strip_indices`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripRange {
    pub start: u32,
    pub count: u32,
}

/// Compiled terrain geometry. Replaced wholesale on reload, never patched.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainMesh {
    rows: usize,
    cols: usize,
    vertices: Vec<TerrainVertex>,
    bands: Vec<HeightBand>,
    strip_indices: Vec<u32>,
    strips: Vec<StripRange>,
    wireframe_indices: Vec<u32>,
    height_range: HeightRange,
}

impl TerrainMesh {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn vertices(&self) -> &[TerrainVertex] {
        &self.vertices
    }

    pub fn vertex(&self, row: usize, col: usize) -> &TerrainVertex {
        &self.vertices[row * self.cols + col]
    }

    pub fn band(&self, row: usize, col: usize) -> HeightBand {
        self.bands[row * self.cols + col]
    }

    /// Concatenated strip indices; see [`Self::strips`] for the ranges.
    pub fn strip_indices(&self) -> &[u32] {
        &self.strip_indices
    }

    pub fn strips(&self) -> &[StripRange] {
        &self.strips
    }

    /// Line-list edges of every strip triangle, for wireframe drawing.
    pub fn wireframe_indices(&self) -> &[u32] {
        &self.wireframe_indices
    }

    pub fn height_range(&self) -> HeightRange {
        self.height_range
    }

    pub fn triangle_count(&self) -> usize {
        self.strips.iter().map(|s| s.count as usize - 2).sum()
    }
}

/// Build a mesh from `grid`. Pure; fails only on invalid inputs.
pub fn build(grid: &ElevationGrid, params: &MeshParams) -> Result<TerrainMesh> {
    let rows = grid.rows();
    let cols = grid.cols();
    if rows < 2 || cols < 2 {
        return Err(TerrainError::InvalidGrid { rows, cols });
    }
    check_index_range(rows, cols)?;
    if !(params.height_scale > 0.0) {
        return Err(TerrainError::InvalidScale(params.height_scale));
    }
    params.thresholds.validate()?;

    let range = grid.height_range();
    if range.is_flat() {
        log::debug!(
            "[terrain_core] flat elevation grid ({} everywhere); every cell maps to the lowest band",
            range.min
        );
    }

    let mut vertices = Vec::with_capacity(rows * cols);
    let mut bands = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            let height = grid.get(row, col);
            let band = HeightBand::classify(range.normalize(height), &params.thresholds);
            vertices.push(TerrainVertex {
                position: vertex_position(row, col, rows, cols, height, params),
                normal: vertex_normal(grid, row, col, params.height_scale),
                color: params.palette.color(band),
            });
            bands.push(band);
        }
    }

    let (strip_indices, strips) = strip_connectivity(rows, cols);
    let wireframe_indices = wireframe_edges(&strip_indices, &strips);

    Ok(TerrainMesh {
        rows,
        cols,
        vertices,
        bands,
        strip_indices,
        strips,
        wireframe_indices,
        height_range: range,
    })
}

/// Vertex ids, strip offsets and index counts are all stored as `u32`.
fn check_index_range(rows: usize, cols: usize) -> Result<()> {
    let largest = rows
        .checked_mul(cols)
        .and_then(|cells| cells.checked_mul(WIREFRAME_INDICES_PER_CELL));
    match largest {
        Some(count) if count <= u32::MAX as usize => Ok(()),
        _ => Err(TerrainError::GridTooLarge { rows, cols }),
    }
}

fn vertex_position(
    row: usize,
    col: usize,
    rows: usize,
    cols: usize,
    height: f32,
    params: &MeshParams,
) -> [f32; 3] {
    let x = (col as f32 / (cols - 1) as f32 - 0.5) * params.span;
    let y = (row as f32 / (rows - 1) as f32 - 0.5) * params.span;
    let z = height * params.height_scale;
    [x, y, z]
}

/// Central-difference normal for interior cells. Border cells and
/// zero-length results use straight up.
fn vertex_normal(grid: &ElevationGrid, row: usize, col: usize, height_scale: f32) -> [f32; 3] {
    let rows = grid.rows();
    let cols = grid.cols();
    let interior = row > 0 && row < rows - 1 && col > 0 && col < cols - 1;
    if !interior {
        return FLAT_NORMAL;
    }

    let dx = grid.get(row, col + 1) - grid.get(row, col - 1);
    let dy = grid.get(row + 1, col) - grid.get(row - 1, col);
    let raw = Vec3::new(
        -dx * height_scale * 2.0,
        -dy * height_scale * 2.0,
        4.0 / rows.max(cols) as f32,
    );
    let length = raw.length();
    if length > 0.0 && length.is_finite() {
        (raw / length).to_array()
    } else {
        FLAT_NORMAL
    }
}

fn strip_connectivity(rows: usize, cols: usize) -> (Vec<u32>, Vec<StripRange>) {
    let mut indices = Vec::with_capacity((rows - 1) * cols * 2);
    let mut strips = Vec::with_capacity(rows - 1);
    for row in 0..rows - 1 {
        let start = indices.len() as u32;
        for col in 0..cols {
            indices.push((row * cols + col) as u32);
            indices.push(((row + 1) * cols + col) as u32);
        }
        strips.push(StripRange {
            start,
            count: indices.len() as u32 - start,
        });
    }
    (indices, strips)
}

fn wireframe_edges(strip_indices: &[u32], strips: &[StripRange]) -> Vec<u32> {
    let mut edges = Vec::new();
    for strip in strips {
        let slice = &strip_indices[strip.start as usize..(strip.start + strip.count) as usize];
        for window in slice.windows(3) {
            let [a, b, c] = [window[0], window[1], window[2]];
            edges.extend_from_slice(&[a, b, b, c, c, a]);
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn params(height_scale: f32) -> MeshParams {
        MeshParams {
            height_scale,
            ..MeshParams::default()
        }
    }

    fn bump_grid() -> ElevationGrid {
        ElevationGrid::from_rows(vec![
            vec![0.0, 0.0, 0.0],
            vec![0.0, 10.0, 0.0],
            vec![0.0, 0.0, 0.0],
        ])
        .unwrap()
    }

    #[test]
    fn rejects_non_positive_scale() {
        let grid = bump_grid();
        assert!(matches!(
            build(&grid, &params(0.0)),
            Err(TerrainError::InvalidScale(_))
        ));
        assert!(matches!(
            build(&grid, &params(-1.0)),
            Err(TerrainError::InvalidScale(_))
        ));
        assert!(build(&grid, &params(f32::NAN)).is_err());
    }

    #[test]
    fn rejects_bad_thresholds() {
        let mut p = params(1.0);
        p.thresholds.mid = 0.2;
        assert!(matches!(
            build(&bump_grid(), &p),
            Err(TerrainError::InvalidThresholds { .. })
        ));
    }

    #[test]
    fn positions_span_the_world_square() {
        let mesh = build(&bump_grid(), &params(1.0)).unwrap();
        assert_eq!(mesh.vertex(0, 0).position, [-2.0, -2.0, 0.0]);
        assert_eq!(mesh.vertex(2, 2).position, [2.0, 2.0, 0.0]);
        assert_eq!(mesh.vertex(1, 1).position, [0.0, 0.0, 10.0]);
        assert_eq!(mesh.vertex(0, 2).position, [2.0, -2.0, 0.0]);
    }

    #[test]
    fn interior_normal_follows_gradient() {
        let grid = ElevationGrid::from_rows(vec![
            vec![0.0, 0.0, 0.0],
            vec![0.0, 1.0, 2.0],
            vec![0.0, 0.0, 0.0],
        ])
        .unwrap();
        let mesh = build(&grid, &params(1.0)).unwrap();
        // dx = 2 - 0, dy = 0 - 0 -> raw (-4, 0, 4/3)
        let raw = Vec3::new(-4.0, 0.0, 4.0 / 3.0).normalize();
        let normal = Vec3::from(mesh.vertex(1, 1).normal);
        assert!((normal - raw).length() < EPSILON);
        assert!((normal.length() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn border_normals_point_up() {
        let mesh = build(&bump_grid(), &params(1.0)).unwrap();
        for (row, col) in [(0, 0), (0, 1), (1, 0), (2, 2), (1, 2)] {
            assert_eq!(mesh.vertex(row, col).normal, FLAT_NORMAL);
        }
        // Symmetric neighbourhood cancels the gradient.
        let normal = mesh.vertex(1, 1).normal;
        assert!((Vec3::from(normal) - Vec3::Z).length() < EPSILON);
    }

    #[test]
    fn strips_alternate_between_rows() {
        let grid = ElevationGrid::new(3, 4, vec![0.0; 12]).unwrap();
        let mesh = build(&grid, &params(1.0)).unwrap();
        assert_eq!(mesh.strips().len(), 2);
        assert_eq!(mesh.strips()[1], StripRange { start: 8, count: 8 });
        assert_eq!(&mesh.strip_indices()[..8], &[0, 4, 1, 5, 2, 6, 3, 7]);
        assert_eq!(&mesh.strip_indices()[8..], &[4, 8, 5, 9, 6, 10, 7, 11]);
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(mesh.wireframe_indices().len(), 12 * 6);
    }

    #[test]
    fn index_range_guards_u32_overflow() {
        assert!(check_index_range(100, 100).is_ok());
        assert!(check_index_range(16_000, 16_000).is_ok());
        assert!(matches!(
            check_index_range(20_000, 20_000),
            Err(TerrainError::GridTooLarge {
                rows: 20_000,
                cols: 20_000
            })
        ));
        assert!(matches!(
            check_index_range(usize::MAX, 2),
            Err(TerrainError::GridTooLarge { .. })
        ));
    }

    #[test]
    fn flat_grid_is_all_water() {
        let grid = ElevationGrid::new(4, 4, vec![1234.5; 16]).unwrap();
        let mesh = build(&grid, &params(0.1)).unwrap();
        assert!(mesh.height_range().is_flat());
        let water = BandPalette::default().water;
        assert!(mesh.vertices().iter().all(|v| v.color == water));
    }
}
