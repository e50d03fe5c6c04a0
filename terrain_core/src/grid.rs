//! Elevation samples as delivered by the data-fetch side. A grid is
//! immutable once built; the render pipeline shares it behind an `Arc` and
//! uses pointer identity to decide when the cached mesh is stale.

use crate::error::{Result, TerrainError};

/// Smallest grid edge that still yields at least one quad.
pub const MIN_GRID_EDGE: usize = 2;

/// Row-major `rows x cols` height samples.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationGrid {
    rows: usize,
    cols: usize,
    samples: Vec<f32>,
}

/// Inclusive min/max of a grid. A flat grid has `min == max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightRange {
    pub min: f32,
    pub max: f32,
}

impl HeightRange {
    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    pub fn is_flat(&self) -> bool {
        self.max == self.min
    }

    /// Map a height into `[0, 1]`. Every value of a flat range maps to 0.
    pub fn normalize(&self, height: f32) -> f32 {
        if self.is_flat() {
            0.0
        } else {
            (height - self.min) / self.span()
        }
    }
}

impl ElevationGrid {
    pub fn new(rows: usize, cols: usize, samples: Vec<f32>) -> Result<Self> {
        if rows < MIN_GRID_EDGE || cols < MIN_GRID_EDGE {
            return Err(TerrainError::InvalidGrid { rows, cols });
        }
        let expected = rows * cols;
        if samples.len() != expected {
            return Err(TerrainError::GridShape {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            rows,
            cols,
            samples,
        })
    }

    /// Build from nested rows; every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let row_count = rows.len();
        let col_count = rows.first().map(Vec::len).unwrap_or(0);
        let mut samples = Vec::with_capacity(row_count * col_count);
        for row in rows {
            if row.len() != col_count {
                return Err(TerrainError::GridShape {
                    expected: row_count * col_count,
                    actual: samples.len() + row.len(),
                });
            }
            samples.extend(row);
        }
        Self::new(row_count, col_count, samples)
    }

    /// Produce a grid by evaluating `f(row, col)` for every cell.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> f32) -> Result<Self> {
        let mut samples = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                samples.push(f(row, col));
            }
        }
        Self::new(rows, cols, samples)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.rows && col < self.cols);
        row * self.cols + col
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.samples[self.index(row, col)]
    }

    pub fn height_range(&self) -> HeightRange {
        let (min, max) = self
            .samples
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| {
                (lo.min(h), hi.max(h))
            });
        HeightRange { min, max }
    }

    /// Heights rescaled to `[0, 1]` over the whole grid; a flat grid
    /// normalizes to all zeros.
    pub fn normalized(&self) -> Vec<f32> {
        let range = self.height_range();
        self.samples.iter().map(|&h| range.normalize(h)).collect()
    }

    /// Apply a 3x3 binomial blur `iterations` times. Border cells are
    /// carried through untouched.
    pub fn smoothed(&self, iterations: usize) -> Self {
        const KERNEL: [[f32; 3]; 3] = [[1.0, 2.0, 1.0], [2.0, 4.0, 2.0], [1.0, 2.0, 1.0]];

        let mut current = self.samples.clone();
        for _ in 0..iterations {
            let mut next = current.clone();
            for row in 1..self.rows - 1 {
                for col in 1..self.cols - 1 {
                    let mut acc = 0.0;
                    for (kr, kernel_row) in KERNEL.iter().enumerate() {
                        for (kc, weight) in kernel_row.iter().enumerate() {
                            let sample = current[(row + kr - 1) * self.cols + (col + kc - 1)];
                            acc += sample * weight;
                        }
                    }
                    next[row * self.cols + col] = acc / 16.0;
                }
            }
            current = next;
        }

        Self {
            rows: self.rows,
            cols: self.cols,
            samples: current,
        }
    }
}

/// RGB8 image handed over by the texture provider. Kept next to the mesh
/// for consumers that want it; terrain colour comes from height bands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
}

impl TextureImage {
    pub fn new(width: u32, height: u32, rgb: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        if rgb.len() != expected {
            return Err(TerrainError::TextureShape {
                width,
                height,
                expected,
                actual: rgb.len(),
            });
        }
        Ok(Self { width, height, rgb })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgb(&self) -> &[u8] {
        &self.rgb
    }

    pub fn into_rgb(self) -> Vec<u8> {
        self.rgb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_grids_smaller_than_two_by_two() {
        let err = ElevationGrid::new(1, 5, vec![0.0; 5]).unwrap_err();
        assert!(matches!(err, TerrainError::InvalidGrid { rows: 1, cols: 5 }));
        let err = ElevationGrid::from_rows(vec![vec![1.0], vec![2.0]]).unwrap_err();
        assert!(matches!(err, TerrainError::InvalidGrid { rows: 2, cols: 1 }));
    }

    #[test]
    fn rejects_sample_count_mismatch() {
        let err = ElevationGrid::new(2, 3, vec![0.0; 5]).unwrap_err();
        assert!(matches!(
            err,
            TerrainError::GridShape {
                expected: 6,
                actual: 5
            }
        ));
        let err = ElevationGrid::from_rows(vec![vec![0.0, 1.0], vec![2.0]]).unwrap_err();
        assert!(matches!(err, TerrainError::GridShape { .. }));
    }

    #[test]
    fn indexes_row_major() {
        let grid = ElevationGrid::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.cols(), 3);
        assert_eq!(grid.get(1, 0), 4.0);
        assert_eq!(grid.get(0, 2), 3.0);
    }

    #[test]
    fn flat_grid_normalizes_to_zero() {
        let grid = ElevationGrid::new(3, 3, vec![250.0; 9]).unwrap();
        let range = grid.height_range();
        assert!(range.is_flat());
        assert!(grid.normalized().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn normalizes_over_whole_grid() {
        let grid = ElevationGrid::from_rows(vec![vec![10.0, 20.0], vec![30.0, 50.0]]).unwrap();
        assert_eq!(grid.normalized(), vec![0.0, 0.25, 0.5, 1.0]);
    }

    #[test]
    fn smoothing_keeps_borders_and_blurs_interior() {
        let grid = ElevationGrid::from_rows(vec![
            vec![0.0, 0.0, 0.0],
            vec![0.0, 16.0, 0.0],
            vec![0.0, 0.0, 0.0],
        ])
        .unwrap();
        let smoothed = grid.smoothed(1);
        assert_eq!(smoothed.get(1, 1), 4.0);
        assert_eq!(smoothed.get(0, 0), 0.0);
        assert_eq!(smoothed.get(2, 1), 0.0);
        assert_eq!(grid.smoothed(0), grid);
    }

    #[test]
    fn texture_validates_buffer_length() {
        assert!(TextureImage::new(2, 2, vec![0; 12]).is_ok());
        let err = TextureImage::new(2, 2, vec![0; 11]).unwrap_err();
        assert!(matches!(err, TerrainError::TextureShape { expected: 12, .. }));
    }
}
