//! Height-band colouring shared by the live mesh and the standalone
//! heightmap texture.

use crate::config::{ColorSettings, HeightThresholds, Rgb};
use crate::error::Result;
use crate::grid::{ElevationGrid, TextureImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeightBand {
    Water,
    Low,
    Mid,
    High,
}

impl HeightBand {
    /// First band whose threshold the normalized height is strictly below.
    /// A value sitting exactly on a threshold belongs to the upper band.
    pub fn classify(ratio: f32, thresholds: &HeightThresholds) -> Self {
        if ratio < thresholds.water {
            HeightBand::Water
        } else if ratio < thresholds.low {
            HeightBand::Low
        } else if ratio < thresholds.mid {
            HeightBand::Mid
        } else {
            HeightBand::High
        }
    }
}

/// One colour per band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandPalette {
    pub water: Rgb,
    pub low: Rgb,
    pub mid: Rgb,
    pub high: Rgb,
}

impl BandPalette {
    pub fn color(&self, band: HeightBand) -> Rgb {
        match band {
            HeightBand::Water => self.water,
            HeightBand::Low => self.low,
            HeightBand::Mid => self.mid,
            HeightBand::High => self.high,
        }
    }
}

impl From<&ColorSettings> for BandPalette {
    fn from(colors: &ColorSettings) -> Self {
        Self {
            water: colors.water,
            low: colors.land_low,
            mid: colors.land_mid,
            high: colors.land_high,
        }
    }
}

impl Default for BandPalette {
    fn default() -> Self {
        Self::from(&ColorSettings::default())
    }
}

/// Render the grid as an RGB8 image, one pixel per sample, row 0 on top.
pub fn heightmap_texture(
    grid: &ElevationGrid,
    thresholds: &HeightThresholds,
    palette: &BandPalette,
) -> Result<TextureImage> {
    thresholds.validate()?;
    let range = grid.height_range();
    let mut rgb = Vec::with_capacity(grid.len() * 3);
    for &height in grid.samples() {
        let band = HeightBand::classify(range.normalize(height), thresholds);
        for channel in palette.color(band) {
            rgb.push((channel.clamp(0.0, 1.0) * 255.0) as u8);
        }
    }
    TextureImage::new(grid.cols() as u32, grid.rows() as u32, rgb)
}
