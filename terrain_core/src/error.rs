use thiserror::Error;

/// Failures produced while validating terrain inputs or configuration.
///
/// None of these are fatal to the render loop: the pipeline keeps whatever
/// it was showing before and hands the error back to the caller.
#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("elevation grid must be at least 2x2 (got {rows}x{cols})")]
    InvalidGrid { rows: usize, cols: usize },
    #[error("elevation grid {rows}x{cols} is too large for 32-bit mesh indices")]
    GridTooLarge { rows: usize, cols: usize },
    #[error("height scale must be positive (got {0})")]
    InvalidScale(f32),
    #[error(
        "band thresholds must be strictly increasing inside (0, 1) (got water={water}, low={low}, mid={mid})"
    )]
    InvalidThresholds { water: f32, low: f32, mid: f32 },
    #[error("grid shape mismatch: expected {expected} samples but got {actual}")]
    GridShape { expected: usize, actual: usize },
    #[error("texture buffer mismatch: {width}x{height} RGB needs {expected} bytes but got {actual}")]
    TextureShape {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("configuration io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = TerrainError> = std::result::Result<T, E>;
