use std::io;

use terrain_core::TerrainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error(transparent)]
    Grid(#[from] TerrainError),
    #[error("giving up on {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: Box<FetchError>,
    },
}

pub type Result<T, E = FetchError> = std::result::Result<T, E>;
