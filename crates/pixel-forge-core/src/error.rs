use thiserror::Error;

#[derive(Debug, Error)]
pub enum PixelForgeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid project: {0}")]
    InvalidProject(String),
    #[error("Palette import failed: {0}")]
    PaletteImport(String),
    #[error("Unknown palette preset: {0}")]
    UnknownPreset(String),
    #[error("Unknown texture id: {0}")]
    UnknownTexture(u64),
    #[error("{} texture(s) do not fit the atlas canvas", overflowed.len())]
    OutOfSpace { overflowed: Vec<u64> },
    #[error("Run was superseded by a newer request")]
    Cancelled,
    #[error("Encoding error: {0}")]
    Encode(String),
}

pub type Result<T> = std::result::Result<T, PixelForgeError>;
