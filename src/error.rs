//! Error types
//!
//! Asset failures stay local to the entity or texture that caused them and are
//! only ever logged. Render failures happen at startup and end the process.

use thiserror::Error;

/// Failure while reading, parsing or decoding a room asset.
#[derive(Error, Debug)]
pub enum AssetError {
    /// The asset source has no file under this path.
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// Reading the file failed.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A mesh or material text could not be parsed.
    #[error("{format} parse error on line {line}: {message}")]
    Parse {
        /// `"obj"` or `"mtl"`
        format: &'static str,
        line: usize,
        message: String,
    },

    /// An image file could not be decoded.
    #[error("Failed to decode image {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },

    /// The image is bigger than any texture the renderer will create.
    #[error("Image {path} is {width}x{height}, larger than the {max} texel limit")]
    TooLarge {
        path: String,
        width: u32,
        height: u32,
        max: u32,
    },

    /// The six faces of a cubemap do not share one size.
    #[error("Cubemap faces must have the same dimensions: {0}")]
    CubemapMismatch(String),

    /// The background loader could not be started or lost a job.
    #[error("Asset loader error: {0}")]
    Loader(String),
}

impl AssetError {
    pub(crate) fn parse(format: &'static str, line: usize, message: impl Into<String>) -> Self {
        AssetError::Parse {
            format,
            line,
            message: message.into(),
        }
    }
}

/// Failure while bringing up the GPU.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to create window surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("Failed to request WGPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("Failed to create WGPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("Surface reports no supported formats")]
    NoSurfaceFormat,
}
