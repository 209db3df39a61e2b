use thiserror::Error;

use crate::renderer::backend::RendererMode;

#[derive(Error, Debug)]
pub enum ViewError {
    #[error("Invalid viewport: {width}x{height}")]
    InvalidViewport { width: u32, height: u32 },

    #[error("Offscreen raster unavailable: {0}")]
    RasterUnavailable(String),

    #[error("Backend unavailable: {0:?}")]
    BackendUnavailable(RendererMode),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ViewError>;
