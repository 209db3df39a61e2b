pub mod config;
pub mod error;
pub mod types;

pub use config::ViewConfig;
pub use error::{Result, ViewError};
