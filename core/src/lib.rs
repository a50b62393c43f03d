pub mod config;
pub mod descriptor;
pub mod image;
pub mod keypoint;
pub mod runtime;

pub use config::*;
pub use descriptor::*;
pub use self::image::*;
pub use keypoint::*;
pub use runtime::*;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid buffer: {0}")]
    InvalidBuffer(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
