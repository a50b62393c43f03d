//! OpenCV-backed feature pipeline: detect → describe → match → visualize.
//!
//! The algorithms themselves live in OpenCV; this crate picks one, feeds it
//! the configured thresholds and converts the results into
//! [`easymatch_core`] types.

mod convert;
pub mod detector;
pub mod extractor;
pub mod matcher;
pub mod outcome;
pub mod pipeline;
pub mod render;

pub use detector::*;
pub use extractor::*;
pub use matcher::*;
pub use outcome::*;
pub use pipeline::*;
pub use render::*;

pub use easymatch_core::{
    DescriptorKind, DescriptorMatrix, FeatureMatch, Image, KeyPoint, KeyPoints, Matches,
    ThresholdConfig,
};

pub type Result<T> = std::result::Result<T, FeatureError>;

#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    #[error("Unknown detection algorithm: {0}")]
    UnknownDetector(String),

    #[error("Unknown descriptor algorithm: {0}")]
    UnknownDescriptor(String),

    #[error("Unknown matcher mode: {0}")]
    UnknownMatcher(String),

    #[error("Incompatible configuration: {0}")]
    IncompatibleConfig(String),

    #[error("Descriptor error: {0}")]
    DescriptorError(String),

    #[error("Matching error: {0}")]
    MatchingError(String),

    #[error(transparent)]
    Core(#[from] easymatch_core::CoreError),

    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),
}

impl FeatureError {
    /// True for errors caused by the caller's choice of algorithms or modes,
    /// as opposed to failures reported by the vision library.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            FeatureError::UnknownDetector(_)
                | FeatureError::UnknownDescriptor(_)
                | FeatureError::UnknownMatcher(_)
                | FeatureError::IncompatibleConfig(_)
        )
    }
}
