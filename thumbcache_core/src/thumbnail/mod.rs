//! Thumbnail artifacts: deterministic cache layout, pluggable generators and
//! the pausable generation pipeline

pub mod generator;
pub mod pipeline;
pub mod store;

#[cfg(feature = "image")]
pub use generator::ImageGenerator;
pub use generator::{SidecarGenerator, ThumbnailGenerator};
pub use pipeline::{PipelineOptions, ThumbnailPipeline};
pub use store::ThumbnailStore;
