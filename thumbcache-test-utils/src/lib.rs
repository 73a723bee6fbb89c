//! Test utilities for the thumbnail cache
//!
//! This crate provides cache-directory fixtures with controlled sizes and
//! modification times, mock generators and an event recorder for testing
//! the pipeline, the eviction engine and the service boundary.

pub mod builders;
pub mod mocks;

// Re-export commonly used types
pub use builders::{CacheFixture, CacheFixtureBuilder, SourceTree};
pub use mocks::{BrokenGenerator, EventRecorder, FailingGenerator, GatedGenerator};
