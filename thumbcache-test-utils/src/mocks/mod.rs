//! Mock implementations for testing

mod events;
mod generator;

pub use events::EventRecorder;
pub use generator::{BrokenGenerator, FailingGenerator, GatedGenerator};
