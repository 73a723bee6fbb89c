//! Thumbnail cache command line interface
//!
//! Library half of the `thumbcache` binary: configuration, file discovery,
//! progress rendering and the orchestrators behind each subcommand.

pub mod config;
pub mod file_discovery;
pub mod orchestrators;
pub mod paths;
pub mod progress;
pub mod terminal;
