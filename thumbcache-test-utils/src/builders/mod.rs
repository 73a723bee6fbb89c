//! Builders for on-disk test scenarios

mod cache_fixture;

pub use cache_fixture::{CacheFixture, CacheFixtureBuilder, FixtureFile, SourceTree};
