//! Data models for jobwatch

mod job;
mod summary;

pub use job::*;
pub use summary::*;
