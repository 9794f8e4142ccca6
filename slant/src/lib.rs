//! Library surface for the slant viewer (used by integration tests).

pub mod render;
pub mod types;
