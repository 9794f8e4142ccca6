//! slant_agent: samples host resource counters on a fixed cadence and writes
//! one pipe-delimited record per sample to a line-oriented sink.

pub mod config;
pub mod error;
pub mod metrics;
pub mod provider;
pub mod record;
pub mod sampler;
pub mod sandbox;
pub mod types;
