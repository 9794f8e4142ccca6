//! Error types for the agent library. Every variant is fatal to the process.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} contains illegal characters")]
    IllegalName(String),
    #[error("interval must be at least one second")]
    ZeroInterval,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("read {path}: {source}")]
    Read {
        path: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("parse {path}: {detail}")]
    Parse { path: &'static str, detail: String },
    #[error("clock: {0}")]
    Clock(String),
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("sample: {0}")]
    Sample(#[from] ProviderError),
    #[error("write record: {0}")]
    Output(#[source] io::Error),
    #[error("install signal handler: {0}")]
    Signal(#[source] io::Error),
    #[error("{op}: {source}")]
    Restrict {
        op: &'static str,
        #[source]
        source: io::Error,
    },
}
