//! The snapshot source seam.
//!
//! Acquisition is the implementor's constructor, release is its `Drop`. The
//! sampler takes the provider by value, so release happens exactly once on
//! whichever path the loop exits through.

use crate::config::SamplingConfig;
use crate::error::ProviderError;
use crate::types::Snapshot;

pub trait SnapshotProvider {
    /// Captures one snapshot. Errors are not retried by the caller.
    fn sample(&mut self, cfg: &SamplingConfig) -> Result<Snapshot, ProviderError>;
}

impl<P: SnapshotProvider + ?Sized> SnapshotProvider for Box<P> {
    fn sample(&mut self, cfg: &SamplingConfig) -> Result<Snapshot, ProviderError> {
        (**self).sample(cfg)
    }
}
