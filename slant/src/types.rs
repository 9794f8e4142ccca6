//! Types that mirror the aggregate store's JSON output.

use serde::Deserialize;

/// Accumulated CPU utilization for one window of one resolution tier.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct AggregatePoint {
    // sum of per-sample utilization percentages
    pub cpu: f64,
    // samples folded into this window
    pub entries: u64,
}

impl AggregatePoint {
    pub fn new(cpu: f64, entries: u64) -> Self {
        Self { cpu, entries }
    }

    /// Mean utilization, or `None` for an empty window.
    pub fn average(&self) -> Option<f64> {
        (self.entries > 0).then(|| self.cpu / self.entries as f64)
    }
}

/// Windows per resolution tier, most recent first.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Resolutions {
    #[serde(default)]
    pub fine: Vec<AggregatePoint>,
    #[serde(default)]
    pub medium: Vec<AggregatePoint>,
    #[serde(default)]
    pub coarse: Vec<AggregatePoint>,
}

fn latest_average(tier: &[AggregatePoint]) -> Option<f64> {
    tier.first().and_then(AggregatePoint::average)
}

impl Resolutions {
    pub fn fine_average(&self) -> Option<f64> {
        latest_average(&self.fine)
    }

    pub fn medium_average(&self) -> Option<f64> {
        latest_average(&self.medium)
    }

    pub fn coarse_average(&self) -> Option<f64> {
        latest_average(&self.coarse)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HostView {
    pub host: String,
    // None until the store has any history for the host
    #[serde(default)]
    pub recs: Option<Resolutions>,
}

impl HostView {
    pub fn new(host: impl Into<String>, recs: Option<Resolutions>) -> Self {
        Self {
            host: host.into(),
            recs,
        }
    }
}
