//! Sampling configuration: which disk devices and process names to watch.
//!
//! Names end up verbatim inside the pipe-delimited record, so they are
//! validated once here and never escaped later.

use std::time::Duration;

use crate::error::ConfigError;

/// Default sampling cadence.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15);

/// True when `name` may be embedded in a record: printable ASCII only, and
/// neither of the record delimiters `|` and `,`.
pub fn is_printable(name: &str) -> bool {
    name.chars()
        .all(|c| (c.is_ascii_graphic() || c == ' ') && c != '|' && c != ',')
}

/// Splits a comma list, skipping empty entries, and validates every item.
pub fn parse_list(list: &str) -> Result<Vec<String>, ConfigError> {
    list.split(',')
        .filter(|item| !item.is_empty())
        .map(|item| {
            if is_printable(item) {
                Ok(item.to_string())
            } else {
                Err(ConfigError::IllegalName(item.escape_debug().to_string()))
            }
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SamplingConfig {
    disks: Vec<String>,
    procs: Vec<String>,
}

impl SamplingConfig {
    pub(crate) fn new(disks: Vec<String>, procs: Vec<String>) -> Result<Self, ConfigError> {
        if let Some(bad) = disks.iter().chain(procs.iter()).find(|s| !is_printable(s)) {
            return Err(ConfigError::IllegalName(bad.escape_debug().to_string()));
        }
        Ok(Self { disks, procs })
    }

    /// Builds a config from the raw `-d` / `-p` comma lists.
    pub fn from_lists(disks: Option<&str>, procs: Option<&str>) -> Result<Self, ConfigError> {
        Self::new(
            disks.map(parse_list).transpose()?.unwrap_or_default(),
            procs.map(parse_list).transpose()?.unwrap_or_default(),
        )
    }

    pub fn disks(&self) -> &[String] {
        &self.disks
    }

    pub fn procs(&self) -> &[String] {
        &self.procs
    }
}

/// Validates an interval given in whole seconds.
pub fn interval_from_secs(secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::ZeroInterval);
    }
    Ok(Duration::from_secs(secs))
}
