//! Snapshot types produced by the provider and read by the record encoder.
//! Field changes here change the record layout.

use chrono::{DateTime, Duration, Utc};

/// Number of CPU states tracked per processor: user, nice, system, interrupt, idle.
pub const CPU_STATES: usize = 5;

/// Index of the idle state within a CPU state row.
pub const CP_IDLE: usize = 4;

/// One set of interface counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IfCount {
    pub ibytes: u64,
    pub ipackets: u64,
    pub ierrors: u64,
    pub obytes: u64,
    pub opackets: u64,
    pub oerrors: u64,
    pub collisions: u64,
    // up / down
    pub flags: i32,
    pub link_state: i32,
}

impl IfCount {
    /// Counter-wise difference `self - old`, saturating at zero.
    pub fn delta(&self, old: &IfCount) -> IfCount {
        IfCount {
            ibytes: self.ibytes.saturating_sub(old.ibytes),
            ipackets: self.ipackets.saturating_sub(old.ipackets),
            ierrors: self.ierrors.saturating_sub(old.ierrors),
            obytes: self.obytes.saturating_sub(old.obytes),
            opackets: self.opackets.saturating_sub(old.opackets),
            oerrors: self.oerrors.saturating_sub(old.oerrors),
            collisions: self.collisions.saturating_sub(old.collisions),
            flags: self.flags,
            link_state: self.link_state,
        }
    }

    pub fn accumulate(&mut self, other: &IfCount) {
        self.ibytes = self.ibytes.saturating_add(other.ibytes);
        self.ipackets = self.ipackets.saturating_add(other.ipackets);
        self.ierrors = self.ierrors.saturating_add(other.ierrors);
        self.obytes = self.obytes.saturating_add(other.obytes);
        self.opackets = self.opackets.saturating_add(other.opackets);
        self.oerrors = self.oerrors.saturating_add(other.oerrors);
        self.collisions = self.collisions.saturating_add(other.collisions);
    }
}

/// Per-interface state: current raw counters, previous raw counters, and the
/// delta between them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IfStat {
    pub name: String,
    pub cur: IfCount,
    pub old: IfCount,
    pub now: IfCount,
    // interface was present in the latest refresh
    pub seen: u8,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuStats {
    /// Share of ticks per state across all CPUs, in tenths of a percent.
    pub states: Vec<i64>,
    pub avg: f64,
    /// Raw tick counters, `[cpu][state]`.
    pub time: Vec<Vec<i64>>,
    pub old: Vec<Vec<i64>>,
    pub diff: Vec<Vec<i64>>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkStats {
    pub ifaces: Vec<IfStat>,
    pub sum: IfCount,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskStats {
    pub rbytes: u64,
    pub wbytes: u64,
    // bytes/sec over the last interval
    pub ravg: i64,
    pub wavg: i64,
}

/// One immutable capture of host resource state.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub sample: u64,
    pub timestamp: DateTime<Utc>,
    pub page_shift: u32,
    pub mem_avg: f64,
    pub proc_pct: f64,
    pub file_pct: f64,
    pub cpu: CpuStats,
    pub command_pct: f64,
    pub network: NetworkStats,
    pub disk: DiskStats,
    pub boot_time: DateTime<Utc>,
}

impl Snapshot {
    pub fn uptime(&self) -> Duration {
        self.timestamp - self.boot_time
    }
}
