//! Snapshot collection using sysinfo, with /proc reads on Linux for the
//! counters sysinfo does not expose (per-state CPU ticks, table pressure,
//! block device I/O).

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use chrono::{DateTime, Utc};
use sysinfo::{
    CpuRefreshKind, MemoryRefreshKind, Networks, ProcessRefreshKind, ProcessesToUpdate,
    RefreshKind, System,
};
use tracing::debug;

use crate::config::SamplingConfig;
use crate::error::ProviderError;
use crate::provider::SnapshotProvider;
use crate::types::{
    CpuStats, DiskStats, IfCount, IfStat, NetworkStats, Snapshot, CPU_STATES, CP_IDLE,
};

const FALLBACK_PAGE_SHIFT: u32 = 12;

// /proc/diskstats counts 512-byte sectors regardless of the device's block size
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
const SECTOR_BYTES: u64 = 512;

/// Persistent sysinfo handles plus the previous counters needed for deltas.
pub struct SysinfoProvider {
    sys: System,
    networks: Networks,
    sample: u64,
    cp_time: Vec<Vec<i64>>,
    ifaces: Vec<IfStat>,
    disk_last: Option<(u64, u64, Instant)>,
    page_shift: u32,
    boot_time: DateTime<Utc>,
}

impl SysinfoProvider {
    pub fn acquire() -> Result<Self, ProviderError> {
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
            .with_memory(MemoryRefreshKind::everything());
        let sys = System::new_with_specifics(refresh_kind);

        let boot = i64::try_from(System::boot_time())
            .map_err(|e| ProviderError::Clock(format!("boot time: {e}")))?;
        let boot_time = DateTime::<Utc>::from_timestamp(boot, 0)
            .ok_or_else(|| ProviderError::Clock(format!("boot time {boot} out of range")))?;

        let page_shift = page_shift();
        debug!(page_shift, %boot_time, "snapshot provider acquired");

        Ok(Self {
            sys,
            // Keep Networks alive across samples so totals can be diffed
            networks: Networks::new_with_refreshed_list(),
            sample: 0,
            cp_time: Vec::new(),
            ifaces: Vec::new(),
            disk_last: None,
            page_shift,
            boot_time,
        })
    }

    fn collect_cpu(&mut self) -> Result<CpuStats, ProviderError> {
        self.sys.refresh_cpu_usage();
        let count = self.sys.cpus().len().max(1);

        let time = read_cpu_ticks()?;
        let old = if self.cp_time.len() == time.len() {
            std::mem::replace(&mut self.cp_time, time.clone())
        } else {
            // first sample or CPU topology change: no meaningful delta yet
            self.cp_time = time.clone();
            time.clone()
        };
        let diff: Vec<Vec<i64>> = time
            .iter()
            .zip(&old)
            .map(|(t, o)| t.iter().zip(o).map(|(a, b)| a.saturating_sub(*b)).collect())
            .collect();

        let mut totals = [0i64; CPU_STATES];
        for row in &diff {
            for (acc, v) in totals.iter_mut().zip(row) {
                *acc = acc.saturating_add(*v);
            }
        }
        let all: i64 = totals.iter().sum();
        let states: Vec<i64> = totals
            .iter()
            .map(|v| if all > 0 { v * 1000 / all } else { 0 })
            .collect();
        let avg = if all > 0 {
            100.0 - totals[CP_IDLE] as f64 * 100.0 / all as f64
        } else {
            f64::from(self.sys.global_cpu_usage())
        };

        Ok(CpuStats {
            states,
            avg,
            time,
            old,
            diff,
            count,
        })
    }

    fn collect_network(&mut self) -> NetworkStats {
        self.networks.refresh(true);

        for ifs in &mut self.ifaces {
            ifs.seen = 0;
            ifs.now = IfCount::default();
        }
        for (name, data) in self.networks.iter() {
            if name.starts_with("lo") {
                continue;
            }
            let cur = IfCount {
                ibytes: data.total_received(),
                ipackets: data.total_packets_received(),
                ierrors: data.total_errors_on_received(),
                obytes: data.total_transmitted(),
                opackets: data.total_packets_transmitted(),
                oerrors: data.total_errors_on_transmitted(),
                collisions: 0,
                flags: 1,
                link_state: 0,
            };
            match self.ifaces.iter_mut().find(|s| &s.name == name) {
                Some(ifs) => {
                    ifs.old = ifs.cur;
                    ifs.cur = cur;
                    ifs.now = cur.delta(&ifs.old);
                    ifs.seen = 1;
                }
                None => self.ifaces.push(IfStat {
                    name: name.clone(),
                    cur,
                    old: cur,
                    now: IfCount {
                        flags: cur.flags,
                        ..IfCount::default()
                    },
                    seen: 1,
                }),
            }
        }
        self.ifaces.sort_by(|a, b| a.name.cmp(&b.name));

        let mut sum = IfCount::default();
        for ifs in self.ifaces.iter().filter(|s| s.seen != 0) {
            sum.accumulate(&ifs.now);
        }
        NetworkStats {
            ifaces: self.ifaces.clone(),
            sum,
        }
    }

    fn collect_disks(
        &mut self,
        cfg: &SamplingConfig,
        now: Instant,
    ) -> Result<DiskStats, ProviderError> {
        let (rbytes, wbytes) = if cfg.disks().is_empty() {
            (0, 0)
        } else {
            sum_disk_bytes(cfg.disks(), &read_disk_counters()?)
        };

        let (ravg, wavg) = match self.disk_last {
            Some((r, w, at)) => {
                let secs = now.duration_since(at).as_secs_f64();
                if secs > 0.0 {
                    (
                        (rbytes.saturating_sub(r) as f64 / secs) as i64,
                        (wbytes.saturating_sub(w) as f64 / secs) as i64,
                    )
                } else {
                    (0, 0)
                }
            }
            None => (0, 0),
        };
        self.disk_last = Some((rbytes, wbytes, now));

        Ok(DiskStats {
            rbytes,
            wbytes,
            ravg,
            wavg,
        })
    }

    fn collect_processes(&mut self, cfg: &SamplingConfig) -> Result<(f64, f64), ProviderError> {
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().without_tasks(),
        );
        let running: HashSet<String> = self
            .sys
            .processes()
            .values()
            .map(|p| p.name().to_string_lossy().into_owned())
            .collect();

        let command_pct = if cfg.procs().is_empty() {
            0.0
        } else {
            let found = cfg.procs().iter().filter(|n| running.contains(*n)).count();
            found as f64 * 100.0 / cfg.procs().len() as f64
        };

        let proc_pct = match read_proc_max()? {
            Some(max) if max > 0 => self.sys.processes().len() as f64 * 100.0 / max as f64,
            _ => 0.0,
        };
        Ok((proc_pct, command_pct))
    }
}

impl SnapshotProvider for SysinfoProvider {
    fn sample(&mut self, cfg: &SamplingConfig) -> Result<Snapshot, ProviderError> {
        let started = Instant::now();
        let timestamp = Utc::now();

        self.sys.refresh_memory();
        let mem_total = self.sys.total_memory();
        let mem_used = mem_total.saturating_sub(self.sys.available_memory());
        let mem_avg = if mem_total > 0 {
            mem_used as f64 * 100.0 / mem_total as f64
        } else {
            0.0
        };

        let cpu = self.collect_cpu()?;
        let (proc_pct, command_pct) = self.collect_processes(cfg)?;
        let file_pct = read_file_pressure()?;
        let network = self.collect_network();
        let disk = self.collect_disks(cfg, started)?;

        self.sample += 1;
        debug!(
            sample = self.sample,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sampled"
        );

        Ok(Snapshot {
            sample: self.sample,
            timestamp,
            page_shift: self.page_shift,
            mem_avg,
            proc_pct,
            file_pct,
            cpu,
            command_pct,
            network,
            disk,
            boot_time: self.boot_time,
        })
    }
}

impl Drop for SysinfoProvider {
    fn drop(&mut self) {
        debug!(samples = self.sample, "snapshot provider released");
    }
}

#[cfg(unix)]
fn page_shift() -> u32 {
    // SAFETY: sysconf has no preconditions; a negative return means unsupported.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 && (size as u64).is_power_of_two() {
        (size as u64).trailing_zeros()
    } else {
        FALLBACK_PAGE_SHIFT
    }
}

#[cfg(not(unix))]
fn page_shift() -> u32 {
    FALLBACK_PAGE_SHIFT
}

/// Parses the per-CPU lines of /proc/stat into `[cpu][state]` ticks, folding
/// Linux's columns into user, nice, system, interrupt, idle.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_cpu_ticks(stat: &str) -> Result<Vec<Vec<i64>>, String> {
    let mut rows = Vec::new();
    for line in stat.lines() {
        let mut it = line.split_whitespace();
        let Some(label) = it.next() else { continue };
        // "cpu" is the aggregate line; "cpuN" are the processors
        let Some(id) = label.strip_prefix("cpu") else { continue };
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let vals: Vec<i64> = it
            .take(7)
            .map(|tok| tok.parse::<i64>().map_err(|e| format!("{label}: {e}")))
            .collect::<Result<_, _>>()?;
        if vals.len() < 4 {
            return Err(format!("{label}: expected at least 4 columns"));
        }
        let col = |i: usize| vals.get(i).copied().unwrap_or(0);
        // user nice system idle iowait irq softirq
        rows.push(vec![col(0), col(1), col(2), col(5) + col(6), col(3) + col(4)]);
    }
    Ok(rows)
}

/// Parses /proc/sys/fs/file-nr ("allocated free max") into percent in use.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_file_nr(s: &str) -> Result<f64, String> {
    let vals: Vec<u64> = s
        .split_whitespace()
        .map(|tok| tok.parse::<u64>().map_err(|e| e.to_string()))
        .collect::<Result<_, _>>()?;
    let &[alloc, free, max] = vals.as_slice() else {
        return Err(format!("expected 3 columns, got {}", vals.len()));
    };
    if max == 0 {
        return Ok(0.0);
    }
    Ok(alloc.saturating_sub(free) as f64 * 100.0 / max as f64)
}

/// Parses /proc/diskstats into cumulative `(read, written)` bytes per device.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_diskstats(s: &str) -> Result<HashMap<String, (u64, u64)>, String> {
    let mut devices = HashMap::new();
    for line in s.lines() {
        let cols: Vec<&str> = line.split_whitespace().collect();
        if cols.is_empty() {
            continue;
        }
        // major minor name reads rmerged rsectors rms writes wmerged wsectors ...
        if cols.len() < 10 {
            return Err(format!("{line:?}: expected at least 10 columns"));
        }
        let sectors = |i: usize| {
            cols[i]
                .parse::<u64>()
                .map_err(|e| format!("{} column {}: {e}", cols[2], i + 1))
        };
        let read = sectors(5)?.saturating_mul(SECTOR_BYTES);
        let written = sectors(9)?.saturating_mul(SECTOR_BYTES);
        devices.insert(cols[2].to_string(), (read, written));
    }
    Ok(devices)
}

/// Totals the configured devices; each name counts once.
fn sum_disk_bytes(wanted: &[String], devices: &HashMap<String, (u64, u64)>) -> (u64, u64) {
    let mut counted = HashSet::new();
    let (mut rbytes, mut wbytes) = (0u64, 0u64);
    for dev in wanted {
        if !counted.insert(dev.as_str()) {
            continue;
        }
        match devices.get(dev) {
            Some((r, w)) => {
                rbytes = rbytes.saturating_add(*r);
                wbytes = wbytes.saturating_add(*w);
            }
            None => debug!(device = %dev, "configured disk not present, counted as zero"),
        }
    }
    (rbytes, wbytes)
}

#[cfg(target_os = "linux")]
fn read_disk_counters() -> Result<HashMap<String, (u64, u64)>, ProviderError> {
    const PATH: &str = "/proc/diskstats";
    let s = std::fs::read_to_string(PATH).map_err(|source| ProviderError::Read { path: PATH, source })?;
    parse_diskstats(&s).map_err(|detail| ProviderError::Parse { path: PATH, detail })
}

#[cfg(not(target_os = "linux"))]
fn read_disk_counters() -> Result<HashMap<String, (u64, u64)>, ProviderError> {
    Ok(HashMap::new())
}

#[cfg(target_os = "linux")]
fn read_cpu_ticks() -> Result<Vec<Vec<i64>>, ProviderError> {
    const PATH: &str = "/proc/stat";
    let s = std::fs::read_to_string(PATH).map_err(|source| ProviderError::Read { path: PATH, source })?;
    parse_cpu_ticks(&s).map_err(|detail| ProviderError::Parse { path: PATH, detail })
}

#[cfg(not(target_os = "linux"))]
fn read_cpu_ticks() -> Result<Vec<Vec<i64>>, ProviderError> {
    Ok(Vec::new())
}

#[cfg(target_os = "linux")]
fn read_file_pressure() -> Result<f64, ProviderError> {
    const PATH: &str = "/proc/sys/fs/file-nr";
    let s = std::fs::read_to_string(PATH).map_err(|source| ProviderError::Read { path: PATH, source })?;
    parse_file_nr(&s).map_err(|detail| ProviderError::Parse { path: PATH, detail })
}

#[cfg(not(target_os = "linux"))]
fn read_file_pressure() -> Result<f64, ProviderError> {
    Ok(0.0)
}

#[cfg(target_os = "linux")]
fn read_proc_max() -> Result<Option<u64>, ProviderError> {
    const PATH: &str = "/proc/sys/kernel/pid_max";
    let s = std::fs::read_to_string(PATH).map_err(|source| ProviderError::Read { path: PATH, source })?;
    s.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|e| ProviderError::Parse {
            path: PATH,
            detail: e.to_string(),
        })
}

#[cfg(not(target_os = "linux"))]
fn read_proc_max() -> Result<Option<u64>, ProviderError> {
    Ok(None)
}
