//! Pipe-delimited record encoding.
//!
//! One line per snapshot. Every field is terminated by `|`; the two trailing
//! list fields join their items with `,`. Names are validated by
//! [`SamplingConfig`] at load time, so nothing is escaped here.

use std::fmt::Write as _;
use std::io::{self, Write};

use crate::config::SamplingConfig;
use crate::types::{IfCount, IfStat, Snapshot};

/// Number of `|`-terminated fields in every record.
pub const RECORD_FIELDS: usize = 19 + 3 * IFCOUNT_FIELDS + 1 + IFCOUNT_FIELDS + 2;

const IFCOUNT_FIELDS: usize = 9;

fn push_ifcount(out: &mut String, c: &IfCount) {
    let _ = write!(
        out,
        "{}|{}|{}|{}|{}|{}|{}|{}|{}|",
        c.ibytes, c.ipackets, c.ierrors, c.obytes, c.opackets, c.oerrors, c.collisions, c.flags,
        c.link_state,
    );
}

fn push_ifstat(out: &mut String, s: &IfStat) {
    push_ifcount(out, &s.cur);
    push_ifcount(out, &s.old);
    push_ifcount(out, &s.now);
    let _ = write!(out, "{}|", s.seen);
}

fn first_tick(rows: &[Vec<i64>]) -> i64 {
    rows.first().and_then(|r| r.first()).copied().unwrap_or(0)
}

/// Encodes one snapshot as a newline-terminated record.
pub fn encode(cfg: &SamplingConfig, s: &Snapshot) -> String {
    let mut out = String::with_capacity(512);
    let _ = write!(
        out,
        "{}|{}|{}|{:.6}|{:.6}|{:.6}|{}|{:.6}|{}|{}|{}|{}|{:.6}|{}|{}|{}|{}|{}|{}|",
        s.sample,
        s.timestamp.timestamp(),
        s.page_shift,
        s.mem_avg,
        s.proc_pct,
        s.file_pct,
        s.cpu.states.first().copied().unwrap_or(0),
        s.cpu.avg,
        first_tick(&s.cpu.time),
        first_tick(&s.cpu.old),
        first_tick(&s.cpu.diff),
        s.cpu.count,
        s.command_pct,
        s.network.ifaces.len(),
        s.disk.rbytes,
        s.disk.wbytes,
        s.disk.ravg,
        s.disk.wavg,
        s.boot_time.timestamp(),
    );

    // Only the primary interface is carried; an empty table encodes as zeros.
    match s.network.ifaces.first() {
        Some(ifs) => push_ifstat(&mut out, ifs),
        None => push_ifstat(&mut out, &IfStat::default()),
    }
    push_ifcount(&mut out, &s.network.sum);

    out.push_str(&cfg.disks().join(","));
    out.push('|');
    out.push_str(&cfg.procs().join(","));
    out.push_str("|\n");
    out
}

/// Writes one record and flushes the sink. A failed write or flush means the
/// consumer may hold a partial line, so the caller must treat it as fatal.
pub fn write_record<W: Write>(sink: &mut W, cfg: &SamplingConfig, s: &Snapshot) -> io::Result<()> {
    sink.write_all(encode(cfg, s).as_bytes())?;
    sink.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CpuStats, DiskStats, NetworkStats};
    use chrono::{TimeZone, Utc};

    fn snapshot(sample: u64) -> Snapshot {
        Snapshot {
            sample,
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            page_shift: 12,
            mem_avg: 41.5,
            proc_pct: 3.25,
            file_pct: 0.5,
            cpu: CpuStats {
                states: vec![125, 0, 50, 0, 825],
                avg: 17.5,
                time: vec![vec![900, 1, 2, 3, 4], vec![7, 7, 7, 7, 7]],
                old: vec![vec![800, 1, 2, 3, 4], vec![7, 7, 7, 7, 7]],
                diff: vec![vec![100, 0, 0, 0, 0], vec![0, 0, 0, 0, 0]],
                count: 2,
            },
            command_pct: 100.0,
            network: NetworkStats::default(),
            disk: DiskStats {
                rbytes: 4096,
                wbytes: 8192,
                ravg: 10,
                wavg: -1,
            },
            boot_time: Utc.timestamp_opt(1_699_990_000, 0).unwrap(),
        }
    }

    fn fields(line: &str) -> Vec<&str> {
        let body = line.strip_suffix('\n').expect("newline terminated");
        let body = body.strip_suffix('|').expect("last field terminated");
        body.split('|').collect()
    }

    #[test]
    fn field_count_is_fixed() {
        let cfg = SamplingConfig::new(vec!["sd0".into()], vec![]).unwrap();
        let mut s = snapshot(1);
        assert_eq!(fields(&encode(&cfg, &s)).len(), RECORD_FIELDS);

        s.cpu = CpuStats::default();
        s.network.ifaces.push(IfStat {
            name: "em0".into(),
            seen: 1,
            ..IfStat::default()
        });
        s.network.ifaces.push(IfStat::default());
        assert_eq!(fields(&encode(&cfg, &s)).len(), RECORD_FIELDS);
        assert_eq!(RECORD_FIELDS, 58);
    }

    #[test]
    fn header_fields_in_order() {
        let cfg = SamplingConfig::default();
        let line = encode(&cfg, &snapshot(7));
        let f = fields(&line);
        assert_eq!(
            &f[..19],
            [
                "7",
                "1700000000",
                "12",
                "41.500000",
                "3.250000",
                "0.500000",
                "125",
                "17.500000",
                "900",
                "800",
                "100",
                "2",
                "100.000000",
                "0",
                "4096",
                "8192",
                "10",
                "-1",
                "1699990000",
            ]
        );
        assert_eq!(f[56], "");
        assert_eq!(f[57], "");
    }

    #[test]
    fn primary_interface_block() {
        let cfg = SamplingConfig::default();
        let mut s = snapshot(1);
        let cur = IfCount {
            ibytes: 1000,
            ipackets: 10,
            obytes: 500,
            opackets: 5,
            flags: 1,
            ..IfCount::default()
        };
        let old = IfCount {
            ibytes: 400,
            ipackets: 4,
            obytes: 100,
            opackets: 1,
            flags: 1,
            ..IfCount::default()
        };
        s.network.ifaces.push(IfStat {
            name: "em0".into(),
            cur,
            old,
            now: cur.delta(&old),
            seen: 1,
        });
        s.network.sum = cur.delta(&old);
        let line = encode(&cfg, &s);
        let f = fields(&line);
        assert_eq!(f[13], "1");
        assert_eq!(&f[19..28], ["1000", "10", "0", "500", "5", "0", "0", "1", "0"]);
        assert_eq!(&f[37..46], ["600", "6", "0", "400", "4", "0", "0", "1", "0"]);
        assert_eq!(f[46], "1");
        assert_eq!(&f[47..56], &f[37..46]);
    }

    #[test]
    fn encoding_is_idempotent() {
        let cfg = SamplingConfig::new(vec!["sd0".into()], vec!["httpd".into()]).unwrap();
        let s = snapshot(3);
        assert_eq!(encode(&cfg, &s), encode(&cfg, &s));
    }

    #[test]
    fn lists_are_standalone_fields() {
        let cfg =
            SamplingConfig::new(vec!["sd0".into(), "sd1".into()], vec!["httpd".into()]).unwrap();
        let line = encode(&cfg, &snapshot(42));
        assert!(line.starts_with("42|"));
        assert!(line.ends_with("|sd0,sd1|httpd|\n"));
        let f = fields(&line);
        assert_eq!(f[56], "sd0,sd1");
        assert_eq!(f[57], "httpd");
        assert_eq!(line.matches('\n').count(), 1);
    }

    struct FailingFlush(Vec<u8>);

    impl Write for FailingFlush {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn flush_failure_is_reported() {
        let cfg = SamplingConfig::default();
        let mut sink = FailingFlush(Vec::new());
        let err = write_record(&mut sink, &cfg, &snapshot(1)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn write_record_appends_whole_lines() {
        let cfg = SamplingConfig::default();
        let mut sink = Vec::new();
        write_record(&mut sink, &cfg, &snapshot(1)).unwrap();
        write_record(&mut sink, &cfg, &snapshot(2)).unwrap();
        let text = String::from_utf8(sink).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("1|"));
        assert!(lines[1].starts_with("2|"));
    }
}
