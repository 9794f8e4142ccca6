//! Fixed-width CPU gauge report, one row per host:
//!
//! ```text
//! hostname [|||||||||| xxx.x%|xxx.x%|xxx.x%]
//! ```
//!
//! The bar and the first percentage come from the fine tier, the other two
//! columns from the medium and coarse tiers. Missing tiers render as
//! right-aligned placeholders of the same width so columns stay aligned.

use std::fmt::Write as _;
use std::io::{self, Write};

use crate::types::HostView;

/// The host column is never narrower than this word.
pub const HOST_HEADER: &str = "hostname";

const BAR_SLOTS: usize = 10;
// one percentage column: " xx.x%|"
const PCT_WIDTH: usize = 7;
const GAUGE_WIDTH: usize = BAR_SLOTS + PCT_WIDTH;
/// Width of everything after the opening bracket, closing bracket included.
pub const ROW_WIDTH: usize = GAUGE_WIDTH + 2 * PCT_WIDTH;

/// Width of the host column for this set of hosts.
pub fn host_width(hosts: &[HostView]) -> usize {
    hosts
        .iter()
        .map(|h| h.host.chars().count())
        .fold(HOST_HEADER.len(), usize::max)
}

fn push_bar(out: &mut String, avg: f64) {
    for slot in 1..=BAR_SLOTS {
        out.push(if avg >= (slot * 10) as f64 { '|' } else { ' ' });
    }
}

fn push_row(out: &mut String, h: &HostView, width: usize) {
    let _ = write!(out, "{:<width$} [", h.host);

    let Some(recs) = h.recs.as_ref() else {
        let _ = writeln!(out, "{:>ROW_WIDTH$}", "]");
        return;
    };

    match recs.fine_average() {
        Some(avg) => {
            push_bar(out, avg);
            let _ = write!(out, " {avg:4.1}%|");
        }
        None => {
            let _ = write!(out, "{:>GAUGE_WIDTH$}", "|");
        }
    }

    match recs.medium_average() {
        Some(avg) => {
            let _ = write!(out, " {avg:4.1}%|");
        }
        None => {
            let _ = write!(out, "{:>PCT_WIDTH$}", "|");
        }
    }

    match recs.coarse_average() {
        Some(avg) => {
            let _ = write!(out, " {avg:4.1}%]");
        }
        None => {
            let _ = write!(out, "{:>PCT_WIDTH$}", "]");
        }
    }

    out.push('\n');
}

/// Builds the whole report, one line per host in input order.
pub fn render(hosts: &[HostView]) -> String {
    let width = host_width(hosts);
    let mut out = String::with_capacity(hosts.len() * (width + 2 + ROW_WIDTH + 1));
    for h in hosts {
        push_row(&mut out, h, width);
    }
    out
}

/// Renders and writes the report in a single write, then flushes.
pub fn draw<W: Write>(out: &mut W, hosts: &[HostView]) -> io::Result<()> {
    let report = render(hosts);
    out.write_all(report.as_bytes())?;
    out.flush()
}
