//! Access-statistics and hotspot reporting.
//!
//! After a run, the per-address access counters of a backend are condensed
//! into a scalar cutoff (two strategies below) and rendered as an
//! annotated listing: one line per address with its byte value and
//! adjusted count, prefixed with `*` when the address is a hotspot, plus
//! any label lines supplied by an external symbol table.

use std::collections::HashMap;
use std::io::Write;

use thiserror::Error;

use crate::memory::{Memory, MemoryError};

/// Address to labels, insertion order preserved per address.
pub type LabelMap = HashMap<u16, Vec<String>>;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("percentage {0} outside [0, 1]")]
    BadPercentage(f64),
    #[error("range start {start:#06X} beyond end {end:#06X}")]
    BadRange { start: u16, end: u16 },
    #[error("malformed dump range {0:?}: expected \"<address>:<length>\" in decimal")]
    BadDumpRange(String),
    #[error("dump range {addr}+{len} wraps around the address space")]
    DumpRangeWraps { addr: u16, len: u32 },
    #[error("malformed label map: {0}")]
    BadLabels(#[from] serde_json::Error),
    #[error("label map key {0:?} is not a decimal address")]
    BadLabelAddress(String),
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn check_args(start: u16, end: u16, percent: f64) -> Result<(), StatsError> {
    if !(0.0..=1.0).contains(&percent) {
        return Err(StatsError::BadPercentage(percent));
    }
    if start > end {
        return Err(StatsError::BadRange { start, end });
    }
    Ok(())
}

/// `floor(len * (1 - p))`, clamped to the last index. The clamp covers
/// p == 0, where the raw formula lands one past the end.
fn cutoff_index(len: usize, percent: f64) -> usize {
    let index = (len as f64 * (1.0 - percent)).floor() as usize;
    index.min(len - 1)
}

/// Cutoff over the *distinct* access-count values in [start, end]: sort
/// them ascending and pick the value at `floor(n * (1 - p))` - the top
/// p fraction of count levels.
pub fn distinct_cutoff(
    mem: &dyn Memory,
    start: u16,
    end: u16,
    percent: f64,
) -> Result<u64, StatsError> {
    check_args(start, end, percent)?;
    let mut values: Vec<u64> = (start..=end).map(|a| mem.access_count(a)).collect();
    values.sort_unstable();
    values.dedup();
    Ok(values[cutoff_index(values.len(), percent)])
}

/// Cutoff over *every* address's count, duplicates included: the top p
/// fraction of addresses by rank.
pub fn rank_cutoff(
    mem: &dyn Memory,
    start: u16,
    end: u16,
    percent: f64,
) -> Result<u64, StatsError> {
    check_args(start, end, percent)?;
    let mut values: Vec<u64> = (start..=end).map(|a| mem.access_count(a)).collect();
    values.sort_unstable();
    Ok(values[cutoff_index(values.len(), percent)])
}

/// Render the hotspot listing for [start, end] into `out`.
///
/// Reading each byte is itself an access, so the printed count is the raw
/// counter minus one, floored at zero.
pub fn render_report<W: Write>(
    mem: &mut dyn Memory,
    start: u16,
    end: u16,
    cutoff: u64,
    labels: &LabelMap,
    out: &mut W,
) -> Result<(), StatsError> {
    if start > end {
        return Err(StatsError::BadRange { start, end });
    }
    for addr in start..=end {
        if let Some(names) = labels.get(&addr) {
            for name in names {
                writeln!(out, "{name}")?;
            }
        }
        let byte = mem.load(addr)?;
        let adjusted = mem.access_count(addr).saturating_sub(1);
        let marker = if adjusted >= cutoff { '*' } else { ' ' };
        writeln!(out, "{marker}{addr:04X}: {byte:02X} {adjusted}")?;
    }
    Ok(())
}

/// Parse the CLI dump-range syntax `"<address>:<length>"`, both decimal.
/// The length must be at least 1 and `address + length - 1` must not wrap
/// below the address.
pub fn parse_dump_range(s: &str) -> Result<(u16, u32), StatsError> {
    let bad = || StatsError::BadDumpRange(s.to_string());
    let (addr_part, len_part) = s.split_once(':').ok_or_else(bad)?;
    let addr: u16 = addr_part.trim().parse().map_err(|_| bad())?;
    let len: u32 = len_part.trim().parse().map_err(|_| bad())?;
    if len < 1 {
        return Err(bad());
    }
    if addr as u64 + len as u64 - 1 > 0xFFFF {
        return Err(StatsError::DumpRangeWraps { addr, len });
    }
    Ok((addr, len))
}

/// Parse a label-map JSON object (`{"2049": ["start", "loop"]}`) produced
/// from an assembler symbol table. Keys are decimal addresses.
pub fn parse_label_map(json: &str) -> Result<LabelMap, StatsError> {
    let raw: HashMap<String, Vec<String>> = serde_json::from_str(json)?;
    let mut labels = LabelMap::new();
    for (key, names) in raw {
        let addr: u16 = key
            .trim()
            .parse()
            .map_err(|_| StatsError::BadLabelAddress(key.clone()))?;
        labels.insert(addr, names);
    }
    Ok(labels)
}
