//! Linux interface counters from `/proc/net/dev`
//!
//! Format:
//! ```text
//! Inter-|   Receive                                                |  Transmit
//!  face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
//!     lo: 2776770   11307    0    0    0     0          0         0  2776770   11307    0    0    0     0       0          0
//! ```
//!
//! The parser itself is plain text handling and builds on every platform; only
//! the default collector selection is tied to Linux.

use log::{debug, trace};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use super::InterfaceStatsCollector;
use crate::collectors::counters::{CollectionError, InterfaceSample};

pub const BACKEND_NAME: &str = "linux-procfs";

/// Default location of the per-interface counter table
pub const PROC_NET_DEV: &str = "/proc/net/dev";

/// Name treated as the loopback interface.
///
/// This is a naming heuristic: it matches the usual Linux loopback but not a
/// loopback device that was given another name.
pub const LOOPBACK_NAME: &str = "lo";

/// Interface names longer than this many bytes are truncated
pub const MAX_INTERFACE_NAME_LEN: usize = 31;

/// Number of counters following the colon on each interface line
const COUNTER_FIELDS: usize = 16;
/// Position of the received-bytes counter
const RX_BYTES_FIELD: usize = 0;
/// Position of the sent-bytes counter
const TX_BYTES_FIELD: usize = 8;

/// Reads interface counters from a procfs `net/dev` file
#[derive(Debug, Clone)]
pub struct ProcNetDevCollector {
    path: PathBuf,
}

impl Default for ProcNetDevCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcNetDevCollector {
    pub fn new() -> Self {
        Self::with_path(PROC_NET_DEV)
    }

    /// Uses an alternate `net/dev` file, e.g. from a host procfs mounted into a container
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_samples(&self) -> Result<Vec<InterfaceSample>, CollectionError> {
        let file = File::open(&self.path).map_err(|e| {
            CollectionError::query(
                BACKEND_NAME,
                format!("unable to open {}", self.path.display()),
            )
            .with_io_source(e)
        })?;

        // The file handle is dropped on every return path below
        parse_proc_net_dev(BufReader::new(file)).map_err(|e| {
            CollectionError::fetch(
                BACKEND_NAME,
                format!("unable to read {}", self.path.display()),
            )
            .with_io_source(e)
        })
    }
}

impl InterfaceStatsCollector for ProcNetDevCollector {
    fn collect(&self) -> Result<Vec<InterfaceSample>, CollectionError> {
        let samples = self.read_samples().map_err(CollectionError::logged)?;
        debug!(
            "Collected {} interfaces from {}",
            samples.len(),
            self.path.display()
        );
        Ok(samples)
    }

    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }
}

/// Parses a whole `net/dev` table, dropping header lines and the loopback interface
///
/// Only I/O errors are reported; malformed interface lines are parsed best-effort.
pub fn parse_proc_net_dev<R: BufRead>(mut reader: R) -> std::io::Result<Vec<InterfaceSample>> {
    let mut samples = Vec::new();
    let mut raw = Vec::new();

    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&raw);

        let Some(sample) = parse_proc_net_dev_line(&line) else {
            trace!("Skipping non-interface line: {:?}", line.trim_end());
            continue;
        };

        if is_loopback(&sample.identity) {
            trace!("Skipping loopback interface '{}'", sample.identity);
            continue;
        }

        samples.push(sample);
    }

    Ok(samples)
}

/// Parses one `name: <16 counters>` line
///
/// Returns `None` for lines without a colon (the two header lines) and for
/// lines with an empty interface name. Missing or non-numeric counters read
/// as zero.
pub fn parse_proc_net_dev_line(line: &str) -> Option<InterfaceSample> {
    let (name, counters) = line.split_once(':')?;
    let name = bounded_name(name.trim());
    if name.is_empty() {
        return None;
    }

    let mut values = [0u64; COUNTER_FIELDS];
    for (slot, field) in values.iter_mut().zip(counters.split_whitespace()) {
        *slot = field.parse().unwrap_or(0);
    }

    Some(InterfaceSample::new(
        name,
        values[RX_BYTES_FIELD],
        values[TX_BYTES_FIELD],
    ))
}

pub fn is_loopback(name: &str) -> bool {
    name == LOOPBACK_NAME
}

fn bounded_name(name: &str) -> &str {
    if name.len() <= MAX_INTERFACE_NAME_LEN {
        return name;
    }
    let mut end = MAX_INTERFACE_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}
