//! Cross-platform sampling of per-interface cumulative network byte counters.
//!
//! ```no_run
//! use kaipo_counters::collectors::{CollectorOptions, InterfaceStatsCollector, create_platform_collector};
//!
//! let collector = create_platform_collector(&CollectorOptions::default())?;
//! for sample in collector.collect()? {
//!     println!("{}: rx={} tx={}", sample.identity, sample.download_bytes, sample.upload_bytes);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod collectors;
pub mod config;
pub mod monitor;
