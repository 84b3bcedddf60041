use anyhow::Result;
use std::path::PathBuf;

use crate::collectors::counters::{CollectionError, InterfaceSample};

// Platform-specific interface counter sources
// Each backend reads cumulative byte counters from its own OS facility and
// applies that platform's filter rules before handing back plain samples

/// Linux counters from the `/proc/net/dev` text table
/// Filters loopback by interface name
pub mod linux;

/// macOS counters from `sysctl(NET_RT_IFLIST2)` routing messages
/// Filters loopback by interface type
pub mod macos;

/// Windows counters from the IP Helper `GetIfTable` interface table
/// Filters loopback, non-operational and duplicate rows
pub mod windows;

/// A source of per-interface cumulative byte counters
///
/// Implementations keep no state between calls, so one collector can be shared
/// across threads and polled concurrently.
pub trait InterfaceStatsCollector: Send + Sync {
    /// Reads the current counters for every relevant interface.
    ///
    /// Either every interface is returned or the call fails; a failed call
    /// has already written its diagnostic log entry.
    fn collect(&self) -> Result<Vec<InterfaceSample>, CollectionError>;

    /// Short name of the OS facility behind this collector
    fn backend_name(&self) -> &'static str;
}

/// Knobs for building the platform collector
#[derive(Debug, Clone)]
pub struct CollectorOptions {
    /// `net/dev` table read by the Linux backend
    pub proc_net_dev_path: PathBuf,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            proc_net_dev_path: PathBuf::from(linux::PROC_NET_DEV),
        }
    }
}

#[cfg_attr(not(target_os = "linux"), allow(unused_variables))]
pub fn create_platform_collector(
    options: &CollectorOptions,
) -> Result<Box<dyn InterfaceStatsCollector>> {
    #[cfg(target_os = "linux")]
    {
        Ok(Box::new(linux::ProcNetDevCollector::with_path(
            options.proc_net_dev_path.clone(),
        )))
    }

    #[cfg(target_os = "macos")]
    {
        Ok(Box::new(macos::SysctlInterfaceCollector::new()))
    }

    #[cfg(target_os = "windows")]
    {
        Ok(Box::new(windows::IfTableCollector::new()))
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        Err(anyhow::anyhow!("Unsupported platform for interface counter collection"))
    }
}

/// Collects once with the default collector for this platform
pub fn collect() -> Result<Vec<InterfaceSample>> {
    let collector = create_platform_collector(&CollectorOptions::default())?;
    Ok(collector.collect()?)
}
