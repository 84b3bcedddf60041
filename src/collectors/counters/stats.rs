//! Interface counter samples
//!
//! This module contains the InterfaceSample struct produced by every platform
//! backend, plus the SampleBatch wrapper used when a collection is handed to
//! consumers together with its timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cumulative byte counters for one network interface at collection time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceSample {
    /// Interface name on Linux/macOS (e.g. "eth0", "en0"); hardware address as
    /// fixed-width hex on Windows
    pub identity: String,
    /// Total bytes received since the interface came up or its counters reset
    pub download_bytes: u64,
    /// Total bytes sent since the interface came up or its counters reset
    pub upload_bytes: u64,
    /// Remote peer attribution; always empty when produced by a collector
    pub host: String,
}

impl InterfaceSample {
    pub fn new(identity: impl Into<String>, download_bytes: u64, upload_bytes: u64) -> Self {
        Self {
            identity: identity.into(),
            download_bytes,
            upload_bytes,
            host: String::new(),
        }
    }

    /// Gets the total bytes transferred (received + sent)
    pub fn total_bytes(&self) -> u64 {
        self.download_bytes.saturating_add(self.upload_bytes)
    }
}

/// One successful collection, stamped with the time it was taken
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleBatch {
    /// UTC timestamp when the collection completed
    pub collected_at: DateTime<Utc>,
    /// Name of the backend that produced the samples
    pub backend: String,
    pub samples: Vec<InterfaceSample>,
}

impl SampleBatch {
    pub fn new(backend: impl Into<String>, samples: Vec<InterfaceSample>) -> Self {
        Self {
            collected_at: Utc::now(),
            backend: backend.into(),
            samples,
        }
    }

    /// Sum of download counters across all interfaces in the batch
    pub fn total_download_bytes(&self) -> u64 {
        self.samples
            .iter()
            .fold(0u64, |acc, s| acc.saturating_add(s.download_bytes))
    }

    /// Sum of upload counters across all interfaces in the batch
    pub fn total_upload_bytes(&self) -> u64 {
        self.samples
            .iter()
            .fold(0u64, |acc, s| acc.saturating_add(s.upload_bytes))
    }

    pub fn find(&self, identity: &str) -> Option<&InterfaceSample> {
        self.samples.iter().find(|s| s.identity == identity)
    }
}
