//! Interface counter data model
//!
//! ## Module Organization
//!
//! - `stats`: InterfaceSample and SampleBatch
//! - `errors`: CollectionError, its classification, and failure logging
//! - `formatting`: byte totals and hardware address rendering

pub mod errors;
pub mod formatting;
pub mod stats;

pub use errors::{CollectionError, CollectionErrorKind};
pub use formatting::{format_bytes, format_hardware_address};
pub use stats::{InterfaceSample, SampleBatch};
