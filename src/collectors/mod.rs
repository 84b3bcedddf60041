pub mod counters;
pub mod platform;

pub use counters::{CollectionError, CollectionErrorKind, InterfaceSample, SampleBatch};
pub use platform::{CollectorOptions, InterfaceStatsCollector, create_platform_collector};
