pub mod defaults;
pub mod settings;

pub use settings::{AggregateConfig, Config, DisplayConfig, ProjectIgnoreConfig, ScanConfig, SortField};
