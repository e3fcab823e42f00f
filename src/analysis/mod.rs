pub mod aggregator;
pub mod analyzer;
pub mod graph;
pub mod overview;
pub mod report_builder;
pub mod resolver;

pub use aggregator::{AggregateOptions, AggregationEngine};
pub use analyzer::{Analysis, AnalyzeOptions, Analyzer};
pub use graph::{EdgeRules, EdgeTable};
pub use overview::overview;
pub use report_builder::ReportBuilder;
pub use resolver::{resolve, NodeId, Resolver};
