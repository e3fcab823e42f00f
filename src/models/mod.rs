pub mod manifest;
pub mod package;
pub mod path_context;
pub mod registry;
pub mod report;

pub use manifest::{DeclaredDependencies, DependencyGroup, DependencyKind, Manifest};
pub use package::{Aggregates, PackageRecord};
pub use path_context::PathContext;
pub use registry::{Registry, RootInfo};
pub use report::{GroupRow, Metrics, ModuleRow, Overview, Report, Row, Snapshot};
