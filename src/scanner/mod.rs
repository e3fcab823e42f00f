pub mod file_stat;
pub mod manifest_reader;
pub mod package_scanner;
pub mod progress;
pub mod project_ignore;
pub mod reporter;
pub mod workspace;

pub use file_stat::{EntryStat, FileStatCache, IgnoreFn, SubtreeSize};
pub use manifest_reader::{read_manifest, ManifestRead};
pub use package_scanner::PackageScanner;
pub use progress::ProgressReporter;
pub use project_ignore::ProjectIgnore;
pub use reporter::{NoopReporter, RecordingReporter, Reporter, TracingReporter, Warning};
pub use workspace::WorkspaceMatcher;
