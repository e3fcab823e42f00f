pub mod snapshot;
pub mod table;

pub use snapshot::write_snapshot;
pub use table::TableRenderer;
