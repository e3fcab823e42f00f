pub mod report_screen;

pub use report_screen::{ReportScreen, ReportView};
