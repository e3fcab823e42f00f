pub mod analysis;
pub mod config;
pub mod error;
pub mod models;
pub mod output;
pub mod scanner;
pub mod tui;
pub mod utils;

// 重新导出常用类型
pub use analysis::{Analysis, AnalyzeOptions, Analyzer};
pub use config::Config;
pub use error::{AnalyzeError, Result};
