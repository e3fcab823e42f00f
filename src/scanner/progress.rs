use std::io::IsTerminal;

use indicatif::{ProgressBar, ProgressStyle};

use crate::scanner::{Reporter, Warning};

/// 终端进度条，警告输出时暂停进度条
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// 创建进度条；stderr 不是终端时使用隐藏的进度条
    pub fn new() -> Self {
        let bar = if cfg!(test) || !std::io::stderr().is_terminal() {
            ProgressBar::hidden()
        } else {
            Self::create_progress_bar()
        };
        Self { bar }
    }

    fn create_progress_bar() -> ProgressBar {
        let pb = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:30.cyan/blue} {percent:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        pb.set_style(style);
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for ProgressReporter {
    fn on_package(&self, processed: usize, total: usize, name: &str) {
        self.bar.set_length(total as u64);
        self.bar.set_position(processed as u64);
        self.bar.set_message(name.to_string());
    }

    fn warn(&self, warning: Warning) {
        self.bar.suspend(|| tracing::warn!("{}", warning));
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
