use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::models::DependencyKind;

/// 可恢复的问题，上报后流程继续
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// 无法读取文件或目录的元数据
    StatFailed { path: PathBuf, error: String },

    /// 无法列出目录内容
    ReadDirFailed { path: PathBuf, error: String },

    /// package.json 存在但无法解析
    MalformedManifest { path: PathBuf, error: String },

    /// 非可选依赖在任何安装位置都找不到
    MissingDependency {
        requester: String,
        name: String,
        kind: DependencyKind,
    },

    /// 既不是文件、目录也不是链接的条目
    UnknownEntry { path: PathBuf },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::StatFailed { path, error } => {
                write!(f, "无法读取文件信息 {}: {}", path.display(), error)
            }
            Warning::ReadDirFailed { path, error } => {
                write!(f, "无法读取目录 {}: {}", path.display(), error)
            }
            Warning::MalformedManifest { path, error } => {
                write!(f, "无法解析 {}: {}", path.display(), error)
            }
            Warning::MissingDependency { requester, name, kind } => {
                write!(f, "not found module: {} ({} of {})", name, kind.manifest_key(), requester)
            }
            Warning::UnknownEntry { path } => {
                write!(f, "Unknown module: {}", path.display())
            }
        }
    }
}

/// 扫描与聚合时注入的上报能力（进度 + 警告）
pub trait Reporter: Send + Sync {
    /// 创建了一个包记录；`processed` 单调不减
    fn on_package(&self, _processed: usize, _total: usize, _name: &str) {}

    /// 上报可恢复的问题
    fn warn(&self, warning: Warning);

    /// 扫描阶段结束
    fn finish(&self) {}
}

/// 什么都不做，测试默认使用
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl Reporter for NoopReporter {
    fn warn(&self, _warning: Warning) {}
}

/// 把警告写入 tracing 日志
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn on_package(&self, processed: usize, total: usize, name: &str) {
        tracing::trace!("[{}/{}] {}", processed, total, name);
    }

    fn warn(&self, warning: Warning) {
        tracing::warn!("{}", warning);
    }
}

/// 记录所有警告和进度，便于检查
#[derive(Debug, Default)]
pub struct RecordingReporter {
    warnings: Mutex<Vec<Warning>>,
    progress: Mutex<Vec<(usize, usize)>>,
    finished: AtomicUsize,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> Vec<Warning> {
        self.warnings.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// 所有 MissingDependency 警告的 (requester, name)
    pub fn missing_dependencies(&self) -> Vec<(String, String)> {
        self.warnings()
            .into_iter()
            .filter_map(|w| match w {
                Warning::MissingDependency { requester, name, .. } => Some((requester, name)),
                _ => None,
            })
            .collect()
    }

    pub fn progress(&self) -> Vec<(usize, usize)> {
        self.progress.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// finish 被调用的次数
    pub fn finish_count(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

impl Reporter for RecordingReporter {
    fn on_package(&self, processed: usize, total: usize, _name: &str) {
        if let Ok(mut progress) = self.progress.lock() {
            progress.push((processed, total));
        }
    }

    fn warn(&self, warning: Warning) {
        if let Ok(mut warnings) = self.warnings.lock() {
            warnings.push(warning);
        }
    }

    fn finish(&self) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}
