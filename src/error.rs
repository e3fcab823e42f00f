use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// 分析流程的结果类型
pub type Result<T> = std::result::Result<T, AnalyzeError>;

/// 会中止整个分析流程的错误
///
/// 单个文件、单个清单或单个依赖的问题不会出现在这里，
/// 它们通过 [`crate::scanner::Reporter`] 以警告的形式上报。
#[derive(Error, Debug)]
pub enum AnalyzeError {
    /// 根目录下没有可读取的 package.json
    #[error("Failed to read package.json from: {}", root.display())]
    ManifestNotFound { root: PathBuf },

    /// 根目录下没有安装目录
    #[error("Not found {install_dir} folder in {}, or try npm install first", root.display())]
    InstallRootNotFound { root: PathBuf, install_dir: String },

    /// 用户中断了聚合计算
    #[error("Aggregation cancelled")]
    Cancelled,

    /// 无法恢复的 I/O 错误
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl AnalyzeError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// 是否属于用户可见的致命错误（缺少清单或安装目录）
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::ManifestNotFound { .. } | Self::InstallRootNotFound { .. }
        )
    }
}
