use std::path::{Path, PathBuf};

use crate::config::ScanConfig;

/// 扫描与解析共享的路径上下文
///
/// 注册表中的 key 都是相对 `install_root` 的路径，分隔符统一为 `/`。
#[derive(Debug, Clone, PartialEq)]
pub struct PathContext {
    /// 被分析项目（或 workspace 包）的根目录
    pub project_root: PathBuf,

    /// 项目根目录下的安装目录
    pub install_root: PathBuf,

    pub install_dir: String,

    pub scope_prefix: String,

    pub manifest_file: String,
}

impl PathContext {
    pub fn new(project_root: &Path, scan: &ScanConfig) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            install_root: project_root.join(&scan.install_dir),
            install_dir: scan.install_dir.clone(),
            scope_prefix: scan.scope_prefix.clone(),
            manifest_file: scan.manifest_file.clone(),
        }
    }

    /// 相对安装根目录的规范化 key
    pub fn relative_key(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.install_root).unwrap_or(path);
        normalize_separators(&relative.to_string_lossy())
    }

    /// 包目录下的私有安装目录
    pub fn nested_install_dir(&self, package_dir: &Path) -> PathBuf {
        package_dir.join(&self.install_dir)
    }

    /// 包目录下的清单文件
    pub fn manifest_path(&self, package_dir: &Path) -> PathBuf {
        package_dir.join(&self.manifest_file)
    }

    pub fn is_scope_dir(&self, name: &str) -> bool {
        !self.scope_prefix.is_empty() && name.starts_with(&self.scope_prefix)
    }

    /// key 是否位于某个包的私有安装目录中
    pub fn is_nested_key(&self, key: &str) -> bool {
        key.split('/').any(|segment| segment == self.install_dir)
    }
}

/// 把 `\` 统一为 `/`
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}
