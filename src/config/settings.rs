use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use anyhow::Result;

use crate::config::defaults::DefaultConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 扫描配置
    pub scan: ScanConfig,

    /// 根项目忽略配置
    pub ignore: ProjectIgnoreConfig,

    /// 聚合计算配置
    pub aggregate: AggregateConfig,

    /// 显示配置
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// 安装目录名
    pub install_dir: String,

    /// scope 目录前缀
    pub scope_prefix: String,

    /// 包清单文件名
    pub manifest_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectIgnoreConfig {
    /// 是否读取根目录的 .gitignore
    pub use_gitignore: bool,

    /// 额外的 gitignore 语法规则
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    /// peerDependencies 是否参与传递聚合
    pub include_peer: bool,

    /// 并行聚合线程数，0 表示使用 CPU 核心数
    pub threads: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// 默认排序字段
    pub default_sort: Option<SortField>,

    /// 是否显示文件数量列
    pub show_files: bool,
}

/// 报表排序字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Name,
    Version,
    Size,
    Files,
    Deps,
    #[value(name = "dSize", alias = "d-size")]
    DSize,
    Nested,
}

impl SortField {
    pub const ALL: [SortField; 7] = [
        SortField::Name,
        SortField::Version,
        SortField::Size,
        SortField::Files,
        SortField::Deps,
        SortField::DSize,
        SortField::Nested,
    ];

    /// 报表中对应的列名
    pub fn column_name(&self) -> &'static str {
        match self {
            SortField::Name => "Name",
            SortField::Version => "Version",
            SortField::Size => "Size",
            SortField::Files => "Files",
            SortField::Deps => "Deps Amount",
            SortField::DSize => "Deps Size",
            SortField::Nested => "Deps Nested",
        }
    }

    /// 循环切换到下一个字段
    pub fn next(&self) -> SortField {
        let index = Self::ALL.iter().position(|f| f == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            install_dir: DefaultConfig::INSTALL_DIR.to_string(),
            scope_prefix: DefaultConfig::SCOPE_PREFIX.to_string(),
            manifest_file: DefaultConfig::MANIFEST_FILE.to_string(),
        }
    }
}

impl Default for ProjectIgnoreConfig {
    fn default() -> Self {
        Self {
            use_gitignore: true,
            patterns: DefaultConfig::default_ignore_patterns(),
        }
    }
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            include_peer: true,
            threads: 0,
        }
    }
}

impl AggregateConfig {
    /// 实际使用的线程数
    pub fn effective_threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get().max(1)
        } else {
            self.threads
        }
    }
}

impl Config {
    /// 从文件加载配置
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// 获取默认配置文件路径
    pub fn default_config_path() -> Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("无法找到配置目录"))?;
        path.push("nm-analyzer");
        path.push("config.toml");
        Ok(path)
    }

    /// 加载配置，如果文件不存在则使用默认配置
    pub fn load_or_default() -> Result<Self> {
        let config_path = match Self::default_config_path() {
            Ok(path) => path,
            Err(_) => return Ok(Self::default()),
        };

        if config_path.exists() {
            tracing::debug!("加载配置文件: {}", config_path.display());
            Self::load_from_file(&config_path)
        } else {
            Ok(Self::default())
        }
    }
}
