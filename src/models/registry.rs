use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;

use crate::models::PackageRecord;

/// 一次扫描得到的已安装包注册表，key 为相对安装根目录的路径
#[derive(Debug, Clone, Default, Serialize)]
pub struct Registry {
    /// 安装根目录的绝对路径
    pub install_root: PathBuf,

    /// 安装目录名（嵌套解析时使用）
    pub install_dir: String,

    /// 按发现顺序保存的包记录
    entries: IndexMap<String, PackageRecord>,

    /// 安装目录中不属于任何包的文件数量（.bin、.package-lock.json 等）
    pub loose_files: usize,

    /// 安装目录中不属于任何包的字节数
    pub loose_size: u64,
}

impl Registry {
    pub fn new(install_root: &Path, install_dir: &str) -> Self {
        Self {
            install_root: install_root.to_path_buf(),
            install_dir: install_dir.to_string(),
            ..Self::default()
        }
    }

    /// 插入记录；path 已存在时保留旧记录并返回 false
    pub fn insert(&mut self, record: PackageRecord) -> bool {
        if self.entries.contains_key(&record.path) {
            return false;
        }
        self.entries.insert(record.path.clone(), record);
        true
    }

    pub fn get(&self, path: &str) -> Option<&PackageRecord> {
        self.entries.get(path)
    }

    pub fn index_of(&self, path: &str) -> Option<usize> {
        self.entries.get_index_of(path)
    }

    pub fn get_index(&self, index: usize) -> Option<&PackageRecord> {
        self.entries.get_index(index).map(|(_, record)| record)
    }

    pub(crate) fn get_index_mut(&mut self, index: usize) -> Option<&mut PackageRecord> {
        self.entries.get_index_mut(index).map(|(_, record)| record)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &PackageRecord> {
        self.entries.values()
    }

    /// 所有包自身大小与零散文件之和，即安装目录的实际占用
    pub fn total_size(&self) -> u64 {
        self.records().map(|r| r.self_size).sum::<u64>() + self.loose_size
    }

    pub fn total_files(&self) -> usize {
        self.records().map(|r| r.self_files).sum::<usize>() + self.loose_files
    }
}

/// 被分析的根：主项目或 workspace 包
#[derive(Debug, Clone, Serialize)]
pub struct RootInfo {
    /// 根目录绝对路径
    pub dir: PathBuf,

    /// 相对主项目的目录，主项目为 "."
    pub label: String,

    /// 根记录，path 为空串
    pub record: PackageRecord,

    /// 该根自己的安装目录（workspace 包可能没有）
    pub registry: Option<Registry>,
}

impl RootInfo {
    pub fn new(dir: &Path, label: &str, record: PackageRecord) -> Self {
        Self {
            dir: dir.to_path_buf(),
            label: label.to_string(),
            record,
            registry: None,
        }
    }

    pub fn is_project(&self) -> bool {
        self.label == "."
    }
}
