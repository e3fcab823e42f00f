use serde::{Deserialize, Serialize};

use crate::models::{DeclaredDependencies, DependencyKind};

/// 传递依赖聚合结果，聚合前全部为 0
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregates {
    /// 去重后的传递依赖数量
    pub dep_count: usize,

    /// 传递依赖的自身大小之和
    pub dep_size: u64,

    /// 传递依赖的自身文件数之和
    pub dep_files: usize,

    /// 传递依赖中嵌套安装的数量
    pub nested_dep_count: usize,
}

/// 一个已安装的包目录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// 相对安装根目录的路径，例如 `lodash` 或 `foo/node_modules/lodash`；根项目为空串
    pub path: String,

    pub name: String,

    pub version: String,

    /// 声明的依赖分组
    pub declared: DeclaredDependencies,

    /// 是否安装在其他包的私有安装目录中
    pub is_nested: bool,

    /// 是否是符号链接
    pub is_link: bool,

    /// 包目录自身的文件数量（不含嵌套安装目录）
    pub self_files: usize,

    /// 包目录自身的字节数（不含嵌套安装目录）
    pub self_size: u64,

    pub aggregates: Aggregates,
}

impl PackageRecord {
    /// 创建已安装包记录，已安装包的开发依赖不参与计算
    pub fn installed(
        path: String,
        name: String,
        version: String,
        declared: DeclaredDependencies,
    ) -> Self {
        Self {
            path,
            name,
            version,
            declared: declared.without_development(),
            is_nested: false,
            is_link: false,
            self_files: 0,
            self_size: 0,
            aggregates: Aggregates::default(),
        }
    }

    /// 创建根项目记录
    pub fn root(name: String, version: String, declared: DeclaredDependencies) -> Self {
        Self {
            path: String::new(),
            name,
            version,
            declared,
            is_nested: false,
            is_link: false,
            self_files: 0,
            self_size: 0,
            aggregates: Aggregates::default(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// 是否计入嵌套安装数量，链接包不算
    pub fn counts_as_nested(&self) -> bool {
        self.is_nested && !self.is_link
    }

    /// 参与聚合的依赖名（按分组顺序，同名只出现一次）
    pub fn visible_dependencies(&self, include_peer: bool, include_dev: bool) -> Vec<(&str, DependencyKind)> {
        let mut names: Vec<(&str, DependencyKind)> = Vec::new();
        for group in self.declared.groups() {
            let visible = match group.kind {
                DependencyKind::Runtime | DependencyKind::Optional => true,
                DependencyKind::Peer => include_peer,
                DependencyKind::Development => include_dev && self.is_root(),
            };
            if !visible {
                continue;
            }
            for name in group.entries.keys() {
                if !names.iter().any(|(n, _)| *n == name.as_str()) {
                    names.push((name.as_str(), group.kind));
                }
            }
        }
        names
    }
}
