use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 依赖分组类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyKind {
    /// dependencies
    Runtime,

    /// optionalDependencies
    Optional,

    /// peerDependencies
    Peer,

    /// devDependencies（只对根项目生效）
    Development,
}

impl DependencyKind {
    /// 报表中的分组顺序
    pub const ALL: [DependencyKind; 4] = [
        DependencyKind::Runtime,
        DependencyKind::Optional,
        DependencyKind::Peer,
        DependencyKind::Development,
    ];

    /// package.json 中对应的字段名
    pub fn manifest_key(&self) -> &'static str {
        match self {
            DependencyKind::Runtime => "dependencies",
            DependencyKind::Optional => "optionalDependencies",
            DependencyKind::Peer => "peerDependencies",
            DependencyKind::Development => "devDependencies",
        }
    }
}

/// 一个依赖分组：依赖名 -> 版本范围
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyGroup {
    pub kind: DependencyKind,
    pub entries: IndexMap<String, String>,
}

/// 按声明顺序保存的依赖分组
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeclaredDependencies {
    groups: Vec<DependencyGroup>,

    /// peerDependenciesMeta 中标记为 optional 的依赖名
    #[serde(default)]
    optional_peers: Vec<String>,
}

impl DeclaredDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加分组，空分组会被忽略，同类分组会被合并
    pub fn insert(&mut self, kind: DependencyKind, entries: IndexMap<String, String>) {
        if entries.is_empty() {
            return;
        }
        match self.groups.iter_mut().find(|g| g.kind == kind) {
            Some(group) => group.entries.extend(entries),
            None => self.groups.push(DependencyGroup { kind, entries }),
        }
    }

    pub fn group(&self, kind: DependencyKind) -> Option<&DependencyGroup> {
        self.groups.iter().find(|g| g.kind == kind)
    }

    pub fn groups(&self) -> impl Iterator<Item = &DependencyGroup> {
        self.groups.iter()
    }

    /// 去掉 devDependencies（已安装的包不会安装自己的开发依赖）
    pub fn without_development(mut self) -> Self {
        self.groups.retain(|g| g.kind != DependencyKind::Development);
        self
    }

    pub fn mark_optional_peer(&mut self, name: &str) {
        if !self.optional_peers.iter().any(|n| n == name) {
            self.optional_peers.push(name.to_string());
        }
    }

    /// 依赖名是否可选：出现在 optionalDependencies 中，或是可选的 peer 依赖
    pub fn is_optional(&self, name: &str) -> bool {
        let in_optional_group = self.group(DependencyKind::Optional)
            .map(|g| g.entries.contains_key(name))
            .unwrap_or(false);
        in_optional_group || self.optional_peers.iter().any(|n| n == name)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// 读取到的包清单
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub name: Option<String>,
    pub version: String,
    pub dependencies: DeclaredDependencies,

    /// workspaces 字段中的通配符
    pub workspaces: Vec<String>,
}

impl Manifest {
    /// 从 JSON 值构建清单，根节点不是对象时返回 None
    pub fn from_json(json: &Value) -> Option<Self> {
        let object = json.as_object()?;

        let name = object.get("name")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        let version = object.get("version")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let mut dependencies = DeclaredDependencies::new();
        for kind in DependencyKind::ALL {
            if let Some(map) = object.get(kind.manifest_key()).and_then(|v| v.as_object()) {
                let entries = map.iter()
                    .map(|(name, range)| {
                        let range = match range {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (name.clone(), range)
                    })
                    .collect();
                dependencies.insert(kind, entries);
            }
        }

        if let Some(meta) = object.get("peerDependenciesMeta").and_then(|v| v.as_object()) {
            let optional = meta.iter().filter(|(_, entry)| {
                entry.get("optional").and_then(|v| v.as_bool()).unwrap_or(false)
            });
            for (name, _) in optional {
                dependencies.mark_optional_peer(name);
            }
        }

        Some(Self {
            name,
            version,
            dependencies,
            workspaces: Self::parse_workspaces(object.get("workspaces")),
        })
    }

    /// workspaces 既可以是数组，也可以是 { packages: [...] }
    fn parse_workspaces(value: Option<&Value>) -> Vec<String> {
        let list = match value {
            Some(Value::Array(list)) => list,
            Some(Value::Object(map)) => match map.get("packages") {
                Some(Value::Array(list)) => list,
                _ => return Vec::new(),
            },
            Some(Value::String(s)) => return s.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            _ => return Vec::new(),
        };

        list.iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.to_string())
            .collect()
    }

    /// 包名，缺失时退回到目录名
    pub fn display_name(&self, fallback: &str) -> String {
        self.name.clone().unwrap_or_else(|| fallback.to_string())
    }
}
