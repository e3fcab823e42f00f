use crate::models::{PackageRecord, Registry};

/// 分层注册表中的一个包：第几层、层内第几个
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub layer: usize,
    pub index: usize,
}

/// 依赖解析器 - 与运行时模块解析相同的"先嵌套、后提升"查找
///
/// 第 0 层是请求方所在的注册表；后续层是外层项目的注册表（workspace 包回退到
/// 主项目的安装目录），只做提升位置的查找。
pub struct Resolver<'a> {
    layers: Vec<&'a Registry>,
}

impl<'a> Resolver<'a> {
    pub fn new(layers: Vec<&'a Registry>) -> Self {
        Self { layers }
    }

    pub fn single(registry: &'a Registry) -> Self {
        Self::new(vec![registry])
    }

    pub fn layers(&self) -> &[&'a Registry] {
        &self.layers
    }

    pub fn record(&self, id: NodeId) -> Option<&'a PackageRecord> {
        self.layers.get(id.layer).and_then(|registry| registry.get_index(id.index))
    }

    /// 解析依赖名；`from` 为 None 表示由第 0 层的根项目发起
    pub fn resolve(&self, name: &str, from: Option<NodeId>) -> Option<NodeId> {
        let (start_layer, requester_path) = match from {
            Some(id) => (id.layer, self.record(id).map(|r| r.path.as_str()).unwrap_or("")),
            None => (0, ""),
        };

        let registry = self.layers.get(start_layer)?;
        if let Some(index) = lookup(registry, requester_path, name) {
            return Some(NodeId { layer: start_layer, index });
        }

        self.layers
            .iter()
            .enumerate()
            .skip(start_layer + 1)
            .find_map(|(layer, registry)| {
                registry.index_of(name).map(|index| NodeId { layer, index })
            })
    }
}

/// 在单个注册表中按请求方路径解析依赖
pub fn resolve<'r>(name: &str, requester_path: &str, registry: &'r Registry) -> Option<&'r PackageRecord> {
    lookup(registry, requester_path, name).and_then(|index| registry.get_index(index))
}

fn lookup(registry: &Registry, requester_path: &str, name: &str) -> Option<usize> {
    candidate_keys(requester_path, name, &registry.install_dir)
        .iter()
        .find_map(|key| registry.index_of(key))
}

/// 依次尝试的注册表 key：从请求方自身的私有安装目录开始逐级向上，最后是提升位置
///
/// 以安装目录名结尾的祖先不会再拼接一层安装目录。
pub fn candidate_keys(requester_path: &str, name: &str, install_dir: &str) -> Vec<String> {
    let segments: Vec<&str> = requester_path
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    let mut keys = Vec::with_capacity(segments.len() + 1);
    for end in (1..=segments.len()).rev() {
        if segments[end - 1] == install_dir {
            continue;
        }
        keys.push(format!("{}/{}/{}", segments[..end].join("/"), install_dir, name));
    }
    keys.push(name.to_string());
    keys
}
