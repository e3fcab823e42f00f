use std::collections::HashSet;
use std::path::PathBuf;

use crate::analysis::resolver::{NodeId, Resolver};
use crate::models::{DependencyKind, PackageRecord};
use crate::scanner::{Reporter, Warning};

/// 已上报过的缺失依赖：(安装根目录, 请求方路径, 依赖名)
pub type WarnedSet = HashSet<(PathBuf, String, String)>;

/// 依赖图的可见性规则
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeRules {
    pub include_peer: bool,

    /// 只对根项目生效
    pub include_dev: bool,
}

/// 预先解析好的依赖边
///
/// 每个包的依赖只解析一次，之后每次 BFS 都只读这张表，
/// 所以并行聚合时不需要再访问解析器，也不会重复上报缺失依赖。
#[derive(Debug, Default)]
pub struct EdgeTable {
    /// [layer][index] -> 解析到的依赖
    edges: Vec<Vec<Vec<NodeId>>>,

    root: Vec<NodeId>,
}

impl EdgeTable {
    pub fn build(
        resolver: &Resolver<'_>,
        root: &PackageRecord,
        rules: EdgeRules,
        warned: &mut WarnedSet,
        reporter: &dyn Reporter,
    ) -> Self {
        let mut builder = EdgeBuilder { resolver, rules, warned, reporter };

        let root_edges = builder.resolve_all(root, None);

        let mut edges = Vec::with_capacity(resolver.layers().len());
        for (layer, registry) in resolver.layers().iter().enumerate() {
            let layer_edges = registry
                .records()
                .enumerate()
                .map(|(index, record)| builder.resolve_all(record, Some(NodeId { layer, index })))
                .collect();
            edges.push(layer_edges);
        }

        Self { edges, root: root_edges }
    }

    pub fn dependencies(&self, id: NodeId) -> &[NodeId] {
        self.edges
            .get(id.layer)
            .and_then(|layer| layer.get(id.index))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn root_dependencies(&self) -> &[NodeId] {
        &self.root
    }

    /// 边的总数（含根项目）
    pub fn edge_count(&self) -> usize {
        self.root.len()
            + self
                .edges
                .iter()
                .flat_map(|layer| layer.iter())
                .map(Vec::len)
                .sum::<usize>()
    }
}

struct EdgeBuilder<'a, 'r> {
    resolver: &'a Resolver<'r>,
    rules: EdgeRules,
    warned: &'a mut WarnedSet,
    reporter: &'a dyn Reporter,
}

impl EdgeBuilder<'_, '_> {
    fn resolve_all(&mut self, record: &PackageRecord, from: Option<NodeId>) -> Vec<NodeId> {
        let mut resolved = Vec::new();
        for (name, kind) in record.visible_dependencies(self.rules.include_peer, self.rules.include_dev) {
            match self.resolver.resolve(name, from) {
                Some(id) => {
                    if !resolved.contains(&id) {
                        resolved.push(id);
                    }
                }
                None => self.report_missing(record, from, name, kind),
            }
        }
        resolved
    }

    fn report_missing(&mut self, record: &PackageRecord, from: Option<NodeId>, name: &str, kind: DependencyKind) {
        // 缺少可选依赖是正常情况
        if kind == DependencyKind::Optional || record.declared.is_optional(name) {
            return;
        }

        let layer = from.map(|id| id.layer).unwrap_or(0);
        let install_root = self
            .resolver
            .layers()
            .get(layer)
            .map(|registry| registry.install_root.clone())
            .unwrap_or_default();

        let key = (install_root, record.path.clone(), name.to_string());
        if !self.warned.insert(key) {
            return;
        }

        let requester = if record.is_root() {
            record.name.clone()
        } else {
            record.path.clone()
        };
        self.reporter.warn(Warning::MissingDependency {
            requester,
            name: name.to_string(),
            kind,
        });
    }
}
