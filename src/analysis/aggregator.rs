use std::collections::{HashSet, VecDeque};

use rayon::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::analysis::graph::{EdgeRules, EdgeTable, WarnedSet};
use crate::analysis::resolver::{NodeId, Resolver};
use crate::config::AggregateConfig;
use crate::error::{AnalyzeError, Result};
use crate::models::{Aggregates, PackageRecord, Registry};
use crate::scanner::Reporter;

/// 聚合选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateOptions {
    pub include_peer: bool,

    /// 根项目的 devDependencies 是否参与聚合（`--prod` 时为 false）
    pub include_dev: bool,

    /// rayon 线程数
    pub threads: usize,
}

impl AggregateOptions {
    pub fn from_config(config: &AggregateConfig, prod: bool) -> Self {
        Self {
            include_peer: config.include_peer,
            include_dev: !prod,
            threads: config.effective_threads(),
        }
    }

    fn rules(&self) -> EdgeRules {
        EdgeRules {
            include_peer: self.include_peer,
            include_dev: self.include_dev,
        }
    }
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self::from_config(&AggregateConfig::default(), false)
    }
}

/// 传递依赖聚合引擎
///
/// 每个起点包各自做一次 BFS，使用私有的 visited 集合；
/// 不同起点之间互不共享结果，所以可以安全地并行。
pub struct AggregationEngine<'r> {
    options: AggregateOptions,
    reporter: &'r dyn Reporter,
    cancel: CancellationToken,

    /// 整个运行期间已上报的缺失依赖
    warned: WarnedSet,
}

impl<'r> AggregationEngine<'r> {
    pub fn new(options: AggregateOptions, reporter: &'r dyn Reporter) -> Self {
        Self {
            options,
            reporter,
            cancel: CancellationToken::new(),
            warned: WarnedSet::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 为注册表中每个包和根项目计算聚合结果
    pub fn aggregate(&mut self, registry: &mut Registry, root: &mut PackageRecord) -> Result<()> {
        self.aggregate_layered(registry, &[], root)
    }

    /// 与 [`aggregate`](Self::aggregate) 相同，但解析时在 `local` 找不到的依赖
    /// 会继续在 `fallback` 的提升位置查找（workspace 包回退到主项目）
    ///
    /// 只有 `local` 中的记录和 `root` 会被写入。
    pub fn aggregate_layered(
        &mut self,
        local: &mut Registry,
        fallback: &[&Registry],
        root: &mut PackageRecord,
    ) -> Result<()> {
        let (root_aggregates, package_aggregates) = {
            let mut layers: Vec<&Registry> = vec![&*local];
            layers.extend_from_slice(fallback);
            let resolver = Resolver::new(layers);

            let edges = EdgeTable::build(
                &resolver,
                root,
                self.options.rules(),
                &mut self.warned,
                self.reporter,
            );
            tracing::debug!(
                "依赖图: {} 个包, {} 条边",
                resolver.layers().iter().map(|r| r.len()).sum::<usize>(),
                edges.edge_count()
            );

            let root_aggregates = fold(&resolver, &reachable_set(&edges, edges.root_dependencies()));
            let package_aggregates = self.aggregate_packages(&resolver, &edges, local.len())?;
            (root_aggregates, package_aggregates)
        };

        for (index, aggregates) in package_aggregates.into_iter().enumerate() {
            if let Some(record) = local.get_index_mut(index) {
                record.aggregates = aggregates;
            }
        }
        root.aggregates = root_aggregates;

        Ok(())
    }

    /// 并行计算第 0 层每个包的聚合结果；取消时在两个起点包之间中止
    fn aggregate_packages(
        &self,
        resolver: &Resolver<'_>,
        edges: &EdgeTable,
        count: usize,
    ) -> Result<Vec<Aggregates>> {
        let cancel = &self.cancel;
        let work = || {
            (0..count)
                .into_par_iter()
                .map(|index| {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    let start = NodeId { layer: 0, index };
                    let visited = reachable_set(edges, edges.dependencies(start));
                    Some(fold(resolver, &visited))
                })
                .collect::<Option<Vec<_>>>()
        };

        let results = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.threads.max(1))
            .build()
        {
            Ok(pool) => pool.install(work),
            Err(err) => {
                tracing::debug!("创建线程池失败，使用全局线程池: {}", err);
                work()
            }
        };

        match results {
            Some(results) if !cancel.is_cancelled() => Ok(results),
            _ => Err(AnalyzeError::Cancelled),
        }
    }
}

/// 从直接依赖出发做 BFS，返回按发现顺序排列的去重可达集合
///
/// 起点包本身只有在依赖环回到它时才会出现在集合中。
pub fn reachable_set(edges: &EdgeTable, direct: &[NodeId]) -> Vec<NodeId> {
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut order = Vec::new();
    let mut queue: VecDeque<NodeId> = VecDeque::new();

    for &id in direct {
        if visited.insert(id) {
            order.push(id);
            queue.push_back(id);
        }
    }

    while let Some(current) = queue.pop_front() {
        for &next in edges.dependencies(current) {
            if visited.insert(next) {
                order.push(next);
                queue.push_back(next);
            }
        }
    }

    order
}

/// 把可达集合折叠为聚合数值
pub fn fold(resolver: &Resolver<'_>, visited: &[NodeId]) -> Aggregates {
    let mut aggregates = Aggregates::default();
    for record in visited.iter().filter_map(|&id| resolver.record(id)) {
        aggregates.dep_count += 1;
        aggregates.dep_size += record.self_size;
        aggregates.dep_files += record.self_files;
        if record.counts_as_nested() {
            aggregates.nested_dep_count += 1;
        }
    }
    aggregates
}
