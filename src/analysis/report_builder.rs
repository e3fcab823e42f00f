use crate::analysis::aggregator::AggregateOptions;
use crate::analysis::resolver::Resolver;
use crate::models::{DependencyKind, GroupRow, Metrics, ModuleRow, PackageRecord, Registry, RootInfo, Row};

/// 把聚合后的注册表组装成报表树
///
/// 每个根一行，子行是依赖分组；指定了模块时子行直接是这些模块。
pub struct ReportBuilder<'a> {
    include_peer: bool,
    include_dev: bool,
    modules: &'a [String],
}

impl<'a> ReportBuilder<'a> {
    pub fn new(options: &AggregateOptions) -> Self {
        Self {
            include_peer: options.include_peer,
            include_dev: options.include_dev,
            modules: &[],
        }
    }

    pub fn with_modules(mut self, modules: &'a [String]) -> Self {
        self.modules = modules;
        self
    }

    /// 构建一个根的报表行
    ///
    /// `project` 为主项目注册表，workspace 包在自己的安装目录中找不到的依赖会回退到这里。
    pub fn build_root(&self, root: &RootInfo, project: Option<&Registry>) -> Row {
        let empty = Registry::default();
        let mut layers: Vec<&Registry> = vec![root.registry.as_ref().unwrap_or(&empty)];
        if !root.is_project() {
            layers.extend(project);
        }
        let resolver = Resolver::new(layers);

        let children = if self.modules.is_empty() {
            self.group_rows(&root.record, &resolver)
        } else {
            self.modules
                .iter()
                .map(|name| module_row(name, &resolver))
                .collect()
        };

        Row::Module(ModuleRow {
            name: root.record.name.clone(),
            path: Some(root.label.clone()),
            version: Some(root.record.version.clone()),
            metrics: Some(Metrics::from(&root.record)),
            children,
        })
    }

    fn group_rows(&self, record: &PackageRecord, resolver: &Resolver<'_>) -> Vec<Row> {
        DependencyKind::ALL
            .iter()
            .filter(|kind| self.is_visible(**kind))
            .filter_map(|kind| record.declared.group(*kind))
            .map(|group| {
                Row::Group(GroupRow {
                    name: group.kind.manifest_key().to_string(),
                    children: group
                        .entries
                        .keys()
                        .map(|name| module_row(name, resolver))
                        .collect(),
                })
            })
            .collect()
    }

    fn is_visible(&self, kind: DependencyKind) -> bool {
        match kind {
            DependencyKind::Runtime | DependencyKind::Optional => true,
            DependencyKind::Peer => self.include_peer,
            DependencyKind::Development => self.include_dev,
        }
    }
}

fn module_row(name: &str, resolver: &Resolver<'_>) -> Row {
    let row = resolver
        .resolve(name, None)
        .and_then(|id| resolver.record(id))
        .map(|record| ModuleRow::resolved(record, name))
        .unwrap_or_else(|| ModuleRow::missing(name));
    Row::Module(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Aggregates, DeclaredDependencies};
    use indexmap::IndexMap;
    use std::path::Path;

    fn deps(names: &[&str]) -> IndexMap<String, String> {
        names.iter().map(|n| (n.to_string(), "*".to_string())).collect()
    }

    fn registry(names: &[&str]) -> Registry {
        let mut registry = Registry::new(Path::new("/app/node_modules"), "node_modules");
        for name in names {
            let mut record = PackageRecord::installed(name.to_string(), name.to_string(), "2.0.0".into(), DeclaredDependencies::new());
            record.self_size = 100;
            record.aggregates = Aggregates { dep_count: 1, dep_size: 5, dep_files: 1, nested_dep_count: 0 };
            registry.insert(record);
        }
        registry
    }

    fn project(registry: Registry) -> RootInfo {
        let mut declared = DeclaredDependencies::new();
        declared.insert(DependencyKind::Development, deps(&["jest"]));
        declared.insert(DependencyKind::Runtime, deps(&["x", "gone"]));
        let record = PackageRecord::root("app".into(), "1.0.0".into(), declared);
        let mut root = RootInfo::new(Path::new("/app"), ".", record);
        root.registry = Some(registry);
        root
    }

    fn names(row: &Row) -> Vec<&str> {
        row.children().iter().map(|r| r.name()).collect()
    }

    #[test]
    fn test_group_rows() {
        let root = project(registry(&["x", "jest"]));
        let row = ReportBuilder::new(&AggregateOptions::default()).build_root(&root, None);

        let module = row.as_module().unwrap();
        assert_eq!(module.name, "app");
        assert_eq!(module.path.as_deref(), Some("."));
        assert_eq!(names(&row), vec!["dependencies", "devDependencies"]);

        let runtime = &row.children()[0];
        assert_eq!(names(runtime), vec!["x", "gone"]);
        let x = runtime.children()[0].as_module().unwrap();
        assert_eq!(x.version.as_deref(), Some("2.0.0"));
        assert_eq!(x.metrics.unwrap().size, 100);
        assert_eq!(x.metrics.unwrap().dep_size, 5);
        assert!(runtime.children()[1].as_module().unwrap().is_missing());
    }

    #[test]
    fn test_prod_omits_dev_group() {
        let root = project(registry(&["x"]));
        let options = AggregateOptions { include_dev: false, ..AggregateOptions::default() };
        let row = ReportBuilder::new(&options).build_root(&root, None);
        assert_eq!(names(&row), vec!["dependencies"]);
    }

    #[test]
    fn test_module_filter() {
        let root = project(registry(&["x", "y"]));
        let modules = vec!["y".to_string(), "nope".to_string()];
        let row = ReportBuilder::new(&AggregateOptions::default())
            .with_modules(&modules)
            .build_root(&root, None);

        assert_eq!(names(&row), vec!["y", "nope"]);
        assert!(row.children()[1].as_module().unwrap().is_missing());
    }

    #[test]
    fn test_workspace_falls_back_to_project() {
        let project_registry = registry(&["x"]);

        let mut declared = DeclaredDependencies::new();
        declared.insert(DependencyKind::Runtime, deps(&["x"]));
        let record = PackageRecord::root("web".into(), "0.1.0".into(), declared);
        let workspace = RootInfo::new(Path::new("/app/packages/web"), "packages/web", record);

        let row = ReportBuilder::new(&AggregateOptions::default()).build_root(&workspace, Some(&project_registry));
        let x = row.children()[0].children()[0].as_module().unwrap();
        assert!(!x.is_missing());
        assert_eq!(row.as_module().unwrap().path.as_deref(), Some("packages/web"));
    }
}
