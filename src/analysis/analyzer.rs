use std::path::{Path, PathBuf};

use tokio::fs;
use tokio_util::sync::CancellationToken;

use crate::analysis::aggregator::{AggregateOptions, AggregationEngine};
use crate::analysis::overview::overview;
use crate::analysis::report_builder::ReportBuilder;
use crate::config::Config;
use crate::error::{AnalyzeError, Result};
use crate::models::path_context::normalize_separators;
use crate::models::{Manifest, PackageRecord, PathContext, Registry, Report, RootInfo};
use crate::scanner::{
    read_manifest, FileStatCache, ManifestRead, PackageScanner, ProjectIgnore, Reporter, Warning,
    WorkspaceMatcher,
};

/// 一次分析的输入
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    /// 含 package.json 的项目根目录
    pub root: PathBuf,

    /// 只报告这些已安装的包
    pub modules: Vec<String>,

    /// 排除根项目的 devDependencies
    pub prod: bool,

    /// None 不分析 workspace；Some(None) 分析全部；Some(Some(name)) 只分析匹配的包
    pub workspace: Option<Option<String>>,
}

impl AnalyzeOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }
}

/// 分析结果
#[derive(Debug, Clone)]
pub struct Analysis {
    /// 主项目，`registry` 总是存在
    pub project: RootInfo,

    pub workspaces: Vec<RootInfo>,

    pub report: Report,
}

impl Analysis {
    pub fn roots(&self) -> impl Iterator<Item = &RootInfo> {
        std::iter::once(&self.project).chain(self.workspaces.iter())
    }

    pub fn project_registry(&self) -> Option<&Registry> {
        self.project.registry.as_ref()
    }
}

/// 分析流程：检查 → 扫描 → 聚合 → 生成报表
pub struct Analyzer<'r> {
    config: Config,
    reporter: &'r dyn Reporter,
    cancel: CancellationToken,
}

impl<'r> Analyzer<'r> {
    pub fn new(config: Config, reporter: &'r dyn Reporter) -> Self {
        Self {
            config,
            reporter,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn run(&self, options: &AnalyzeOptions) -> Result<Analysis> {
        // 致命错误必须在任何扫描之前发现
        let root_dir = fs::canonicalize(&options.root).await.map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => AnalyzeError::ManifestNotFound { root: options.root.clone() },
            _ => AnalyzeError::io(&options.root, err),
        })?;
        let ctx = PathContext::new(&root_dir, &self.config.scan);

        let manifest = match read_manifest(&ctx.manifest_path(&root_dir)).await {
            ManifestRead::Found(manifest) => manifest,
            ManifestRead::Missing | ManifestRead::Malformed(_) => {
                return Err(AnalyzeError::ManifestNotFound { root: root_dir });
            }
        };

        if !is_dir(&ctx.install_root).await {
            return Err(AnalyzeError::InstallRootNotFound {
                root: root_dir,
                install_dir: ctx.install_dir.clone(),
            });
        }

        tracing::info!("分析项目: {}", root_dir.display());

        let mut project = self.load_root(&root_dir, ".", &manifest).await;

        // 进度条在所有扫描（包括 workspace）结束后才关闭
        let scanned = self.scan_all(ctx, &root_dir, &manifest, options).await;
        self.reporter.finish();
        let (mut project_registry, mut workspaces) = scanned?;
        tracing::info!("发现 {} 个已安装的包", project_registry.len());

        if self.cancel.is_cancelled() {
            return Err(AnalyzeError::Cancelled);
        }

        let aggregate_options = AggregateOptions::from_config(&self.config.aggregate, options.prod);
        let mut engine = AggregationEngine::new(aggregate_options, self.reporter)
            .with_cancel_token(self.cancel.clone());

        engine.aggregate(&mut project_registry, &mut project.record)?;
        for workspace in &mut workspaces {
            match workspace.registry.as_mut() {
                Some(local) => {
                    engine.aggregate_layered(local, &[&project_registry], &mut workspace.record)?;
                }
                None => {
                    let install_root = workspace.dir.join(&self.config.scan.install_dir);
                    let mut local = Registry::new(&install_root, &self.config.scan.install_dir);
                    engine.aggregate_layered(&mut local, &[&project_registry], &mut workspace.record)?;
                }
            }
        }
        project.registry = Some(project_registry);

        let overview = overview(all_registries(&project, &workspaces));

        let builder = ReportBuilder::new(&aggregate_options).with_modules(&options.modules);
        let rows = std::iter::once(builder.build_root(&project, None))
            .chain(
                workspaces
                    .iter()
                    .map(|workspace| builder.build_root(workspace, project.registry.as_ref())),
            )
            .collect();

        Ok(Analysis {
            project,
            workspaces,
            report: Report { rows, overview },
        })
    }

    /// 扫描主项目的安装目录和需要分析的 workspace 包
    async fn scan_all(
        &self,
        ctx: PathContext,
        root_dir: &Path,
        manifest: &Manifest,
        options: &AnalyzeOptions,
    ) -> Result<(Registry, Vec<RootInfo>)> {
        let project_registry = PackageScanner::new(ctx, self.reporter)
            .with_cancel_token(self.cancel.clone())
            .scan()
            .await?;

        let workspaces = match &options.workspace {
            Some(filter) => self.load_workspaces(root_dir, manifest, filter.as_deref()).await?,
            None => Vec::new(),
        };

        Ok((project_registry, workspaces))
    }

    /// 建立根记录并测量根目录自身的占用（按忽略规则跳过 .git、安装目录等）
    async fn load_root(&self, dir: &Path, label: &str, manifest: &Manifest) -> RootInfo {
        let fallback = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| label.to_string());

        let mut record = PackageRecord::root(
            manifest.display_name(&fallback),
            manifest.version.clone(),
            manifest.dependencies.clone(),
        );

        let ignore = ProjectIgnore::new(dir, &self.config.ignore);
        tracing::debug!("{}: {} 条忽略规则", label, ignore.rule_count());
        let is_ignored = |relative: &str, is_dir: bool| ignore.is_ignored(relative, is_dir);
        let footprint = FileStatCache::new(&self.config.scan.install_dir)
            .measure_subtree(dir, Some(&is_ignored), self.reporter)
            .await;
        record.self_files = footprint.files;
        record.self_size = footprint.size;

        RootInfo::new(dir, label, record)
    }

    /// 按 workspaces 规则查找并扫描 workspace 包
    async fn load_workspaces(&self, root_dir: &Path, manifest: &Manifest, filter: Option<&str>) -> Result<Vec<RootInfo>> {
        if manifest.workspaces.is_empty() {
            tracing::warn!("package.json 中没有 workspaces 配置");
            return Ok(Vec::new());
        }

        let matcher = WorkspaceMatcher::new(&manifest.workspaces);
        let root = root_dir.to_path_buf();
        let manifest_file = self.config.scan.manifest_file.clone();
        let install_dir = self.config.scan.install_dir.clone();
        let dirs = tokio::task::spawn_blocking(move || matcher.find_packages(&root, &manifest_file, &install_dir))
            .await
            .unwrap_or_else(|err| {
                tracing::warn!("查找 workspace 包失败: {}", err);
                Vec::new()
            });

        let mut workspaces = Vec::new();
        for dir in dirs {
            if self.cancel.is_cancelled() {
                return Err(AnalyzeError::Cancelled);
            }
            let ctx = PathContext::new(&dir, &self.config.scan);
            let manifest_path = ctx.manifest_path(&dir);
            let manifest = match read_manifest(&manifest_path).await {
                ManifestRead::Found(manifest) => manifest,
                ManifestRead::Missing => continue,
                ManifestRead::Malformed(error) => {
                    self.reporter.warn(Warning::MalformedManifest { path: manifest_path, error });
                    continue;
                }
            };

            let relative = dir.strip_prefix(root_dir).unwrap_or(&dir);
            let label = normalize_separators(&relative.to_string_lossy());
            if let Some(filter) = filter {
                let dir_name = dir.file_name().map(|n| n.to_string_lossy().to_string());
                if manifest.name.as_deref() != Some(filter) && dir_name.as_deref() != Some(filter) {
                    continue;
                }
            }

            let mut workspace = self.load_root(&dir, &label, &manifest).await;
            if is_dir(&ctx.install_root).await {
                let registry = PackageScanner::new(ctx, self.reporter)
                    .with_cancel_token(self.cancel.clone())
                    .scan()
                    .await?;
                workspace.registry = Some(registry);
            }
            tracing::debug!("workspace 包: {} ({})", workspace.record.name, label);
            workspaces.push(workspace);
        }

        if workspaces.is_empty() {
            match filter {
                Some(name) => tracing::warn!("没有找到名为 {} 的 workspace 包", name),
                None => tracing::warn!("没有找到匹配 workspaces 规则的包"),
            }
        }

        Ok(workspaces)
    }
}

fn all_registries<'a>(project: &'a RootInfo, workspaces: &'a [RootInfo]) -> impl Iterator<Item = &'a Registry> {
    std::iter::once(project)
        .chain(workspaces.iter())
        .filter_map(|root| root.registry.as_ref())
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{NoopReporter, RecordingReporter};
    use std::fs as std_fs;
    use tempfile::tempdir;

    fn write_package(dir: &Path, json: &str, payload: usize) {
        std_fs::create_dir_all(dir).unwrap();
        std_fs::write(dir.join("package.json"), json).unwrap();
        std_fs::write(dir.join("index.js"), "x".repeat(payload)).unwrap();
    }

    #[tokio::test]
    async fn test_missing_manifest_is_fatal() {
        let temp_dir = tempdir().unwrap();
        std_fs::create_dir_all(temp_dir.path().join("node_modules")).unwrap();

        let reporter = NoopReporter;
        let result = Analyzer::new(Config::default(), &reporter)
            .run(&AnalyzeOptions::new(temp_dir.path()))
            .await;
        assert!(matches!(result, Err(AnalyzeError::ManifestNotFound { .. })));
    }

    #[tokio::test]
    async fn test_missing_install_root_is_fatal() {
        let temp_dir = tempdir().unwrap();
        std_fs::write(temp_dir.path().join("package.json"), r#"{"name":"app"}"#).unwrap();

        let reporter = NoopReporter;
        let result = Analyzer::new(Config::default(), &reporter)
            .run(&AnalyzeOptions::new(temp_dir.path()))
            .await;
        assert!(matches!(result, Err(AnalyzeError::InstallRootNotFound { .. })));
    }

    #[tokio::test]
    async fn test_run_pipeline() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        std_fs::write(
            root.join("package.json"),
            r#"{"name":"app","version":"1.0.0","dependencies":{"a":"*"},"devDependencies":{"t":"*"}}"#,
        )
        .unwrap();
        std_fs::write(root.join("main.js"), "12345").unwrap();

        let nm = root.join("node_modules");
        write_package(&nm.join("a"), r#"{"name":"a","version":"1.0.0","dependencies":{"b":"*"}}"#, 100);
        write_package(&nm.join("b"), r#"{"name":"b","version":"1.0.0"}"#, 200);
        write_package(&nm.join("t"), r#"{"name":"t","version":"1.0.0"}"#, 300);

        let reporter = RecordingReporter::new();
        let analysis = Analyzer::new(Config::default(), &reporter)
            .run(&AnalyzeOptions::new(root))
            .await
            .unwrap();

        let registry = analysis.project_registry().unwrap();
        assert_eq!(registry.len(), 3);

        let a = registry.get("a").unwrap();
        assert_eq!(a.aggregates.dep_count, 1);
        assert_eq!(a.aggregates.dep_size, registry.get("b").unwrap().self_size);

        let root_record = &analysis.project.record;
        assert_eq!(root_record.aggregates.dep_count, 3);
        assert_eq!(root_record.self_files, 2);

        assert_eq!(analysis.report.rows.len(), 1);
        assert_eq!(analysis.report.overview.total_packages, 3);
        assert!(reporter.warnings().is_empty());

        let prod = AnalyzeOptions { prod: true, ..AnalyzeOptions::new(root) };
        let analysis = Analyzer::new(Config::default(), &reporter).run(&prod).await.unwrap();
        assert_eq!(analysis.project.record.aggregates.dep_count, 2);
        assert_eq!(analysis.report.rows[0].children().len(), 1);
    }

    /// 发现第一个包后取消
    struct CancelDuringScan {
        token: CancellationToken,
    }

    impl Reporter for CancelDuringScan {
        fn on_package(&self, _processed: usize, _total: usize, _name: &str) {
            self.token.cancel();
        }

        fn warn(&self, _warning: Warning) {}
    }

    #[tokio::test]
    async fn test_cancelled_during_scan() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        std_fs::write(root.join("package.json"), r#"{"name":"app","dependencies":{"a":"*"}}"#).unwrap();
        let nm = root.join("node_modules");
        write_package(&nm.join("a"), r#"{"name":"a"}"#, 1);
        write_package(&nm.join("b"), r#"{"name":"b"}"#, 1);

        let token = CancellationToken::new();
        let reporter = CancelDuringScan { token: token.clone() };
        let result = Analyzer::new(Config::default(), &reporter)
            .with_cancel_token(token)
            .run(&AnalyzeOptions::new(root))
            .await;
        assert!(matches!(result, Err(AnalyzeError::Cancelled)));
    }

    #[tokio::test]
    async fn test_reporter_finished_once_after_workspace_scans() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        std_fs::write(root.join("package.json"), r#"{"name":"mono","workspaces":["packages/*"]}"#).unwrap();
        write_package(&root.join("node_modules/shared"), r#"{"name":"shared"}"#, 1);
        for name in ["web", "api"] {
            let dir = root.join("packages").join(name);
            write_package(&dir, &format!(r#"{{"name":"{}","dependencies":{{"own":"*"}}}}"#, name), 1);
            write_package(&dir.join("node_modules/own"), r#"{"name":"own"}"#, 1);
        }

        let reporter = RecordingReporter::new();
        let options = AnalyzeOptions {
            workspace: Some(None),
            ..AnalyzeOptions::new(root)
        };
        let analysis = Analyzer::new(Config::default(), &reporter).run(&options).await.unwrap();

        assert_eq!(analysis.workspaces.len(), 2);
        assert_eq!(reporter.progress().len(), 3, "三个安装目录各有一个包");
        assert_eq!(reporter.finish_count(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_aggregation() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        std_fs::write(root.join("package.json"), r#"{"name":"app"}"#).unwrap();
        std_fs::create_dir_all(root.join("node_modules")).unwrap();

        let token = CancellationToken::new();
        token.cancel();

        let reporter = NoopReporter;
        let result = Analyzer::new(Config::default(), &reporter)
            .with_cancel_token(token)
            .run(&AnalyzeOptions::new(root))
            .await;
        assert!(matches!(result, Err(AnalyzeError::Cancelled)));
    }
}
