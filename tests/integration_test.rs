use std::fs;
use std::path::Path;
use serde_json::json;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

use nm_analyzer_cli::models::{Metrics, Row};
use nm_analyzer_cli::scanner::{NoopReporter, RecordingReporter};
use nm_analyzer_cli::{Analysis, AnalyzeError, AnalyzeOptions, Analyzer, Config};

/// 写入一个 package.json
fn write_manifest(dir: &Path, manifest: serde_json::Value) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("package.json"), serde_json::to_string_pretty(&manifest).unwrap()).unwrap();
}

/// 在 `node_modules` 下的相对路径安装一个包
fn install(root: &Path, rel: &str, name: &str, deps: &[&str], payload: usize) {
    let dir = root.join("node_modules").join(rel);
    let dependencies: serde_json::Map<String, serde_json::Value> = deps
        .iter()
        .map(|d| (d.to_string(), json!("*")))
        .collect();
    write_manifest(&dir, json!({ "name": name, "version": "1.0.0", "dependencies": dependencies }));
    fs::write(dir.join("index.js"), "x".repeat(payload)).unwrap();
}

fn project(root: &Path, manifest: serde_json::Value) {
    write_manifest(root, manifest);
    fs::create_dir_all(root.join("node_modules")).unwrap();
}

async fn analyze(root: &Path, reporter: &RecordingReporter) -> Analysis {
    Analyzer::new(Config::default(), reporter)
        .run(&AnalyzeOptions::new(root))
        .await
        .unwrap()
}

fn self_size(analysis: &Analysis, path: &str) -> u64 {
    analysis.project_registry().unwrap().get(path).unwrap().self_size
}

fn project_metrics(analysis: &Analysis) -> Metrics {
    analysis.report.rows[0].as_module().unwrap().metrics.unwrap()
}

/// 报表中某个分组下的模块名
fn group_names(row: &Row, group: &str) -> Vec<String> {
    row.children()
        .iter()
        .find(|g| g.name() == group)
        .map(|g| g.children().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_single_dependency() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    project(root, json!({ "name": "app", "version": "1.0.0", "dependencies": { "a": "^1.0.0" } }));
    install(root, "a", "a", &[], 100);

    let reporter = RecordingReporter::new();
    let analysis = analyze(root, &reporter).await;

    let metrics = project_metrics(&analysis);
    assert_eq!(metrics.dep_count, 1, "根项目应该只有一个依赖");
    assert_eq!(metrics.dep_size, self_size(&analysis, "a"));
    assert_eq!(metrics.nested_dep_count, 0);

    let a = analysis.project_registry().unwrap().get("a").unwrap();
    assert_eq!(a.aggregates.dep_count, 0, "叶子包没有依赖");
    assert!(reporter.missing_dependencies().is_empty());

    assert_eq!(analysis.report.overview.total_packages, 1);
    assert_eq!(analysis.report.overview.nested_packages, 0);
    assert_eq!(analysis.report.overview.duplication_ratio, 0.0);
}

#[tokio::test]
async fn test_diamond_counts_shared_dependency_once() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    project(root, json!({ "name": "app", "dependencies": { "a": "*", "b": "*" } }));
    install(root, "a", "a", &["c"], 10);
    install(root, "b", "b", &["c"], 20);
    install(root, "c", "c", &[], 4000);

    let reporter = RecordingReporter::new();
    let analysis = analyze(root, &reporter).await;

    let metrics = project_metrics(&analysis);
    assert_eq!(metrics.dep_count, 3, "c 只应计算一次");
    assert_eq!(
        metrics.dep_size,
        self_size(&analysis, "a") + self_size(&analysis, "b") + self_size(&analysis, "c")
    );

    let registry = analysis.project_registry().unwrap();
    assert_eq!(registry.get("a").unwrap().aggregates.dep_count, 1);
    assert_eq!(registry.get("b").unwrap().aggregates.dep_size, self_size(&analysis, "c"));
}

#[tokio::test]
async fn test_nested_copy_is_preferred_and_counted() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    project(root, json!({ "name": "app", "dependencies": { "a": "*", "c": "*" } }));
    install(root, "a", "a", &["c"], 10);
    install(root, "c", "c", &[], 300);
    install(root, "a/node_modules/c", "c", &[], 30);

    let reporter = RecordingReporter::new();
    let analysis = analyze(root, &reporter).await;
    let registry = analysis.project_registry().unwrap();

    let a = registry.get("a").unwrap();
    assert_eq!(a.aggregates.dep_count, 1);
    assert_eq!(a.aggregates.dep_size, self_size(&analysis, "a/node_modules/c"), "a 应该使用自己的嵌套副本");
    assert_eq!(a.aggregates.nested_dep_count, 1);

    let metrics = project_metrics(&analysis);
    assert_eq!(metrics.dep_count, 3, "两个 c 副本是不同的包");
    assert_eq!(metrics.nested_dep_count, 1);

    let overview = analysis.report.overview;
    assert_eq!(overview.total_packages, 3);
    assert_eq!(overview.nested_packages, 1);
    assert!((overview.duplication_ratio - 1.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_missing_dependency_is_reported_once() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    project(root, json!({ "name": "app", "dependencies": { "a": "*", "ghost": "*" } }));
    install(root, "a", "a", &["b"], 10);

    let reporter = RecordingReporter::new();
    let analysis = analyze(root, &reporter).await;

    let mut missing = reporter.missing_dependencies();
    missing.sort();
    assert_eq!(
        missing,
        vec![("a".to_string(), "b".to_string()), ("app".to_string(), "ghost".to_string())],
        "每个缺失依赖只报告一次"
    );

    let metrics = project_metrics(&analysis);
    assert_eq!(metrics.dep_count, 1, "缺失的依赖不计入统计");

    let names = group_names(&analysis.report.rows[0], "dependencies");
    assert_eq!(names, vec!["a", "ghost"]);
    let ghost = &analysis.report.rows[0].children()[0].children()[1];
    assert!(ghost.as_module().unwrap().is_missing());
}

#[tokio::test]
async fn test_missing_optional_dependency_is_silent() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    project(root, json!({
        "name": "app",
        "dependencies": { "a": "*" },
        "optionalDependencies": { "fsevents": "*" }
    }));
    let dir = root.join("node_modules/a");
    write_manifest(&dir, json!({
        "name": "a",
        "dependencies": { "native": "*" },
        "optionalDependencies": { "native": "*" }
    }));

    let reporter = RecordingReporter::new();
    analyze(root, &reporter).await;

    assert!(reporter.missing_dependencies().is_empty(), "可选依赖缺失时不应该警告");
}

#[tokio::test]
async fn test_dev_dependencies_only_for_root() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    project(root, json!({
        "name": "app",
        "dependencies": { "a": "*" },
        "devDependencies": { "jest": "*" }
    }));
    write_manifest(&root.join("node_modules/a"), json!({ "name": "a", "devDependencies": { "mocha": "*" } }));
    install(root, "jest", "jest", &[], 50);

    let reporter = RecordingReporter::new();
    let analysis = analyze(root, &reporter).await;

    assert_eq!(project_metrics(&analysis).dep_count, 2);
    assert_eq!(
        analysis.project_registry().unwrap().get("a").unwrap().aggregates.dep_count,
        0,
        "已安装包的 devDependencies 不参与统计"
    );
    assert!(reporter.missing_dependencies().is_empty(), "mocha 不应该被解析");

    let mut options = AnalyzeOptions::new(root);
    options.prod = true;
    let analysis = Analyzer::new(Config::default(), &reporter).run(&options).await.unwrap();
    assert_eq!(project_metrics(&analysis).dep_count, 1);
    assert!(group_names(&analysis.report.rows[0], "devDependencies").is_empty());
}

#[tokio::test]
async fn test_cycle_terminates() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    project(root, json!({ "name": "app", "dependencies": { "a": "*" } }));
    install(root, "a", "a", &["b"], 10);
    install(root, "b", "b", &["a"], 10);

    let reporter = RecordingReporter::new();
    let analysis = analyze(root, &reporter).await;

    assert_eq!(project_metrics(&analysis).dep_count, 2);
    let registry = analysis.project_registry().unwrap();
    assert_eq!(registry.get("a").unwrap().aggregates.dep_count, 2, "环会回到 a 自身");
}

#[tokio::test]
async fn test_scoped_packages() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    project(root, json!({ "name": "app", "dependencies": { "@scope/ui": "*" } }));
    install(root, "@scope/ui", "@scope/ui", &["@scope/core"], 10);
    install(root, "@scope/core", "@scope/core", &[], 10);

    let reporter = RecordingReporter::new();
    let analysis = analyze(root, &reporter).await;

    let registry = analysis.project_registry().unwrap();
    assert!(registry.contains("@scope/ui"));
    assert!(registry.contains("@scope/core"));
    assert_eq!(project_metrics(&analysis).dep_count, 2);
    assert!(reporter.missing_dependencies().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_linked_package_is_not_nested() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    project(root, json!({ "name": "app", "dependencies": { "local": "*" } }));
    let target = root.join("libs/local");
    write_manifest(&target, json!({ "name": "local", "version": "0.1.0" }));
    fs::write(target.join("index.js"), "x".repeat(64)).unwrap();
    std::os::unix::fs::symlink(&target, root.join("node_modules/local")).unwrap();

    let reporter = RecordingReporter::new();
    let analysis = analyze(root, &reporter).await;

    let local = analysis.project_registry().unwrap().get("local").unwrap();
    assert!(local.is_link);
    assert!(local.self_size > 64, "链接包按目标目录计算大小");
    assert_eq!(project_metrics(&analysis).dep_count, 1);
    assert_eq!(project_metrics(&analysis).nested_dep_count, 0);
}

#[tokio::test]
async fn test_module_filter() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    project(root, json!({ "name": "app", "dependencies": { "a": "*", "b": "*" } }));
    install(root, "a", "a", &[], 10);
    install(root, "b", "b", &[], 10);

    let reporter = NoopReporter;
    let mut options = AnalyzeOptions::new(root);
    options.modules = vec!["b".to_string(), "nope".to_string()];
    let analysis = Analyzer::new(Config::default(), &reporter).run(&options).await.unwrap();

    let children = analysis.report.rows[0].children();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].name(), "b");
    assert!(!children[0].as_module().unwrap().is_missing());
    assert!(children[1].as_module().unwrap().is_missing());
}

#[tokio::test]
async fn test_workspaces_fall_back_to_project_install() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    project(root, json!({ "name": "mono", "workspaces": ["packages/*"] }));
    install(root, "shared", "shared", &[], 100);
    write_manifest(&root.join("packages/web"), json!({ "name": "web", "dependencies": { "shared": "*", "own": "*" } }));
    install(&root.join("packages/web"), "own", "own", &[], 10);
    write_manifest(&root.join("packages/api"), json!({ "name": "api", "dependencies": { "shared": "*" } }));

    let reporter = RecordingReporter::new();
    let mut options = AnalyzeOptions::new(root);
    options.workspace = Some(None);
    let analysis = Analyzer::new(Config::default(), &reporter).run(&options).await.unwrap();

    assert_eq!(analysis.workspaces.len(), 2);
    assert_eq!(analysis.report.rows.len(), 3, "主项目加两个 workspace");

    let web = analysis.workspaces.iter().find(|w| w.record.name == "web").unwrap();
    assert_eq!(web.record.aggregates.dep_count, 2, "shared 应该回退到主项目的安装目录");
    let api = analysis.workspaces.iter().find(|w| w.record.name == "api").unwrap();
    assert_eq!(api.record.aggregates.dep_count, 1);
    assert!(reporter.missing_dependencies().is_empty());

    assert_eq!(analysis.report.overview.total_packages, 2, "概况包括 workspace 自己的安装目录");

    options.workspace = Some(Some("api".to_string()));
    let analysis = Analyzer::new(Config::default(), &reporter).run(&options).await.unwrap();
    assert_eq!(analysis.workspaces.len(), 1);
    assert_eq!(analysis.workspaces[0].record.name, "api");
}

#[tokio::test]
async fn test_loose_entries_count_toward_overview_only() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    project(root, json!({ "name": "app", "dependencies": { "a": "*" } }));
    install(root, "a", "a", &[], 10);
    fs::create_dir_all(root.join("node_modules/.bin")).unwrap();
    fs::write(root.join("node_modules/.bin/tool"), "#!/bin/sh\n").unwrap();

    let reporter = RecordingReporter::new();
    let analysis = analyze(root, &reporter).await;

    let registry = analysis.project_registry().unwrap();
    assert_eq!(registry.len(), 1, ".bin 不是包");
    assert!(registry.loose_size > 0);
    assert_eq!(analysis.report.overview.total_packages, 1);
    assert!(analysis.report.overview.total_size > self_size(&analysis, "a"));
}

#[tokio::test]
async fn test_analysis_is_idempotent() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    project(root, json!({ "name": "app", "dependencies": { "a": "*" } }));
    install(root, "a", "a", &["b"], 10);
    install(root, "b", "b", &[], 10);
    install(root, "a/node_modules/b", "b", &[], 20);

    let reporter = NoopReporter;
    let first = Analyzer::new(Config::default(), &reporter).run(&AnalyzeOptions::new(root)).await.unwrap();
    let second = Analyzer::new(Config::default(), &reporter).run(&AnalyzeOptions::new(root)).await.unwrap();

    assert_eq!(first.report.rows, second.report.rows, "两次分析结果应该相同");
    assert_eq!(first.report.overview, second.report.overview);
}

#[tokio::test]
async fn test_fatal_errors() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    let reporter = NoopReporter;

    let err = Analyzer::new(Config::default(), &reporter)
        .run(&AnalyzeOptions::new(root))
        .await
        .unwrap_err();
    assert!(matches!(err, AnalyzeError::ManifestNotFound { .. }), "没有 package.json 时应该失败");

    write_manifest(root, json!({ "name": "app" }));
    let err = Analyzer::new(Config::default(), &reporter)
        .run(&AnalyzeOptions::new(root))
        .await
        .unwrap_err();
    assert!(matches!(err, AnalyzeError::InstallRootNotFound { .. }), "没有 node_modules 时应该失败");
}

#[tokio::test]
async fn test_cancelled_analysis() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    project(root, json!({ "name": "app", "dependencies": { "a": "*" } }));
    install(root, "a", "a", &[], 10);

    let reporter = NoopReporter;
    let token = CancellationToken::new();
    token.cancel();
    let err = Analyzer::new(Config::default(), &reporter)
        .with_cancel_token(token)
        .run(&AnalyzeOptions::new(root))
        .await
        .unwrap_err();
    assert!(matches!(err, AnalyzeError::Cancelled));
}

#[tokio::test]
async fn test_json_snapshot() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    project(root, json!({ "name": "app", "dependencies": { "a": "*" } }));
    install(root, "a", "a", &[], 10);

    let reporter = NoopReporter;
    let analysis = Analyzer::new(Config::default(), &reporter).run(&AnalyzeOptions::new(root)).await.unwrap();

    let out = temp_dir.path().join("reports/report.json");
    nm_analyzer_cli::output::write_snapshot(&out, root, &analysis.report)
        .await
        .unwrap();

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(value["overview"]["total_packages"], 1);
    assert!(value["rows"].is_array());
}
