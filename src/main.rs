mod cli;

use std::io::IsTerminal;
use std::process;

use anyhow::Result;
use clap::Parser;
use crossterm::style::Stylize;
use tokio_util::sync::CancellationToken;

use cli::Cli;
use nm_analyzer_cli::analysis::{AnalyzeOptions, Analyzer};
use nm_analyzer_cli::config::Config;
use nm_analyzer_cli::error::AnalyzeError;
use nm_analyzer_cli::output::{write_snapshot, TableRenderer};
use nm_analyzer_cli::scanner::{ProgressReporter, Reporter, TracingReporter};
use nm_analyzer_cli::tui::App;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // 日志写到 stderr，stdout 只输出报表
    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli).await {
        eprintln!("{}", format!("[nm-analyzer] ERROR: {:#}", err).red());
        if err.downcast_ref::<AnalyzeError>().is_some_and(|e| e.is_setup_error()) {
            eprintln!("[nm-analyzer] 请在含 package.json 的项目根目录运行，并先安装依赖");
        }
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load_or_default()?,
    };

    let sort = cli.sort.or(config.display.default_sort);
    let show_files = cli.files || config.display.show_files;

    let options = AnalyzeOptions {
        root: cli.root.clone(),
        modules: cli.module_names(),
        prod: cli.prod,
        workspace: cli.workspace.clone(),
    };

    // Ctrl-C 在两个包之间中止聚合
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("收到中断信号，正在停止...");
            interrupt.cancel();
        }
    });

    // 详细模式下进度条会和调试日志交错，改为直接写日志
    let reporter: Box<dyn Reporter> = if cli.verbose {
        Box::new(TracingReporter)
    } else {
        Box::new(ProgressReporter::new())
    };
    let mut analysis = Analyzer::new(config, reporter.as_ref())
        .with_cancel_token(cancel)
        .run(&options)
        .await?;

    let root = analysis.project.dir.display().to_string();
    println!("[nm-analyzer] root: {}", root);

    if let Some(field) = sort {
        analysis.report.sort(field, cli.asc);
        println!("[nm-analyzer] sort by: {}", field.column_name());
    }

    if let Some(path) = &cli.json {
        write_snapshot(path, &analysis.project.dir, &analysis.report).await?;
    }

    if cli.tui {
        let mut app = App::new(root, analysis.report, sort, cli.asc, show_files);
        return app.run().await;
    }

    let renderer = TableRenderer::new(show_files, std::io::stdout().is_terminal());
    println!("[nm-analyzer] {}", renderer.render_overview(&analysis.report.overview));
    print!("{}", renderer.render(&analysis.report.rows));

    Ok(())
}
