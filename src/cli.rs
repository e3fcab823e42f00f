use clap::Parser;
use std::path::PathBuf;

use nm_analyzer_cli::config::SortField;

#[derive(Parser, Debug)]
#[command(name = "nm-analyzer")]
#[command(about = "分析已安装的 node_modules：大小、依赖数量与重复安装情况")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// 只分析这些已安装的包
    pub modules: Vec<String>,

    /// 含 package.json 的项目根目录
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// 只分析指定的包，可用逗号分隔
    #[arg(short, long = "module", value_delimiter = ',')]
    pub module: Vec<String>,

    /// 排序字段，不带值时按 dSize 排序
    #[arg(short, long, value_enum, num_args = 0..=1, default_missing_value = "dSize")]
    pub sort: Option<SortField>,

    /// 升序排序（默认降序）
    #[arg(short, long)]
    pub asc: bool,

    /// 显示文件数量列
    #[arg(short, long)]
    pub files: bool,

    /// 不统计根项目的 devDependencies
    #[arg(long)]
    pub prod: bool,

    /// 同时分析 workspaces 中的包，可指定包名
    #[arg(short, long, num_args = 0..=1)]
    pub workspace: Option<Option<String>>,

    /// 将报表保存为 JSON 文件
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// 在交互式界面中浏览报表
    #[arg(long)]
    pub tui: bool,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 详细输出
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// 位置参数与 --module 合并后的模块列表
    pub fn module_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in self.modules.iter().chain(self.module.iter()) {
            let name = name.trim();
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }
}
