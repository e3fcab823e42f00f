use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use crate::config::ProjectIgnoreConfig;

/// 根项目的忽略规则 - 合并 .gitignore 与配置中的规则
///
/// 只用于测量根项目（和 workspace 包）自身的大小，已安装的包不使用。
pub struct ProjectIgnore {
    matcher: Gitignore,
}

impl ProjectIgnore {
    /// 创建忽略规则；规则文件有问题时记录警告并尽量使用可用的部分
    pub fn new(project_path: &Path, config: &ProjectIgnoreConfig) -> Self {
        let mut builder = GitignoreBuilder::new(project_path);

        for pattern in &config.patterns {
            if let Err(err) = builder.add_line(None, pattern) {
                tracing::warn!("无效的忽略规则 {}: {}", pattern, err);
            }
        }

        if config.use_gitignore {
            let gitignore = project_path.join(".gitignore");
            if gitignore.is_file() {
                if let Some(err) = builder.add(&gitignore) {
                    tracing::warn!("读取 {} 时出错: {}", gitignore.display(), err);
                }
            }
        }

        let matcher = builder.build().unwrap_or_else(|err| {
            tracing::warn!("构建忽略规则失败: {}", err);
            Gitignore::empty()
        });

        Self { matcher }
    }

    /// 检查相对项目根目录的路径是否应该被忽略（包括父目录被忽略的情况）
    pub fn is_ignored(&self, relative_path: &str, is_dir: bool) -> bool {
        let relative_path = relative_path.trim_start_matches("./").trim_end_matches('/');
        if relative_path.is_empty() || relative_path.starts_with('/') {
            return false;
        }
        self.matcher
            .matched_path_or_any_parents(relative_path, is_dir)
            .is_ignore()
    }

    /// 规则数量（包括 .gitignore 中的）
    pub fn rule_count(&self) -> usize {
        self.matcher.num_ignores() as usize
    }
}
