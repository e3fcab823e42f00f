use std::path::{Path, PathBuf};

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::models::path_context::normalize_separators;

/// workspaces 通配符匹配器
pub struct WorkspaceMatcher {
    include: GlobSet,
    exclude: GlobSet,

    /// 最大匹配深度，None 表示含有 `**`
    max_depth: Option<usize>,
}

impl WorkspaceMatcher {
    /// 由 package.json 的 workspaces 字段构建；`!` 开头的规则表示排除
    pub fn new(patterns: &[String]) -> Self {
        let mut include = GlobSetBuilder::new();
        let mut exclude = GlobSetBuilder::new();
        let mut max_depth = Some(0);

        for raw in patterns {
            let (negated, pattern) = match raw.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, raw.as_str()),
            };
            let pattern = pattern.trim_start_matches("./").trim_end_matches('/');
            if pattern.is_empty() {
                continue;
            }

            let glob = match build_glob(pattern) {
                Ok(glob) => glob,
                Err(err) => {
                    tracing::warn!("无效的 workspaces 规则 {}: {}", raw, err);
                    continue;
                }
            };

            if negated {
                exclude.add(glob);
            } else {
                include.add(glob);
                max_depth = match (max_depth, pattern.contains("**")) {
                    (_, true) | (None, _) => None,
                    (Some(depth), false) => Some(depth.max(pattern.split('/').count())),
                };
            }
        }

        Self {
            include: include.build().unwrap_or_else(|_| GlobSet::empty()),
            exclude: exclude.build().unwrap_or_else(|_| GlobSet::empty()),
            max_depth,
        }
    }

    pub fn is_match(&self, relative_dir: &str) -> bool {
        self.include.is_match(relative_dir) && !self.exclude.is_match(relative_dir)
    }

    /// 在项目根目录下查找匹配且带清单的目录，按路径排序
    pub fn find_packages(
        &self,
        project_root: &Path,
        manifest_file: &str,
        install_dir: &str,
    ) -> Vec<PathBuf> {
        if self.include.is_empty() {
            return Vec::new();
        }

        let mut walker = WalkDir::new(project_root).min_depth(1).follow_links(false);
        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth);
        }

        let mut packages: Vec<PathBuf> = walker
            .into_iter()
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                !(entry.file_type().is_dir() && (name == install_dir || name.starts_with('.')))
            })
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_dir())
            .filter(|entry| {
                let relative = entry.path().strip_prefix(project_root).unwrap_or(entry.path());
                self.is_match(&normalize_separators(&relative.to_string_lossy()))
            })
            .filter(|entry| entry.path().join(manifest_file).is_file())
            .map(|entry| entry.into_path())
            .collect();

        packages.sort();
        packages
    }
}

fn build_glob(pattern: &str) -> Result<Glob, globset::Error> {
    GlobBuilder::new(pattern).literal_separator(true).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use std::fs;

    fn make_package(root: &Path, dir: &str) {
        let path = root.join(dir);
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("package.json"), "{}").unwrap();
    }

    #[test]
    fn test_match_patterns() {
        let matcher = WorkspaceMatcher::new(&[
            "packages/*".to_string(),
            "./apps/**".to_string(),
            "!packages/private".to_string(),
        ]);

        assert!(matcher.is_match("packages/a"));
        assert!(!matcher.is_match("packages/a/src"));
        assert!(!matcher.is_match("packages/private"));
        assert!(matcher.is_match("apps/web/admin"));
        assert!(!matcher.is_match("tools/x"));
    }

    #[test]
    fn test_find_packages() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        make_package(root, "packages/b");
        make_package(root, "packages/a");
        fs::create_dir_all(root.join("packages/no-manifest")).unwrap();
        make_package(root, "node_modules/packages/x");
        make_package(root, "other/c");

        let matcher = WorkspaceMatcher::new(&["packages/*".to_string()]);
        let found = matcher.find_packages(root, "package.json", "node_modules");

        assert_eq!(found, vec![root.join("packages/a"), root.join("packages/b")]);
    }

    #[test]
    fn test_empty_patterns() {
        let temp_dir = tempdir().unwrap();
        make_package(temp_dir.path(), "packages/a");

        let matcher = WorkspaceMatcher::new(&[]);
        assert!(matcher.find_packages(temp_dir.path(), "package.json", "node_modules").is_empty());
    }
}
