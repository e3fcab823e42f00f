use std::collections::HashMap;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};

use futures::future::{BoxFuture, FutureExt};
use tokio::fs;

use crate::models::path_context::normalize_separators;
use crate::scanner::{Reporter, Warning};

/// 忽略判断：(相对子树根目录的路径, 是否为目录) -> 是否跳过
pub type IgnoreFn<'a> = &'a (dyn Fn(&str, bool) -> bool + Send + Sync);

/// 子树的文件数量与字节数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubtreeSize {
    pub files: usize,
    pub size: u64,
}

impl AddAssign for SubtreeSize {
    fn add_assign(&mut self, other: Self) {
        self.files += other.files;
        self.size += other.size;
    }
}

/// 单个条目的 lstat 结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStat {
    pub is_file: bool,
    pub is_dir: bool,
    pub is_symlink: bool,
    pub size: u64,
}

/// 文件统计器
///
/// 按包目录缓存测量结果，多个链接指向同一目标时只遍历一次。
pub struct FileStatCache {
    /// 私有安装目录名，测量包自身大小时跳过
    install_dir: String,

    /// 规范化路径 -> 包自身大小
    packages: HashMap<PathBuf, SubtreeSize>,
}

impl FileStatCache {
    pub fn new(install_dir: &str) -> Self {
        Self {
            install_dir: install_dir.to_string(),
            packages: HashMap::new(),
        }
    }

    /// lstat 一个条目，不跟随链接；失败时上报并返回 None
    pub async fn stat_entry(path: &Path, reporter: &dyn Reporter) -> Option<EntryStat> {
        match fs::symlink_metadata(path).await {
            Ok(metadata) => {
                let file_type = metadata.file_type();
                Some(EntryStat {
                    is_file: file_type.is_file(),
                    is_dir: file_type.is_dir(),
                    is_symlink: file_type.is_symlink(),
                    size: metadata.len(),
                })
            }
            Err(err) => {
                reporter.warn(Warning::StatFailed {
                    path: path.to_path_buf(),
                    error: err.to_string(),
                });
                None
            }
        }
    }

    /// 统计子树的文件数量和字节数
    ///
    /// 被忽略的目录整体跳过，不再深入；遍历中遇到的符号链接不跟随。
    pub async fn measure_subtree(
        &self,
        root: &Path,
        ignore: Option<IgnoreFn<'_>>,
        reporter: &dyn Reporter,
    ) -> SubtreeSize {
        walk_dir(root, root, ignore, reporter).await
    }

    /// 统计包目录自身的大小（不含其顶层私有安装目录），结果按规范化路径缓存
    pub async fn measure_package(&mut self, package_dir: &Path, reporter: &dyn Reporter) -> SubtreeSize {
        let key = fs::canonicalize(package_dir)
            .await
            .unwrap_or_else(|_| package_dir.to_path_buf());

        if let Some(cached) = self.packages.get(&key) {
            return *cached;
        }

        let install_dir = self.install_dir.clone();
        let skip_nested = move |relative: &str, is_dir: bool| is_dir && relative == install_dir;
        let measured = walk_dir(&key, &key, Some(&skip_nested), reporter).await;

        self.packages.insert(key, measured);
        measured
    }
}

fn relative_to(base: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    normalize_separators(&relative.to_string_lossy())
}

fn walk_dir<'a>(
    dir: &'a Path,
    base: &'a Path,
    ignore: Option<IgnoreFn<'a>>,
    reporter: &'a dyn Reporter,
) -> BoxFuture<'a, SubtreeSize> {
    async move {
        let mut total = SubtreeSize::default();

        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(err) => {
                reporter.warn(Warning::ReadDirFailed {
                    path: dir.to_path_buf(),
                    error: err.to_string(),
                });
                return total;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    reporter.warn(Warning::ReadDirFailed {
                        path: dir.to_path_buf(),
                        error: err.to_string(),
                    });
                    break;
                }
            };
            let path = entry.path();

            let Some(stat) = FileStatCache::stat_entry(&path, reporter).await else {
                continue;
            };

            if let Some(ignore) = ignore {
                if ignore(&relative_to(base, &path), stat.is_dir) {
                    continue;
                }
            }

            if stat.is_file {
                total.files += 1;
                total.size += stat.size;
            } else if stat.is_dir {
                total += walk_dir(&path, base, ignore, reporter).await;
            }
        }

        total
    }
    .boxed()
}
