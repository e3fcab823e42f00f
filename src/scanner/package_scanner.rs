use std::path::{Path, PathBuf};

use futures::future::{BoxFuture, FutureExt};
use tokio::fs;
use tokio_util::sync::CancellationToken;

use crate::error::{AnalyzeError, Result};
use crate::models::{PackageRecord, PathContext, Registry};
use crate::scanner::file_stat::{EntryStat, FileStatCache, SubtreeSize};
use crate::scanner::manifest_reader::{read_manifest, ManifestRead};
use crate::scanner::{Reporter, Warning};

/// 扫描进度（跨所有层级累计）
#[derive(Debug, Clone, Copy, Default)]
struct ScanProgress {
    /// 已处理的目录条目
    processed: usize,

    /// 已列出的目录条目总数
    total: usize,
}

/// 一个安装目录（含其嵌套安装目录）的累计数据，用于进度与概况
#[derive(Debug, Clone, Copy, Default)]
struct ScanTotals {
    packages: usize,
    files: usize,
    size: u64,
}

impl ScanTotals {
    fn add_weight(&mut self, weight: SubtreeSize) {
        self.files += weight.files;
        self.size += weight.size;
    }

    fn merge(&mut self, other: ScanTotals) {
        self.packages += other.packages;
        self.files += other.files;
        self.size += other.size;
    }
}

/// 已安装包扫描器 - 深度优先遍历安装目录，为每个带清单的目录建立记录
pub struct PackageScanner<'r> {
    ctx: PathContext,
    stats: FileStatCache,
    reporter: &'r dyn Reporter,
    progress: ScanProgress,
    cancel: CancellationToken,
}

impl<'r> PackageScanner<'r> {
    pub fn new(ctx: PathContext, reporter: &'r dyn Reporter) -> Self {
        Self {
            stats: FileStatCache::new(&ctx.install_dir),
            ctx,
            reporter,
            progress: ScanProgress::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// 取消后在下一个目录条目处停止扫描
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 扫描安装根目录，返回注册表；空目录得到空注册表
    pub async fn scan(&mut self) -> Result<Registry> {
        let install_root = self.ctx.install_root.clone();
        let mut registry = Registry::new(&install_root, &self.ctx.install_dir);

        let totals = self.scan_install_dir(&install_root, None, &mut registry).await;
        if self.cancel.is_cancelled() {
            return Err(AnalyzeError::Cancelled);
        }

        tracing::debug!(
            "扫描完成: {} 个包, {} 个文件, {} 字节",
            totals.packages,
            totals.files,
            totals.size
        );

        Ok(registry)
    }

    /// 列出目录并按名称排序，保证发现顺序稳定
    async fn list_dir(&self, dir: &Path) -> Vec<(String, PathBuf)> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(err) => {
                self.reporter.warn(Warning::ReadDirFailed {
                    path: dir.to_path_buf(),
                    error: err.to_string(),
                });
                return Vec::new();
            }
        };

        let mut list = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    list.push((entry.file_name().to_string_lossy().to_string(), entry.path()));
                }
                Ok(None) => break,
                Err(err) => {
                    self.reporter.warn(Warning::ReadDirFailed {
                        path: dir.to_path_buf(),
                        error: err.to_string(),
                    });
                    break;
                }
            }
        }

        list.sort_by(|a, b| a.0.cmp(&b.0));
        list
    }

    /// 扫描一个安装目录
    ///
    /// `owner` 为拥有该目录的包 key（顶层为 None），零散文件计入 owner 自身大小。
    fn scan_install_dir<'a>(
        &'a mut self,
        dir: &'a Path,
        owner: Option<&'a str>,
        registry: &'a mut Registry,
    ) -> BoxFuture<'a, ScanTotals> {
        async move {
            let mut totals = ScanTotals::default();

            let entries = self.list_dir(dir).await;
            self.progress.total += entries.len();

            for (name, path) in entries {
                if self.cancel.is_cancelled() {
                    break;
                }
                self.progress.processed += 1;

                let Some(stat) = FileStatCache::stat_entry(&path, self.reporter).await else {
                    continue;
                };

                // .package-lock.json、.yarn-integrity 等
                if stat.is_file {
                    let weight = SubtreeSize { files: 1, size: stat.size };
                    add_loose_weight(registry, owner, weight);
                    totals.add_weight(weight);
                    continue;
                }

                if !stat.is_dir && !stat.is_symlink {
                    self.reporter.warn(Warning::UnknownEntry { path });
                    continue;
                }

                if stat.is_dir && self.ctx.is_scope_dir(&name) {
                    let scoped = self.scan_install_dir(&path, owner, registry).await;
                    totals.merge(scoped);
                    continue;
                }

                let entry_totals = self.scan_entry(&path, stat, owner, registry).await;
                totals.merge(entry_totals);
            }

            totals
        }
        .boxed()
    }

    /// 处理安装目录中的一个目录或链接
    async fn scan_entry(
        &mut self,
        path: &Path,
        stat: EntryStat,
        owner: Option<&str>,
        registry: &mut Registry,
    ) -> ScanTotals {
        let mut totals = ScanTotals::default();

        let measure_dir = if stat.is_symlink {
            match fs::canonicalize(path).await {
                Ok(target) => target,
                Err(err) => {
                    self.reporter.warn(Warning::StatFailed {
                        path: path.to_path_buf(),
                        error: err.to_string(),
                    });
                    return totals;
                }
            }
        } else {
            path.to_path_buf()
        };

        // 指向文件的链接（.modules.yaml 等）与普通文件一样只计入重量
        if stat.is_symlink {
            let Some(target) = FileStatCache::stat_entry(&measure_dir, self.reporter).await else {
                return totals;
            };
            if !target.is_dir {
                let weight = SubtreeSize { files: 1, size: target.size };
                add_loose_weight(registry, owner, weight);
                totals.add_weight(weight);
                return totals;
            }
        }

        let manifest_path = self.ctx.manifest_path(path);
        let manifest = match read_manifest(&manifest_path).await {
            ManifestRead::Found(manifest) => Some(manifest),
            ManifestRead::Missing => None,
            ManifestRead::Malformed(error) => {
                self.reporter.warn(Warning::MalformedManifest {
                    path: manifest_path,
                    error,
                });
                None
            }
        };

        // 没有清单的目录（.bin、.cache 等）只计入重量
        let Some(manifest) = manifest else {
            let weight = self.stats.measure_subtree(&measure_dir, None, self.reporter).await;
            add_loose_weight(registry, owner, weight);
            totals.add_weight(weight);
            return totals;
        };

        let key = self.ctx.relative_key(path);
        if registry.contains(&key) {
            tracing::debug!("重复的包路径: {}", key);
            return totals;
        }
        let fallback_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| key.clone());

        let own = self.stats.measure_package(&measure_dir, self.reporter).await;

        let mut record = PackageRecord::installed(
            key.clone(),
            manifest.display_name(&fallback_name),
            manifest.version.clone(),
            manifest.dependencies,
        );
        record.is_nested = self.ctx.is_nested_key(&key);
        record.is_link = stat.is_symlink;
        record.self_files = own.files;
        record.self_size = own.size;

        self.reporter.on_package(self.progress.processed, self.progress.total, &record.name);

        registry.insert(record);
        totals.packages += 1;
        totals.add_weight(own);

        // 链接包不进入目标目录的嵌套安装目录
        if stat.is_symlink {
            return totals;
        }

        let nested_dir = self.ctx.nested_install_dir(path);
        if is_real_dir(&nested_dir).await {
            let nested_totals = self.scan_install_dir(&nested_dir, Some(&key), registry).await;
            totals.merge(nested_totals);
        }

        totals
    }
}

async fn is_real_dir(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .await
        .map(|m| m.file_type().is_dir())
        .unwrap_or(false)
}

fn add_loose_weight(registry: &mut Registry, owner: Option<&str>, weight: SubtreeSize) {
    let owner_record = owner
        .and_then(|key| registry.index_of(key))
        .and_then(|index| registry.get_index_mut(index));

    match owner_record {
        Some(record) => {
            record.self_files += weight.files;
            record.self_size += weight.size;
        }
        None => {
            registry.loose_files += weight.files;
            registry.loose_size += weight.size;
        }
    }
}
