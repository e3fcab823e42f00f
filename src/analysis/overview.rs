use crate::models::{Overview, Registry};

/// 统计整个安装目录的重复安装概况
///
/// 与逐包聚合无关，扫描完成后即可计算；多个注册表（workspace 私有安装目录）合并统计。
pub fn overview<'a>(registries: impl IntoIterator<Item = &'a Registry>) -> Overview {
    let mut overview = Overview::default();

    for registry in registries {
        overview.total_packages += registry.len();
        overview.nested_packages += registry.records().filter(|r| r.is_nested).count();
        overview.total_size += registry.total_size();
        overview.total_files += registry.total_files();
    }

    overview.duplication_ratio = if overview.total_packages == 0 {
        0.0
    } else {
        overview.nested_packages as f64 / overview.total_packages as f64
    };

    overview
}
