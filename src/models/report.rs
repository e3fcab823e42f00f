use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::SortField;
use crate::models::PackageRecord;

/// 一行报表的数值部分
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub files: usize,
    pub size: u64,
    pub dep_count: usize,
    pub dep_files: usize,
    pub dep_size: u64,
    pub nested_dep_count: usize,
}

impl From<&PackageRecord> for Metrics {
    fn from(record: &PackageRecord) -> Self {
        Self {
            files: record.self_files,
            size: record.self_size,
            dep_count: record.aggregates.dep_count,
            dep_files: record.aggregates.dep_files,
            dep_size: record.aggregates.dep_size,
            nested_dep_count: record.aggregates.nested_dep_count,
        }
    }
}

/// 报表中的分组行，例如 `dependencies`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRow {
    pub name: String,
    pub children: Vec<Row>,
}

/// 报表中的模块行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleRow {
    pub name: String,

    /// 解析到的安装路径；根行为相对主项目的目录，找不到时为 None
    pub path: Option<String>,

    pub version: Option<String>,

    /// 找不到对应安装包时为 None
    pub metrics: Option<Metrics>,

    pub children: Vec<Row>,
}

impl ModuleRow {
    pub fn resolved(record: &PackageRecord, display_name: &str) -> Self {
        Self {
            name: display_name.to_string(),
            path: Some(record.path.clone()),
            version: Some(record.version.clone()),
            metrics: Some(Metrics::from(record)),
            children: Vec::new(),
        }
    }

    pub fn missing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: None,
            version: None,
            metrics: None,
            children: Vec::new(),
        }
    }

    pub fn is_missing(&self) -> bool {
        self.metrics.is_none()
    }
}

/// 渲染用的行：分组或模块
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Row {
    Group(GroupRow),
    Module(ModuleRow),
}

impl Row {
    pub fn name(&self) -> &str {
        match self {
            Row::Group(group) => &group.name,
            Row::Module(module) => &module.name,
        }
    }

    pub fn children(&self) -> &[Row] {
        match self {
            Row::Group(group) => &group.children,
            Row::Module(module) => &module.children,
        }
    }

    fn children_mut(&mut self) -> &mut Vec<Row> {
        match self {
            Row::Group(group) => &mut group.children,
            Row::Module(module) => &mut module.children,
        }
    }

    pub fn as_module(&self) -> Option<&ModuleRow> {
        match self {
            Row::Module(module) => Some(module),
            Row::Group(_) => None,
        }
    }

    /// 递归排序子行；降序为默认，`asc` 为升序。分组行保持原顺序
    pub fn sort_children(&mut self, field: SortField, asc: bool) {
        let children = self.children_mut();
        if children.iter().all(|c| matches!(c, Row::Module(_))) {
            children.sort_by(|a, b| {
                let ordering = compare_rows(a, b, field);
                if asc { ordering } else { ordering.reverse() }
            });
        }
        for child in children.iter_mut() {
            child.sort_children(field, asc);
        }
    }

    /// 深度优先展开为 (深度, 行) 列表
    pub fn flatten(&self) -> Vec<(usize, &Row)> {
        let mut out = Vec::new();
        flatten_into(self, 0, &mut out);
        out
    }
}

fn flatten_into<'a>(row: &'a Row, depth: usize, out: &mut Vec<(usize, &'a Row)>) {
    out.push((depth, row));
    for child in row.children() {
        flatten_into(child, depth + 1, out);
    }
}

/// 找不到的模块在任何排序下都排在数值为 0 的位置
fn compare_rows(a: &Row, b: &Row, field: SortField) -> Ordering {
    let (Some(a), Some(b)) = (a.as_module(), b.as_module()) else {
        return Ordering::Equal;
    };
    let ma = a.metrics.unwrap_or_default();
    let mb = b.metrics.unwrap_or_default();

    match field {
        SortField::Name => a.name.cmp(&b.name),
        SortField::Version => a.version.cmp(&b.version),
        SortField::Size => ma.size.cmp(&mb.size),
        SortField::Files => ma.files.cmp(&mb.files),
        SortField::Deps => ma.dep_count.cmp(&mb.dep_count),
        SortField::DSize => ma.dep_size.cmp(&mb.dep_size),
        SortField::Nested => ma.nested_dep_count.cmp(&mb.nested_dep_count),
    }
}

/// 整个安装目录的重复安装概况
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Overview {
    pub total_packages: usize,
    pub nested_packages: usize,

    /// nested_packages / total_packages，范围 [0, 1]
    pub duplication_ratio: f64,

    pub total_size: u64,
    pub total_files: usize,
}

impl Overview {
    pub fn duplication_percent(&self) -> f64 {
        self.duplication_ratio * 100.0
    }
}

/// 完整的分析报表
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// 每个根（主项目、workspace 包）一行
    pub rows: Vec<Row>,

    pub overview: Overview,
}

impl Report {
    pub fn sort(&mut self, field: SortField, asc: bool) {
        for row in &mut self.rows {
            row.sort_children(field, asc);
        }
    }
}

/// 导出到磁盘的 JSON 快照
#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    pub root: String,
    pub generated_at: DateTime<Utc>,
    pub overview: &'a Overview,
    pub rows: &'a [Row],
}
