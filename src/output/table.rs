use crossterm::style::{Color, Stylize};

use crate::models::{Overview, Row};
use crate::utils::size_format::{
    format_count, format_percent, format_size, nested_tier, percent_tier, size_tier, Tier,
};

/// 名称列最大宽度
const NAME_MAX_WIDTH: usize = 60;

#[derive(Debug, Clone)]
struct Cell {
    text: String,
    tier: Tier,
}

impl Cell {
    fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), tier: Tier::Plain }
    }

    fn empty() -> Self {
        Self::plain("")
    }

    fn width(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

/// 纯文本表格渲染器
#[derive(Debug, Clone, Copy)]
pub struct TableRenderer {
    /// 是否显示文件数量列
    pub show_files: bool,

    /// 是否输出 ANSI 颜色
    pub color: bool,
}

impl TableRenderer {
    pub fn new(show_files: bool, color: bool) -> Self {
        Self { show_files, color }
    }

    fn headers(&self) -> Vec<(&'static str, Align)> {
        let mut headers = vec![
            (" Name", Align::Left),
            ("Version", Align::Left),
            ("Size", Align::Right),
            ("Deps Amount", Align::Right),
            ("Deps Nested", Align::Right),
            ("Deps Size", Align::Right),
        ];
        if self.show_files {
            headers.insert(2, ("Files", Align::Right));
            headers.insert(6, ("Deps Files", Align::Right));
        }
        headers
    }

    /// 渲染整个报表树
    pub fn render(&self, rows: &[Row]) -> String {
        let headers = self.headers();

        let mut lines: Vec<Vec<Cell>> = Vec::new();
        for (i, row) in rows.iter().enumerate() {
            self.collect(row, "", i + 1 == rows.len(), true, &mut lines);
        }

        let mut widths: Vec<usize> = headers.iter().map(|(h, _)| h.chars().count()).collect();
        for line in &lines {
            for (width, cell) in widths.iter_mut().zip(line) {
                *width = (*width).max(cell.width());
            }
        }

        let mut out = String::new();
        let header_cells: Vec<Cell> = headers.iter().map(|(h, _)| Cell::plain(*h)).collect();
        out.push_str(&self.format_line(&header_cells, &headers, &widths, true));
        out.push('\n');
        let separator: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
        out.push_str(&separator.join("─┼─"));
        out.push('\n');

        for line in &lines {
            out.push_str(&self.format_line(line, &headers, &widths, false));
            out.push('\n');
        }
        out
    }

    /// 概况行：总数、嵌套数与重复率
    pub fn render_overview(&self, overview: &Overview) -> String {
        let percent = overview.duplication_percent();
        format!(
            "total: {} nested: {} (duplication: {}) size: {}",
            self.paint(&format_count(overview.total_packages), Tier::Plain, Some(Color::Cyan)),
            self.paint(&format_count(overview.nested_packages), nested_tier(overview.nested_packages), None),
            self.paint(&format_percent(percent), percent_tier(percent), None),
            self.paint(&format_size(overview.total_size), size_tier(overview.total_size), None),
        )
    }

    fn collect(&self, row: &Row, prefix: &str, is_last: bool, is_top: bool, lines: &mut Vec<Vec<Cell>>) {
        let branch = if is_top {
            String::new()
        } else if is_last {
            format!("{}└ ", prefix)
        } else {
            format!("{}├ ", prefix)
        };

        lines.push(self.cells(row, &branch));

        let child_prefix = if is_top {
            String::new()
        } else if is_last {
            format!("{}  ", prefix)
        } else {
            format!("{}│ ", prefix)
        };

        let children = row.children();
        for (i, child) in children.iter().enumerate() {
            self.collect(child, &child_prefix, i + 1 == children.len(), false, lines);
        }
    }

    fn cells(&self, row: &Row, branch: &str) -> Vec<Cell> {
        let name = truncate(&format!(" {}{}", branch, row.name()), NAME_MAX_WIDTH);
        let column_count = if self.show_files { 8 } else { 6 };

        let module = match row {
            Row::Group(_) => {
                let mut cells = vec![Cell::plain(name)];
                cells.resize(column_count, Cell::empty());
                return cells;
            }
            Row::Module(module) => module,
        };

        let Some(metrics) = module.metrics else {
            let mut cells = vec![Cell { text: name, tier: Tier::Red }, Cell::plain("not found")];
            cells.resize(column_count, Cell::empty());
            return cells;
        };

        let mut cells = vec![
            Cell::plain(name),
            Cell::plain(module.version.clone().unwrap_or_default()),
            Cell { text: format_size(metrics.size), tier: size_tier(metrics.size) },
            Cell::plain(format_count(metrics.dep_count)),
            Cell {
                text: format_count(metrics.nested_dep_count),
                tier: nested_tier(metrics.nested_dep_count),
            },
            Cell { text: format_size(metrics.dep_size), tier: size_tier(metrics.dep_size) },
        ];
        if self.show_files {
            cells.insert(2, Cell::plain(format_count(metrics.files)));
            cells.insert(6, Cell::plain(format_count(metrics.dep_files)));
        }
        cells
    }

    fn format_line(&self, cells: &[Cell], headers: &[(&str, Align)], widths: &[usize], bold: bool) -> String {
        let parts: Vec<String> = cells
            .iter()
            .zip(headers.iter().zip(widths))
            .map(|(cell, ((_, align), width))| {
                let padding = " ".repeat(width.saturating_sub(cell.width()));
                let padded = match align {
                    Align::Left => format!("{}{}", cell.text, padding),
                    Align::Right => format!("{}{}", padding, cell.text),
                };
                if bold && self.color {
                    padded.bold().to_string()
                } else {
                    self.paint(&padded, cell.tier, None)
                }
            })
            .collect();
        parts.join(" │ ").trim_end().to_string()
    }

    fn paint(&self, text: &str, tier: Tier, fallback: Option<Color>) -> String {
        if !self.color {
            return text.to_string();
        }
        match tier_color(tier).or(fallback) {
            Some(color) => text.with(color).to_string(),
            None => text.to_string(),
        }
    }
}

fn tier_color(tier: Tier) -> Option<Color> {
    match tier {
        Tier::Plain => None,
        Tier::Green => Some(Color::Green),
        Tier::Yellow => Some(Color::Yellow),
        Tier::Red => Some(Color::Red),
        Tier::Magenta => Some(Color::Magenta),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
