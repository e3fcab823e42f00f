use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row as TableRow, Table, TableState},
    Frame,
};

use crate::config::SortField;
use crate::models::{Overview, Row};
use crate::utils::size_format::{
    format_count, format_percent, format_size, nested_tier, percent_tier, size_tier, Tier,
};

/// 报表屏幕 - 绘制概况和展开后的报表树
pub struct ReportScreen {
    table_state: TableState,
}

/// 绘制时需要的视图参数
pub struct ReportView<'a> {
    pub root: &'a str,
    pub rows: &'a [(usize, &'a Row)],
    pub overview: &'a Overview,
    pub selected: usize,
    pub sort: Option<SortField>,
    pub asc: bool,
    pub show_files: bool,
}

impl ReportScreen {
    pub fn new() -> Self {
        Self {
            table_state: TableState::default(),
        }
    }

    pub fn draw(&mut self, f: &mut Frame, area: Rect, view: &ReportView<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4), // 概况
                Constraint::Min(0),    // 报表
            ])
            .split(area);

        self.draw_overview(f, chunks[0], view);
        self.draw_table(f, chunks[1], view);
    }

    fn draw_overview(&self, f: &mut Frame, area: Rect, view: &ReportView<'_>) {
        let overview = view.overview;
        let percent = overview.duplication_percent();

        let sort_text = match view.sort {
            Some(field) => format!("{} ({})", field.column_name(), if view.asc { "升序" } else { "降序" }),
            None => "原始顺序".to_string(),
        };

        let text = vec![
            Line::from(vec![
                Span::raw("总包数: "),
                Span::styled(format_count(overview.total_packages), Style::default().fg(Color::Cyan)),
                Span::raw("  嵌套: "),
                Span::styled(format_count(overview.nested_packages), tier_style(nested_tier(overview.nested_packages))),
                Span::raw("  重复率: "),
                Span::styled(format_percent(percent), tier_style(percent_tier(percent))),
                Span::raw("  总大小: "),
                Span::styled(format_size(overview.total_size), tier_style(size_tier(overview.total_size))),
            ]),
            Line::from(vec![
                Span::raw("排序: "),
                Span::styled(sort_text, Style::default().add_modifier(Modifier::BOLD)),
            ]),
        ];

        let block = Block::default()
            .title(format!("依赖分析: {}", view.root))
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::Cyan));

        let paragraph = Paragraph::new(text)
            .block(block)
            .style(Style::default().fg(Color::White));

        f.render_widget(paragraph, area);
    }

    fn draw_table(&mut self, f: &mut Frame, area: Rect, view: &ReportView<'_>) {
        let mut header = vec!["Name", "Version", "Size", "Deps", "Nested", "Deps Size"];
        let mut widths = vec![
            Constraint::Min(30),
            Constraint::Length(12),
            Constraint::Length(11),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(11),
        ];
        if view.show_files {
            header.insert(2, "Files");
            header.insert(6, "Deps Files");
            widths.insert(2, Constraint::Length(8));
            widths.insert(6, Constraint::Length(10));
        }

        let rows: Vec<TableRow> = view
            .rows
            .iter()
            .map(|(depth, row)| table_row(*depth, row, view.show_files))
            .collect();

        let header_row = TableRow::new(header)
            .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

        let table = Table::new(rows, widths)
            .header(header_row)
            .block(Block::default().borders(Borders::ALL).title("模块"))
            .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
            .highlight_symbol("> ");

        self.table_state.select(if view.rows.is_empty() { None } else { Some(view.selected) });
        f.render_stateful_widget(table, area, &mut self.table_state);
    }
}

impl Default for ReportScreen {
    fn default() -> Self {
        Self::new()
    }
}

fn table_row<'a>(depth: usize, row: &'a Row, show_files: bool) -> TableRow<'a> {
    let name = format!("{}{}", "  ".repeat(depth), row.name());

    let module = match row {
        Row::Group(_) => {
            return TableRow::new(vec![Cell::from(name)])
                .style(Style::default().fg(Color::Blue).add_modifier(Modifier::ITALIC));
        }
        Row::Module(module) => module,
    };

    let Some(metrics) = module.metrics else {
        return TableRow::new(vec![Cell::from(name), Cell::from("not found")])
            .style(Style::default().fg(Color::Red));
    };

    let mut cells = vec![
        Cell::from(name),
        Cell::from(module.version.clone().unwrap_or_default()),
        Cell::from(format_size(metrics.size)).style(tier_style(size_tier(metrics.size))),
        Cell::from(format_count(metrics.dep_count)),
        Cell::from(format_count(metrics.nested_dep_count)).style(tier_style(nested_tier(metrics.nested_dep_count))),
        Cell::from(format_size(metrics.dep_size)).style(tier_style(size_tier(metrics.dep_size))),
    ];
    if show_files {
        cells.insert(2, Cell::from(format_count(metrics.files)));
        cells.insert(6, Cell::from(format_count(metrics.dep_files)));
    }
    TableRow::new(cells)
}

fn tier_style(tier: Tier) -> Style {
    let color = match tier {
        Tier::Plain => return Style::default(),
        Tier::Green => Color::Green,
        Tier::Yellow => Color::Yellow,
        Tier::Red => Color::Red,
        Tier::Magenta => Color::Magenta,
    };
    Style::default().fg(color)
}
