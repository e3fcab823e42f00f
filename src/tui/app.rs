use std::io;
use ratatui::{
    backend::CrosstermBackend,
    Terminal,
    layout::{Constraint, Layout, Rect},
    widgets::{Block, Borders, Paragraph},
    style::{Color, Style, Modifier},
    text::{Line, Span},
    Frame,
};
use crossterm::{
    event::KeyEvent,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    execute,
};
use anyhow::Result;

use crate::config::SortField;
use crate::models::{Report, Row};
use crate::tui::events::{Action, Event, EventHandler};
use crate::tui::screens::{ReportScreen, ReportView};

/// 翻页时移动的行数
const PAGE_SIZE: usize = 10;

/// 应用程序状态
#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    /// 浏览报表
    Browsing,

    /// 显示帮助信息
    Help,

    /// 退出中
    Quitting,
}

/// 交互式报表浏览器
pub struct App {
    state: AppState,

    /// 被分析的根目录
    root: String,

    /// 分析得到的原始报表（保持声明顺序）
    original: Report,

    /// 当前排序后的报表
    report: Report,

    sort: Option<SortField>,
    asc: bool,
    show_files: bool,

    /// 当前选中行（展开后的行号）
    selected: usize,

    status_message: String,

    report_screen: ReportScreen,
}

impl App {
    pub fn new(root: String, report: Report, sort: Option<SortField>, asc: bool, show_files: bool) -> Self {
        let mut app = Self {
            state: AppState::Browsing,
            root,
            report: report.clone(),
            original: report,
            sort,
            asc,
            show_files,
            selected: 0,
            status_message: "按 h 查看帮助".to_string(),
            report_screen: ReportScreen::new(),
        };
        app.apply_sort();
        app
    }

    /// 运行应用程序
    pub async fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let mut event_handler = EventHandler::new();
        event_handler.start();

        let result = self.main_loop(&mut terminal, &mut event_handler).await;

        // 恢复终端
        event_handler.stop();
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    async fn main_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        event_handler: &mut EventHandler,
    ) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;

            match event_handler.next().await? {
                Event::Key(key) => self.handle_key(key),
                Event::Resize(_, _) | Event::Tick => {}
            }

            if self.state == AppState::Quitting {
                break;
            }
        }

        Ok(())
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn sort(&self) -> Option<SortField> {
        self.sort
    }

    pub fn is_ascending(&self) -> bool {
        self.asc
    }

    pub fn show_files(&self) -> bool {
        self.show_files
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    /// 展开后的行数
    pub fn row_count(&self) -> usize {
        self.report.rows.iter().map(|r| r.flatten().len()).sum()
    }

    /// 按键对应的操作；帮助界面中任意键返回
    pub fn handle_key(&mut self, key: KeyEvent) {
        let action = Action::from_key(&key);
        if action == Some(Action::Quit) {
            self.state = AppState::Quitting;
            return;
        }
        if self.state == AppState::Help {
            self.state = AppState::Browsing;
            return;
        }

        let last = self.row_count().saturating_sub(1);
        match action {
            Some(Action::Up) => self.selected = self.selected.saturating_sub(1),
            Some(Action::Down) => self.selected = (self.selected + 1).min(last),
            Some(Action::PageUp) => self.selected = self.selected.saturating_sub(PAGE_SIZE),
            Some(Action::PageDown) => self.selected = (self.selected + PAGE_SIZE).min(last),
            Some(Action::CycleSort) => {
                self.sort = Some(self.sort.map(|f| f.next()).unwrap_or(SortField::Name));
                self.apply_sort();
            }
            Some(Action::ToggleOrder) => {
                self.asc = !self.asc;
                self.apply_sort();
            }
            Some(Action::ToggleFiles) => self.show_files = !self.show_files,
            Some(Action::Help) => self.state = AppState::Help,
            Some(Action::Quit) | None => {}
        }
    }

    /// 从原始顺序重新排序，排序是稳定的
    fn apply_sort(&mut self) {
        self.report = self.original.clone();
        if let Some(field) = self.sort {
            self.report.sort(field, self.asc);
            self.status_message = format!(
                "按 {} {}排序",
                field.column_name(),
                if self.asc { "升序" } else { "降序" }
            );
        }
    }

    fn draw(&mut self, f: &mut Frame) {
        let [body, status] = Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(f.area());

        if self.state == AppState::Help {
            draw_help(f, body);
        } else {
            let rows: Vec<(usize, &Row)> = self.report.rows.iter().flat_map(|r| r.flatten()).collect();
            let view = ReportView {
                root: &self.root,
                rows: &rows,
                overview: &self.report.overview,
                selected: self.selected,
                sort: self.sort,
                asc: self.asc,
                show_files: self.show_files,
            };
            self.report_screen.draw(f, body, &view);
        }

        let position = match self.row_count() {
            0 => "0/0".to_string(),
            count => format!("{}/{}", self.selected + 1, count),
        };
        let status_line = Line::from(vec![
            Span::raw(format!(" {} ", self.status_message)),
            Span::styled(format!("行 {}", position), Style::default().add_modifier(Modifier::BOLD)),
        ]);
        f.render_widget(
            Paragraph::new(status_line).style(Style::default().bg(Color::Blue).fg(Color::White)),
            status,
        );
    }
}

/// 帮助界面中列出的按键
const KEY_BINDINGS: &[(&str, &str)] = &[
    ("↑/↓, k/j", "上下移动"),
    ("PgUp/PgDn", "翻页"),
    ("s", "切换排序字段"),
    ("a", "切换升序/降序"),
    ("f", "显示/隐藏文件数量"),
    ("q, Esc, Ctrl+C", "退出"),
];

fn draw_help(f: &mut Frame, area: Rect) {
    let mut lines = vec![
        Line::from(Span::styled("快捷键", Style::default().add_modifier(Modifier::BOLD))),
        Line::default(),
    ];
    lines.extend(KEY_BINDINGS.iter().map(|(keys, description)| {
        Line::from(vec![
            Span::styled(format!("  {:<16}", keys), Style::default().fg(Color::Yellow)),
            Span::raw(*description),
        ])
    }));
    lines.push(Line::default());
    lines.push(Line::from("按任意键返回"));

    let help = Paragraph::new(lines)
        .block(Block::default().title("帮助").borders(Borders::ALL).border_style(Style::default().fg(Color::Green)));
    f.render_widget(help, area);
}
