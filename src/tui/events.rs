use std::time::{Duration, Instant};
use crossterm::event::{self, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// 刷新间隔
const TICK_RATE: Duration = Duration::from_millis(250);

/// 界面事件
#[derive(Clone, Debug)]
pub enum Event {
    Key(KeyEvent),

    /// 终端大小变化，重新绘制即可
    Resize(u16, u16),

    Tick,
}

/// 在阻塞线程中轮询终端输入，通过通道交给界面循环
pub struct EventHandler {
    receiver: mpsc::UnboundedReceiver<Event>,
    sender: mpsc::UnboundedSender<Event>,
    shutdown: CancellationToken,
    reader: Option<tokio::task::JoinHandle<()>>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            receiver,
            sender,
            shutdown: CancellationToken::new(),
            reader: None,
        }
    }

    pub fn start(&mut self) {
        if self.reader.is_some() {
            return;
        }
        let sender = self.sender.clone();
        let shutdown = self.shutdown.clone();

        self.reader = Some(tokio::task::spawn_blocking(move || {
            let mut last_tick = Instant::now();
            while !shutdown.is_cancelled() {
                let timeout = TICK_RATE.saturating_sub(last_tick.elapsed());
                let forwarded = match event::poll(timeout) {
                    Ok(true) => match event::read() {
                        Ok(event::Event::Key(key)) if key.kind == KeyEventKind::Press => sender.send(Event::Key(key)),
                        Ok(event::Event::Resize(w, h)) => sender.send(Event::Resize(w, h)),
                        Ok(_) => Ok(()),
                        Err(err) => {
                            tracing::debug!("读取终端事件失败: {}", err);
                            Ok(())
                        }
                    },
                    Ok(false) => Ok(()),
                    Err(err) => {
                        tracing::debug!("轮询终端事件失败: {}", err);
                        Ok(())
                    }
                };
                if forwarded.is_err() {
                    break;
                }

                if last_tick.elapsed() >= TICK_RATE {
                    if sender.send(Event::Tick).is_err() {
                        break;
                    }
                    last_tick = Instant::now();
                }
            }
        }));
    }

    pub async fn next(&mut self) -> Result<Event> {
        self.receiver
            .recv()
            .await
            .ok_or_else(|| anyhow::anyhow!("终端事件通道已关闭"))
    }

    /// 通知读取线程退出；线程在下一次轮询超时后结束
    pub fn stop(&mut self) {
        self.shutdown.cancel();
        self.reader.take();
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventHandler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 报表浏览器支持的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Up,
    Down,
    PageUp,
    PageDown,
    /// 切换到下一个排序字段
    CycleSort,
    /// 升序/降序
    ToggleOrder,
    /// 显示/隐藏文件数量列
    ToggleFiles,
    Help,
}

impl Action {
    /// 按键映射；未绑定的键返回 None
    pub fn from_key(key: &KeyEvent) -> Option<Action> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') | KeyCode::Char('C') => Some(Action::Quit),
                _ => None,
            };
        }

        let action = match key.code {
            KeyCode::Esc => Action::Quit,
            KeyCode::Up => Action::Up,
            KeyCode::Down => Action::Down,
            KeyCode::PageUp => Action::PageUp,
            KeyCode::PageDown => Action::PageDown,
            KeyCode::F(1) => Action::Help,
            KeyCode::Char(c) => match c.to_ascii_lowercase() {
                'q' => Action::Quit,
                'k' => Action::Up,
                'j' => Action::Down,
                's' => Action::CycleSort,
                'a' => Action::ToggleOrder,
                'f' => Action::ToggleFiles,
                'h' | '?' => Action::Help,
                _ => return None,
            },
            _ => return None,
        };
        Some(action)
    }
}
