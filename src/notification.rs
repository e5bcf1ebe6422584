//! Модуль для реализации системы уведомлений
//!
//! Конкретные наблюдатели за статусом переозвучки: лог, память, канал
//! и консоль.

use std::io::Write;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::progress::{DubState, StatusObserver, StatusUpdate};

/// Наблюдатель, пишущий статус в лог
#[derive(Default)]
pub struct LogStatusObserver;

impl StatusObserver for LogStatusObserver {
    fn on_status_update(&self, update: StatusUpdate) {
        match update.state {
            DubState::Failed(_) => log::error!("[{}] {}", update.task_id, update.message),
            _ => log::info!("[{}] {} ({:.0}%)", update.task_id, update.message, update.total_progress),
        }
    }
}

/// Наблюдатель, сохраняющий обновления в памяти
#[derive(Clone, Default)]
pub struct MemoryStatusObserver {
    history: Arc<Mutex<Vec<StatusUpdate>>>,
}

impl MemoryStatusObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<StatusUpdate> {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Последняя строка статуса, как ее увидел бы пользователь
    pub fn last_message(&self) -> Option<String> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .map(|u| u.message.clone())
    }

    pub fn clear_history(&self) {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl StatusObserver for MemoryStatusObserver {
    fn on_status_update(&self, update: StatusUpdate) {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).push(update);
    }
}

/// Наблюдатель, пересылающий обновления в канал
pub struct ChannelStatusObserver {
    sender: mpsc::UnboundedSender<StatusUpdate>,
}

impl ChannelStatusObserver {
    pub fn new(sender: mpsc::UnboundedSender<StatusUpdate>) -> Self {
        Self { sender }
    }
}

impl StatusObserver for ChannelStatusObserver {
    fn on_status_update(&self, update: StatusUpdate) {
        if self.sender.send(update).is_err() {
            log::debug!("Status channel closed");
        }
    }
}

/// Наблюдатель для терминала: строка статуса перезаписывается на месте
pub struct ConsoleStatusObserver {
    prefix: Option<String>,
    in_place: bool,
}

impl ConsoleStatusObserver {
    pub fn new() -> Self {
        Self { prefix: None, in_place: true }
    }

    /// С несколькими запусками одновременно строки не перезаписываются
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            in_place: false,
        }
    }

    pub fn render(&self, update: &StatusUpdate) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}{}: {}", prefix, update.task_id, update.message),
            None => format!("{}: {}", update.task_id, update.message),
        }
    }
}

impl Default for ConsoleStatusObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusObserver for ConsoleStatusObserver {
    fn on_status_update(&self, update: StatusUpdate) {
        let line = self.render(&update);
        let mut stdout = std::io::stdout().lock();
        let result = if !self.in_place {
            writeln!(stdout, "{}", line)
        } else if update.state.is_terminal() {
            writeln!(stdout, "\r\x1b[2K{}", line)
        } else {
            write!(stdout, "\r\x1b[2K{}", line)
        };
        let _ = result.and_then(|_| stdout.flush());
    }
}
