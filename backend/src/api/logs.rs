//! Pipeline log broadcasting.
//!
//! Every pipeline step reports through [`LOG_BROADCASTER`]. Entries are
//! echoed to stderr (stdout is reserved for command output such as JSON
//! records) and fanned out to SSE clients of `/api/logs`.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Capacity of the broadcast channel. Slow subscribers lose the oldest entries.
const CHANNEL_CAPACITY: usize = 100;

/// Log level for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
        }
    }
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting level for sub-steps
    #[serde(default)]
    pub indent: u8,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            indent: 0,
            timestamp: Utc::now(),
        }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// Console rendering, without the timestamp.
    pub fn render(&self) -> String {
        let indent = "   ".repeat(self.indent as usize);
        format!("{}{} {}", indent, self.level.prefix(), self.message)
    }
}

/// Global log broadcaster
pub static LOG_BROADCASTER: Lazy<LogBroadcaster> = Lazy::new(LogBroadcaster::new);

/// Broadcasts log entries to all connected SSE clients
pub struct LogBroadcaster {
    sender: broadcast::Sender<LogEntry>,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Echo an entry to stderr and send it to all subscribers
    pub fn log(&self, entry: LogEntry) {
        eprintln!("{}", entry.render());

        // No receivers is fine
        let _ = self.sender.send(entry);
    }

    /// Get a receiver for SSE streaming
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

pub fn log_info(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Info, msg));
}

pub fn log_success(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Success, msg));
}

pub fn log_warning(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Warning, msg));
}

pub fn log_error(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Error, msg));
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Info, msg).with_indent(indent));
}
