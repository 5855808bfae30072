//! Log capture for the dashboard.
//!
//! A tracing layer copies every event into a bounded in-memory buffer that
//! the web API serves as recent log lines. Structured `guild_id` and
//! `user_id` fields are kept so the dashboard can filter by guild.

use serde::Serialize;
use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// A single captured log line
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub level: String,
    pub target: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Ring buffer of recent log entries
pub struct LogBuffer {
    recent: parking_lot::RwLock<VecDeque<LogEntry>>,
    max_entries: usize,
}

impl LogBuffer {
    pub fn new(max_entries: usize) -> Self {
        Self {
            recent: parking_lot::RwLock::new(VecDeque::with_capacity(max_entries)),
            max_entries,
        }
    }

    /// Add a log entry, dropping the oldest when full
    pub fn push(&self, entry: LogEntry) {
        let mut recent = self.recent.write();
        if recent.len() >= self.max_entries {
            recent.pop_front();
        }
        recent.push_back(entry);
    }

    /// Last `count` entries, oldest first, optionally only those tagged with `guild_id`
    pub fn get_recent(&self, count: usize, guild_id: Option<&str>) -> Vec<LogEntry> {
        let recent = self.recent.read();
        let mut matching: Vec<LogEntry> = recent
            .iter()
            .rev()
            .filter(|e| guild_id.map_or(true, |g| e.guild_id.as_deref() == Some(g)))
            .take(count)
            .cloned()
            .collect();
        matching.reverse();
        matching
    }
}

/// Shared log buffer type
pub type SharedLogBuffer = Arc<LogBuffer>;

/// Create a shared log buffer
pub fn create_log_buffer(max_entries: usize) -> SharedLogBuffer {
    Arc::new(LogBuffer::new(max_entries))
}

/// Tracing layer that captures logs to the buffer
pub struct LogCaptureLayer {
    buffer: SharedLogBuffer,
}

impl LogCaptureLayer {
    pub fn new(buffer: SharedLogBuffer) -> Self {
        Self { buffer }
    }
}

impl<S> Layer<S> for LogCaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = EntryVisitor::default();
        event.record(&mut visitor);

        self.buffer.push(LogEntry {
            timestamp: chrono::Utc::now(),
            level: event.metadata().level().to_string(),
            target: event.metadata().target().to_string(),
            message: visitor.finish(),
            guild_id: visitor.guild_id,
            user_id: visitor.user_id,
        });
    }
}

/// Collects the message and the fields we index on
#[derive(Default)]
struct EntryVisitor {
    message: String,
    extra: String,
    guild_id: Option<String>,
    user_id: Option<String>,
}

impl EntryVisitor {
    fn finish(&mut self) -> String {
        let mut message = std::mem::take(&mut self.message);
        if !self.extra.is_empty() {
            if !message.is_empty() {
                message.push(' ');
            }
            message.push_str(&self.extra);
        }
        message
    }

    fn record_value(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = value,
            "guild_id" => self.guild_id = Some(value),
            "user_id" => self.user_id = Some(value),
            name => {
                if !self.extra.is_empty() {
                    self.extra.push_str(", ");
                }
                let _ = write!(self.extra, "{}={}", name, value);
            }
        }
    }
}

impl Visit for EntryVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record_value(field, format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_value(field, value.to_string());
    }
}
