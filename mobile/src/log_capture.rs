use std::collections::VecDeque;
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use tracing::Subscriber;
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Lines kept for `status` output.
pub const LOG_BUFFER_CAPACITY: usize = 200;

/// Keeps recent log lines in memory next to the normal fmt output.
pub struct LogCaptureLayer;

impl<S> Layer<S> for LogCaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = metadata.level();
        let target = metadata.target();

        struct MessageVisitor {
            message: String,
        }

        impl tracing::field::Visit for MessageVisitor {
            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                if field.name() == "message" {
                    self.message = format!("{:?}", value);
                }
            }

            fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                if field.name() == "message" {
                    self.message = value.to_string();
                }
            }
        }

        let mut visitor = MessageVisitor {
            message: String::new(),
        };
        event.record(&mut visitor);

        append_log(*level, format!("[{}] {}: {}", level, target, visitor.message));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: tracing::Level,
    pub line: String,
}

/// Bounded ring of log lines.
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, level: tracing::Level, line: String) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry { level, line });
    }

    /// Lines at `min_level` or more severe, oldest first.
    pub fn lines(&self, min_level: tracing::Level) -> Vec<String> {
        // tracing orders levels by verbosity: ERROR < WARN < ... < TRACE
        self.entries
            .iter()
            .filter(|entry| entry.level <= min_level)
            .map(|entry| entry.line.clone())
            .collect()
    }
}

static LOG_BUFFER: OnceLock<Mutex<LogBuffer>> = OnceLock::new();

fn log_buffer() -> &'static Mutex<LogBuffer> {
    LOG_BUFFER.get_or_init(|| Mutex::new(LogBuffer::new(LOG_BUFFER_CAPACITY)))
}

pub fn append_log(level: tracing::Level, line: String) {
    if let Ok(mut buffer) = log_buffer().lock() {
        buffer.push(level, line);
    }
}

/// Captured lines at `min_level` or more severe, oldest first.
pub fn recent_logs(min_level: tracing::Level) -> Vec<String> {
    log_buffer()
        .lock()
        .map(|buffer| buffer.lines(min_level))
        .unwrap_or_default()
}

// Type-erased reload handle using a closure
type ReloadFn = Box<dyn Fn(&str) + Send + Sync>;

static RELOAD_HANDLE: OnceLock<Arc<RwLock<Option<ReloadFn>>>> = OnceLock::new();

fn get_reload_handle() -> &'static Arc<RwLock<Option<ReloadFn>>> {
    RELOAD_HANDLE.get_or_init(|| Arc::new(RwLock::new(None)))
}

/// Store the reload handle for later use (type-erased)
pub fn set_reload_fn<F>(reload_fn: F)
where
    F: Fn(&str) + Send + Sync + 'static,
{
    if let Ok(mut handle) = get_reload_handle().write() {
        *handle = Some(Box::new(reload_fn));
    }
}

/// Update the tracing log level at runtime
pub fn update_tracing_level(level: &str) {
    if let Ok(handle) = get_reload_handle().read() {
        if let Some(ref reload_fn) = *handle {
            reload_fn(level);
        }
    }
}
