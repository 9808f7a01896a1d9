/// Severity of a trace message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceLevel {
    Verbose,
    Info,
    Warning,
    Error,
}

/// Sink for progress and diagnostic output.
///
/// The orchestrator and the process invoker never log directly; they are
/// handed a `TraceWriter` so tests can capture what a run reported.
pub trait TraceWriter: Send + Sync {
    /// Write one message at the given level.
    fn write(&self, level: TraceLevel, message: &str);

    fn info(&self, message: &str) {
        self.write(TraceLevel::Info, message);
    }

    fn verbose(&self, message: &str) {
        self.write(TraceLevel::Verbose, message);
    }

    fn warning(&self, message: &str) {
        self.write(TraceLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.write(TraceLevel::Error, message);
    }
}

/// Forwards messages to the `tracing` crate under a fixed target.
#[derive(Debug, Clone)]
pub struct TracingTraceWriter {
    target: &'static str,
}

impl TracingTraceWriter {
    pub fn new(target: &'static str) -> Self {
        Self { target }
    }
}

impl Default for TracingTraceWriter {
    fn default() -> Self {
        Self::new("bootstrap")
    }
}

impl TraceWriter for TracingTraceWriter {
    fn write(&self, level: TraceLevel, message: &str) {
        let target = self.target;
        match level {
            TraceLevel::Verbose => tracing::debug!(component = target, "{}", message),
            TraceLevel::Info => tracing::info!(component = target, "{}", message),
            TraceLevel::Warning => tracing::warn!(component = target, "{}", message),
            TraceLevel::Error => tracing::error!(component = target, "{}", message),
        }
    }
}

/// Discards everything.
#[derive(Debug, Clone, Default)]
pub struct NullTraceWriter;

impl TraceWriter for NullTraceWriter {
    fn write(&self, _level: TraceLevel, _message: &str) {}
}

/// Keeps every message in memory, in order.
#[derive(Debug, Default)]
pub struct CollectingTraceWriter {
    messages: parking_lot::Mutex<Vec<(TraceLevel, String)>>,
}

impl CollectingTraceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all collected messages.
    pub fn messages(&self) -> Vec<(TraceLevel, String)> {
        self.messages.lock().clone()
    }

    /// Whether any message at `level` contains `needle`.
    pub fn contains(&self, level: TraceLevel, needle: &str) -> bool {
        self.messages
            .lock()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }
}

impl TraceWriter for CollectingTraceWriter {
    fn write(&self, level: TraceLevel, message: &str) {
        self.messages.lock().push((level, message.to_string()));
    }
}
