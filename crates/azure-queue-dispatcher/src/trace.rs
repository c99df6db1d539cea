//! Trace events for enqueue calls.
//!
//! Every enqueue call reports its outcome through the [`Logger`] trait. The
//! default implementation forwards to `tracing`; callers with their own
//! telemetry pipeline plug in a different implementation.
//!
//! # Examples
//!
//! ```rust
//! use azure_queue_dispatcher::trace::{Logger, NoOpLogger, TraceSource};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let logger: Arc<dyn Logger> = Arc::new(NoOpLogger);
//! let source = TraceSource::azure_queue("dispatcher");
//! logger.trace(&source, "send message: orders", Duration::from_millis(12), true);
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[cfg(test)]
#[path = "trace_tests.rs"]
mod tests;

/// Type tag used for every queue dispatcher trace source
pub const AZURE_QUEUE_SOURCE_TYPE: &str = "azure queue";

/// Component that produced a trace event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceSource {
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: String,
}

impl TraceSource {
    pub fn azure_queue(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_type: AZURE_QUEUE_SOURCE_TYPE.to_string(),
        }
    }
}

/// Command that was traced: a short name plus the full command text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceCommand {
    pub name: String,
    pub text: String,
}

impl TraceCommand {
    /// Command describing a Put Message call against `queue`
    pub fn send_message(queue: &str, message_text: &str) -> Self {
        Self {
            name: format!("send message: {}", queue),
            text: message_text.to_string(),
        }
    }
}

/// Receiver of trace events.
///
/// Called exactly once per enqueue call, whether it succeeded or failed.
/// Implementations must not fail; a logging problem never affects dispatch.
pub trait Logger: Send + Sync {
    fn trace(&self, source: &TraceSource, command: &str, duration: Duration, success: bool);
}

/// Logger that emits trace events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn trace(&self, source: &TraceSource, command: &str, duration: Duration, success: bool) {
        let duration_ms = duration.as_millis() as u64;
        if success {
            tracing::info!(
                target: "azure_queue_dispatcher::trace",
                source = %source.name,
                source_type = %source.source_type,
                command = %command,
                duration_ms,
                success,
                "Dispatched message"
            );
        } else {
            tracing::warn!(
                target: "azure_queue_dispatcher::trace",
                source = %source.name,
                source_type = %source.source_type,
                command = %command,
                duration_ms,
                success,
                "Failed to dispatch message"
            );
        }
    }
}

/// Logger that discards all trace events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn trace(&self, _source: &TraceSource, _command: &str, _duration: Duration, _success: bool) {}
}
