//! Error types for dispatch operations.

use std::time::Duration;
use thiserror::Error;

/// Error returned by a dispatch call.
///
/// Validation failures are raised before any request reaches the queue
/// service. Send failures carry the target queue and, when the message was
/// already serialized, the message text that was being sent.
#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error("Invalid task: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to serialize task: {0}")]
    Serialization(#[from] SerializationError),

    #[error("Failed to send a message into {queue} queue")]
    Send {
        queue: String,
        command: Option<String>,
        #[source]
        cause: StorageError,
    },
}

impl DispatcherError {
    /// Name of the queue the failed task was addressed to, if known
    pub fn queue(&self) -> Option<&str> {
        match self {
            Self::Validation(err) => err.queue(),
            Self::Serialization(_) => None,
            Self::Send { queue, .. } => Some(queue),
        }
    }

    /// Message text of the failed send command
    pub fn command(&self) -> Option<&str> {
        match self {
            Self::Send { command, .. } => command.as_deref(),
            _ => None,
        }
    }

    /// Underlying storage failure for send errors
    pub fn storage_error(&self) -> Option<&StorageError> {
        match self {
            Self::Send { cause, .. } => Some(cause),
            _ => None,
        }
    }

    /// Check if the failure was raised before any network call
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Task validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Cannot send task(s): task(s) are invalid")]
    NoTasks,

    #[error("Task name is invalid: {message}")]
    InvalidName { name: String, message: String },

    #[error("Task time-to-live is invalid")]
    InvalidTtl,

    #[error("Task delay is invalid")]
    InvalidDelay,

    #[error("Task delay must be smaller than time-to-live (queue: {queue}, delay: {delay}s, ttl: {ttl}s)")]
    DelayNotLessThanTtl { queue: String, delay: u64, ttl: u64 },

    #[error("Message for queue {queue} is too large: {size} bytes (max: {max_size})")]
    MessageTooLarge {
        queue: String,
        size: usize,
        max_size: usize,
    },
}

impl ValidationError {
    /// Queue name associated with the failure, when the name itself was valid
    pub fn queue(&self) -> Option<&str> {
        match self {
            Self::DelayNotLessThanTtl { queue, .. } | Self::MessageTooLarge { queue, .. } => {
                Some(queue)
            }
            _ => None,
        }
    }
}

/// Errors during message envelope serialization/deserialization
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Message text is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("XML processing failed: {message}")]
    Xml { message: String },
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration parsing failed: {message}")]
    Parsing { message: String },

    #[error("Retry policy type is invalid: {policy_type}")]
    InvalidRetryPolicy { policy_type: String },
}

/// Errors returned by the queue storage transport
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Authentication failed: {code} - {message}")]
    Authentication { code: String, message: String },

    #[error("Queue not found: {queue}")]
    QueueNotFound { queue: String },

    #[error("Queue service error (HTTP {status}): {code} - {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Request timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Invalid response from queue service: {message}")]
    InvalidResponse { message: String },
}

impl StorageError {
    /// Check if error is transient and the request may be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Authentication { .. } => false,
            Self::QueueNotFound { .. } => false,
            Self::Service { status, .. } => matches!(status, 408 | 429 | 500 | 502 | 503 | 504),
            Self::Network { .. } => true,
            Self::Timeout { .. } => true,
            Self::InvalidResponse { .. } => false,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
