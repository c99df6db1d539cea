//! Task definitions and validation.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;

/// Maximum size of an encoded message accepted by Azure Storage Queues (64 KiB)
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Validated Azure Storage queue name
///
/// Queue names are 3-63 characters long, contain only lowercase ASCII
/// letters, digits and hyphens, start and end with a letter or digit, and
/// never contain consecutive hyphens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QueueName(String);

impl QueueName {
    /// Create new queue name with validation
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        let invalid = |message: &str| ValidationError::InvalidName {
            name: name.clone(),
            message: message.to_string(),
        };

        if name.len() < 3 || name.len() > 63 {
            return Err(invalid("must be 3-63 characters"));
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(invalid(
                "only lowercase ASCII letters, digits, and hyphens allowed",
            ));
        }

        if name.starts_with('-') || name.ends_with('-') || name.contains("--") {
            return Err(invalid(
                "no leading/trailing hyphens or consecutive hyphens",
            ));
        }

        Ok(Self(name))
    }

    /// Get queue name as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for QueueName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<QueueName> for String {
    fn from(name: QueueName) -> Self {
        name.0
    }
}

/// Unit of work submitted to a queue
///
/// `ttl` and `delay` are expressed in seconds. When both are set the delay
/// must be strictly smaller than the time-to-live, otherwise the message
/// would expire before it ever became visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,
}

impl Task {
    /// Create a task for the given queue
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
            ttl: None,
            delay: None,
        }
    }

    /// Set the message time-to-live in seconds
    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set the visibility delay in seconds
    pub fn with_delay(mut self, delay: u64) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Build a task from an untyped JSON object
    ///
    /// Performs the field-type checks a typed [`Task`] gets for free: the name
    /// must be a string and `ttl`/`delay`, when present, must be non-negative
    /// whole numbers. A `null` ttl or delay is treated as absent.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        let mut object = match value {
            Value::Object(object) => object,
            _ => return Err(ValidationError::NoTasks),
        };

        let name = match object.remove("name") {
            Some(Value::String(name)) => name,
            other => {
                return Err(ValidationError::InvalidName {
                    name: other.map(|v| v.to_string()).unwrap_or_default(),
                    message: "must be a string".to_string(),
                })
            }
        };

        let ttl = parse_seconds(object.remove("ttl")).map_err(|_| ValidationError::InvalidTtl)?;
        let delay =
            parse_seconds(object.remove("delay")).map_err(|_| ValidationError::InvalidDelay)?;
        let payload = object.remove("payload").unwrap_or(Value::Null);

        Ok(Self {
            name,
            payload,
            ttl,
            delay,
        })
    }

    /// Validate the task and resolve its queue name
    pub fn validate(&self) -> Result<QueueName, ValidationError> {
        let queue = QueueName::new(self.name.as_str())?;

        if let (Some(delay), Some(ttl)) = (self.delay, self.ttl) {
            if delay >= ttl {
                return Err(ValidationError::DelayNotLessThanTtl {
                    queue: queue.to_string(),
                    delay,
                    ttl,
                });
            }
        }

        Ok(queue)
    }
}

fn parse_seconds(value: Option<Value>) -> Result<Option<u64>, ()> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_u64().map(Some).ok_or(()),
        Some(_) => Err(()),
    }
}

/// One or more tasks handed to a single dispatch call
#[derive(Debug, Clone, PartialEq)]
pub struct Tasks(Vec<Task>);

impl Tasks {
    pub fn into_vec(self) -> Vec<Task> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a JSON task object or an array of task objects
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(Task::from_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Self),
            other => Task::from_value(other).map(|task| Self(vec![task])),
        }
    }
}

impl From<Task> for Tasks {
    fn from(task: Task) -> Self {
        Self(vec![task])
    }
}

impl From<Vec<Task>> for Tasks {
    fn from(tasks: Vec<Task>) -> Self {
        Self(tasks)
    }
}

impl From<&[Task]> for Tasks {
    fn from(tasks: &[Task]) -> Self {
        Self(tasks.to_vec())
    }
}

impl<const N: usize> From<[Task; N]> for Tasks {
    fn from(tasks: [Task; N]) -> Self {
        Self(tasks.into())
    }
}
