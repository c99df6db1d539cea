//! # Azure Queue Dispatcher
//!
//! Dispatch client for Azure Storage Queues. Tasks (a JSON payload plus an
//! optional delay and time-to-live) are validated, wrapped in a message
//! envelope and enqueued, one message per task, with a trace event reported
//! for every enqueue call.
//!
//! ## Module Organization
//!
//! - [`config`] - Dispatcher configuration and retry policy mapping
//! - [`task`] - Tasks, queue names and validation
//! - [`message`] - Message envelope and enqueue options
//! - [`client`] - Per-call dispatch client
//! - [`storage`] - Queue transport trait and the Azure REST transport
//! - [`retry`] - Fixed-interval retry options for the request pipeline
//! - [`trace`] - Trace event seam
//! - [`error`] - Error types for all dispatch operations
//!
//! ## Example
//!
//! ```no_run
//! use azure_queue_dispatcher::{Dispatcher, DispatcherConfig, Task};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DispatcherConfig::new("myaccount", "c2VjcmV0LWtleQ==").with_name("orders");
//! let dispatcher = Dispatcher::new(config)?;
//!
//! let client = dispatcher.get_client(None).with_operation_id("op-42");
//! client
//!     .send(Task::new("orders", json!({ "id": 7 })).with_ttl(3600).with_delay(10))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod retry;
pub mod storage;
pub mod task;
pub mod trace;

pub use client::DispatcherClient;
pub use config::{AccessKey, DispatcherConfig, DispatcherRetryPolicy};
pub use error::{
    ConfigurationError, DispatcherError, SerializationError, StorageError, ValidationError,
};
pub use message::{EnqueueOptions, EnqueuedMessage, MessageEnvelope};
pub use retry::RetryOptions;
pub use storage::{AzureQueueStorage, QueueTransport, SharedKeyCredential};
pub use task::{QueueName, Task, Tasks};
pub use trace::{Logger, NoOpLogger, TraceCommand, TraceSource, TracingLogger};

use std::sync::Arc;
use tracing::info;

/// Long-lived factory for [`DispatcherClient`]s.
///
/// Holds the queue transport (credentials, retry pipeline, HTTP connection
/// pool) and the trace source shared by every client it creates.
#[derive(Clone)]
pub struct Dispatcher {
    source: TraceSource,
    transport: Arc<dyn QueueTransport>,
}

impl Dispatcher {
    /// Build a dispatcher from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid: missing account or key,
    /// a key that is not base64, an unsupported retry policy type, or a
    /// malformed endpoint.
    pub fn new(config: DispatcherConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let credential = SharedKeyCredential::new(config.account.clone(), config.access_key.decode()?);
        let retry = config.retry_options()?;
        let service_url = config.service_url()?;

        info!(
            source = config.source_name(),
            account = %config.account,
            endpoint = %service_url,
            max_tries = retry.max_tries,
            retry_delay_ms = retry.retry_delay.as_millis() as u64,
            try_timeout_ms = retry.try_timeout.as_millis() as u64,
            "Creating queue dispatcher"
        );

        let transport = AzureQueueStorage::new(service_url, credential, retry)?;
        Ok(Self::with_transport(config.source_name(), Arc::new(transport)))
    }

    /// Build a dispatcher around an existing transport
    pub fn with_transport(source_name: &str, transport: Arc<dyn QueueTransport>) -> Self {
        Self {
            source: TraceSource::azure_queue(source_name),
            transport,
        }
    }

    /// Create a client reporting trace events to `logger`
    ///
    /// Without a logger, trace events go to [`TracingLogger`].
    pub fn get_client(&self, logger: Option<Arc<dyn Logger>>) -> DispatcherClient {
        let logger = logger.unwrap_or_else(|| Arc::new(TracingLogger));
        DispatcherClient::new(Arc::clone(&self.transport), self.source.clone(), logger)
    }

    pub fn source(&self) -> &TraceSource {
        &self.source
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("source", &self.source)
            .finish()
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
