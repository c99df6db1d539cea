//! Per-call dispatch client.

use crate::error::{DispatcherError, ValidationError};
use crate::message::{EnqueueOptions, EnqueuedMessage, MessageEnvelope};
use crate::storage::QueueTransport;
use crate::task::{QueueName, Task, Tasks, MAX_MESSAGE_SIZE};
use crate::trace::{Logger, TraceCommand, TraceSource};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

/// Client that validates tasks and enqueues them, one message per task.
///
/// Clients are cheap to create: obtain one per logical operation from
/// [`crate::Dispatcher::get_client`] and tag it with the operation id.
#[derive(Clone)]
pub struct DispatcherClient {
    transport: Arc<dyn QueueTransport>,
    source: TraceSource,
    logger: Arc<dyn Logger>,
    operation_id: Option<String>,
}

/// A validated task ready to be sent
struct PreparedMessage {
    queue: QueueName,
    text: String,
    options: EnqueueOptions,
}

impl DispatcherClient {
    pub fn new(
        transport: Arc<dyn QueueTransport>,
        source: TraceSource,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            transport,
            source,
            logger,
            operation_id: None,
        }
    }

    /// Tag every message sent by this client with an operation id
    ///
    /// The id is written to the envelope metadata and sent as the client
    /// request id of each Put Message call.
    pub fn with_operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }

    pub fn operation_id(&self) -> Option<&str> {
        self.operation_id.as_deref()
    }

    pub fn source(&self) -> &TraceSource {
        &self.source
    }

    /// Send one task or a batch of tasks
    ///
    /// All tasks are validated before anything is sent; a single invalid task
    /// rejects the whole call. Valid tasks are then sent concurrently and the
    /// call waits for every send to finish. Receipts are returned in task
    /// order. If any send failed, the error of the first failed task (in task
    /// order) is returned.
    ///
    /// # Errors
    ///
    /// - [`DispatcherError::Validation`] if the batch is empty or any task is invalid
    /// - [`DispatcherError::Serialization`] if a payload cannot be encoded
    /// - [`DispatcherError::Send`] if the queue service rejected a message
    pub async fn send(
        &self,
        tasks: impl Into<Tasks>,
    ) -> Result<Vec<EnqueuedMessage>, DispatcherError> {
        let tasks = tasks.into();
        if tasks.is_empty() {
            return Err(ValidationError::NoTasks.into());
        }

        let messages = tasks
            .into_vec()
            .iter()
            .map(|task| self.prepare(task))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            source = %self.source.name,
            count = messages.len(),
            "Dispatching messages"
        );

        let results = join_all(
            messages
                .iter()
                .map(|message| self.send_message(&message.queue, &message.text, &message.options)),
        )
        .await;

        results.into_iter().collect()
    }

    /// Validate a task and encode its message
    fn prepare(&self, task: &Task) -> Result<PreparedMessage, DispatcherError> {
        let queue = task.validate()?;
        let text = MessageEnvelope::encode(self.operation_id.as_deref(), &task.payload)?;

        if text.len() > MAX_MESSAGE_SIZE {
            return Err(ValidationError::MessageTooLarge {
                queue: queue.to_string(),
                size: text.len(),
                max_size: MAX_MESSAGE_SIZE,
            }
            .into());
        }

        Ok(PreparedMessage {
            options: EnqueueOptions::from_task(task, self.operation_id.as_deref()),
            queue,
            text,
        })
    }

    /// Enqueue a single message and report exactly one trace event
    async fn send_message(
        &self,
        queue: &QueueName,
        message_text: &str,
        options: &EnqueueOptions,
    ) -> Result<EnqueuedMessage, DispatcherError> {
        let start = Instant::now();
        let command = TraceCommand::send_message(queue.as_str(), message_text);

        match self.transport.enqueue(queue, message_text, options).await {
            Ok(message) => {
                self.logger
                    .trace(&self.source, &command.name, start.elapsed(), true);
                Ok(message)
            }
            Err(cause) => {
                self.logger
                    .trace(&self.source, &command.name, start.elapsed(), false);
                Err(DispatcherError::Send {
                    queue: queue.to_string(),
                    command: Some(command.text),
                    cause,
                })
            }
        }
    }
}

impl std::fmt::Debug for DispatcherClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherClient")
            .field("source", &self.source)
            .field("operation_id", &self.operation_id)
            .finish()
    }
}
