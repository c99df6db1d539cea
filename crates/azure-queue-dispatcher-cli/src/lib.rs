//! # Azure Queue Dispatcher CLI
//!
//! Command-line front end for dispatching tasks to Azure Storage Queues.
//!
//! This module provides CLI commands for:
//! - Sending a single task or a file of tasks
//! - Validating and displaying the resolved configuration
//! - Generating shell completions

use azure_queue_dispatcher::{
    ConfigurationError, Dispatcher, DispatcherConfig, DispatcherError, EnqueuedMessage, Task,
    Tasks, ValidationError,
};
use clap::{CommandFactory, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

// ============================================================================
// CLI Structure
// ============================================================================

/// Azure Queue Dispatcher - send tasks to Azure Storage Queues
#[derive(Parser)]
#[command(name = "aqd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Send tasks to Azure Storage Queues")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "AQD_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Logging level (overridden by RUST_LOG)
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Send one task, or every task in a JSON file
    Send {
        /// Target queue name
        #[arg(short, long, required_unless_present = "file", conflicts_with = "file")]
        queue: Option<String>,

        /// Task payload as JSON
        #[arg(short, long, default_value = "null", conflicts_with = "file")]
        payload: String,

        /// Message time-to-live in seconds
        #[arg(long, conflicts_with = "file")]
        ttl: Option<u64>,

        /// Visibility delay in seconds
        #[arg(long, conflicts_with = "file")]
        delay: Option<u64>,

        /// JSON file holding a task object or an array of task objects
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Operation id stamped on every message (generated when omitted)
        #[arg(long)]
        operation_id: Option<String>,

        /// Output format
        #[arg(short = 'o', long, default_value = "text")]
        format: OutputFormat,
    },

    /// Validate configuration
    Config {
        /// Show resolved configuration (access key redacted)
        #[arg(short, long)]
        show: bool,

        /// Output format for configuration
        #[arg(short = 'f', long, default_value = "yaml")]
        format: ConfigFormat,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Output format options
#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output
    Json,
}

/// Configuration format options
#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
    /// TOML format
    Toml,
}

// ============================================================================
// CLI Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatcherError),

    #[error("Invalid argument: {arg} - {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ValidationError> for CliError {
    fn from(error: ValidationError) -> Self {
        Self::Dispatch(error.into())
    }
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 1,
            Self::Dispatch(_) => 2,
            Self::InvalidArgument { .. } => 3,
            Self::Io(_) => 4,
        }
    }
}

// ============================================================================
// Output Types
// ============================================================================

/// Receipt of one dispatched message, as printed by `send`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendReceipt {
    pub queue: String,
    pub message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_next_visible: Option<String>,
}

impl SendReceipt {
    fn new(queue: &str, message: &EnqueuedMessage) -> Self {
        Self {
            queue: queue.to_string(),
            message_id: message.message_id.clone(),
            time_next_visible: message.time_next_visible.map(|t| t.to_rfc3339()),
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Main CLI entry point
pub async fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();
    initialize_logging(&cli)?;
    run(cli).await
}

/// Execute a parsed command line
pub async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Send {
            queue,
            payload,
            ttl,
            delay,
            file,
            operation_id,
            format,
        } => {
            let config = DispatcherConfig::load(cli.config.as_deref())?;
            let tasks = match file {
                Some(path) => read_tasks(&path)?,
                None => inline_task(queue, &payload, ttl, delay)?,
            };
            execute_send_command(config, tasks, operation_id, format).await
        }
        Commands::Config { show, format } => {
            let config = DispatcherConfig::load(cli.config.as_deref())?;
            execute_config_command(&config, show, format)
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "aqd", &mut std::io::stdout());
            Ok(())
        }
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// Initialize logging based on CLI arguments
///
/// `RUST_LOG` takes precedence over `--log-level`. Logs go to stderr so that
/// command output on stdout stays machine-readable.
fn initialize_logging(cli: &Cli) -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .map_err(|e| CliError::InvalidArgument {
            arg: "log-level".to_string(),
            message: e.to_string(),
        })?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = if cli.json_logs {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    result.map_err(|e| CliError::InvalidArgument {
        arg: "log-level".to_string(),
        message: format!("failed to initialize logging: {}", e),
    })
}

/// Build a single task from command-line arguments
fn inline_task(
    queue: Option<String>,
    payload: &str,
    ttl: Option<u64>,
    delay: Option<u64>,
) -> Result<Tasks, CliError> {
    let queue = queue.ok_or_else(|| CliError::InvalidArgument {
        arg: "queue".to_string(),
        message: "a queue name is required when no task file is given".to_string(),
    })?;

    let payload = serde_json::from_str(payload).map_err(|e| CliError::InvalidArgument {
        arg: "payload".to_string(),
        message: format!("payload is not valid JSON: {}", e),
    })?;

    let mut task = Task::new(queue, payload);
    task.ttl = ttl;
    task.delay = delay;
    Ok(task.into())
}

/// Read tasks from a JSON file holding a task object or an array of them
fn read_tasks(path: &Path) -> Result<Tasks, CliError> {
    let contents = std::fs::read_to_string(path)?;
    let value = serde_json::from_str(&contents).map_err(|e| CliError::InvalidArgument {
        arg: "file".to_string(),
        message: format!("{} is not valid JSON: {}", path.display(), e),
    })?;

    let tasks = Tasks::from_value(value)?;
    debug!(path = %path.display(), count = tasks.len(), "Loaded tasks from file");
    Ok(tasks)
}

/// Execute send command
async fn execute_send_command(
    config: DispatcherConfig,
    tasks: Tasks,
    operation_id: Option<String>,
    format: OutputFormat,
) -> Result<(), CliError> {
    let operation_id = operation_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let tasks = tasks.into_vec();
    let queues: Vec<String> = tasks.iter().map(|task| task.name.clone()).collect();

    info!(
        operation_id = %operation_id,
        count = tasks.len(),
        "Sending tasks"
    );

    let dispatcher = Dispatcher::new(config)?;
    let client = dispatcher.get_client(None).with_operation_id(&operation_id);
    let messages = client.send(tasks).await?;

    let receipts: Vec<SendReceipt> = queues
        .iter()
        .zip(messages.iter())
        .map(|(queue, message)| SendReceipt::new(queue, message))
        .collect();

    println!("{}", render_receipts(&receipts, &format)?);
    Ok(())
}

fn render_receipts(receipts: &[SendReceipt], format: &OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(receipts).map_err(|e| CliError::InvalidArgument {
                arg: "format".to_string(),
                message: e.to_string(),
            })
        }
        OutputFormat::Text => Ok(receipts
            .iter()
            .map(|r| format!("{}\t{}", r.queue, r.message_id))
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

/// Execute config command
fn execute_config_command(
    config: &DispatcherConfig,
    show: bool,
    format: ConfigFormat,
) -> Result<(), CliError> {
    info!(account = %config.account, "Configuration is valid");

    if show {
        println!("{}", render_config(config, &format)?);
    } else {
        println!("Configuration is valid");
    }
    Ok(())
}

/// Render the configuration; the access key is always redacted
fn render_config(config: &DispatcherConfig, format: &ConfigFormat) -> Result<String, CliError> {
    let render_error = |message: String| CliError::InvalidArgument {
        arg: "format".to_string(),
        message,
    };

    match format {
        ConfigFormat::Yaml => serde_yaml::to_string(config).map_err(|e| render_error(e.to_string())),
        ConfigFormat::Json => {
            serde_json::to_string_pretty(config).map_err(|e| render_error(e.to_string()))
        }
        ConfigFormat::Toml => toml::to_string(config).map_err(|e| render_error(e.to_string())),
    }
}
