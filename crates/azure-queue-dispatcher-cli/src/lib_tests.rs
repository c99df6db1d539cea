//! Tests for the aqd CLI library module.

use super::*;
use azure_queue_dispatcher::DispatcherRetryPolicy;
use serde_json::json;
use std::io::Write;
use std::time::Duration;

const TEST_KEY: &str = "dGVzdC1hY2NvdW50LWtleS0wMTIzNDU2Nzg5YWJjZGVm";

#[test]
fn test_cli_parsing_send_inline() {
    let cli = Cli::try_parse_from([
        "aqd", "send", "--queue", "orders", "--payload", r#"{"id":1}"#, "--ttl", "600",
        "--delay", "30",
    ])
    .unwrap();

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
            assert_eq!(queue.as_deref(), Some("orders"));
            assert_eq!(payload, r#"{"id":1}"#);
            assert_eq!(ttl, Some(600));
            assert_eq!(delay, Some(30));
            assert!(file.is_none());
            assert!(operation_id.is_none());
            assert_eq!(format, OutputFormat::Text);
        }
        _ => panic!("Expected Send command"),
    }
    assert_eq!(cli.log_level, "info");
    assert!(!cli.json_logs);
}

#[test]
fn test_cli_parsing_send_requires_queue_or_file() {
    assert!(Cli::try_parse_from(["aqd", "send"]).is_err());
    assert!(Cli::try_parse_from(["aqd", "send", "--file", "tasks.json"]).is_ok());
    assert!(
        Cli::try_parse_from(["aqd", "send", "--file", "tasks.json", "--queue", "orders"]).is_err()
    );
}

#[test]
fn test_cli_parsing_global_flags() {
    let cli = Cli::try_parse_from([
        "aqd",
        "config",
        "--show",
        "--format",
        "json",
        "--config",
        "dispatcher.yaml",
        "--json-logs",
    ])
    .unwrap();

    assert_eq!(cli.config, Some(PathBuf::from("dispatcher.yaml")));
    assert!(cli.json_logs);
    match cli.command {
        Commands::Config { show, format } => {
            assert!(show);
            assert_eq!(format, ConfigFormat::Json);
        }
        _ => panic!("Expected Config command"),
    }
}

#[test]
fn test_exit_codes() {
    let config_error = CliError::from(ConfigurationError::Missing {
        key: "account".to_string(),
    });
    assert_eq!(config_error.exit_code(), 1);

    let dispatch_error = CliError::from(ValidationError::NoTasks);
    assert_eq!(dispatch_error.exit_code(), 2);

    let argument_error = CliError::InvalidArgument {
        arg: "payload".to_string(),
        message: "bad".to_string(),
    };
    assert_eq!(argument_error.exit_code(), 3);

    let io_error = CliError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
    assert_eq!(io_error.exit_code(), 4);
}

#[test]
fn test_inline_task_parses_payload() {
    let tasks = inline_task(Some("orders".to_string()), r#"{"id":1}"#, Some(60), None).unwrap();
    let tasks = tasks.into_vec();

    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].name, "orders");
    assert_eq!(tasks[0].payload, json!({ "id": 1 }));
    assert_eq!(tasks[0].ttl, Some(60));
    assert_eq!(tasks[0].delay, None);
}

#[test]
fn test_inline_task_rejects_invalid_payload() {
    let error = inline_task(Some("orders".to_string()), "{not json", None, None).unwrap_err();
    assert!(matches!(error, CliError::InvalidArgument { ref arg, .. } if arg == "payload"));
}

#[test]
fn test_read_tasks_accepts_object_or_array() {
    let mut single = tempfile::NamedTempFile::new().unwrap();
    write!(single, r#"{{"name":"orders","payload":{{"id":1}}}}"#).unwrap();
    assert_eq!(read_tasks(single.path()).unwrap().len(), 1);

    let mut many = tempfile::NamedTempFile::new().unwrap();
    write!(
        many,
        r#"[{{"name":"orders","payload":1}},{{"name":"billing","payload":2,"ttl":60}}]"#
    )
    .unwrap();
    let tasks = read_tasks(many.path()).unwrap().into_vec();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[1].name, "billing");
    assert_eq!(tasks[1].ttl, Some(60));
}

#[test]
fn test_read_tasks_errors() {
    let missing = read_tasks(Path::new("/nonexistent/tasks.json")).unwrap_err();
    assert_eq!(missing.exit_code(), 4);

    let mut malformed = tempfile::NamedTempFile::new().unwrap();
    write!(malformed, "not json").unwrap();
    assert_eq!(read_tasks(malformed.path()).unwrap_err().exit_code(), 3);

    let mut invalid = tempfile::NamedTempFile::new().unwrap();
    write!(invalid, r#"[{{"payload":1}}]"#).unwrap();
    assert_eq!(read_tasks(invalid.path()).unwrap_err().exit_code(), 2);
}

#[test]
fn test_render_config_redacts_access_key() {
    let config = DispatcherConfig::new("myaccount", TEST_KEY)
        .with_name("billing")
        .with_retry_policy(DispatcherRetryPolicy::linear(3, Duration::from_secs(2)));

    for format in [ConfigFormat::Yaml, ConfigFormat::Json, ConfigFormat::Toml] {
        let rendered = render_config(&config, &format).unwrap();
        assert!(rendered.contains("myaccount"), "{:?}: {}", format, rendered);
        assert!(rendered.contains("<redacted>"), "{:?}: {}", format, rendered);
        assert!(!rendered.contains(TEST_KEY), "{:?}: {}", format, rendered);
        assert!(rendered.contains("linear"), "{:?}: {}", format, rendered);
    }
}

#[test]
fn test_render_receipts() {
    let receipts = vec![
        SendReceipt {
            queue: "orders".to_string(),
            message_id: "m-1".to_string(),
            time_next_visible: None,
        },
        SendReceipt {
            queue: "billing".to_string(),
            message_id: "m-2".to_string(),
            time_next_visible: Some("2026-01-05T10:00:00+00:00".to_string()),
        },
    ];

    let text = render_receipts(&receipts, &OutputFormat::Text).unwrap();
    assert_eq!(text, "orders\tm-1\nbilling\tm-2");

    let parsed: serde_json::Value =
        serde_json::from_str(&render_receipts(&receipts, &OutputFormat::Json).unwrap()).unwrap();
    assert_eq!(parsed[0]["message_id"], "m-1");
    assert!(parsed[0].get("time_next_visible").is_none());
    assert_eq!(parsed[1]["time_next_visible"], "2026-01-05T10:00:00+00:00");
}
