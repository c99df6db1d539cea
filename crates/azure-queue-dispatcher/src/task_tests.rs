//! Tests for task definitions and validation.

use super::*;
use serde_json::json;

mod queue_name_tests {
    use super::*;

    #[test]
    fn test_valid_queue_names() {
        assert!(QueueName::new("orders").is_ok());
        assert!(QueueName::new("order-events-2").is_ok());
        assert!(QueueName::new("abc").is_ok());
        assert!(QueueName::new("a".repeat(63)).is_ok());
    }

    #[test]
    fn test_invalid_queue_names() {
        assert!(QueueName::new("").is_err());
        assert!(QueueName::new("ab").is_err());
        assert!(QueueName::new("a".repeat(64)).is_err());
        assert!(QueueName::new("Orders").is_err());
        assert!(QueueName::new("order_events").is_err());
        assert!(QueueName::new("-orders").is_err());
        assert!(QueueName::new("orders-").is_err());
        assert!(QueueName::new("order--events").is_err());
    }

    #[test]
    fn test_invalid_queue_name_reports_name() {
        let error = QueueName::new("Bad_Name").unwrap_err();
        match error {
            ValidationError::InvalidName { name, .. } => assert_eq!(name, "Bad_Name"),
            other => panic!("Expected InvalidName, got {:?}", other),
        }
    }

    #[test]
    fn test_queue_name_serde() {
        let name: QueueName = serde_json::from_value(json!("orders")).unwrap();
        assert_eq!(name.as_str(), "orders");
        assert!(serde_json::from_value::<QueueName>(json!("NOPE")).is_err());
    }
}

mod validation_tests {
    use super::*;

    #[test]
    fn test_task_without_timing_is_valid() {
        let task = Task::new("orders", json!({ "id": 1 }));
        assert_eq!(task.validate().unwrap().as_str(), "orders");
    }

    #[test]
    fn test_delay_smaller_than_ttl_is_valid() {
        let task = Task::new("orders", json!(null)).with_ttl(60).with_delay(59);
        assert!(task.validate().is_ok());
    }

    #[test]
    fn test_delay_equal_to_ttl_is_rejected() {
        let task = Task::new("orders", json!(null)).with_ttl(60).with_delay(60);
        assert_eq!(
            task.validate(),
            Err(ValidationError::DelayNotLessThanTtl {
                queue: "orders".to_string(),
                delay: 60,
                ttl: 60,
            })
        );
    }

    #[test]
    fn test_delay_greater_than_ttl_is_rejected() {
        let task = Task::new("orders", json!(null)).with_ttl(10).with_delay(30);
        assert!(matches!(
            task.validate(),
            Err(ValidationError::DelayNotLessThanTtl { .. })
        ));
    }

    #[test]
    fn test_delay_or_ttl_alone_is_valid() {
        assert!(Task::new("orders", json!(null)).with_delay(300).validate().is_ok());
        assert!(Task::new("orders", json!(null)).with_ttl(1).validate().is_ok());
    }

    #[test]
    fn test_invalid_queue_name_is_rejected() {
        let task = Task::new("Not A Queue", json!(null));
        assert!(matches!(
            task.validate(),
            Err(ValidationError::InvalidName { .. })
        ));
    }
}

mod from_value_tests {
    use super::*;

    #[test]
    fn test_full_task_object() {
        let task = Task::from_value(json!({
            "name": "orders",
            "payload": { "id": 7 },
            "ttl": 3600,
            "delay": 10
        }))
        .unwrap();

        assert_eq!(task.name, "orders");
        assert_eq!(task.payload, json!({ "id": 7 }));
        assert_eq!(task.ttl, Some(3600));
        assert_eq!(task.delay, Some(10));
    }

    #[test]
    fn test_missing_optional_fields() {
        let task = Task::from_value(json!({ "name": "orders" })).unwrap();
        assert_eq!(task.payload, Value::Null);
        assert_eq!(task.ttl, None);
        assert_eq!(task.delay, None);
    }

    #[test]
    fn test_null_timing_is_absent() {
        let task = Task::from_value(json!({ "name": "orders", "ttl": null, "delay": null })).unwrap();
        assert_eq!(task.ttl, None);
        assert_eq!(task.delay, None);
    }

    #[test]
    fn test_non_string_name_is_rejected() {
        let result = Task::from_value(json!({ "name": 42, "payload": {} }));
        assert!(matches!(result, Err(ValidationError::InvalidName { .. })));

        let result = Task::from_value(json!({ "payload": {} }));
        assert!(matches!(result, Err(ValidationError::InvalidName { .. })));
    }

    #[test]
    fn test_non_numeric_ttl_is_rejected() {
        let result = Task::from_value(json!({ "name": "orders", "ttl": "60" }));
        assert_eq!(result, Err(ValidationError::InvalidTtl));

        let result = Task::from_value(json!({ "name": "orders", "ttl": -5 }));
        assert_eq!(result, Err(ValidationError::InvalidTtl));

        let result = Task::from_value(json!({ "name": "orders", "ttl": 1.5 }));
        assert_eq!(result, Err(ValidationError::InvalidTtl));
    }

    #[test]
    fn test_non_numeric_delay_is_rejected() {
        let result = Task::from_value(json!({ "name": "orders", "delay": true }));
        assert_eq!(result, Err(ValidationError::InvalidDelay));
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert_eq!(
            Task::from_value(json!("orders")),
            Err(ValidationError::NoTasks)
        );
    }
}

mod tasks_tests {
    use super::*;

    #[test]
    fn test_single_task_and_one_element_vec_are_equivalent() {
        let task = Task::new("orders", json!({ "id": 1 }));
        let single: Tasks = task.clone().into();
        let batch: Tasks = vec![task].into();
        assert_eq!(single, batch);
    }

    #[test]
    fn test_tasks_from_json_object_or_array() {
        let single = Tasks::from_value(json!({ "name": "orders" })).unwrap();
        assert_eq!(single.len(), 1);

        let batch = Tasks::from_value(json!([
            { "name": "orders" },
            { "name": "invoices", "ttl": 60 }
        ]))
        .unwrap();
        assert_eq!(batch.len(), 2);

        let invalid = Tasks::from_value(json!([{ "name": "orders" }, { "name": 1 }]));
        assert!(invalid.is_err());
    }

    #[test]
    fn test_empty_array_yields_empty_tasks() {
        let tasks = Tasks::from_value(json!([])).unwrap();
        assert!(tasks.is_empty());
    }
}
