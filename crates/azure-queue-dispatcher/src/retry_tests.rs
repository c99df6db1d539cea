//! Tests for retry options.

use super::*;

#[test]
fn test_default_options() {
    let options = RetryOptions::default();
    assert_eq!(options.max_tries, 4);
    assert_eq!(options.retry_delay, Duration::from_millis(4000));
    assert_eq!(options.try_timeout, Duration::from_millis(3000));
}

#[test]
fn test_fixed_options_derive_try_timeout() {
    let options = RetryOptions::fixed(5, Duration::from_millis(2500));
    assert_eq!(options.max_tries, 5);
    assert_eq!(options.try_timeout, Duration::from_millis(1500));
}

#[test]
fn test_try_timeout_has_lower_bound() {
    let options = RetryOptions::fixed(3, Duration::from_millis(200));
    assert_eq!(options.try_timeout, Duration::from_millis(1000));
}

#[test]
fn test_zero_tries_means_single_try() {
    let options = RetryOptions::fixed(0, Duration::from_millis(100));
    assert_eq!(options.max_tries, 1);
    assert!(!options.should_retry(1));
}

#[test]
fn test_should_retry_until_max_tries() {
    let options = RetryOptions::fixed(3, Duration::from_millis(100));
    assert!(options.should_retry(1));
    assert!(options.should_retry(2));
    assert!(!options.should_retry(3));
    assert!(!options.should_retry(4));
}

#[test]
fn test_try_timeout_override() {
    let options = RetryOptions::default().with_try_timeout(Duration::from_millis(750));
    assert_eq!(options.try_timeout, Duration::from_millis(750));
    assert_eq!(options.retry_delay, DEFAULT_RETRY_DELAY);
}
