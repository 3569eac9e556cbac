//! Tests for configuration validation and loading

use std::collections::HashMap;
use std::time::Duration;

use course_admission::config::{AdmissionConfig, ConcurrencyStrategy, RetryPolicy};

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_default_config_is_valid() {
    let cfg = AdmissionConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.concurrency, ConcurrencyStrategy::RowLock);
    assert_eq!(cfg.transaction_timeout(), Duration::from_secs(2));
    assert_eq!(cfg.sweep_interval(), Duration::from_secs(30));
}

#[test]
fn test_invalid_timeout() {
    let cfg = AdmissionConfig {
        transaction_timeout_ms: 0,
        ..AdmissionConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_notice_limits_must_be_positive() {
    let cfg = AdmissionConfig::default();
    assert_eq!(cfg.notice_max_attempts, 10);
    assert_eq!(cfg.max_pending_notices, 10_000);

    let cfg = AdmissionConfig {
        notice_max_attempts: 0,
        ..AdmissionConfig::default()
    };
    assert!(cfg.validate().is_err());

    let cfg = AdmissionConfig {
        max_pending_notices: 0,
        ..AdmissionConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_invalid_retry_policy() {
    let cfg = AdmissionConfig {
        retry: RetryPolicy {
            max_attempts: 0,
            base_delay_ms: 5,
            max_delay_ms: 200,
        },
        ..AdmissionConfig::default()
    };
    assert!(cfg.validate().is_err());

    let cfg = AdmissionConfig {
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 200,
        },
        ..AdmissionConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_from_json_with_defaults() {
    let cfg = AdmissionConfig::from_json_str(
        r#"{ "concurrency": "optimistic", "retry": { "max_attempts": 8 } }"#,
    )
    .unwrap();
    assert_eq!(cfg.concurrency, ConcurrencyStrategy::Optimistic);
    assert_eq!(cfg.retry.max_attempts, 8);
    assert_eq!(cfg.retry.base_delay_ms, RetryPolicy::default().base_delay_ms);
    assert_eq!(cfg.transaction_timeout_ms, 2_000);
}

#[test]
fn test_from_json_rejects_invalid() {
    assert!(AdmissionConfig::from_json_str(r#"{ "sweep_interval_secs": 0 }"#).is_err());
    assert!(AdmissionConfig::from_json_str("not json").is_err());
}

#[test]
fn test_from_lookup_overrides() {
    let cfg = AdmissionConfig::from_lookup(lookup(&[
        ("ADMISSION_CONCURRENCY", "optimistic"),
        ("ADMISSION_TRANSACTION_TIMEOUT_MS", "750"),
        ("ADMISSION_RETRY_MAX_ATTEMPTS", "9"),
        ("ADMISSION_SWEEP_INTERVAL_SECS", "5"),
        ("ADMISSION_NOTICE_MAX_ATTEMPTS", "4"),
        ("ADMISSION_MAX_PENDING_NOTICES", "64"),
        ("ADMISSION_LOG", "course_admission=debug"),
    ]))
    .unwrap();
    assert_eq!(cfg.concurrency, ConcurrencyStrategy::Optimistic);
    assert_eq!(cfg.transaction_timeout_ms, 750);
    assert_eq!(cfg.retry.max_attempts, 9);
    assert_eq!(cfg.sweep_interval_secs, 5);
    assert_eq!(cfg.notice_max_attempts, 4);
    assert_eq!(cfg.max_pending_notices, 64);
    assert_eq!(cfg.log_filter.as_deref(), Some("course_admission=debug"));
}

#[test]
fn test_from_lookup_empty_is_default() {
    let cfg = AdmissionConfig::from_lookup(|_| None).unwrap();
    assert_eq!(cfg, AdmissionConfig::default());
}

#[test]
fn test_from_lookup_rejects_garbage() {
    assert!(AdmissionConfig::from_lookup(lookup(&[("ADMISSION_CONCURRENCY", "mvcc")])).is_err());
    assert!(
        AdmissionConfig::from_lookup(lookup(&[("ADMISSION_RETRY_MAX_ATTEMPTS", "lots")])).is_err()
    );
    assert!(
        AdmissionConfig::from_lookup(lookup(&[("ADMISSION_TRANSACTION_TIMEOUT_MS", "0")])).is_err()
    );
}
