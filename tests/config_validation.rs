//! Integration tests for configuration validation

#![allow(clippy::expect_used)]

use im_protocol::config::{CodecConfig, DispatchConfig, LoggingConfig, SessionConfig};
use im_protocol::error::ProtocolError;
use std::time::Duration;
use tracing::Level;

#[test]
fn test_default_config_validates() {
    let config = SessionConfig::default();
    let errors = config.validate();
    assert!(
        errors.is_empty(),
        "Default config should be valid, but got errors: {:?}",
        errors
    );
    assert!(config.validate_strict().is_ok());
}

#[test]
fn test_response_timeout_too_short() {
    let mut config = SessionConfig::default();
    config.dispatch.response_timeout = Duration::from_millis(5);

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("Response timeout too short")));
}

#[test]
fn test_response_timeout_too_long() {
    let dispatch = DispatchConfig {
        response_timeout: Duration::from_secs(600),
        ..DispatchConfig::default()
    };
    assert!(dispatch
        .validate()
        .iter()
        .any(|e| e.contains("Response timeout too long")));
}

#[test]
fn test_zero_outbound_capacity() {
    let mut config = SessionConfig::default();
    config.dispatch.outbound_capacity = 0;

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Outbound capacity must be greater than 0")));
}

#[test]
fn test_zero_pending_requests() {
    let mut config = SessionConfig::default();
    config.dispatch.max_pending_requests = 0;
    assert!(!config.validate().is_empty());
}

#[test]
fn test_unprefixed_blocks_only_warn() {
    let codec = CodecConfig {
        prefix_record_count: false,
        ..CodecConfig::default()
    };
    let errors = codec.validate();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("WARNING"));
}

#[test]
fn test_tiny_block_size_rejected() {
    let codec = CodecConfig {
        max_block_size: 1,
        ..CodecConfig::default()
    };
    assert!(codec
        .validate()
        .iter()
        .any(|e| e.contains("at least the record count")));
}

#[test]
fn test_empty_app_name() {
    let logging = LoggingConfig {
        app_name: String::new(),
        ..LoggingConfig::default()
    };
    assert!(logging
        .validate()
        .iter()
        .any(|e| e.contains("cannot be empty")));
}

#[test]
fn test_validate_strict_collects_every_error() {
    let config = SessionConfig::default_with_overrides(|c| {
        c.dispatch.outbound_capacity = 0;
        c.logging.app_name = String::new();
    });

    match config.validate_strict() {
        Err(ProtocolError::ConfigError(msg)) => {
            assert!(msg.contains("Outbound capacity"));
            assert!(msg.contains("Application name"));
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn test_example_config_parses_back() {
    let text = SessionConfig::example_config();
    let parsed = SessionConfig::from_toml(&text).expect("example config should parse");

    let defaults = SessionConfig::default();
    assert_eq!(parsed.dispatch.response_timeout, defaults.dispatch.response_timeout);
    assert_eq!(parsed.codec.max_block_size, defaults.codec.max_block_size);
    assert_eq!(parsed.logging.log_level, Level::INFO);
}

#[test]
fn test_toml_sections_and_missing_sections() {
    let text = r#"
        [dispatch]
        response_timeout = 2500
        outbound_capacity = 8
        max_pending_requests = 16
        shutdown_timeout = 1000

        [logging]
        app_name = "client"
        log_level = "debug"
        json_format = true
    "#;
    let config = SessionConfig::from_toml(text).expect("config should parse");

    assert_eq!(config.dispatch.response_timeout, Duration::from_millis(2500));
    assert_eq!(config.dispatch.outbound_capacity, 8);
    assert_eq!(config.logging.log_level, Level::DEBUG);
    assert!(config.logging.json_format);
    // absent section falls back to defaults
    assert!(config.codec.prefix_record_count);
    assert!(!config.codec.encrypt_outbound);
}

#[test]
fn test_invalid_log_level_rejected() {
    let text = r#"
        [logging]
        app_name = "client"
        log_level = "loud"
        json_format = false
    "#;
    assert!(matches!(
        SessionConfig::from_toml(text),
        Err(ProtocolError::ConfigError(_))
    ));
}

#[test]
fn test_save_and_reload() {
    let path = std::env::temp_dir().join(format!("im-protocol-config-{}.toml", std::process::id()));
    let config = SessionConfig::default_with_overrides(|c| {
        c.dispatch.response_timeout = Duration::from_millis(750);
        c.codec.encrypt_outbound = true;
    });

    config.save_to_file(&path).expect("save should succeed");
    let loaded = SessionConfig::from_file(&path).expect("load should succeed");
    let _ = std::fs::remove_file(&path);

    assert_eq!(loaded.dispatch.response_timeout, Duration::from_millis(750));
    assert!(loaded.codec.encrypt_outbound);
}

#[test]
fn test_missing_file_is_config_error() {
    let result = SessionConfig::from_file("/definitely/not/here/im-protocol.toml");
    assert!(matches!(result, Err(ProtocolError::ConfigError(_))));
}

#[test]
fn test_env_overrides() {
    std::env::set_var("IM_PROTOCOL_RESPONSE_TIMEOUT_MS", "1234");
    std::env::set_var("IM_PROTOCOL_ENCRYPT_OUTBOUND", "true");
    std::env::set_var("IM_PROTOCOL_LOG_LEVEL", "warn");
    std::env::set_var("IM_PROTOCOL_OUTBOUND_CAPACITY", "not-a-number");

    let config = SessionConfig::from_env().expect("env config should load");

    for var in [
        "IM_PROTOCOL_RESPONSE_TIMEOUT_MS",
        "IM_PROTOCOL_ENCRYPT_OUTBOUND",
        "IM_PROTOCOL_LOG_LEVEL",
        "IM_PROTOCOL_OUTBOUND_CAPACITY",
    ] {
        std::env::remove_var(var);
    }

    assert_eq!(config.dispatch.response_timeout, Duration::from_millis(1234));
    assert!(config.codec.encrypt_outbound);
    assert_eq!(config.logging.log_level, Level::WARN);
    // unparsable values keep the default
    assert_eq!(
        config.dispatch.outbound_capacity,
        DispatchConfig::default().outbound_capacity
    );
}
