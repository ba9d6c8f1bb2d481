// Error handling tests
// Author: kelexine (https://github.com/kelexine)

use anyhow::anyhow;
use upshield::error::ShieldError;

#[test]
fn test_error_display_messages() {
    let errors = vec![
        ShieldError::BackingStore("redis unreachable".to_string()),
        ShieldError::BreakerOpen {
            name: "amap_poi".to_string(),
        },
        ShieldError::Upstream {
            operation: "llm_completion".to_string(),
            attempts: 3,
            source: anyhow!("timeout"),
        },
        ShieldError::Config("missing cache section".to_string()),
    ];

    for error in errors {
        let display = format!("{}", error);
        assert!(!display.is_empty(), "Error should have display message");
    }
}

#[test]
fn test_backing_store_error() {
    let error = ShieldError::BackingStore("connection refused".to_string());
    assert!(format!("{}", error).contains("connection refused"));
    assert!(!error.is_breaker_open());
}

#[test]
fn test_breaker_open_error_names_dependency() {
    let error = ShieldError::BreakerOpen {
        name: "amap_weather".to_string(),
    };
    assert!(format!("{}", error).contains("amap_weather"));
    assert!(error.is_breaker_open());
}

#[test]
fn test_upstream_error_preserves_cause_and_attempts() {
    let error = ShieldError::Upstream {
        operation: "llm_completion".to_string(),
        attempts: 3,
        source: anyhow!("rate limited"),
    };
    let display = format!("{}", error);
    assert!(display.contains("llm_completion"));
    assert!(display.contains("3 attempt"));
    assert!(display.contains("rate limited"));
}

#[test]
fn test_serialization_error_converts() {
    let bad = serde_json::from_str::<u32>("not json").unwrap_err();
    let error: ShieldError = bad.into();
    assert!(matches!(error, ShieldError::Serialization(_)));
}
