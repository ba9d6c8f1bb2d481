// Retry executor and breaker/retry composition tests
// Author: kelexine (https://github.com/kelexine)

use anyhow::anyhow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use upshield::breaker::{BreakerConfig, BreakerRegistry, CircuitState};
use upshield::error::ShieldError;
use upshield::guard;
use upshield::retry::{self, RetryPolicy};

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        multiplier: 2.0,
    }
}

#[tokio::test]
async fn test_success_on_third_attempt() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let out = retry::execute("flaky", &fast_policy(3), move || {
        let counter = counter.clone();
        async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(anyhow!("transient failure {n}"))
            } else {
                Ok("done")
            }
        }
    })
    .await;

    assert_eq!(out.unwrap(), "done");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_exhaustion_surfaces_last_failure() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let out: upshield::error::Result<u32> =
        retry::execute("doomed", &fast_policy(2), move || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Err(anyhow!("failure on attempt {n}"))
            }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    match out {
        Err(ShieldError::Upstream {
            operation,
            attempts,
            source,
        }) => {
            assert_eq!(operation, "doomed");
            assert_eq!(attempts, 2);
            assert!(source.to_string().contains("attempt 2"));
        }
        other => panic!("expected upstream exhaustion, got {other:?}"),
    }
}

#[tokio::test]
async fn test_immediate_success_makes_single_attempt() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let out = retry::execute("steady", &fast_policy(5), move || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(42u32)
        }
    })
    .await;

    assert_eq!(out.unwrap(), 42);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

async fn always_failing_call(
    registry: &BreakerRegistry,
    policy: &RetryPolicy,
    calls: &Arc<AtomicUsize>,
) -> upshield::error::Result<u32> {
    let calls = calls.clone();
    guard::call(registry, "upstream", policy, move || {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<u32, _>(anyhow!("still down"))
        }
    })
    .await
}

// The breaker wraps the whole retry loop: one exhausted loop registers one
// breaker failure, and an open breaker stops calls before any retry runs.
#[tokio::test]
async fn test_guard_counts_one_breaker_failure_per_exhausted_loop() {
    let registry = BreakerRegistry::new(BreakerConfig {
        failure_threshold: 2,
        reset_timeout: Duration::from_secs(60),
    });
    let policy = fast_policy(3);
    let calls = Arc::new(AtomicUsize::new(0));

    // First protected call: three attempts inside, one recorded failure.
    let first = always_failing_call(&registry, &policy, &calls).await;
    assert!(matches!(first, Err(ShieldError::Upstream { attempts: 3, .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    let snapshot = registry.state("upstream");
    assert_eq!(snapshot.state, CircuitState::Closed);
    assert_eq!(snapshot.failure_count, 1);

    // Second protected call trips the breaker.
    let second = always_failing_call(&registry, &policy, &calls).await;
    assert!(second.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 6);
    assert_eq!(registry.state("upstream").state, CircuitState::Open);

    // Third call is rejected before a single attempt runs.
    let third = always_failing_call(&registry, &policy, &calls).await;
    assert!(matches!(third, Err(ShieldError::BreakerOpen { .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn test_guard_success_path_passes_value_through() {
    let registry = BreakerRegistry::default();
    let out = guard::call(&registry, "healthy", &fast_policy(3), || async {
        Ok("pong".to_string())
    })
    .await;

    assert_eq!(out.unwrap(), "pong");
    assert_eq!(registry.state("healthy").state, CircuitState::Closed);
}

#[tokio::test]
async fn test_guard_retries_recover_before_breaker_notices() {
    let registry = BreakerRegistry::new(BreakerConfig {
        failure_threshold: 1,
        reset_timeout: Duration::from_secs(60),
    });
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    // Fails once, then succeeds: the inner retry absorbs the failure and the
    // breaker (threshold 1!) records only the overall success.
    let out = guard::call(&registry, "recovering", &fast_policy(3), move || {
        let counter = counter.clone();
        async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if n == 1 {
                Err(anyhow!("hiccup"))
            } else {
                Ok(n)
            }
        }
    })
    .await;

    assert_eq!(out.unwrap(), 2);
    let snapshot = registry.state("recovering");
    assert_eq!(snapshot.state, CircuitState::Closed);
    assert_eq!(snapshot.failure_count, 0);
}
