use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tradewire::core::resilience::{
    Decorator, PolicyRegistry, RateLimiter, RateLimiterConfig, ResilienceSpec, RetryConfig,
    DEFAULT,
};
use tradewire::{ExchangeError, FailureKind};

fn io_failure(attempt: usize) -> ExchangeError {
    ExchangeError::network(FailureKind::Io, format!("connection reset on attempt {}", attempt))
}

#[tokio::test(start_paused = true)]
async fn test_retry_succeeds_on_third_invocation_after_growing_backoff() {
    let registry = PolicyRegistry::new_default();
    let invocations = Mutex::new(Vec::new());

    let result = Decorator::decorate(ResilienceSpec::default(), || async {
        let attempt = {
            let mut invocations = invocations.lock().unwrap();
            invocations.push(Instant::now());
            invocations.len()
        };
        if attempt < 3 {
            Err(io_failure(attempt))
        } else {
            Ok("filled")
        }
    })
    .with_retry(registry.retry(DEFAULT))
    .call()
    .await;

    assert_eq!(result.unwrap(), "filled");
    let invocations = invocations.into_inner().unwrap();
    assert_eq!(invocations.len(), 3);
    let first_wait = invocations[1] - invocations[0];
    let second_wait = invocations[2] - invocations[1];
    assert!(first_wait >= Duration::from_millis(50));
    assert!(second_wait >= Duration::from_millis(200));
    assert!(second_wait > first_wait);
}

#[tokio::test(start_paused = true)]
async fn test_retry_disabled_invokes_once() {
    let registry = PolicyRegistry::new_default();
    let calls = AtomicUsize::new(0);
    let spec = ResilienceSpec {
        retry_enabled: false,
        rate_limiter_enabled: true,
    };

    let result = Decorator::decorate(spec, || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Err::<(), _>(io_failure(1))
    })
    .with_retry(registry.retry(DEFAULT))
    .call()
    .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_non_retryable_failure_surfaces_unchanged() {
    let registry = PolicyRegistry::new_default();
    let calls = AtomicUsize::new(0);

    let result = Decorator::decorate(ResilienceSpec::default(), || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Err::<(), _>(ExchangeError::AuthError("Signature for this request is not valid".to_string()))
    })
    .with_retry(registry.retry(DEFAULT))
    .call()
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    match result {
        Err(ExchangeError::AuthError(message)) => {
            assert_eq!(message, "Signature for this request is not valid");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_surface_last_failure() {
    let registry = PolicyRegistry::new_default();
    let calls = AtomicUsize::new(0);

    let result = Decorator::decorate(ResilienceSpec::default(), || async {
        let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
        Err::<(), _>(io_failure(attempt))
    })
    .with_retry(registry.retry(DEFAULT))
    .call()
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    match result {
        Err(ExchangeError::NetworkError { kind, message }) => {
            assert_eq!(kind, FailureKind::Io);
            assert_eq!(message, "connection reset on attempt 3");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_non_idempotent_policy_does_not_retry_server_errors() {
    let registry = PolicyRegistry::new_default();
    let calls = AtomicUsize::new(0);

    let result = Decorator::decorate(ResilienceSpec::default(), || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Err::<(), _>(ExchangeError::from_status(500, "Internal error"))
    })
    .with_retry(registry.retry_with_config("placeOrder", "nonIdempotentCallsBase"))
    .call()
    .await;

    assert!(matches!(result, Err(ExchangeError::ServerError { status: 500, .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_inside_limiter_charges_one_permit_per_call() {
    let registry = PolicyRegistry::new_default();
    let limiter = Arc::new(RateLimiter::new(
        "orders",
        RateLimiterConfig::new(10, Duration::from_secs(60)),
    ));
    let calls = AtomicUsize::new(0);

    let result = Decorator::decorate(ResilienceSpec::default(), || async {
        let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt < 3 {
            Err(io_failure(attempt))
        } else {
            Ok(attempt)
        }
    })
    .with_retry(registry.retry(DEFAULT))
    .with_rate_limiter(limiter.clone())
    .call()
    .await;

    assert_eq!(result.unwrap(), 3);
    assert_eq!(limiter.available_permits().await, 9);
}

#[tokio::test(start_paused = true)]
async fn test_limiter_inside_retry_charges_every_attempt() {
    let registry = PolicyRegistry::new_default();
    let limiter = Arc::new(RateLimiter::new(
        "orders",
        RateLimiterConfig::new(10, Duration::from_secs(60)),
    ));
    let calls = AtomicUsize::new(0);

    let result = Decorator::decorate(ResilienceSpec::default(), || async {
        let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt < 3 {
            Err(io_failure(attempt))
        } else {
            Ok(attempt)
        }
    })
    .with_rate_limiter(limiter.clone())
    .with_retry(registry.retry(DEFAULT))
    .call()
    .await;

    assert_eq!(result.unwrap(), 3);
    assert_eq!(limiter.available_permits().await, 7);
}

#[tokio::test(start_paused = true)]
async fn test_limiter_timeout_skips_work_and_is_not_retried() {
    let registry = PolicyRegistry::new_default();
    let limiter = Arc::new(RateLimiter::new(
        "strict",
        RateLimiterConfig::new(1, Duration::from_secs(60)).with_timeout(Duration::from_secs(1)),
    ));
    let calls = AtomicUsize::new(0);
    let work = || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<(), ExchangeError>(())
    };

    Decorator::decorate(ResilienceSpec::default(), work)
        .with_rate_limiter(limiter.clone())
        .with_retry(registry.retry(DEFAULT))
        .call()
        .await
        .unwrap();

    let started = Instant::now();
    let second = Decorator::decorate(ResilienceSpec::default(), work)
        .with_rate_limiter(limiter.clone())
        .with_retry(registry.retry(DEFAULT))
        .call()
        .await;

    match second {
        Err(error @ ExchangeError::RateLimitExceeded { .. }) => {
            assert_eq!(error.kind(), FailureKind::RateLimitExceeded);
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    // gave up without sleeping through the window or backing off
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limiter_disabled_skips_acquisition() {
    let limiter = Arc::new(RateLimiter::new(
        "unused",
        RateLimiterConfig::new(1, Duration::from_secs(60)),
    ));
    let spec = ResilienceSpec {
        retry_enabled: true,
        rate_limiter_enabled: false,
    };

    for _ in 0..3 {
        Decorator::decorate(spec, || async { Ok::<(), ExchangeError>(()) })
            .with_rate_limiter(limiter.clone())
            .call()
            .await
            .unwrap();
    }
    assert_eq!(limiter.available_permits().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_aborts_permit_wait() {
    let limiter = Arc::new(RateLimiter::new(
        "slow",
        RateLimiterConfig::new(1, Duration::from_secs(10)).with_timeout(Duration::from_secs(30)),
    ));
    assert!(limiter.try_acquire(1).await);

    let calls = AtomicUsize::new(0);
    let result = Decorator::decorate(ResilienceSpec::default(), || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<(), ExchangeError>(())
    })
    .with_rate_limiter(limiter)
    .with_timeout(Duration::from_secs(2))
    .call()
    .await;

    assert!(matches!(result, Err(ExchangeError::DeadlineExceeded)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_registry_lookups_are_stable() {
    let registry = PolicyRegistry::new_default();
    registry
        .register_retry_policy("marketData", RetryConfig::idempotent())
        .unwrap();
    registry
        .register_rate_limiter(
            "kraken",
            RateLimiterConfig::new(90, Duration::from_secs(60)),
        )
        .unwrap();

    let first = registry.retry("marketData");
    let second = registry.retry("marketData");
    assert_eq!(first.config(), second.config());
    assert!(Arc::ptr_eq(&first, &second));

    let first = registry.rate_limiter("kraken");
    let second = registry.rate_limiter("kraken");
    assert_eq!(first.config(), second.config());
    assert!(Arc::ptr_eq(&first, &second));
}
