use super::rate_limiter::RateLimiter;
use super::retry::RetryPolicy;
use super::ResilienceSpec;
use crate::core::errors::ExchangeError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tokio_retry::RetryIf;
use tracing::warn;

type BoxedCall<'a, T> = Pin<Box<dyn Future<Output = Result<T, ExchangeError>> + Send + 'a>>;

/// One policy wrapped around the unit of work.
#[derive(Debug, Clone)]
pub enum Decoration {
    Retry(Arc<RetryPolicy>),
    RateLimiter {
        limiter: Arc<RateLimiter>,
        permits: u32,
    },
}

/// The decorations that actually apply once the [`ResilienceSpec`] has been
/// consulted, innermost first.
#[derive(Debug, Clone, Default)]
pub struct DecorationPlan {
    layers: Vec<Decoration>,
}

impl DecorationPlan {
    pub fn resolve(spec: ResilienceSpec, requested: &[Decoration]) -> Self {
        let layers = requested
            .iter()
            .filter(|decoration| match decoration {
                Decoration::Retry(_) => spec.retry_enabled,
                Decoration::RateLimiter { .. } => spec.rate_limiter_enabled,
            })
            .cloned()
            .collect();
        Self { layers }
    }

    pub fn layers(&self) -> &[Decoration] {
        &self.layers
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// Wraps one exchange call with retry and rate-limiting policies.
///
/// Each `with_*` call wraps everything added before it, so the usual chain
///
/// ```rust,no_run
/// # use tradewire::core::resilience::{Decorator, PolicyRegistry, ResilienceSpec};
/// # async fn example() -> Result<(), tradewire::ExchangeError> {
/// let registry = PolicyRegistry::new_default();
/// let work = || async { Ok::<_, tradewire::ExchangeError>(42_u64) };
/// let ticker = Decorator::decorate(ResilienceSpec::default(), work)
///     .with_retry(registry.retry("default"))
///     .with_rate_limiter(registry.rate_limiter("binance"))
///     .call()
///     .await?;
/// # Ok(())
/// # }
/// ```
///
/// takes one permit and then runs the whole retry loop under it: a logical
/// call costs one permit no matter how many attempts it makes. Reversing the
/// two calls charges a permit per attempt instead.
///
/// Setting a deadline bounds the whole call, including permit waits and
/// backoff sleeps. Dropping the returned future cancels it as well.
pub struct Decorator<W> {
    spec: ResilienceSpec,
    work: W,
    requested: Vec<Decoration>,
    deadline: Option<Instant>,
}

impl<W> Decorator<W> {
    pub fn decorate(spec: ResilienceSpec, work: W) -> Self {
        Self {
            spec,
            work,
            requested: Vec::new(),
            deadline: None,
        }
    }

    /// Retry the work wrapped so far. No-op when retries are disabled.
    #[must_use]
    pub fn with_retry(mut self, policy: Arc<RetryPolicy>) -> Self {
        self.requested.push(Decoration::Retry(policy));
        self
    }

    /// Take one permit before running the work wrapped so far. No-op when
    /// rate limiting is disabled.
    #[must_use]
    pub fn with_rate_limiter(self, limiter: Arc<RateLimiter>) -> Self {
        self.with_rate_limiter_permits(limiter, 1)
    }

    #[must_use]
    pub fn with_rate_limiter_permits(mut self, limiter: Arc<RateLimiter>, permits: u32) -> Self {
        self.requested
            .push(Decoration::RateLimiter { limiter, permits });
        self
    }

    /// Abort the call with [`ExchangeError::DeadlineExceeded`] at `deadline`.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn plan(&self) -> DecorationPlan {
        DecorationPlan::resolve(self.spec, &self.requested)
    }

    pub async fn call<T, Fut>(self) -> Result<T, ExchangeError>
    where
        W: Fn() -> Fut + Sync,
        Fut: Future<Output = Result<T, ExchangeError>> + Send,
        T: Send,
    {
        let plan = self.plan();
        let call = execute(plan.layers(), &self.work);
        match self.deadline {
            Some(deadline) => timeout_at(deadline, call)
                .await
                .map_err(|_| ExchangeError::DeadlineExceeded)?,
            None => call.await,
        }
    }
}

fn execute<'a, W, Fut, T>(layers: &'a [Decoration], work: &'a W) -> BoxedCall<'a, T>
where
    W: Fn() -> Fut + Sync,
    Fut: Future<Output = Result<T, ExchangeError>> + Send + 'a,
    T: Send + 'a,
{
    match layers.split_last() {
        None => Box::pin(work()),
        Some((Decoration::RateLimiter { limiter, permits }, inner)) => Box::pin(async move {
            limiter.acquire(*permits).await?;
            execute(inner, work).await
        }),
        Some((Decoration::Retry(policy), inner)) => {
            Box::pin(with_retry(policy, move || execute(inner, work)))
        }
    }
}

async fn with_retry<T, A, F>(policy: &RetryPolicy, action: A) -> Result<T, ExchangeError>
where
    A: FnMut() -> F,
    F: Future<Output = Result<T, ExchangeError>>,
{
    let max_attempts = policy.max_attempts().max(1);
    let waits = policy
        .backoff()
        .iter()
        .take(max_attempts.saturating_sub(1) as usize);

    let mut attempt = 0_u32;
    let condition = |error: &ExchangeError| {
        attempt += 1;
        let retryable = policy.is_retryable(error);
        if retryable && attempt < max_attempts {
            warn!(
                policy = %policy.name(),
                attempt,
                max_attempts,
                kind = %error.kind(),
                delay_ms = policy.backoff().interval(attempt).as_millis() as u64,
                error = %error,
                "Call failed, retrying"
            );
        }
        retryable
    };

    RetryIf::spawn(waits, action, condition).await
}
