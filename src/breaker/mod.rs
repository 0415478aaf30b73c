//! Per-dependency circuit breakers.
//!
//! # Data Flow
//! ```text
//! Caller request:
//!     → registry.get("github_api") (lazy create)
//!     → breaker.call(async op)
//!         Closed:    run op, count classified failures
//!         Open:      reject fast until recovery timeout elapses
//!         HalfOpen:  probe; successes close, any classified failure reopens
//! ```
//!
//! # Design Decisions
//! - Only classified failures (timeouts + errors matching the configured
//!   classifier) move the state machine; anything else propagates untouched
//! - Every call is bounded by `call_timeout`; a timeout is a classified failure
//! - Retry policy belongs to the caller, not the breaker

pub mod registry;

pub use registry::BreakerRegistry;

use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::observability::metrics;
use crate::unix_now;

/// Decides whether an error counts toward the failure threshold.
///
/// Errors rejected by the classifier indicate a caller bug rather than
/// dependency degradation and must not move the state machine.
pub type FailureClassifier =
    Arc<dyn Fn(&(dyn std::error::Error + 'static)) -> bool + Send + Sync>;

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Normal operation, calls run.
    Closed,
    /// Failing fast, calls rejected.
    Open,
    /// Probing whether the dependency recovered.
    HalfOpen,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Closed => write!(f, "closed"),
            State::Open => write!(f, "open"),
            State::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Immutable breaker configuration.
#[derive(Clone)]
pub struct BreakerConfig {
    /// Consecutive classified failures before the circuit opens.
    pub failure_threshold: u32,

    /// How long the circuit stays open before admitting a probe.
    pub recovery_timeout: Duration,

    /// Consecutive probe successes before the circuit closes.
    pub success_threshold: u32,

    /// Deadline applied to every wrapped call.
    pub call_timeout: Duration,

    /// Which errors count as dependency failures.
    pub classifier: FailureClassifier,
}

impl std::fmt::Debug for BreakerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BreakerConfig")
            .field("failure_threshold", &self.failure_threshold)
            .field("recovery_timeout", &self.recovery_timeout)
            .field("success_threshold", &self.success_threshold)
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            success_threshold: 3,
            call_timeout: Duration::from_secs(30),
            classifier: Arc::new(|_| true),
        }
    }
}

impl BreakerConfig {
    /// Preset for the source-forge (pull request) API: fails fast, recovers
    /// quickly since outages there block every tool.
    pub fn forge_api() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
            call_timeout: Duration::from_secs(15),
            ..Self::default()
        }
    }

    /// Preset for cloud control-plane calls.
    pub fn cloud_api() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            success_threshold: 3,
            call_timeout: Duration::from_secs(30),
            ..Self::default()
        }
    }

    /// Preset for model inference calls, which are slow but worth waiting for.
    pub fn inference_api() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(45),
            success_threshold: 2,
            call_timeout: Duration::from_secs(60),
            ..Self::default()
        }
    }
}

impl From<&crate::config::BreakerSettings> for BreakerConfig {
    fn from(settings: &crate::config::BreakerSettings) -> Self {
        Self {
            failure_threshold: settings.failure_threshold,
            recovery_timeout: Duration::from_secs(settings.recovery_timeout_secs),
            success_threshold: settings.success_threshold,
            call_timeout: Duration::from_secs(settings.call_timeout_secs),
            ..Self::default()
        }
    }
}

/// Error returned by [`CircuitBreaker::call`].
#[derive(Debug, Error)]
pub enum BreakerError<E>
where
    E: std::error::Error + 'static,
{
    /// The circuit is open and the call was rejected without running.
    #[error("circuit breaker '{name}' is open")]
    Open { name: String },

    /// The wrapped call exceeded `call_timeout`.
    #[error("circuit breaker '{name}' call timed out after {timeout:?}")]
    Timeout { name: String, timeout: Duration },

    /// The wrapped call itself failed.
    #[error(transparent)]
    Inner(E),
}

/// Read-only view of a breaker for observability.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: State,
    pub failure_count: u32,
    pub success_count: u32,
    pub last_failure_unix: Option<u64>,
    pub last_success_unix: Option<u64>,
}

#[derive(Debug)]
struct Inner {
    state: State,
    failure_count: u32,
    success_count: u32,
    last_failure_at: Option<Instant>,
    last_failure_unix: Option<u64>,
    last_success_unix: Option<u64>,
}

/// Failure/success state machine guarding one named dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                state: State::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_at: None,
                last_failure_unix: None,
                last_success_unix: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execute `op` under breaker protection.
    ///
    /// Rejected immediately while the circuit is open; otherwise the call runs
    /// with `call_timeout` enforced. A timeout or a classified error counts
    /// toward the failure threshold; unclassified errors propagate without
    /// touching breaker state.
    pub async fn call<F, T, E>(&self, op: F) -> Result<T, BreakerError<E>>
    where
        F: Future<Output = Result<T, E>>,
        E: std::error::Error + 'static,
    {
        self.admit()?;

        match tokio::time::timeout(self.config.call_timeout, op).await {
            Ok(Ok(value)) => {
                self.on_success();
                Ok(value)
            }
            Ok(Err(err)) => {
                if (self.config.classifier)(&err) {
                    self.on_failure();
                } else {
                    tracing::warn!(
                        breaker = %self.name,
                        error = %err,
                        "Unclassified error passed through breaker"
                    );
                }
                Err(BreakerError::Inner(err))
            }
            Err(_) => {
                self.on_failure();
                Err(BreakerError::Timeout {
                    name: self.name.clone(),
                    timeout: self.config.call_timeout,
                })
            }
        }
    }

    /// Current state, after applying the Open → HalfOpen recovery transition.
    pub fn state(&self) -> State {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        self.maybe_enter_half_open(&mut inner);
        inner.state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            last_failure_unix: inner.last_failure_unix,
            last_success_unix: inner.last_success_unix,
        }
    }

    /// Gate a call: reject while Open, admit a probe once the recovery
    /// timeout has elapsed.
    fn admit<E: std::error::Error + 'static>(&self) -> Result<(), BreakerError<E>> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        self.maybe_enter_half_open(&mut inner);
        if inner.state == State::Open {
            metrics::record_breaker_rejection(&self.name);
            return Err(BreakerError::Open {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    fn maybe_enter_half_open(&self, inner: &mut Inner) {
        if inner.state != State::Open {
            return;
        }
        let elapsed = inner
            .last_failure_at
            .map(|at| at.elapsed() >= self.config.recovery_timeout)
            .unwrap_or(true);
        if elapsed {
            self.transition(inner, State::HalfOpen);
            inner.success_count = 0;
        }
    }

    fn on_success(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.last_success_unix = Some(unix_now());

        match inner.state {
            State::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    self.transition(&mut inner, State::Closed);
                    inner.failure_count = 0;
                    inner.success_count = 0;
                }
            }
            // A single success while closed means the dependency is fine;
            // non-consecutive failures must never trip the breaker.
            _ => inner.failure_count = 0,
        }
    }

    fn on_failure(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.last_failure_at = Some(Instant::now());
        inner.last_failure_unix = Some(unix_now());

        match inner.state {
            State::HalfOpen => {
                inner.success_count = 0;
                self.transition(&mut inner, State::Open);
            }
            State::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.config.failure_threshold {
                    self.transition(&mut inner, State::Open);
                }
            }
            State::Open => {}
        }
    }

    fn transition(&self, inner: &mut Inner, to: State) {
        if inner.state == to {
            return;
        }
        tracing::info!(
            breaker = %self.name,
            from = %inner.state,
            to = %to,
            failures = inner.failure_count,
            "Circuit breaker state transition"
        );
        metrics::record_breaker_transition(&self.name, to);
        inner.state = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    enum TestError {
        #[error("dependency down")]
        Dependency,
        #[error("caller bug")]
        Bug,
    }

    fn quick_config() -> BreakerConfig {
        BreakerConfig {
            failure_threshold: 3,
            recovery_timeout: Duration::from_millis(50),
            success_threshold: 2,
            call_timeout: Duration::from_millis(200),
            classifier: Arc::new(|e| e.to_string() == "dependency down"),
        }
    }

    async fn fail(cb: &CircuitBreaker) {
        let _ = cb.call(async { Err::<(), _>(TestError::Dependency) }).await;
    }

    async fn succeed(cb: &CircuitBreaker) {
        cb.call(async { Ok::<_, TestError>(()) }).await.unwrap();
    }

    #[tokio::test]
    async fn opens_after_consecutive_failures() {
        let cb = CircuitBreaker::new("t", quick_config());
        for _ in 0..3 {
            fail(&cb).await;
        }
        assert_eq!(cb.state(), State::Open);

        let result = cb.call(async { Ok::<_, TestError>(()) }).await;
        assert!(matches!(result, Err(BreakerError::Open { .. })));
    }

    #[tokio::test]
    async fn success_resets_failure_count() {
        let cb = CircuitBreaker::new("t", quick_config());
        fail(&cb).await;
        fail(&cb).await;
        succeed(&cb).await;
        fail(&cb).await;
        fail(&cb).await;
        assert_eq!(cb.state(), State::Closed);
    }

    #[tokio::test]
    async fn unclassified_errors_do_not_count() {
        let cb = CircuitBreaker::new("t", quick_config());
        for _ in 0..5 {
            let _ = cb.call(async { Err::<(), _>(TestError::Bug) }).await;
        }
        assert_eq!(cb.state(), State::Closed);
        assert_eq!(cb.snapshot().failure_count, 0);
    }

    #[tokio::test]
    async fn recovery_timeout_admits_probe() {
        let cb = CircuitBreaker::new("t", quick_config());
        for _ in 0..3 {
            fail(&cb).await;
        }
        assert!(matches!(
            cb.call(async { Ok::<_, TestError>(()) }).await,
            Err(BreakerError::Open { .. })
        ));

        tokio::time::sleep(Duration::from_millis(80)).await;
        // Probe is admitted and succeeds.
        succeed(&cb).await;
        assert_eq!(cb.state(), State::HalfOpen);
        succeed(&cb).await;
        assert_eq!(cb.state(), State::Closed);
        assert_eq!(cb.snapshot().failure_count, 0);
        assert_eq!(cb.snapshot().success_count, 0);
    }

    #[tokio::test]
    async fn half_open_failure_reopens() {
        let cb = CircuitBreaker::new("t", quick_config());
        for _ in 0..3 {
            fail(&cb).await;
        }
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(cb.state(), State::HalfOpen);

        fail(&cb).await;
        assert_eq!(cb.state(), State::Open);
        assert_eq!(cb.snapshot().success_count, 0);
    }

    #[tokio::test]
    async fn timeout_is_a_classified_failure() {
        let mut config = quick_config();
        config.failure_threshold = 1;
        config.call_timeout = Duration::from_millis(20);
        let cb = CircuitBreaker::new("t", config);

        let result = cb
            .call(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, TestError>(())
            })
            .await;
        assert!(matches!(result, Err(BreakerError::Timeout { .. })));
        assert_eq!(cb.state(), State::Open);
    }
}
