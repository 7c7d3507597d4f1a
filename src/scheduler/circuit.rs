//! Per-source timeouts and circuit breakers

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::SourceConfig;
use crate::market::SourceError;
use crate::telemetry::{record_latency, record_source_failure, LatencyMetric};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    /// Cooldown elapsed; the next call is a trial
    HalfOpen,
}

/// Opens after `threshold` consecutive failures and stays open for `cooldown`
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    state: CircuitState,
    failures: u32,
    threshold: u32,
    cooldown: Duration,
    opened_at: Option<Instant>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            state: CircuitState::Closed,
            failures: 0,
            threshold: threshold.max(1),
            cooldown,
            opened_at: None,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Whether a call may go out at `now`; moves Open to HalfOpen after the cooldown
    pub fn allow(&mut self, now: Instant) -> bool {
        match self.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let cooled = self
                    .opened_at
                    .is_some_and(|at| now.saturating_duration_since(at) >= self.cooldown);
                if cooled {
                    self.state = CircuitState::HalfOpen;
                }
                cooled
            }
        }
    }

    pub fn record_success(&mut self) {
        self.failures = 0;
        self.state = CircuitState::Closed;
        self.opened_at = None;
    }

    pub fn record_failure(&mut self, now: Instant) {
        self.failures = self.failures.saturating_add(1);
        // a failed trial call reopens straight away
        if self.state == CircuitState::HalfOpen || self.failures >= self.threshold {
            self.state = CircuitState::Open;
            self.opened_at = Some(now);
        }
    }
}

/// Source-health report entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceHealth {
    pub source: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub total_failures: u64,
    pub last_error: Option<String>,
    pub last_success: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct GuardState {
    breaker: CircuitBreaker,
    total_failures: u64,
    last_error: Option<String>,
    last_success: Option<DateTime<Utc>>,
}

/// Wraps every call to one external source with a timeout and a breaker
#[derive(Debug)]
pub struct SourceGuard {
    name: String,
    timeout: Duration,
    inner: Mutex<GuardState>,
}

impl SourceGuard {
    pub fn new(name: impl Into<String>, timeout: Duration, threshold: u32, cooldown: Duration) -> Self {
        Self {
            name: name.into(),
            timeout,
            inner: Mutex::new(GuardState {
                breaker: CircuitBreaker::new(threshold, cooldown),
                total_failures: 0,
                last_error: None,
                last_success: None,
            }),
        }
    }

    pub fn from_config(name: impl Into<String>, config: &SourceConfig) -> Self {
        Self::new(name, config.timeout(), config.failure_threshold, config.cooldown())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run `call` unless the breaker is open; a timeout counts as a failure
    pub async fn call<T, F>(&self, call: F) -> Result<T, SourceError>
    where
        F: Future<Output = Result<T, SourceError>>,
    {
        if !self.lock().breaker.allow(Instant::now()) {
            return Err(SourceError::CircuitOpen(self.name.clone()));
        }

        let start = Instant::now();
        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout {
                source_name: self.name.clone(),
                timeout: self.timeout,
            }),
        };
        record_latency(LatencyMetric::SourceFetch, start.elapsed());

        let mut inner = self.lock();
        match &result {
            Ok(_) => {
                if inner.breaker.state() != CircuitState::Closed {
                    tracing::info!(source = %self.name, "Source recovered, circuit closed");
                }
                inner.breaker.record_success();
                inner.last_success = Some(Utc::now());
            }
            Err(e) => {
                inner.breaker.record_failure(Instant::now());
                inner.total_failures += 1;
                inner.last_error = Some(e.to_string());
                record_source_failure(&self.name);

                if inner.breaker.state() == CircuitState::Open {
                    tracing::warn!(
                        source = %self.name,
                        failures = inner.breaker.failures(),
                        error = %e,
                        "Circuit opened"
                    );
                } else {
                    tracing::warn!(source = %self.name, error = %e, "Source call failed");
                }
            }
        }
        result
    }

    pub fn health(&self) -> SourceHealth {
        let inner = self.lock();
        SourceHealth {
            source: self.name.clone(),
            state: inner.breaker.state(),
            consecutive_failures: inner.breaker.failures(),
            total_failures: inner.total_failures,
            last_error: inner.last_error.clone(),
            last_success: inner.last_success,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GuardState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_opens_on_threshold() {
        let now = Instant::now();
        let mut cb = CircuitBreaker::new(3, Duration::from_secs(60));
        assert!(cb.allow(now));
        cb.record_failure(now);
        cb.record_failure(now);
        assert!(cb.allow(now));
        cb.record_failure(now);
        assert!(!cb.allow(now));
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn test_cooldown_then_trial_call() {
        let now = Instant::now();
        let mut cb = CircuitBreaker::new(1, Duration::from_secs(60));
        cb.record_failure(now);
        assert!(!cb.allow(now + Duration::from_secs(59)));
        assert!(cb.allow(now + Duration::from_secs(60)));
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        cb.record_failure(now + Duration::from_secs(61));
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allow(now + Duration::from_secs(62)));

        assert!(cb.allow(now + Duration::from_secs(121)));
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.failures(), 0);
    }

    #[tokio::test]
    async fn test_guard_times_out_and_opens() {
        let guard = SourceGuard::new("slow", Duration::from_millis(10), 2, Duration::from_secs(300));
        for _ in 0..2 {
            let result: Result<(), _> = guard
                .call(async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(())
                })
                .await;
            assert!(matches!(result, Err(SourceError::Timeout { .. })));
        }

        let result = guard.call(async { Ok(1) }).await;
        assert!(matches!(result, Err(SourceError::CircuitOpen(_))));

        let health = guard.health();
        assert_eq!(health.state, CircuitState::Open);
        assert_eq!(health.total_failures, 2);
        assert!(health.last_success.is_none());
    }

    #[tokio::test]
    async fn test_guard_success_resets() {
        let guard = SourceGuard::new("ok", Duration::from_secs(1), 3, Duration::from_secs(300));
        let _ = guard
            .call(async { Err::<(), _>(SourceError::Transport("boom".to_string())) })
            .await;
        assert_eq!(guard.health().consecutive_failures, 1);

        assert_eq!(guard.call(async { Ok(7) }).await.unwrap(), 7);
        let health = guard.health();
        assert_eq!(health.consecutive_failures, 0);
        assert_eq!(health.state, CircuitState::Closed);
        assert_eq!(health.last_error.as_deref(), Some("boom"));
    }
}
