//! Provisioning poller
//!
//! Many Confluent Cloud objects provision asynchronously: the create call
//! returns at once and the object's status moves through `PROVISIONING`
//! before it settles. The poller re-fetches the object at a fixed interval
//! until it reaches a terminal status, disappears, or the wait times out.

use crate::error::ProviderError;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::{Duration, Instant};

/// Repeatedly call `check` until `is_terminal` holds for its result.
///
/// The first check runs immediately. Between checks the poller sleeps
/// `interval`. Once `timeout` has elapsed without a terminal result the
/// returned error is a [`ProviderError::Timeout`] carrying the last
/// observed status (rendered with `describe`). Errors from `check` abort
/// the wait.
pub async fn wait_until_terminal<S, F, Fut, P, D>(
    mut check: F,
    is_terminal: P,
    describe: D,
    interval: Duration,
    timeout: Duration,
) -> Result<S, WaitTimedOut>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<S, ProviderError>>,
    P: Fn(&S) -> bool,
    D: Fn(&S) -> String,
{
    let started = Instant::now();
    let mut checks = 0u32;

    loop {
        let state = check().await.map_err(WaitTimedOut::Check)?;
        checks += 1;

        if is_terminal(&state) {
            tracing::debug!("Terminal status after {} checks ({:?})", checks, started.elapsed());
            return Ok(state);
        }

        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return Err(WaitTimedOut::Elapsed {
                last_status: Some(describe(&state)),
                elapsed,
            });
        }

        tracing::trace!("Status {} not terminal, retrying in {:?}", describe(&state), interval);
        tokio::time::sleep(interval.min(timeout - elapsed)).await;
    }
}

/// Why [`wait_until_terminal`] gave up
#[derive(Debug)]
pub enum WaitTimedOut {
    /// The check itself failed
    Check(ProviderError),
    /// The timeout elapsed
    Elapsed {
        last_status: Option<String>,
        elapsed: Duration,
    },
}

/// What a provisioning wait is waiting for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Any of these statuses
    Statuses(&'static [&'static str]),
    /// The object no longer exists (delete flows)
    Gone,
}

impl Target {
    fn describe(&self) -> String {
        match self {
            Self::Statuses(statuses) => statuses.join(" or "),
            Self::Gone => "deletion".to_string(),
        }
    }
}

/// One observation of a provisioning object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Current status and, for failures, the server's explanation
    Status { status: String, detail: Option<String> },
    /// 404/403
    NotFound,
}

impl Observation {
    pub fn status(status: impl Into<String>) -> Self {
        Self::Status {
            status: status.into(),
            detail: None,
        }
    }

    pub fn failed(status: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Status {
            status: status.into(),
            detail: Some(detail.into()),
        }
    }

    /// Turn the result of a lookup into an observation; not-found errors
    /// become [`Observation::NotFound`], other errors pass through.
    pub fn from_lookup<T>(
        lookup: Result<T, ProviderError>,
        observe: impl FnOnce(T) -> Observation,
    ) -> Result<Observation, ProviderError> {
        match lookup {
            Ok(found) => Ok(observe(found)),
            Err(e) if e.is_not_found() => Ok(Self::NotFound),
            Err(e) => Err(e),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Status { status, .. } => status.clone(),
            Self::NotFound => "NOT_FOUND".to_string(),
        }
    }
}

/// Description of one asynchronous provisioning wait
#[derive(Debug, Clone)]
pub struct ProvisioningHandle {
    /// Human name used in messages ("Kafka Cluster")
    pub kind: &'static str,
    pub resource_id: String,
    /// Scoping ids, e.g. `environment` → `env-123`
    pub parent_ids: BTreeMap<&'static str, String>,
    pub pending: &'static [&'static str],
    pub target: Target,
    pub failed: &'static [&'static str],
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl ProvisioningHandle {
    pub fn new(kind: &'static str, resource_id: &str, target: Target) -> Self {
        Self {
            kind,
            resource_id: resource_id.to_string(),
            parent_ids: BTreeMap::new(),
            pending: &[],
            target,
            failed: &[],
            poll_interval: Duration::from_secs(10),
            timeout: Duration::from_secs(60 * 60),
        }
    }

    pub fn parent(mut self, key: &'static str, id: &str) -> Self {
        self.parent_ids.insert(key, id.to_string());
        self
    }

    pub fn pending(mut self, statuses: &'static [&'static str]) -> Self {
        self.pending = statuses;
        self
    }

    pub fn failed(mut self, statuses: &'static [&'static str]) -> Self {
        self.failed = statuses;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn is_terminal(&self, observation: &Observation) -> bool {
        match observation {
            Observation::NotFound => true,
            Observation::Status { status, .. } => !self.pending.contains(&status.as_str()),
        }
    }

    /// Poll `refresh` until the object reaches the target.
    ///
    /// Returns the final status (`"DELETED"` for [`Target::Gone`]). A
    /// failure status is a [`ProviderError::ProvisioningFailed`]; a status
    /// outside the pending, target and failed sets is reported the same
    /// way. Disappearing while waiting for a status is
    /// [`ProviderError::NotFound`].
    pub async fn wait<F, Fut>(&self, refresh: F) -> Result<String, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Observation, ProviderError>>,
    {
        tracing::info!(
            kind = self.kind,
            id = %self.resource_id,
            parents = ?self.parent_ids,
            "Waiting for {} {:?} to reach {}",
            self.kind,
            self.resource_id,
            self.target.describe()
        );

        let observation = wait_until_terminal(
            refresh,
            |o| self.is_terminal(o),
            Observation::describe,
            self.poll_interval,
            self.timeout,
        )
        .await
        .map_err(|e| match e {
            WaitTimedOut::Check(err) => err,
            WaitTimedOut::Elapsed { last_status, elapsed } => ProviderError::Timeout {
                kind: self.kind.to_string(),
                id: self.resource_id.clone(),
                target: self.target.describe(),
                last_status,
                elapsed,
            },
        })?;

        match (&self.target, observation) {
            (Target::Gone, Observation::NotFound) => {
                tracing::info!("{} {:?} has been deleted", self.kind, self.resource_id);
                Ok("DELETED".to_string())
            }
            (Target::Statuses(_), Observation::NotFound) => Err(ProviderError::NotFound {
                resource_type: self.kind.to_string(),
                id: self.resource_id.clone(),
            }),
            (target, Observation::Status { status, detail }) => {
                let reached = matches!(target, Target::Statuses(ok) if ok.contains(&status.as_str()));
                if reached {
                    tracing::info!("{} {:?} reached {}", self.kind, self.resource_id, status);
                    return Ok(status);
                }

                let detail = if self.failed.contains(&status.as_str()) {
                    detail.unwrap_or_else(|| "provisioning failed".to_string())
                } else {
                    format!("unexpected status, expected {}", self.target.describe())
                };
                Err(ProviderError::ProvisioningFailed {
                    kind: self.kind.to_string(),
                    id: self.resource_id.clone(),
                    status,
                    detail,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Serve observations from a script, repeating the last one
    fn script(statuses: &[&str]) -> (Mutex<Vec<Observation>>, AtomicUsize) {
        let observations = statuses
            .iter()
            .rev()
            .map(|s| match *s {
                "404" => Observation::NotFound,
                s => Observation::status(s),
            })
            .collect();
        (Mutex::new(observations), AtomicUsize::new(0))
    }

    fn next(state: &(Mutex<Vec<Observation>>, AtomicUsize)) -> Observation {
        state.1.fetch_add(1, Ordering::SeqCst);
        let mut remaining = state.0.lock().unwrap();
        if remaining.len() > 1 {
            remaining.pop().unwrap()
        } else {
            remaining[0].clone()
        }
    }

    fn cluster_handle() -> ProvisioningHandle {
        ProvisioningHandle::new("Kafka Cluster", "lkc-1", Target::Statuses(&["PROVISIONED"]))
            .parent("environment", "env-1")
            .pending(&["PROVISIONING"])
            .failed(&["FAILED"])
            .interval(Duration::ZERO)
            .timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_terminal_after_exactly_three_checks() {
        let state = script(&["PROVISIONING", "PROVISIONING", "PROVISIONED"]);
        let status = cluster_handle()
            .wait(|| {
                let observation = next(&state);
                async move { Ok(observation) }
            })
            .await
            .unwrap();

        assert_eq!(status, "PROVISIONED");
        assert_eq!(state.1.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_generic_wait_returns_terminal_value() {
        let calls = AtomicUsize::new(0);
        let value = wait_until_terminal(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok(n) }
            },
            |n| *n == 2,
            |n| n.to_string(),
            Duration::ZERO,
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        assert_eq!(value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_never_terminal_times_out() {
        let state = script(&["PROVISIONING"]);
        let err = cluster_handle()
            .interval(Duration::from_millis(5))
            .timeout(Duration::from_millis(40))
            .wait(|| {
                let observation = next(&state);
                async move { Ok(observation) }
            })
            .await
            .unwrap_err();

        match err {
            ProviderError::Timeout { last_status, elapsed, .. } => {
                assert_eq!(last_status.as_deref(), Some("PROVISIONING"));
                assert!(elapsed >= Duration::from_millis(40));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(state.1.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_failed_status_is_an_error_not_a_timeout() {
        let err = cluster_handle()
            .wait(|| async { Ok(Observation::failed("FAILED", "quota exceeded")) })
            .await
            .unwrap_err();

        match err {
            ProviderError::ProvisioningFailed { status, detail, .. } => {
                assert_eq!(status, "FAILED");
                assert_eq!(detail, "quota exceeded");
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unexpected_status_is_reported() {
        let err = cluster_handle()
            .wait(|| async { Ok(Observation::status("EXPIRED")) })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unexpected status"));
    }

    #[tokio::test]
    async fn test_not_found_is_success_for_delete() {
        let state = script(&["DEPROVISIONING", "404"]);
        let handle = ProvisioningHandle::new("Private Link Attachment", "platt-1", Target::Gone)
            .pending(&["DEPROVISIONING", "READY"])
            .interval(Duration::ZERO);

        let status = handle
            .wait(|| {
                let observation = next(&state);
                async move { Ok(observation) }
            })
            .await
            .unwrap();
        assert_eq!(status, "DELETED");
    }

    #[tokio::test]
    async fn test_not_found_while_provisioning_is_an_error() {
        let err = cluster_handle()
            .wait(|| async { Ok(Observation::NotFound) })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_check_error_aborts() {
        let err = cluster_handle()
            .wait(|| async { Err(ProviderError::validation("boom")) })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_from_lookup_folds_not_found() {
        let gone: Result<&str, _> = Err(ProviderError::NotFound {
            resource_type: "Kafka Cluster".to_string(),
            id: "lkc-1".to_string(),
        });
        assert_eq!(
            Observation::from_lookup(gone, Observation::status).unwrap(),
            Observation::NotFound
        );

        let found: Result<&str, ProviderError> = Ok("PROVISIONED");
        assert_eq!(
            Observation::from_lookup(found, Observation::status).unwrap(),
            Observation::status("PROVISIONED")
        );

        let broken: Result<&str, _> = Err(ProviderError::validation("boom"));
        assert!(Observation::from_lookup(broken, Observation::status).is_err());
    }
}
