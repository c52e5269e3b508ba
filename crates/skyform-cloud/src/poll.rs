//! Poll driver
//!
//! After a mutating call returns, the remote object converges on its own.
//! [`poll_until`] re-fetches it on a fixed interval until its status reaches
//! the target, turns into an error status, the deadline passes, or the
//! orchestrator cancels the operation.

use crate::action::Operation;
use crate::error::{CloudError, Result};
use crate::policy::RetryConfig;
use crate::sdk::ApiError;
use crate::status::{Classify, StatusClass};
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

/// How fetch errors are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    /// Create/update: wait for the target status, every fetch error is fatal
    Converge,
    /// Delete: "not found" means the object is gone
    ConfirmDeletion,
}

/// One observed state of the remote object
#[derive(Debug, Clone, PartialEq)]
pub struct Observation<D> {
    pub status: String,
    pub detail: D,
}

impl<D> Observation<D> {
    pub fn new(status: impl Into<String>, detail: D) -> Self {
        Self {
            status: status.into(),
            detail,
        }
    }
}

/// Terminal success of a poll session
#[derive(Debug, Clone, PartialEq)]
pub enum Settled<D> {
    /// The target status was observed (and the readiness gate passed)
    Reached(D),
    /// The object no longer exists
    Gone,
}

impl<D> Settled<D> {
    pub fn into_detail(self) -> Option<D> {
        match self {
            Settled::Reached(detail) => Some(detail),
            Settled::Gone => None,
        }
    }
}

/// Parameters of one bounded wait
#[derive(Debug, Clone)]
pub struct PollSession<'a> {
    pub kind: &'static str,
    pub handle: String,
    pub operation: Operation,
    pub target: &'a str,
    pub timeout: Duration,
    pub interval: Duration,
    pub mode: PollMode,
    pub transient_retry: Option<&'a RetryConfig>,
}

impl PollSession<'_> {
    fn cancelled(&self) -> CloudError {
        CloudError::Cancelled {
            kind: self.kind,
            handle: self.handle.clone(),
            operation: self.operation,
        }
    }

    fn api_failure(&self, source: ApiError) -> CloudError {
        CloudError::Api {
            kind: self.kind,
            handle: self.handle.clone(),
            operation: self.operation,
            source,
        }
    }

    fn remote_error(&self, status: String) -> CloudError {
        CloudError::RemoteError {
            kind: self.kind,
            handle: self.handle.clone(),
            operation: self.operation,
            status,
            target: self.target.to_string(),
        }
    }

    fn expired(&self, waited: Duration, last: Option<(String, StatusClass)>) -> CloudError {
        match last {
            Some((status, StatusClass::Unknown)) => CloudError::UnrecognizedStatus {
                kind: self.kind,
                handle: self.handle.clone(),
                operation: self.operation,
                status,
                target: self.target.to_string(),
            },
            last => CloudError::Timeout {
                kind: self.kind,
                handle: self.handle.clone(),
                operation: self.operation,
                target: self.target.to_string(),
                waited,
                last_status: last.map(|(status, _)| status),
            },
        }
    }
}

/// Poll `fetch` until the session reaches a terminal state
///
/// The first fetch happens immediately; later fetches are spaced by the
/// session interval. `ready` gates success on auxiliary flags of the detail
/// (e.g. parameters still being applied) once the status itself matches.
pub async fn poll_until<D, F, Fut, R>(
    cancel: &CancellationToken,
    session: &PollSession<'_>,
    classify: &dyn Classify,
    ready: R,
    mut fetch: F,
) -> Result<Settled<D>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<Observation<D>, ApiError>>,
    R: Fn(&D) -> bool,
{
    let started = Instant::now();
    let deadline = started + session.timeout;
    let mut last: Option<(String, StatusClass)> = None;
    let mut failures: u32 = 0;
    let mut tick: u32 = 0;

    loop {
        tick += 1;

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(session.cancelled()),
            fetched = fetch() => fetched,
        };

        let mut delay = session.interval;
        match fetched {
            Ok(observation) => {
                failures = 0;
                let class = classify.classify(&observation.status);
                tracing::debug!(
                    kind = session.kind,
                    handle = %session.handle,
                    status = %observation.status,
                    target = session.target,
                    %class,
                    tick,
                    "polled"
                );

                match class {
                    StatusClass::Success if ready(&observation.detail) => {
                        tracing::info!(
                            kind = session.kind,
                            handle = %session.handle,
                            status = %observation.status,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "{} reached target status",
                            session.operation
                        );
                        return Ok(Settled::Reached(observation.detail));
                    }
                    StatusClass::Success => {
                        tracing::debug!(
                            kind = session.kind,
                            handle = %session.handle,
                            "target status reached but resource is not ready yet"
                        );
                        last = Some((observation.status, StatusClass::Pending));
                    }
                    StatusClass::Error => return Err(session.remote_error(observation.status)),
                    StatusClass::Unknown => {
                        tracing::warn!(
                            kind = session.kind,
                            handle = %session.handle,
                            status = %observation.status,
                            "unrecognized status, continuing to poll"
                        );
                        last = Some((observation.status, class));
                    }
                    StatusClass::Pending => last = Some((observation.status, class)),
                }
            }
            Err(err) if session.mode == PollMode::ConfirmDeletion && err.is_not_found() => {
                tracing::info!(
                    kind = session.kind,
                    handle = %session.handle,
                    "resource is gone"
                );
                return Ok(Settled::Gone);
            }
            Err(err) => match session.transient_retry {
                Some(retry) if err.is_transient() && failures < retry.max_attempts => {
                    delay = retry.delay_for_attempt(failures);
                    failures += 1;
                    tracing::warn!(
                        kind = session.kind,
                        handle = %session.handle,
                        attempt = failures,
                        error = %err,
                        "transient fetch failure, retrying"
                    );
                }
                _ => return Err(session.api_failure(err)),
            },
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(session.expired(now - started, last));
        }

        let wake = (now + delay).min(deadline);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(session.cancelled()),
            _ = sleep_until(wake) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{ErrorMarker, StatusAlphabet};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    static ALPHABET: StatusAlphabet = StatusAlphabet::new(
        &["CREATING", "ACTIVE", "DELETING"],
        ErrorMarker::Exact("ERROR"),
    );

    type Script = Arc<Mutex<VecDeque<std::result::Result<(&'static str, bool), ApiError>>>>;

    /// Fetch closure replaying a script; the last entry repeats forever
    fn scripted(
        steps: Vec<std::result::Result<(&'static str, bool), ApiError>>,
    ) -> (
        Script,
        Arc<Mutex<u32>>,
        impl FnMut() -> std::future::Ready<std::result::Result<Observation<bool>, ApiError>>,
    ) {
        let script: Script = Arc::new(Mutex::new(steps.into_iter().collect()));
        let calls = Arc::new(Mutex::new(0u32));
        let (s, c) = (script.clone(), calls.clone());
        let fetch = move || {
            *c.lock().unwrap() += 1;
            let mut queue = s.lock().unwrap();
            let step = if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue.front().cloned().unwrap()
            };
            std::future::ready(step.map(|(status, pending)| Observation::new(status, pending)))
        };
        (script, calls, fetch)
    }

    fn session(mode: PollMode, timeout_ms: u64, interval_ms: u64) -> PollSession<'static> {
        PollSession {
            kind: "skyform_test",
            handle: "res-1".to_string(),
            operation: Operation::Create,
            target: "ACTIVE",
            timeout: Duration::from_millis(timeout_ms),
            interval: Duration::from_millis(interval_ms),
            mode,
            transient_retry: None,
        }
    }

    fn no_pending_flag(pending: &bool) -> bool {
        !*pending
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_third_fetch() {
        let (_, calls, fetch) = scripted(vec![
            Ok(("CREATING", false)),
            Ok(("CREATING", false)),
            Ok(("ACTIVE", false)),
        ]);
        let classifier = ALPHABET.targeting("ACTIVE");
        let started = Instant::now();

        let settled = poll_until(
            &CancellationToken::new(),
            &session(PollMode::Converge, 1000, 10),
            &classifier,
            no_pending_flag,
            fetch,
        )
        .await
        .unwrap();

        assert_eq!(settled, Settled::Reached(false));
        assert_eq!(*calls.lock().unwrap(), 3);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_success_does_not_wait() {
        let (_, calls, fetch) = scripted(vec![Ok(("ACTIVE", false))]);
        let classifier = ALPHABET.targeting("ACTIVE");
        let started = Instant::now();

        let settled = poll_until(
            &CancellationToken::new(),
            &session(PollMode::Converge, 1000, 10),
            &classifier,
            no_pending_flag,
            fetch,
        )
        .await
        .unwrap();

        assert_eq!(settled, Settled::Reached(false));
        assert_eq!(*calls.lock().unwrap(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_names_handle_and_target() {
        let (_, _, fetch) = scripted(vec![Ok(("CREATING", false))]);
        let classifier = ALPHABET.targeting("ACTIVE");

        let err = poll_until(
            &CancellationToken::new(),
            &session(PollMode::Converge, 50, 10),
            &classifier,
            no_pending_flag,
            fetch,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CloudError::Timeout { .. }));
        let msg = err.to_string();
        assert!(msg.contains("res-1"));
        assert!(msg.contains("\"ACTIVE\""));
        assert_eq!(err.observed_status(), Some("CREATING"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_status_is_terminal_before_deadline() {
        let (_, calls, fetch) = scripted(vec![Ok(("CREATING", false)), Ok(("ERROR", false))]);
        let classifier = ALPHABET.targeting("ACTIVE");
        let started = Instant::now();

        let err = poll_until(
            &CancellationToken::new(),
            &session(PollMode::Converge, 3_600_000, 10),
            &classifier,
            no_pending_flag,
            fetch,
        )
        .await
        .unwrap_err();

        match err {
            CloudError::RemoteError { status, target, .. } => {
                assert_eq!(status, "ERROR");
                assert_eq!(target, "ACTIVE");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(*calls.lock().unwrap(), 2);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_is_fatal_when_converging() {
        let (_, calls, fetch) = scripted(vec![
            Ok(("CREATING", false)),
            Err(ApiError::status(503, "backend unavailable")),
        ]);
        let classifier = ALPHABET.targeting("ACTIVE");

        let err = poll_until(
            &CancellationToken::new(),
            &session(PollMode::Converge, 1000, 10),
            &classifier,
            no_pending_flag,
            fetch,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CloudError::Api { .. }));
        assert!(err.to_string().contains("backend unavailable"));
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_fatal_when_converging() {
        let (_, _, fetch) = scripted(vec![Err(ApiError::not_found("no such server"))]);
        let classifier = ALPHABET.targeting("ACTIVE");

        let err = poll_until(
            &CancellationToken::new(),
            &session(PollMode::Converge, 1000, 10),
            &classifier,
            no_pending_flag,
            fetch,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CloudError::Api { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_confirms_deletion() {
        let (_, calls, fetch) = scripted(vec![Err(ApiError::not_found("no such server"))]);
        let classifier = ALPHABET.targeting("DELETED");

        let settled = poll_until(
            &CancellationToken::new(),
            &session(PollMode::ConfirmDeletion, 1000, 10),
            &classifier,
            no_pending_flag,
            fetch,
        )
        .await
        .unwrap();

        assert_eq!(settled, Settled::Gone);
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_errors_are_fatal_when_confirming_deletion() {
        let (_, _, fetch) = scripted(vec![
            Ok(("DELETING", false)),
            Err(ApiError::status(500, "internal error")),
        ]);
        let classifier = ALPHABET.targeting("DELETED");

        let err = poll_until(
            &CancellationToken::new(),
            &session(PollMode::ConfirmDeletion, 1000, 10),
            &classifier,
            no_pending_flag,
            fetch,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CloudError::Api { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auxiliary_flag_gates_success() {
        let (_, calls, fetch) = scripted(vec![
            Ok(("ACTIVE", true)),
            Ok(("ACTIVE", true)),
            Ok(("ACTIVE", false)),
        ]);
        let classifier = ALPHABET.targeting("ACTIVE");

        let settled = poll_until(
            &CancellationToken::new(),
            &session(PollMode::Converge, 1000, 10),
            &classifier,
            no_pending_flag,
            fetch,
        )
        .await
        .unwrap();

        assert_eq!(settled, Settled::Reached(false));
        assert_eq!(*calls.lock().unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_status_escalates_at_deadline() {
        let (_, _, fetch) = scripted(vec![Ok(("MAINTENANCE", false))]);
        let classifier = ALPHABET.targeting("ACTIVE");

        let err = poll_until(
            &CancellationToken::new(),
            &session(PollMode::Converge, 50, 10),
            &classifier,
            no_pending_flag,
            fetch,
        )
        .await
        .unwrap_err();

        match err {
            CloudError::UnrecognizedStatus { status, .. } => assert_eq!(status, "MAINTENANCE"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_then_success() {
        let (_, _, fetch) = scripted(vec![Ok(("MAINTENANCE", false)), Ok(("ACTIVE", false))]);
        let classifier = ALPHABET.targeting("ACTIVE");

        let settled = poll_until(
            &CancellationToken::new(),
            &session(PollMode::Converge, 1000, 10),
            &classifier,
            no_pending_flag,
            fetch,
        )
        .await
        .unwrap();

        assert_eq!(settled, Settled::Reached(false));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_waiting() {
        let (_, _, fetch) = scripted(vec![Ok(("CREATING", false))]);
        let classifier = ALPHABET.targeting("ACTIVE");
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(25)).await;
            trigger.cancel();
        });
        let started = Instant::now();

        let err = poll_until(
            &cancel,
            &session(PollMode::Converge, 3_600_000, 10),
            &classifier,
            no_pending_flag,
            fetch,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CloudError::Cancelled { .. }));
        assert!(started.elapsed() < Duration::from_millis(40));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_retry_is_opt_in() {
        let retry = RetryConfig {
            max_attempts: 2,
            initial_delay_ms: 5,
            max_delay_ms: 20,
            multiplier: 2.0,
        };
        let (_, calls, fetch) = scripted(vec![
            Err(ApiError::Transport("connection reset".into())),
            Err(ApiError::status(502, "bad gateway")),
            Ok(("ACTIVE", false)),
        ]);
        let classifier = ALPHABET.targeting("ACTIVE");
        let mut retrying = session(PollMode::Converge, 1000, 10);
        retrying.transient_retry = Some(&retry);

        let settled = poll_until(
            &CancellationToken::new(),
            &retrying,
            &classifier,
            no_pending_flag,
            fetch,
        )
        .await
        .unwrap();

        assert_eq!(settled, Settled::Reached(false));
        assert_eq!(*calls.lock().unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_retry_gives_up_after_max_attempts() {
        let retry = RetryConfig {
            max_attempts: 1,
            initial_delay_ms: 5,
            max_delay_ms: 20,
            multiplier: 2.0,
        };
        let (_, _, fetch) = scripted(vec![Err(ApiError::status(503, "maintenance"))]);
        let classifier = ALPHABET.targeting("ACTIVE");
        let mut retrying = session(PollMode::Converge, 1000, 10);
        retrying.transient_retry = Some(&retry);

        let err = poll_until(
            &CancellationToken::new(),
            &retrying,
            &classifier,
            no_pending_flag,
            fetch,
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("maintenance"));
    }
}
