//! Ingestion-side context for fetching external data.
//!
//! External lines can come straight from the source or pre-processed by a
//! remote conflation service. The service is slow and occasionally times
//! out; after a timeout it is left alone for a while and the fetch is retried
//! in the background. That memory of the last failure lives in a
//! [`FallbackCooldown`] value owned by the caller, not in global state.

use std::time::{Duration, Instant};

use crate::data::store::LineStore;

/// Gateway timeouts within this window of the last failure are not reported.
pub const COOLDOWN: Duration = Duration::from_secs(120);
/// How long to wait for the conflation service.
pub const SERVICE_TIMEOUT: Duration = Duration::from_secs(30);
/// Pause before a background retry; the service rejects immediate retries.
pub const RETRY_DELAY: Duration = Duration::from_secs(10);

/// How a fetch failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchFailure {
    /// The service answered 504.
    GatewayTimeout,
    /// The connection timed out after `elapsed`.
    Timeout { elapsed: Duration },
    /// Anything else.
    Other(String),
}

/// What the caller should do about a [`FetchFailure`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureAction {
    /// Surface the failure to the user.
    Propagate,
    /// Stay quiet and fetch again after `delay`.
    RetryInBackground { delay: Duration },
}

/// Remembers the last service timeout.
#[derive(Clone, Debug, Default)]
pub struct FallbackCooldown {
    last_error: Option<Instant>,
}

impl FallbackCooldown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_error(&self) -> Option<Instant> {
        self.last_error
    }

    pub fn record_timeout(&mut self, now: Instant) {
        self.last_error = Some(now);
    }

    /// Whether `now` falls within [`COOLDOWN`] of the last recorded timeout.
    pub fn in_cooldown(&self, now: Instant) -> bool {
        self.last_error
            .is_some_and(|at| now.saturating_duration_since(at) < COOLDOWN)
    }

    /// Decide how to handle `failure` observed at `now`.
    pub fn on_failure(&mut self, failure: &FetchFailure, now: Instant) -> FailureAction {
        let retry = FailureAction::RetryInBackground { delay: RETRY_DELAY };
        match failure {
            FetchFailure::GatewayTimeout if self.in_cooldown(now) => {
                log::debug!("gateway timeout during cooldown, retrying in background");
                retry
            }
            FetchFailure::Timeout { elapsed } if *elapsed > SERVICE_TIMEOUT => {
                self.record_timeout(now);
                log::warn!(
                    "conflation service timed out after {:.1}s; retrying in the background",
                    elapsed.as_secs_f64()
                );
                retry
            }
            _ => FailureAction::Propagate,
        }
    }
}

/// Pick the collection to conflate: the service's output when it produced
/// one, the raw external data otherwise.
pub fn resolve_external(external: LineStore, conflated: Option<LineStore>) -> LineStore {
    match conflated {
        Some(store) => {
            log::debug!(
                "using conflation service output ({} lines) in place of raw data ({} lines)",
                store.num_lines(),
                external.num_lines()
            );
            store
        }
        None => external,
    }
}
