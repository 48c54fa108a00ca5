//! Deadline scopes for outbound calls.
//!
//! Every probe and every report runs inside its own [`Deadline`]: a child
//! of the session's cancellation token plus an absolute expiry. Dropping
//! the scope cancels the child token, so a scope is released on every
//! exit path.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{BeaconError, BeaconResult};

// Roughly 30 years; stands in for budgets too large to add to `now`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Debug)]
pub struct Deadline {
    budget: Duration,
    expires_at: Instant,
    token: CancellationToken,
}

impl Deadline {
    /// Open a scope that expires `budget` from now, or earlier if
    /// `parent` is cancelled.
    pub fn new(budget: Duration, parent: &CancellationToken) -> Self {
        let now = Instant::now();
        let expires_at = now
            .checked_add(budget)
            .unwrap_or_else(|| now + FAR_FUTURE);
        Self {
            budget,
            expires_at,
            token: parent.child_token(),
        }
    }

    /// The duration this scope was opened with.
    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token that fires when the scope is released or the session stops.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Drive `fut` to completion within this scope.
    pub async fn run<F>(&self, fut: F) -> BeaconResult<F::Output>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(BeaconError::Cancelled),
            res = tokio::time::timeout_at(self.expires_at, fut) => {
                res.map_err(|_| BeaconError::DeadlineElapsed(self.budget))
            }
        }
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
