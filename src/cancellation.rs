//! Cooperative cancellation for analysis runs.
//!
//! Analyses check the token between independent units of work (one
//! registration, one procedure). A cancelled run discards everything it
//! collected and returns [`AnalysisError::Cancelled`](crate::AnalysisError).

use std::sync::{atomic::{AtomicBool, Ordering}, Arc};
use std::time::{Duration, Instant};

use crate::error::{AnalysisError, AnalysisResult};

/// A token that signals cancellation to a running analysis.
///
/// Clones share the same flag. Child tokens observe their parent's
/// cancellation, so a host can cancel a whole batch of compilation units with
/// one call.
///
/// # Examples
///
/// ```
/// use ferrous_di_analyzer::CancellationToken;
///
/// let batch = CancellationToken::new();
/// let unit = batch.child_token();
///
/// assert!(!unit.is_cancelled());
/// batch.cancel();
/// assert!(unit.is_cancelled());
/// assert!(unit.throw_if_cancelled().is_err());
/// ```
#[derive(Clone, Debug)]
pub struct CancellationToken {
    inner: Arc<CancellationTokenInner>,
}

#[derive(Debug)]
struct CancellationTokenInner {
    cancelled: AtomicBool,
    parent: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    /// Creates a new cancellation token.
    pub fn new() -> Self {
        Self::with_parts(None, None)
    }

    /// Creates a token that reports cancelled once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_parts(None, Some(Instant::now() + timeout))
    }

    /// Creates a child token cancelled when either it or this token is.
    pub fn child_token(&self) -> Self {
        Self::with_parts(Some(self.clone()), None)
    }

    fn with_parts(parent: Option<CancellationToken>, deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(CancellationTokenInner {
                cancelled: AtomicBool::new(false),
                parent,
                deadline,
            }),
        }
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    /// Returns true if cancellation has been requested on this token or an ancestor.
    pub fn is_cancelled(&self) -> bool {
        if self.inner.cancelled.load(Ordering::Acquire) {
            return true;
        }

        if let Some(deadline) = self.inner.deadline {
            if Instant::now() >= deadline {
                return true;
            }
        }

        match self.inner.parent {
            Some(ref parent) => parent.is_cancelled(),
            None => false,
        }
    }

    /// Returns `Err(AnalysisError::Cancelled)` if the token is cancelled.
    pub fn throw_if_cancelled(&self) -> AnalysisResult<()> {
        if self.is_cancelled() {
            Err(AnalysisError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
