use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::FlowcError;

/// Cooperative cancellation + deadline token threaded through every
/// repository and cache call. Cloning shares the same underlying flag.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    canceled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            canceled: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            canceled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        if self.canceled.load(Ordering::SeqCst) {
            return true;
        }
        matches!(self.deadline, Some(d) if Instant::now() >= d)
    }

    /// Check the token, returning `FlowcError::Canceled` if it has fired.
    /// Call this at entry and before every external call, per the
    /// cancellation contract.
    pub fn check(&self) -> Result<(), FlowcError> {
        if self.is_canceled() {
            Err(FlowcError::Canceled)
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
