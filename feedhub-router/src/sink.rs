//! Provider-wide error sink.

use crate::error::DispatchError;

/// Receives every [`DispatchError`] the router encounters.
///
/// Implementations are called on the dispatching thread and must not block.
pub trait ErrorSink: Send + Sync {
    /// Reports one error.
    fn report(&self, error: &DispatchError);
}

impl<F> ErrorSink for F
where
    F: Fn(&DispatchError) + Send + Sync,
{
    fn report(&self, error: &DispatchError) {
        self(error);
    }
}

/// Default sink: logs through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, error: &DispatchError) {
        match error {
            DispatchError::UnknownSubscription { retired: true, .. } => {
                tracing::debug!("Dropped late event: {}", error);
            }
            DispatchError::UnknownSubscription { .. } | DispatchError::PayloadMismatch { .. } => {
                tracing::warn!("Protocol error: {}", error);
            }
            DispatchError::ListenerFault { .. } => {
                tracing::error!("Listener fault: {}", error);
            }
            DispatchError::Disposed => {
                tracing::debug!("Dispatch after dispose ignored");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_closure_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let sink = move |error: &DispatchError| seen_clone.lock().push(error.clone());

        sink.report(&DispatchError::Disposed);
        assert_eq!(*seen.lock(), vec![DispatchError::Disposed]);
    }

    #[test]
    fn test_tracing_sink_does_not_panic() {
        TracingSink.report(&DispatchError::Disposed);
    }
}
