//! Observable progress of an orchestrated call.

use crate::TransportError;

/// Where a [`CallState`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    /// Nothing has run since creation or the last reset.
    Idle,
    /// An invocation is in flight.
    Loading,
    /// The last settled invocation succeeded.
    Success,
    /// The last settled invocation failed.
    Error,
}

/// Snapshot of an orchestrator's progress and result.
///
/// `data` survives a failed invocation: after an error it still holds the
/// payload of the last success, if any.
#[derive(Debug, Clone)]
pub struct CallState<T> {
    /// Payload of the last successful invocation.
    pub data: Option<T>,
    /// Whether an invocation is in flight.
    pub loading: bool,
    /// Error of the last failed invocation, cleared when a new one starts.
    pub error: Option<TransportError>,
}

impl<T> Default for CallState<T> {
    fn default() -> Self {
        Self::idle()
    }
}

impl<T> CallState<T> {
    /// `{data: None, loading: false, error: None}`.
    pub fn idle() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }

    pub(crate) fn start(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub(crate) fn succeed(&mut self, data: T) {
        self.data = Some(data);
        self.loading = false;
        self.error = None;
    }

    pub(crate) fn fail(&mut self, error: TransportError) {
        self.loading = false;
        self.error = Some(error);
    }

    /// The lifecycle phase this snapshot is in.
    pub fn phase(&self) -> CallPhase {
        match (self.loading, &self.error, &self.data) {
            (true, _, _) => CallPhase::Loading,
            (false, Some(_), _) => CallPhase::Error,
            (false, None, Some(_)) => CallPhase::Success,
            (false, None, None) => CallPhase::Idle,
        }
    }

    /// `true` when the snapshot equals the idle state.
    pub fn is_idle(&self) -> bool {
        self.phase() == CallPhase::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn lifecycle() {
        let mut state = CallState::idle();
        assert_eq!(state.phase(), CallPhase::Idle);

        state.start();
        assert_eq!(state.phase(), CallPhase::Loading);

        state.succeed("first");
        assert_eq!(state.phase(), CallPhase::Success);

        state.start();
        state.fail(TransportError::http(StatusCode::NOT_FOUND));
        assert_eq!(state.phase(), CallPhase::Error);
        assert_eq!(state.data, Some("first"));
    }

    #[test]
    fn start_clears_error_keeps_data() {
        let mut state = CallState::idle();
        state.succeed(1);
        state.fail(TransportError::network("down"));

        state.start();
        assert!(state.error.is_none());
        assert_eq!(state.data, Some(1));
        assert!(state.loading);
    }
}
