use crate::errors::ErrorKind;
use tokio::sync::watch;

/// Stage of a single analysis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Packing,
    Inferring,
    Decoding,
    Done,
    Failed(ErrorKind),
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestState::Done | RequestState::Failed(_))
    }

    /// Position along the happy path; terminal states share the last rank.
    fn rank(&self) -> u8 {
        match self {
            RequestState::Idle => 0,
            RequestState::Packing => 1,
            RequestState::Inferring => 2,
            RequestState::Decoding => 3,
            RequestState::Done | RequestState::Failed(_) => 4,
        }
    }

    /// Allowed moves: one step forward, `Decoding → Done`, or any
    /// non-terminal state straight to `Failed`.
    pub fn can_transition_to(&self, next: RequestState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            RequestState::Failed(_) => true,
            RequestState::Done => *self == RequestState::Decoding,
            _ => next.rank() == self.rank() + 1,
        }
    }
}

/// Drives one request through its states and publishes every transition.
pub struct RequestTracker {
    current: RequestState,
    tx: watch::Sender<RequestState>,
}

impl RequestTracker {
    pub fn channel() -> (Self, watch::Receiver<RequestState>) {
        let (tx, rx) = watch::channel(RequestState::Idle);
        let tracker = Self {
            current: RequestState::Idle,
            tx,
        };
        (tracker, rx)
    }

    pub fn current(&self) -> RequestState {
        self.current
    }

    /// Move to `next`. Returns false, leaving the state unchanged, for an illegal move.
    pub fn advance(&mut self, next: RequestState) -> bool {
        if !self.current.can_transition_to(next) {
            tracing::warn!(from = ?self.current, to = ?next, "Rejected request state transition");
            return false;
        }

        tracing::trace!(from = ?self.current, to = ?next, "Request state transition");
        self.current = next;
        self.tx.send_replace(next);
        true
    }
}
