//! The discovery cancellation slot.

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// A discovery attempt registered with a [`DiscoverySlot`].
#[derive(Debug, Clone)]
pub struct DiscoveryAttempt {
    generation: u64,
    token: CancellationToken,
}

impl DiscoveryAttempt {
    /// The token the attempt's platform request observes.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Whether the attempt has been superseded or cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug, Default)]
struct SlotState {
    live: Option<(u64, CancellationToken)>,
    next_generation: u64,
}

/// Holds the cancellation token of the single live discovery attempt.
///
/// Every attempt gets a fresh token; starting a new attempt cancels the
/// previous one first, so no two attempts ever share a token.
#[derive(Debug, Default)]
pub struct DiscoverySlot {
    state: Mutex<SlotState>,
}

impl DiscoverySlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the live attempt, if any, and register a new one.
    pub fn begin(&self) -> DiscoveryAttempt {
        let mut state = self.state.lock();
        if let Some((generation, token)) = state.live.take() {
            tracing::debug!(generation, "superseding discovery attempt");
            token.cancel();
        }

        let generation = state.next_generation;
        state.next_generation += 1;
        let token = CancellationToken::new();
        state.live = Some((generation, token.clone()));

        DiscoveryAttempt { generation, token }
    }

    /// Cancel the live attempt. Returns whether there was one.
    pub fn cancel(&self) -> bool {
        match self.state.lock().live.take() {
            Some((generation, token)) => {
                tracing::debug!(generation, "cancelling discovery attempt");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Release the slot held by `attempt`. A slot already taken over by a
    /// newer attempt is left alone.
    pub fn finish(&self, attempt: &DiscoveryAttempt) {
        let mut state = self.state.lock();
        if matches!(&state.live, Some((generation, _)) if *generation == attempt.generation) {
            state.live = None;
        }
    }

    /// Whether a discovery attempt is outstanding.
    pub fn is_active(&self) -> bool {
        self.state.lock().live.is_some()
    }
}
