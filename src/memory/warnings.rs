//! Position-local evaluation warnings.

use parking_lot::Mutex;
use tracing::warn;

use crate::error::ValueError;

#[derive(Debug, Default)]
struct WarningsState {
    messages: Vec<String>,
    total: usize,
}

/// Collects the first `max` value warnings raised in one driver context.
///
/// Later warnings are counted but not kept.
#[derive(Debug)]
pub struct Warnings {
    max: usize,
    state: Mutex<WarningsState>,
}

impl Warnings {
    /// Creates an empty collector that keeps at most `max` messages.
    #[must_use]
    pub fn new(max: usize) -> Self {
        Self {
            max,
            state: Mutex::new(WarningsState::default()),
        }
    }

    /// Records that `source` produced null at `position` because of `error`.
    pub fn register(&self, source: &str, position: usize, error: &ValueError) {
        let mut state = self.state.lock();
        state.total += 1;
        if state.messages.len() < self.max {
            let message = format!(
                "evaluation of [{source}] failed at position {position}, treating result as null: {error}"
            );
            warn!(%message, "value warning");
            state.messages.push(message);
        }
    }

    /// Returns the retained messages.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.state.lock().messages.clone()
    }

    /// Returns how many warnings were registered, retained or not.
    #[must_use]
    pub fn total(&self) -> usize {
        self.state.lock().total
    }
}
