//! Memory budget accounting.
//!
//! Every buffer a block factory hands out is backed by a [`MemoryReservation`]
//! against a [`MemoryBudget`]. The reservation returns its bytes when it is
//! dropped, so a block releases its memory when the last reference to it goes
//! away, on success and error paths alike.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::error::{ColexecError, Result};

#[derive(Debug, Default)]
struct BudgetState {
    used: usize,
    peak: usize,
}

/// A named byte budget, optionally nested under a parent budget.
///
/// A reservation must fit in this budget and in every ancestor.
pub struct MemoryBudget {
    name: String,
    limit: Option<usize>,
    parent: Option<Arc<MemoryBudget>>,
    state: Mutex<BudgetState>,
}

impl MemoryBudget {
    /// Creates a root budget. `None` means unbounded.
    #[must_use]
    pub fn new(name: impl Into<String>, limit: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            limit,
            parent: None,
            state: Mutex::new(BudgetState::default()),
        })
    }

    /// Creates an unbounded root budget.
    #[must_use]
    pub fn unbounded(name: impl Into<String>) -> Arc<Self> {
        Self::new(name, None)
    }

    /// Creates a budget whose reservations also count against `self`.
    #[must_use]
    pub fn child(self: &Arc<Self>, name: impl Into<String>, limit: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            limit,
            parent: Some(Arc::clone(self)),
            state: Mutex::new(BudgetState::default()),
        })
    }

    /// Returns the budget name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the configured limit.
    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Returns the bytes currently reserved.
    #[must_use]
    pub fn used(&self) -> usize {
        self.state.lock().used
    }

    /// Returns the highest value `used` has reached.
    #[must_use]
    pub fn peak(&self) -> usize {
        self.state.lock().peak
    }

    /// Reserves `bytes`, failing if this budget or any ancestor would overflow.
    ///
    /// # Errors
    ///
    /// Returns `BudgetExceeded`. Nothing stays reserved on failure.
    pub fn reserve(self: &Arc<Self>, bytes: usize, label: &str) -> Result<MemoryReservation> {
        self.add(bytes, label)?;
        Ok(MemoryReservation {
            budget: Arc::clone(self),
            bytes,
        })
    }

    fn add(&self, bytes: usize, label: &str) -> Result<()> {
        let wanted = {
            let mut state = self.state.lock();
            let wanted = state.used.saturating_add(bytes);
            if let Some(limit) = self.limit {
                if wanted > limit {
                    warn!(
                        budget = %self.name,
                        label,
                        requested = bytes,
                        used = state.used,
                        limit,
                        "memory budget exceeded"
                    );
                    return Err(ColexecError::BudgetExceeded {
                        budget: self.name.clone(),
                        label: label.to_string(),
                        requested: bytes,
                        used: state.used,
                        limit,
                    });
                }
            }
            state.used = wanted;
            wanted
        };

        if let Some(parent) = &self.parent {
            if let Err(e) = parent.add(bytes, label) {
                self.release(bytes);
                return Err(e);
            }
        }
        // peak only counts reservations the whole chain accepted
        let mut state = self.state.lock();
        state.peak = state.peak.max(wanted);
        Ok(())
    }

    fn release(&self, bytes: usize) {
        {
            let mut state = self.state.lock();
            debug_assert!(state.used >= bytes, "released more than reserved");
            state.used = state.used.saturating_sub(bytes);
        }
        if let Some(parent) = &self.parent {
            parent.release(bytes);
        }
    }
}

impl fmt::Debug for MemoryBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryBudget")
            .field("name", &self.name)
            .field("limit", &self.limit)
            .field("used", &state.used)
            .field("peak", &state.peak)
            .finish_non_exhaustive()
    }
}

/// Bytes held against a budget until dropped.
pub struct MemoryReservation {
    budget: Arc<MemoryBudget>,
    bytes: usize,
}

impl MemoryReservation {
    /// Returns the number of reserved bytes.
    #[must_use]
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    /// Returns the budget this reservation counts against.
    #[must_use]
    pub fn budget(&self) -> &Arc<MemoryBudget> {
        &self.budget
    }

    /// Grows or shrinks the reservation to exactly `bytes`.
    ///
    /// # Errors
    ///
    /// Returns `BudgetExceeded` when growing does not fit; the reservation
    /// keeps its previous size in that case.
    pub fn resize(&mut self, bytes: usize, label: &str) -> Result<()> {
        if bytes > self.bytes {
            self.budget.add(bytes - self.bytes, label)?;
        } else {
            self.budget.release(self.bytes - bytes);
        }
        self.bytes = bytes;
        Ok(())
    }
}

impl Drop for MemoryReservation {
    fn drop(&mut self) {
        self.budget.release(self.bytes);
    }
}

impl fmt::Debug for MemoryReservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryReservation")
            .field("budget", &self.budget.name)
            .field("bytes", &self.bytes)
            .finish()
    }
}
