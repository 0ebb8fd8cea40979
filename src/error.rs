//! Error types for colexec evaluation.

use thiserror::Error;

use crate::types::ElementType;

/// Result type alias using [`ColexecError`].
pub type Result<T> = std::result::Result<T, ColexecError>;

/// Error types raised while building buffers or evaluating pages.
#[derive(Debug, Error)]
pub enum ColexecError {
    // ==================== Allocation ====================
    /// A new buffer would push the memory budget past its limit.
    #[error(
        "Memory budget [{budget}] exceeded: requested {requested} bytes for [{label}], \
         {used} bytes used, limit is {limit} bytes"
    )]
    BudgetExceeded {
        budget: String,
        label: String,
        requested: usize,
        used: usize,
        limit: usize,
    },

    // ==================== Contract violations ====================
    /// A block's runtime element type does not match the evaluator's specialization.
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: ElementType,
        actual: ElementType,
    },

    /// Blocks that must be aligned report different position counts.
    #[error("Position count mismatch: expected {expected}, got {actual}")]
    PositionCountMismatch { expected: usize, actual: usize },

    /// A channel index does not address a block of the page.
    #[error("Channel {channel} out of range for page with {block_count} blocks")]
    ChannelOutOfRange { channel: usize, block_count: usize },

    /// An argument was rejected before evaluation started.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No specialized evaluator exists for the requested operation.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    // ==================== Evaluation ====================
    /// A position-local failure surfaced because strict evaluation is configured.
    #[error("Invalid value at position {position}: {source}")]
    InvalidValue {
        position: usize,
        #[source]
        source: ValueError,
    },

    /// The driver observed its cancellation flag between pages.
    #[error("Driver cancelled")]
    Cancelled,

    /// General execution errors (thread pool setup and the like).
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// Arrow conversion failure.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

/// A failure confined to a single position of a single evaluation.
///
/// Depending on the configured [`ValueErrorPolicy`](crate::config::ValueErrorPolicy)
/// the position becomes null (with a recorded warning) or the whole
/// evaluation fails with [`ColexecError::InvalidValue`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// Integer arithmetic overflowed.
    #[error("integer overflow")]
    Overflow,

    /// Division or remainder by zero.
    #[error("/ by zero")]
    DivisionByZero,

    /// Floating point arithmetic produced NaN or an infinity.
    #[error("not a finite number")]
    NotFinite,

    /// An encoded value could not be decoded into its structured type.
    #[error("cannot parse [{value}] as {target}")]
    Malformed { target: &'static str, value: String },
}

impl ValueError {
    /// Builds a [`ValueError::Malformed`] from raw bytes.
    pub(crate) fn malformed(target: &'static str, raw: &[u8]) -> Self {
        ValueError::Malformed {
            target,
            value: String::from_utf8_lossy(raw).into_owned(),
        }
    }
}
