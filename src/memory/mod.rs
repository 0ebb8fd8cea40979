//! Memory accounting and the per-driver context.
//!
//! [`MemoryBudget`] tracks reserved bytes, [`BlockFactory`] turns
//! reservations into builders and blocks, and [`DriverContext`] ties a
//! factory to one driver together with its warnings and error policy.

mod block_factory;
mod budget;
mod driver_context;
mod warnings;

pub use block_factory::BlockFactory;
pub use budget::{MemoryBudget, MemoryReservation};
pub use driver_context::DriverContext;
pub use warnings::Warnings;
