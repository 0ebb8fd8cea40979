//! Type definitions for colexec.

pub mod date;
pub mod geo;
mod value;

pub use value::{DataType, ElementType, Value};
