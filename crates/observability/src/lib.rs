//! Process-wide tracing setup shared by binaries and tests.

/// Tracing subscriber configuration.
pub mod tracing;

pub use crate::tracing::{DEFAULT_FILTER, LogFormat, init, init_with};
