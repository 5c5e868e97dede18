//! Shared tracing setup for binaries and tests embedding the stock engine.

pub mod tracing;

pub use self::tracing::{LogConfig, LogFormat, init, init_for_tests, init_with};
