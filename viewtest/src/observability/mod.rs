//! Log output for test runs.
//!
//! The factory, the middleware runner and the test-case setup emit `tracing`
//! events. Install a subscriber with [`TracingConfig`] (or the
//! [`init_test_logging`] shorthand) to see them in test output.

mod tracing;

pub use self::tracing::{TracingConfig, init_test_logging};
