//! Generic test bodies shared by every `ConcurrentSet` implementation.
//!
//! Instantiated per set type from the integration tests in `tests/`.

pub mod concurrent_set_stress_tests;
