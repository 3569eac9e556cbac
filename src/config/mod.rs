//! Configuration models for admission, concurrency, and retries.

pub mod admission;

pub use admission::{AdmissionConfig, ConcurrencyStrategy, RetryPolicy};
