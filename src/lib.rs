//! # Course Admission
//!
//! A capacity-bounded admission controller for course enrollment.
//!
//! Every enroll request is admitted into a seat, queued on a FIFO waitlist, or
//! rejected, under a hard per-course capacity that holds even when many
//! requests for the same course arrive at once. When a seat is released the
//! longest-waiting student is promoted into it.
//!
//! ## Key Features
//!
//! - **Atomic course transactions**: seat, enrollment, waitlist entry, and
//!   history record commit together or not at all
//! - **Two concurrency strategies**: per-course row locking, or optimistic
//!   commits with bounded, jittered retry
//! - **Deterministic FIFO**: waitlist order comes from a per-course sequence
//!   counter, never from wall-clock time
//! - **Idempotent enroll**: repeating a request returns the existing enrollment
//! - **Decoupled promotion**: drops commit first; promotion and notification
//!   failures go to a background retry sweep
//! - **Audit trail**: append-only history of every status transition
//!
//! ```rust,ignore
//! use course_admission::builders::build_in_memory;
//! use course_admission::config::AdmissionConfig;
//! use course_admission::infra::{InMemoryCourseDirectory, InMemoryNotifier};
//!
//! let directory = InMemoryCourseDirectory::new();
//! directory.open_course("rust-101", 30, true);
//!
//! let controller = build_in_memory(&AdmissionConfig::default(), directory, InMemoryNotifier::new())?;
//! controller.publish_course("rust-101").await?;
//!
//! let admission = controller.enroll("student-7", "rust-101").await?;
//! println!("{} -> {}", admission.enrollment.id, admission.status());
//! ```
//!
//! For complete scenarios, see `tests/admission_scenarios_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core admission logic: ledger, waitlist, history, controller, and promotion.
pub mod core;
/// Configuration models for admission, concurrency, and retries.
pub mod config;
/// Builders to construct controllers from configuration.
pub mod builders;
/// Infrastructure adapters for stores and collaborators.
pub mod infra;
/// Runtime adapters and the request/response surface.
pub mod runtime;
/// Shared utilities.
pub mod util;
