//! Core admission logic: ledger, waitlist, history, controller, and promotion.

pub mod admission;
pub mod collaborators;
pub mod error;
pub mod history;
pub mod ledger;
pub mod model;
pub mod partition;
pub mod promotion;
pub mod store;
pub mod sweep;
pub mod waitlist;

pub use admission::AdmissionController;
pub use collaborators::{CourseDirectory, CourseListing, Notifier};
pub use error::{AdmissionError, AppResult};
pub use history::{HistoryLog, HistoryRecord, TransitionReason};
pub use ledger::{CapacitySnapshot, CourseCapacity, Released, SeatReservation};
pub use model::{Admission, CourseId, Enrollment, EnrollmentId, EnrollmentStatus, StudentId};
pub use partition::{CoursePartition, ReconciliationReport};
pub use store::AdmissionStore;
pub use sweep::{PendingNotice, Spawn, SweepReport, SweeperHandle};
pub use waitlist::{WaitlistEntry, WaitlistQueue};
