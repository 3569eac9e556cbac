//! Runtime adapters and the request/response surface.

pub mod api;
pub mod tokio_spawner;

pub use api::{
    cancel_waitlisted, delete_enrollment, get_capacity, get_waitlist, health, post_enrollment,
    ApiResponse, CallerRole, EnrollRequest, EnrollmentResponse, ErrorBody, Health,
};
pub use tokio_spawner::TokioSpawner;
