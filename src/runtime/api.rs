//! API-facing request/response models and framework-agnostic handlers.
//!
//! Handlers take already-authenticated caller information and return an
//! [`ApiResponse`] carrying the HTTP status and JSON body, so any HTTP stack
//! can mount them:
//!
//! | Route | Handler |
//! |-------|---------|
//! | `POST /enrollments` | [`post_enrollment`] |
//! | `DELETE /enrollments/{id}` | [`delete_enrollment`] |
//! | `POST /enrollments/{id}/cancel` | [`cancel_waitlisted`] |
//! | `GET /capacity/{courseId}` | [`get_capacity`] |
//! | `GET /waitlist/{courseId}/list` | [`get_waitlist`] |

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::core::{
    Admission, AdmissionController, AdmissionError, AdmissionStore, CourseDirectory, CourseId,
    EnrollmentId, EnrollmentStatus, Notifier,
};

/// Body of `POST /enrollments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    /// Course to enroll in.
    pub course_id: CourseId,
}

/// Enrollment state returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResponse {
    /// Enrollment identifier.
    pub enrollment_id: EnrollmentId,
    /// Course identifier.
    pub course_id: CourseId,
    /// Current status.
    pub status: EnrollmentStatus,
    /// 1-based waitlist position when waitlisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waitlist_position: Option<usize>,
}

impl From<&Admission> for EnrollmentResponse {
    fn from(a: &Admission) -> Self {
        Self {
            enrollment_id: a.enrollment.id,
            course_id: a.enrollment.course_id.clone(),
            status: a.enrollment.status,
            waitlist_position: a.waitlist_position,
        }
    }
}

/// Error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Machine-readable reason.
    pub reason: String,
    /// Human-readable detail.
    pub message: String,
    /// Whether retrying later may succeed.
    pub retryable: bool,
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
}

/// Who is calling, as established by the identity layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerRole {
    /// Enrolling student.
    Student,
    /// Course instructor.
    Instructor,
    /// Administrator.
    Admin,
}

/// Status code, JSON body, and optional `Retry-After` hint.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status.
    pub status: u16,
    /// JSON body.
    pub body: Value,
    /// Seconds for a `Retry-After` header on retryable failures.
    pub retry_after_secs: Option<u64>,
}

impl ApiResponse {
    fn ok(status: u16, body: Value) -> Self {
        Self {
            status,
            body,
            retry_after_secs: None,
        }
    }

    fn from_error(err: &AdmissionError) -> Self {
        let body = ErrorBody {
            reason: err.reason().to_owned(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        };
        Self {
            status: err.status_code(),
            body: serde_json::to_value(body).unwrap_or(Value::Null),
            retry_after_secs: err.is_retryable().then_some(1),
        }
    }

    fn forbidden(message: &str) -> Self {
        Self::ok(
            403,
            json!({ "reason": "forbidden", "message": message, "retryable": false }),
        )
    }

    fn serialize<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => Self::ok(status, body),
            Err(e) => Self::from_error(&AdmissionError::Persistence(format!("encode response: {e}"))),
        }
    }
}

fn parse_enrollment_id(raw: &str) -> Result<EnrollmentId, AdmissionError> {
    Uuid::parse_str(raw.trim())
        .map_err(|e| AdmissionError::Validation(format!("invalid enrollment id `{raw}`: {e}")))
}

/// `POST /enrollments` for an authenticated student.
///
/// `201` for a new active or waitlisted enrollment, `200` when the request
/// repeats an existing one.
pub async fn post_enrollment<S, D, N>(
    controller: &AdmissionController<S, D, N>,
    student_id: &str,
    body: &str,
) -> ApiResponse
where
    S: AdmissionStore,
    D: CourseDirectory,
    N: Notifier,
{
    let req: EnrollRequest = match serde_json::from_str(body) {
        Ok(req) => req,
        Err(e) => {
            return ApiResponse::from_error(&AdmissionError::Validation(format!(
                "malformed enroll request: {e}"
            )))
        }
    };
    match controller.enroll(student_id, &req.course_id).await {
        Ok(admission) => {
            let status = if admission.duplicate { 200 } else { 201 };
            ApiResponse::serialize(status, &EnrollmentResponse::from(&admission))
        }
        Err(e) => ApiResponse::from_error(&e),
    }
}

/// `DELETE /enrollments/{id}`: drop an active enrollment.
pub async fn delete_enrollment<S, D, N>(
    controller: &AdmissionController<S, D, N>,
    enrollment_id: &str,
) -> ApiResponse
where
    S: AdmissionStore,
    D: CourseDirectory,
    N: Notifier,
{
    let id = match parse_enrollment_id(enrollment_id) {
        Ok(id) => id,
        Err(e) => return ApiResponse::from_error(&e),
    };
    match controller.drop(id).await {
        Ok(e) => ApiResponse::ok(200, json!({ "enrollmentId": e.id, "status": e.status })),
        Err(e) => ApiResponse::from_error(&e),
    }
}

/// `POST /enrollments/{id}/cancel`: leave the waitlist.
pub async fn cancel_waitlisted<S, D, N>(
    controller: &AdmissionController<S, D, N>,
    enrollment_id: &str,
) -> ApiResponse
where
    S: AdmissionStore,
    D: CourseDirectory,
    N: Notifier,
{
    let id = match parse_enrollment_id(enrollment_id) {
        Ok(id) => id,
        Err(e) => return ApiResponse::from_error(&e),
    };
    match controller.cancel_waitlisted(id).await {
        Ok(e) => ApiResponse::ok(200, json!({ "enrollmentId": e.id, "status": e.status })),
        Err(e) => ApiResponse::from_error(&e),
    }
}

/// `GET /capacity/{courseId}`: last committed capacity figures.
pub fn get_capacity<S, D, N>(controller: &AdmissionController<S, D, N>, course_id: &str) -> ApiResponse
where
    S: AdmissionStore,
    D: CourseDirectory,
    N: Notifier,
{
    match controller.capacity(course_id) {
        Ok(snapshot) => ApiResponse::serialize(200, &snapshot),
        Err(e) => ApiResponse::from_error(&e),
    }
}

/// `GET /waitlist/{courseId}/list`: ordered waitlist, staff only.
pub fn get_waitlist<S, D, N>(
    controller: &AdmissionController<S, D, N>,
    role: CallerRole,
    course_id: &str,
) -> ApiResponse
where
    S: AdmissionStore,
    D: CourseDirectory,
    N: Notifier,
{
    if role == CallerRole::Student {
        return ApiResponse::forbidden("waitlist listing requires instructor or admin role");
    }
    match controller.waitlist(course_id) {
        Ok(entries) => ApiResponse::serialize(200, &entries),
        Err(e) => ApiResponse::from_error(&e),
    }
}

/// Return a health payload.
pub const fn health() -> Health {
    Health { ok: true }
}
