//! REST API request handlers.
//!
//! Handlers translate between the HTTP contract the mobile client consumes
//! and the coordinator's domain API. All domain errors are converted into
//! structured `{detail, ...}` bodies here; intake rejections additionally
//! carry exactly one of the `moderation` / `subject_invalid` flags the
//! client switches on.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::coordinator::QueryCoordinator;
use crate::error::EngineError;
use crate::intake::{IntakeOutcome, RejectReason};
use crate::metrics::{get_metrics, HealthStatus};
use crate::store::{CourseStudent, Notification, Query, TeacherRatingSummary};

/// Application state shared across handlers.
pub struct ApiState {
    /// Coordinator for all engine operations.
    pub coordinator: Arc<QueryCoordinator>,
}

impl ApiState {
    pub fn new(coordinator: Arc<QueryCoordinator>) -> Self {
        Self { coordinator }
    }
}

// ============================================================================
// Actor extraction
// ============================================================================

/// Caller role, as asserted by the upstream gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

/// The authenticated caller. Authentication itself happens upstream; the
/// gateway forwards the verified identity in `X-User-Id` / `X-User-Role`.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let unauthorized = |detail: &str| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new(detail.to_string())),
            )
        };

        let id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or_else(|| unauthorized("Missing or invalid X-User-Id header"))?;

        let role = match parts
            .headers
            .get("x-user-role")
            .and_then(|v| v.to_str().ok())
        {
            Some("student") => Role::Student,
            Some("teacher") => Role::Teacher,
            Some("admin") => Role::Admin,
            _ => return Err(unauthorized("Missing or invalid X-User-Role header")),
        };

        Ok(Actor { id, role })
    }
}

fn require_role(actor: Actor, role: Role, detail: &str) -> Result<Actor, ApiError> {
    if actor.role != role {
        return Err(ApiError(
            StatusCode::FORBIDDEN,
            ErrorResponse::new(detail.to_string()),
        ));
    }
    Ok(actor)
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Error response body. Intake rejections carry exactly one flag; all other
/// errors carry neither.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_invalid: Option<bool>,
}

impl ErrorResponse {
    fn new(detail: String) -> Self {
        Self {
            detail,
            moderation: None,
            subject_invalid: None,
        }
    }
}

/// Internal shorthand for an error status + body pair.
pub struct ApiError(StatusCode, ErrorResponse);

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.0, Json(self.1)).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let (status, detail) = match &err {
            EngineError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            EngineError::Authorization(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            EngineError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            _ => {
                error!(error = %err, code = err.code(), "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        ApiError(status, ErrorResponse::new(detail))
    }
}

/// Query representation returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub id: Uuid,
    pub course_id: Uuid,
    pub course_name: String,
    pub student_id: Uuid,
    pub student_name: String,
    pub student_roll: String,
    pub question: String,
    pub answer: Option<String>,
    pub answered: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub answered_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<Query> for QueryResponse {
    fn from(q: Query) -> Self {
        Self {
            id: q.id,
            course_id: q.course_id,
            course_name: q.course_name,
            student_id: q.student_id,
            student_name: q.student_name,
            student_roll: q.student_roll,
            question: q.question,
            answer: q.answer,
            answered: q.answered,
            created_at: q.created_at,
            answered_at: q.answered_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitQueryRequest {
    pub course_id: Uuid,
    pub question: String,
}

/// Matched FAQ entry surfaced inline on auto-resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqMatchResponse {
    pub query_id: Uuid,
    pub question: String,
    pub answer: String,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitQueryResponse {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faq: Option<FaqMatchResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerQueryRequest {
    pub answer: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateQueryRequest {
    pub query_id: Uuid,
    pub teacher_id: Uuid,
    pub rating: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherRatingResponse {
    pub average_rating: f64,
    pub total_ratings: usize,
}

impl From<TeacherRatingSummary> for TeacherRatingResponse {
    fn from(s: TeacherRatingSummary) -> Self {
        Self {
            average_rating: s.average,
            total_ratings: s.total,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRatingResponse {
    pub rating: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub query_id: Uuid,
    pub course_id: Uuid,
    pub read: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            user_id: n.user_id,
            message: n.message,
            query_id: n.query_id,
            course_id: n.course_id,
            read: n.read,
            created_at: n.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCourseRequest {
    pub name: String,
    pub teacher_id: Uuid,
    #[serde(default)]
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseResponse {
    pub id: Uuid,
    pub name: String,
    pub teacher_id: Uuid,
    pub teacher_name: String,
    pub topics: Vec<String>,
}

impl From<crate::store::Course> for CourseResponse {
    fn from(c: crate::store::Course) -> Self {
        Self {
            id: c.id,
            name: c.name,
            teacher_id: c.teacher_id,
            teacher_name: c.teacher_name,
            topics: c.topics,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTeacherRequest {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub average_rating: f64,
    pub total_ratings: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStudentRequest {
    pub name: String,
    pub roll: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentResponse {
    pub id: Uuid,
    pub name: String,
    pub roll: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
    pub queries_removed: usize,
    pub ratings_removed: usize,
    pub notifications_removed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Query handlers
// ============================================================================

/// POST /queries - Submit a question through the intake pipeline.
pub async fn submit_query_handler(
    State(state): State<Arc<ApiState>>,
    actor: Actor,
    Json(request): Json<SubmitQueryRequest>,
) -> Result<Json<SubmitQueryResponse>, ApiError> {
    let actor = require_role(actor, Role::Student, "Only students can ask queries")?;

    let outcome = state
        .coordinator
        .submit_query(actor.id, request.course_id, &request.question)
        .await?;

    match outcome {
        IntakeOutcome::Rejected { reason } => {
            let mut body = ErrorResponse::new(match reason {
                RejectReason::Moderation => {
                    "Question rejected by content moderation".to_string()
                }
                RejectReason::OffTopic => {
                    "Question does not appear related to this subject".to_string()
                }
            });
            match reason {
                RejectReason::Moderation => body.moderation = Some(true),
                RejectReason::OffTopic => body.subject_invalid = Some(true),
            }
            Err(ApiError(StatusCode::UNPROCESSABLE_ENTITY, body))
        }
        IntakeOutcome::AutoAnswered { query, score } => Ok(Json(SubmitQueryResponse {
            matched: true,
            faq: Some(FaqMatchResponse {
                query_id: query.id,
                question: query.question.clone(),
                answer: query.answer.clone().unwrap_or_default(),
                score,
            }),
            query: None,
        })),
        IntakeOutcome::Accepted { query } => Ok(Json(SubmitQueryResponse {
            matched: false,
            faq: None,
            query: Some(query.into()),
        })),
    }
}

/// PATCH /queries/:id/answer - Answer or re-edit a query.
pub async fn answer_query_handler(
    State(state): State<Arc<ApiState>>,
    actor: Actor,
    Path(query_id): Path<Uuid>,
    Json(request): Json<AnswerQueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let actor = require_role(actor, Role::Teacher, "Only teachers can answer queries")?;
    let query = state
        .coordinator
        .answer_query(query_id, actor.id, &request.answer)
        .await?;
    Ok(Json(query.into()))
}

/// GET /queries/mine - All of the calling student's queries.
pub async fn my_queries_handler(
    State(state): State<Arc<ApiState>>,
    actor: Actor,
) -> Result<Json<Vec<QueryResponse>>, ApiError> {
    let queries = state.coordinator.queries_for_student(actor.id).await?;
    Ok(Json(queries.into_iter().map(Into::into).collect()))
}

/// GET /queries/course/:id - The calling student's queries in a course.
pub async fn course_queries_handler(
    State(state): State<Arc<ApiState>>,
    actor: Actor,
    Path(course_id): Path<Uuid>,
) -> Result<Json<Vec<QueryResponse>>, ApiError> {
    let queries = state
        .coordinator
        .queries_for_student_course(actor.id, course_id, false)
        .await?;
    Ok(Json(queries.into_iter().map(Into::into).collect()))
}

/// GET /queries/course/:id/answered - Answered subset of the above.
pub async fn course_answered_handler(
    State(state): State<Arc<ApiState>>,
    actor: Actor,
    Path(course_id): Path<Uuid>,
) -> Result<Json<Vec<QueryResponse>>, ApiError> {
    let queries = state
        .coordinator
        .queries_for_student_course(actor.id, course_id, true)
        .await?;
    Ok(Json(queries.into_iter().map(Into::into).collect()))
}

/// GET /queries/course/:id/faq - Course FAQ projection.
pub async fn course_faq_handler(
    State(state): State<Arc<ApiState>>,
    _actor: Actor,
    Path(course_id): Path<Uuid>,
) -> Result<Json<Vec<QueryResponse>>, ApiError> {
    let queries = state.coordinator.faq_for_course(course_id).await?;
    Ok(Json(queries.into_iter().map(Into::into).collect()))
}

/// GET /queries/faq/all - FAQ across all courses.
pub async fn faq_all_handler(
    State(state): State<Arc<ApiState>>,
    _actor: Actor,
) -> Result<Json<Vec<QueryResponse>>, ApiError> {
    let queries = state.coordinator.faq_all().await?;
    Ok(Json(queries.into_iter().map(Into::into).collect()))
}

/// GET /queries/teacher - Queries assigned to the calling teacher.
pub async fn teacher_queries_handler(
    State(state): State<Arc<ApiState>>,
    actor: Actor,
) -> Result<Json<Vec<QueryResponse>>, ApiError> {
    let actor = require_role(actor, Role::Teacher, "Only teachers")?;
    let queries = state.coordinator.queries_for_teacher(actor.id, false).await?;
    Ok(Json(queries.into_iter().map(Into::into).collect()))
}

/// GET /queries/teacher/pending - Unanswered queries for the teacher.
pub async fn teacher_pending_handler(
    State(state): State<Arc<ApiState>>,
    actor: Actor,
) -> Result<Json<Vec<QueryResponse>>, ApiError> {
    let actor = require_role(actor, Role::Teacher, "Only teachers")?;
    let queries = state.coordinator.queries_for_teacher(actor.id, true).await?;
    Ok(Json(queries.into_iter().map(Into::into).collect()))
}

/// GET /queries/teacher/course/:id/students - Students who asked in a course.
pub async fn course_roster_handler(
    State(state): State<Arc<ApiState>>,
    actor: Actor,
    Path(course_id): Path<Uuid>,
) -> Result<Json<Vec<CourseStudent>>, ApiError> {
    let actor = require_role(actor, Role::Teacher, "Only teachers")?;
    let roster = state.coordinator.course_roster(course_id, actor.id).await?;
    Ok(Json(roster))
}

/// GET /queries/teacher/course/:cid/student/:sid - One student's queries.
pub async fn teacher_student_queries_handler(
    State(state): State<Arc<ApiState>>,
    actor: Actor,
    Path((course_id, student_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<QueryResponse>>, ApiError> {
    let actor = require_role(actor, Role::Teacher, "Only teachers")?;
    let queries = state
        .coordinator
        .student_queries_in_course(course_id, student_id, actor.id)
        .await?;
    Ok(Json(queries.into_iter().map(Into::into).collect()))
}

// ============================================================================
// Rating handlers
// ============================================================================

/// POST /queries/rate - Upsert a rating for an answered query.
pub async fn rate_query_handler(
    State(state): State<Arc<ApiState>>,
    actor: Actor,
    Json(request): Json<RateQueryRequest>,
) -> Result<Json<TeacherRatingResponse>, ApiError> {
    let actor = require_role(actor, Role::Student, "Only students can rate answers")?;
    let summary = state
        .coordinator
        .rate_query(request.query_id, actor.id, request.teacher_id, request.rating)
        .await?;
    Ok(Json(summary.into()))
}

/// GET /queries/:id/rating - The rating a query currently holds.
pub async fn query_rating_handler(
    State(state): State<Arc<ApiState>>,
    _actor: Actor,
    Path(query_id): Path<Uuid>,
) -> Result<Json<QueryRatingResponse>, ApiError> {
    let rating = state.coordinator.rating_for_query(query_id).await?;
    Ok(Json(QueryRatingResponse { rating }))
}

/// GET /queries/teacher/:id/rating - A teacher's average and count.
pub async fn teacher_rating_handler(
    State(state): State<Arc<ApiState>>,
    _actor: Actor,
    Path(teacher_id): Path<Uuid>,
) -> Result<Json<TeacherRatingResponse>, ApiError> {
    let summary = state.coordinator.teacher_rating(teacher_id).await?;
    Ok(Json(summary.into()))
}

// ============================================================================
// Notification handlers
// ============================================================================

/// GET /queries/notifications - The caller's notifications, newest first.
pub async fn notifications_handler(
    State(state): State<Arc<ApiState>>,
    actor: Actor,
) -> Result<Json<Vec<NotificationResponse>>, ApiError> {
    let notifications = state.coordinator.notifications_for(actor.id).await?;
    Ok(Json(notifications.into_iter().map(Into::into).collect()))
}

/// PATCH /queries/notifications/:id/read - Mark one notification read.
pub async fn mark_notification_read_handler(
    State(state): State<Arc<ApiState>>,
    actor: Actor,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .coordinator
        .mark_notification_read(notification_id, actor.id)
        .await?;
    Ok(Json(MessageResponse {
        message: "Marked as read".to_string(),
    }))
}

// ============================================================================
// Course handlers
// ============================================================================

/// GET /courses - All courses.
pub async fn list_courses_handler(
    State(state): State<Arc<ApiState>>,
    _actor: Actor,
) -> Result<Json<Vec<CourseResponse>>, ApiError> {
    let courses = state.coordinator.list_courses().await?;
    Ok(Json(courses.into_iter().map(Into::into).collect()))
}

/// POST /courses - Create a course (admins and teachers).
pub async fn create_course_handler(
    State(state): State<Arc<ApiState>>,
    actor: Actor,
    Json(request): Json<CreateCourseRequest>,
) -> Result<(StatusCode, Json<CourseResponse>), ApiError> {
    if actor.role == Role::Student {
        return Err(ApiError(
            StatusCode::FORBIDDEN,
            ErrorResponse::new("Only admins or teachers can create subjects".to_string()),
        ));
    }
    let course = state
        .coordinator
        .create_course(&request.name, request.teacher_id, request.topics)
        .await?;
    Ok((StatusCode::CREATED, Json(course.into())))
}

/// GET /courses/teaching - Courses assigned to the calling teacher.
pub async fn teaching_courses_handler(
    State(state): State<Arc<ApiState>>,
    actor: Actor,
) -> Result<Json<Vec<CourseResponse>>, ApiError> {
    let actor = require_role(actor, Role::Teacher, "Only teachers")?;
    let courses = state.coordinator.courses_for_teacher(actor.id).await?;
    Ok(Json(courses.into_iter().map(Into::into).collect()))
}

// ============================================================================
// Admin handlers
// ============================================================================

fn require_admin(actor: Actor) -> Result<Actor, ApiError> {
    require_role(actor, Role::Admin, "Admin only")
}

/// GET /admin/teachers - Teachers with their rating summaries.
pub async fn list_teachers_handler(
    State(state): State<Arc<ApiState>>,
    actor: Actor,
) -> Result<Json<Vec<TeacherResponse>>, ApiError> {
    require_admin(actor)?;
    let teachers = state.coordinator.list_teachers().await?;
    Ok(Json(
        teachers
            .into_iter()
            .map(|(t, summary)| TeacherResponse {
                id: t.id,
                name: t.name,
                email: t.email,
                average_rating: summary.average,
                total_ratings: summary.total,
            })
            .collect(),
    ))
}

/// POST /admin/teachers - Create a teacher account.
pub async fn create_teacher_handler(
    State(state): State<Arc<ApiState>>,
    actor: Actor,
    Json(request): Json<CreateTeacherRequest>,
) -> Result<(StatusCode, Json<TeacherResponse>), ApiError> {
    require_admin(actor)?;
    let teacher = state
        .coordinator
        .create_teacher(&request.name, &request.email)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(TeacherResponse {
            id: teacher.id,
            name: teacher.name,
            email: teacher.email,
            average_rating: 0.0,
            total_ratings: 0,
        }),
    ))
}

/// DELETE /admin/teachers/:id - Remove a teacher and all assigned subjects.
pub async fn delete_teacher_handler(
    State(state): State<Arc<ApiState>>,
    actor: Actor,
    Path(teacher_id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, ApiError> {
    require_admin(actor)?;
    let outcome = state.coordinator.delete_teacher(teacher_id).await?;
    Ok(Json(DeleteResponse {
        message: "Teacher and assigned subjects deleted".to_string(),
        queries_removed: outcome.queries_removed,
        ratings_removed: outcome.ratings_removed,
        notifications_removed: outcome.notifications_removed,
    }))
}

/// GET /admin/subjects - All subjects.
pub async fn admin_list_subjects_handler(
    State(state): State<Arc<ApiState>>,
    actor: Actor,
) -> Result<Json<Vec<CourseResponse>>, ApiError> {
    require_admin(actor)?;
    let courses = state.coordinator.list_courses().await?;
    Ok(Json(courses.into_iter().map(Into::into).collect()))
}

/// POST /admin/subjects - Create a subject assigned to a teacher.
pub async fn admin_create_subject_handler(
    State(state): State<Arc<ApiState>>,
    actor: Actor,
    Json(request): Json<CreateCourseRequest>,
) -> Result<(StatusCode, Json<CourseResponse>), ApiError> {
    require_admin(actor)?;
    let course = state
        .coordinator
        .create_course(&request.name, request.teacher_id, request.topics)
        .await?;
    Ok((StatusCode::CREATED, Json(course.into())))
}

/// DELETE /admin/subjects/:id - Remove a subject and its queries.
pub async fn delete_subject_handler(
    State(state): State<Arc<ApiState>>,
    actor: Actor,
    Path(course_id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, ApiError> {
    require_admin(actor)?;
    let outcome = state.coordinator.delete_course(course_id).await?;
    Ok(Json(DeleteResponse {
        message: "Subject deleted".to_string(),
        queries_removed: outcome.queries_removed,
        ratings_removed: outcome.ratings_removed,
        notifications_removed: outcome.notifications_removed,
    }))
}

/// POST /admin/students - Register a student reference.
pub async fn create_student_handler(
    State(state): State<Arc<ApiState>>,
    actor: Actor,
    Json(request): Json<CreateStudentRequest>,
) -> Result<(StatusCode, Json<StudentResponse>), ApiError> {
    require_admin(actor)?;
    let student = state
        .coordinator
        .create_student(&request.name, &request.roll)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(StudentResponse {
            id: student.id,
            name: student.name,
            roll: student.roll,
        }),
    ))
}

// ============================================================================
// Operational handlers
// ============================================================================

/// GET /health - Liveness probe.
pub async fn health_handler() -> Json<HealthStatus> {
    Json(HealthStatus::ok())
}

/// GET /metrics - Prometheus text exposition.
pub async fn metrics_handler() -> impl IntoResponse {
    get_metrics().export()
}
