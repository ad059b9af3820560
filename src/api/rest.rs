//! REST API router and configuration.

use std::sync::Arc;

use axum::{
    http::{header, Method},
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::api::handlers::{
    admin_create_subject_handler, admin_list_subjects_handler, answer_query_handler,
    course_answered_handler, course_faq_handler, course_queries_handler, course_roster_handler,
    create_course_handler, create_student_handler, create_teacher_handler, delete_subject_handler,
    delete_teacher_handler, faq_all_handler, health_handler, list_courses_handler,
    list_teachers_handler, mark_notification_read_handler, metrics_handler, my_queries_handler,
    notifications_handler, query_rating_handler, rate_query_handler, submit_query_handler,
    teacher_pending_handler, teacher_queries_handler, teacher_rating_handler,
    teacher_student_queries_handler, teaching_courses_handler, ApiState,
};
use crate::coordinator::QueryCoordinator;

/// REST API configuration.
#[derive(Debug, Clone)]
pub struct RestApiConfig {
    /// Enable CORS (the Expo dev client calls cross-origin).
    pub enable_cors: bool,
    /// Allowed origins for CORS.
    pub cors_origins: Vec<String>,
}

impl Default for RestApiConfig {
    fn default() -> Self {
        Self {
            enable_cors: true,
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// Create the REST API router.
///
/// Endpoints:
/// - POST   /queries                                  - Submit a question
/// - PATCH  /queries/:id/answer                       - Answer / re-edit
/// - GET    /queries/mine                             - Student's queries
/// - GET    /queries/course/:id                       - Student's queries in course
/// - GET    /queries/course/:id/answered              - Answered subset
/// - GET    /queries/course/:id/faq                   - Course FAQ
/// - GET    /queries/faq/all                          - Global FAQ
/// - GET    /queries/teacher                          - Teacher's queries
/// - GET    /queries/teacher/pending                  - Teacher's unanswered
/// - GET    /queries/teacher/course/:id/students      - Course roster
/// - GET    /queries/teacher/course/:cid/student/:sid - One student's queries
/// - POST   /queries/rate                             - Upsert a rating
/// - GET    /queries/:id/rating                       - Rating for a query
/// - GET    /queries/teacher/:id/rating               - Teacher summary
/// - GET    /queries/notifications                    - Caller's notifications
/// - PATCH  /queries/notifications/:id/read           - Mark read
/// - GET|POST /courses, GET /courses/teaching         - Courses
/// - /admin/teachers, /admin/subjects, /admin/students - Administration
/// - GET    /health, GET /metrics                     - Operational
pub fn create_rest_router(coordinator: Arc<QueryCoordinator>, config: &RestApiConfig) -> Router {
    let state = Arc::new(ApiState::new(coordinator));

    let query_routes = Router::new()
        .route("/", post(submit_query_handler))
        .route("/mine", get(my_queries_handler))
        .route("/:id/answer", patch(answer_query_handler))
        .route("/:id/rating", get(query_rating_handler))
        .route("/rate", post(rate_query_handler))
        .route("/course/:id", get(course_queries_handler))
        .route("/course/:id/answered", get(course_answered_handler))
        .route("/course/:id/faq", get(course_faq_handler))
        .route("/faq/all", get(faq_all_handler))
        .route("/teacher", get(teacher_queries_handler))
        .route("/teacher/pending", get(teacher_pending_handler))
        .route("/teacher/:id/rating", get(teacher_rating_handler))
        .route(
            "/teacher/course/:course_id/students",
            get(course_roster_handler),
        )
        .route(
            "/teacher/course/:course_id/student/:student_id",
            get(teacher_student_queries_handler),
        )
        .route("/notifications", get(notifications_handler))
        .route(
            "/notifications/:id/read",
            patch(mark_notification_read_handler),
        );

    let course_routes = Router::new()
        .route("/", get(list_courses_handler).post(create_course_handler))
        .route("/teaching", get(teaching_courses_handler));

    let admin_routes = Router::new()
        .route(
            "/teachers",
            get(list_teachers_handler).post(create_teacher_handler),
        )
        .route("/teachers/:id", delete(delete_teacher_handler))
        .route(
            "/subjects",
            get(admin_list_subjects_handler).post(admin_create_subject_handler),
        )
        .route("/subjects/:id", delete(delete_subject_handler))
        .route("/students", post(create_student_handler));

    let router = Router::new()
        .nest("/queries", query_routes)
        .nest("/courses", course_routes)
        .nest("/admin", admin_routes)
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state);

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
            .allow_headers([
                header::CONTENT_TYPE,
                header::AUTHORIZATION,
                header::HeaderName::from_static("x-user-id"),
                header::HeaderName::from_static("x-user-role"),
            ])
            .allow_origin(Any);
        router.layer(cors)
    } else {
        router
    }
}
