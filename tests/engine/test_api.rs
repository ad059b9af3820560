//! Tests for the HTTP contract consumed by the mobile client.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use lyceum::{create_rest_router, Config, QueryCoordinator, RestApiConfig};

struct World {
    router: Router,
    coordinator: Arc<QueryCoordinator>,
    teacher_id: uuid::Uuid,
    student_id: uuid::Uuid,
    course_id: uuid::Uuid,
}

async fn world() -> World {
    let coordinator = Arc::new(QueryCoordinator::new(Config::default()));
    let teacher = coordinator
        .create_teacher("Dr. Rao", "rao@example.edu")
        .await
        .unwrap();
    let student = coordinator.create_student("Alice", "R-001").await.unwrap();
    let course = coordinator
        .create_course("ML101", teacher.id, vec![])
        .await
        .unwrap();
    let router = create_rest_router(coordinator.clone(), &RestApiConfig::default());
    World {
        router,
        coordinator,
        teacher_id: teacher.id,
        student_id: student.id,
        course_id: course.id,
    }
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    actor: Option<(uuid::Uuid, &str)>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = actor {
        builder = builder
            .header("x-user-id", id.to_string())
            .header("x-user-role", role);
    }
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn test_submit_accept_then_auto_answer() {
    let w = world().await;

    let (status, body) = send(
        &w.router,
        Method::POST,
        "/queries",
        Some((w.student_id, "student")),
        Some(json!({"course_id": w.course_id, "question": "What is overfitting?"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matched"], json!(false));
    let query_id = body["query"]["id"].as_str().unwrap().to_string();

    // Teacher answers over the wire.
    let (status, _) = send(
        &w.router,
        Method::PATCH,
        &format!("/queries/{query_id}/answer"),
        Some((w.teacher_id, "teacher")),
        Some(json!({"answer": "Fitting noise instead of signal."})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Resubmitting the same question resolves against the FAQ.
    let (status, body) = send(
        &w.router,
        Method::POST,
        "/queries",
        Some((w.student_id, "student")),
        Some(json!({"course_id": w.course_id, "question": "what is overfitting??"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matched"], json!(true));
    assert_eq!(body["faq"]["answer"], json!("Fitting noise instead of signal."));
}

#[tokio::test]
async fn test_moderation_rejection_body_carries_flag() {
    let w = world().await;
    let (status, body) = send(
        &w.router,
        Method::POST,
        "/queries",
        Some((w.student_id, "student")),
        Some(json!({"course_id": w.course_id, "question": "this course is stupid"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["moderation"], json!(true));
    assert!(body.get("subject_invalid").is_none(), "exactly one flag");
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_off_topic_rejection_body_carries_flag() {
    let w = world().await;
    let course = w
        .coordinator
        .create_course(
            "DB201",
            w.teacher_id,
            vec!["sql".into(), "index".into(), "transaction".into()],
        )
        .await
        .unwrap();

    let (status, body) = send(
        &w.router,
        Method::POST,
        "/queries",
        Some((w.student_id, "student")),
        Some(json!({
            "course_id": course.id,
            "question": "When does the football tournament start this semester?"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["subject_invalid"], json!(true));
    assert!(body.get("moderation").is_none(), "exactly one flag");
}

#[tokio::test]
async fn test_teacher_role_required_for_answering() {
    let w = world().await;
    let (status, body) = send(
        &w.router,
        Method::PATCH,
        &format!("/queries/{}/answer", uuid::Uuid::new_v4()),
        Some((w.student_id, "student")),
        Some(json!({"answer": "nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], json!("Only teachers can answer queries"));
}

#[tokio::test]
async fn test_missing_identity_headers_rejected() {
    let w = world().await;
    let (status, _) = send(
        &w.router,
        Method::POST,
        "/queries",
        None,
        Some(json!({"course_id": w.course_id, "question": "A question"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rating_round_trip() {
    let w = world().await;

    let (_, body) = send(
        &w.router,
        Method::POST,
        "/queries",
        Some((w.student_id, "student")),
        Some(json!({"course_id": w.course_id, "question": "What is overfitting?"})),
    )
    .await;
    let query_id = body["query"]["id"].as_str().unwrap().to_string();
    send(
        &w.router,
        Method::PATCH,
        &format!("/queries/{query_id}/answer"),
        Some((w.teacher_id, "teacher")),
        Some(json!({"answer": "Fitting noise."})),
    )
    .await;

    let (status, body) = send(
        &w.router,
        Method::POST,
        "/queries/rate",
        Some((w.student_id, "student")),
        Some(json!({"query_id": query_id, "teacher_id": w.teacher_id, "rating": 4})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["average_rating"], json!(4.0));
    assert_eq!(body["total_ratings"], json!(1));

    // Update to 5: still one rating, average 5.0.
    let (_, body) = send(
        &w.router,
        Method::POST,
        "/queries/rate",
        Some((w.student_id, "student")),
        Some(json!({"query_id": query_id, "teacher_id": w.teacher_id, "rating": 5})),
    )
    .await;
    assert_eq!(body["average_rating"], json!(5.0));
    assert_eq!(body["total_ratings"], json!(1));

    let (status, body) = send(
        &w.router,
        Method::GET,
        &format!("/queries/{query_id}/rating"),
        Some((w.student_id, "student")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rating"], json!(5));

    let (status, body) = send(
        &w.router,
        Method::GET,
        &format!("/queries/teacher/{}/rating", w.teacher_id),
        Some((w.student_id, "student")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["average_rating"], json!(5.0));
    assert_eq!(body["total_ratings"], json!(1));
}

#[tokio::test]
async fn test_notifications_and_mark_read() {
    let w = world().await;

    let (_, body) = send(
        &w.router,
        Method::POST,
        "/queries",
        Some((w.student_id, "student")),
        Some(json!({"course_id": w.course_id, "question": "What is overfitting?"})),
    )
    .await;
    let query_id = body["query"]["id"].as_str().unwrap().to_string();
    send(
        &w.router,
        Method::PATCH,
        &format!("/queries/{query_id}/answer"),
        Some((w.teacher_id, "teacher")),
        Some(json!({"answer": "Fitting noise."})),
    )
    .await;

    let (status, body) = send(
        &w.router,
        Method::GET,
        "/queries/notifications",
        Some((w.student_id, "student")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["read"], json!(false));
    let notification_id = items[0]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &w.router,
        Method::PATCH,
        &format!("/queries/notifications/{notification_id}/read"),
        Some((w.student_id, "student")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Marked as read"));

    // A different user may not mark it read.
    let (status, _) = send(
        &w.router,
        Method::PATCH,
        &format!("/queries/notifications/{notification_id}/read"),
        Some((w.teacher_id, "teacher")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_faq_endpoints() {
    let w = world().await;
    let (_, body) = send(
        &w.router,
        Method::POST,
        "/queries",
        Some((w.student_id, "student")),
        Some(json!({"course_id": w.course_id, "question": "What is overfitting?"})),
    )
    .await;
    let query_id = body["query"]["id"].as_str().unwrap().to_string();
    send(
        &w.router,
        Method::PATCH,
        &format!("/queries/{query_id}/answer"),
        Some((w.teacher_id, "teacher")),
        Some(json!({"answer": "Fitting noise."})),
    )
    .await;

    let (status, body) = send(
        &w.router,
        Method::GET,
        &format!("/queries/course/{}/faq", w.course_id),
        Some((w.student_id, "student")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(
        &w.router,
        Method::GET,
        "/queries/faq/all",
        Some((w.student_id, "student")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_admin_delete_subject_cascades() {
    let w = world().await;
    let admin_id = uuid::Uuid::new_v4();

    send(
        &w.router,
        Method::POST,
        "/queries",
        Some((w.student_id, "student")),
        Some(json!({"course_id": w.course_id, "question": "What is overfitting?"})),
    )
    .await;

    let (status, body) = send(
        &w.router,
        Method::DELETE,
        &format!("/admin/subjects/{}", w.course_id),
        Some((admin_id, "admin")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Subject deleted"));
    assert_eq!(body["queries_removed"], json!(1));

    // Student role may not delete subjects.
    let (status, _) = send(
        &w.router,
        Method::DELETE,
        &format!("/admin/subjects/{}", w.course_id),
        Some((w.student_id, "student")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_teachers_listing_includes_rating_summary() {
    let w = world().await;
    let admin_id = uuid::Uuid::new_v4();

    let (status, body) = send(
        &w.router,
        Method::GET,
        "/admin/teachers",
        Some((admin_id, "admin")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let teachers = body.as_array().unwrap();
    assert_eq!(teachers.len(), 1);
    assert_eq!(teachers[0]["average_rating"], json!(0.0));
    assert_eq!(teachers[0]["total_ratings"], json!(0));
}

#[tokio::test]
async fn test_health_endpoint() {
    let w = world().await;
    let (status, body) = send(&w.router, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
}
