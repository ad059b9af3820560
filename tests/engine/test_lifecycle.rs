//! Tests for the query state machine, notifications, and cascade deletes.

use lyceum::{Config, EngineError, IntakeOutcome, Query, QueryCoordinator};

struct World {
    coordinator: QueryCoordinator,
    teacher_id: uuid::Uuid,
    student_id: uuid::Uuid,
    course_id: uuid::Uuid,
}

async fn world() -> World {
    let coordinator = QueryCoordinator::new(Config::default());
    let teacher = coordinator
        .create_teacher("Dr. Rao", "rao@example.edu")
        .await
        .unwrap();
    let student = coordinator.create_student("Alice", "R-001").await.unwrap();
    let course = coordinator
        .create_course("ML101", teacher.id, vec![])
        .await
        .unwrap();
    World {
        coordinator,
        teacher_id: teacher.id,
        student_id: student.id,
        course_id: course.id,
    }
}

async fn submit(w: &World, question: &str) -> Query {
    match w
        .coordinator
        .submit_query(w.student_id, w.course_id, question)
        .await
        .unwrap()
    {
        IntakeOutcome::Accepted { query } => query,
        other => panic!("expected acceptance, got {other:?}"),
    }
}

#[tokio::test]
async fn test_answer_sets_state_and_notifies_student_once() {
    let w = world().await;
    let q = submit(&w, "What is overfitting?").await;
    assert!(!q.answered);

    let answered = w
        .coordinator
        .answer_query(q.id, w.teacher_id, "Fitting noise instead of signal.")
        .await
        .unwrap();
    assert!(answered.answered);
    assert!(answered.answer.is_some());
    assert!(answered.answered_at.is_some());
    assert!(answered.invariant_holds());

    let inbox = w
        .coordinator
        .notifications_for(w.student_id)
        .await
        .unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].query_id, q.id);
    assert_eq!(inbox[0].message, "Your ML101 Query has been answered!!");
    assert!(!inbox[0].read);

    // Teacher rating stays untouched until a rating is submitted.
    assert_eq!(
        w.coordinator.teacher_rating(w.teacher_id).await.unwrap().total,
        0
    );
}

#[tokio::test]
async fn test_re_edit_keeps_answered_state_without_second_notification() {
    let w = world().await;
    let q = submit(&w, "What is overfitting?").await;

    w.coordinator
        .answer_query(q.id, w.teacher_id, "First answer")
        .await
        .unwrap();
    let first_answered_at = w.coordinator.get_query(q.id).await.unwrap().answered_at;

    let edited = w
        .coordinator
        .answer_query(q.id, w.teacher_id, "Edited answer")
        .await
        .unwrap();
    assert!(edited.answered);
    assert_eq!(edited.answer.as_deref(), Some("Edited answer"));
    assert!(edited.answered_at >= first_answered_at);
    assert!(edited.invariant_holds());

    let inbox = w
        .coordinator
        .notifications_for(w.student_id)
        .await
        .unwrap();
    assert_eq!(inbox.len(), 1, "re-editing must not notify again");
}

#[tokio::test]
async fn test_answer_failure_semantics() {
    let w = world().await;
    let q = submit(&w, "What is overfitting?").await;

    let err = w
        .coordinator
        .answer_query(q.id, uuid::Uuid::new_v4(), "an answer")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Authorization(_)));

    let err = w
        .coordinator
        .answer_query(q.id, w.teacher_id, "  ")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = w
        .coordinator
        .answer_query(uuid::Uuid::new_v4(), w.teacher_id, "an answer")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    // The failed attempts left the query untouched.
    let unchanged = w.coordinator.get_query(q.id).await.unwrap();
    assert!(!unchanged.answered);
    assert!(unchanged.invariant_holds());
}

#[tokio::test]
async fn test_faq_projection_contains_only_answered() {
    let w = world().await;
    let q1 = submit(&w, "What is overfitting?").await;
    let _q2 = submit(&w, "What is regularization?").await;

    w.coordinator
        .answer_query(q1.id, w.teacher_id, "Fitting noise.")
        .await
        .unwrap();

    let faq = w.coordinator.faq_for_course(w.course_id).await.unwrap();
    assert_eq!(faq.len(), 1);
    assert_eq!(faq[0].id, q1.id);

    let all = w.coordinator.faq_all().await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_course_cascade_removes_queries_ratings_notifications() {
    let w = world().await;
    let q = submit(&w, "What is overfitting?").await;
    w.coordinator
        .answer_query(q.id, w.teacher_id, "Fitting noise.")
        .await
        .unwrap();
    w.coordinator
        .rate_query(q.id, w.student_id, w.teacher_id, 4)
        .await
        .unwrap();

    let outcome = w.coordinator.delete_course(w.course_id).await.unwrap();
    assert_eq!(outcome.queries_removed, 1);
    assert_eq!(outcome.ratings_removed, 1);
    // One notification to the teacher (raised) and one to the student
    // (answered) referenced the removed query.
    assert_eq!(outcome.notifications_removed, 2);

    assert!(matches!(
        w.coordinator.get_query(q.id).await.unwrap_err(),
        EngineError::NotFound(_)
    ));
    assert!(w
        .coordinator
        .notifications_for(w.student_id)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        w.coordinator.teacher_rating(w.teacher_id).await.unwrap().total,
        0
    );
}

#[tokio::test]
async fn test_teacher_cascade_removes_assigned_subjects() {
    let w = world().await;
    let q = submit(&w, "What is overfitting?").await;

    let outcome = w.coordinator.delete_teacher(w.teacher_id).await.unwrap();
    assert_eq!(outcome.courses_removed, 1);
    assert_eq!(outcome.queries_removed, 1);

    assert!(w.coordinator.list_courses().await.unwrap().is_empty());
    assert!(matches!(
        w.coordinator.get_query(q.id).await.unwrap_err(),
        EngineError::NotFound(_)
    ));
    // Deleting again reports not-found, not a partial cascade.
    assert!(matches!(
        w.coordinator.delete_teacher(w.teacher_id).await.unwrap_err(),
        EngineError::NotFound(_)
    ));
}

#[tokio::test]
async fn test_mark_notification_read_flow() {
    let w = world().await;
    let q = submit(&w, "What is overfitting?").await;
    w.coordinator
        .answer_query(q.id, w.teacher_id, "Fitting noise.")
        .await
        .unwrap();

    let inbox = w
        .coordinator
        .notifications_for(w.student_id)
        .await
        .unwrap();
    let notification = &inbox[0];

    // Another user may not mark it read.
    let err = w
        .coordinator
        .mark_notification_read(notification.id, w.teacher_id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Authorization(_)));

    let read = w
        .coordinator
        .mark_notification_read(notification.id, w.student_id)
        .await
        .unwrap();
    assert!(read.read);

    // Idempotent for the owner.
    let again = w
        .coordinator
        .mark_notification_read(notification.id, w.student_id)
        .await
        .unwrap();
    assert!(again.read);
}
