//! Tests for the intake pipeline: moderation, relevance, and FAQ matching.

use lyceum::{Config, IntakeOutcome, QueryCoordinator, RejectReason};

struct World {
    coordinator: QueryCoordinator,
    teacher_id: uuid::Uuid,
    student_id: uuid::Uuid,
    course_id: uuid::Uuid,
}

/// Course "ML101" with an assigned teacher and one registered student.
async fn world_with_topics(topics: Vec<String>) -> World {
    let coordinator = QueryCoordinator::new(Config::default());
    let teacher = coordinator
        .create_teacher("Dr. Rao", "rao@example.edu")
        .await
        .unwrap();
    let student = coordinator.create_student("Alice", "R-001").await.unwrap();
    let course = coordinator
        .create_course("ML101", teacher.id, topics)
        .await
        .unwrap();
    World {
        coordinator,
        teacher_id: teacher.id,
        student_id: student.id,
        course_id: course.id,
    }
}

async fn world() -> World {
    world_with_topics(vec![]).await
}

#[tokio::test]
async fn test_exact_duplicate_always_auto_answers() {
    let w = world().await;

    let q = match w
        .coordinator
        .submit_query(w.student_id, w.course_id, "What is overfitting?")
        .await
        .unwrap()
    {
        IntakeOutcome::Accepted { query } => query,
        other => panic!("expected acceptance, got {other:?}"),
    };
    w.coordinator
        .answer_query(q.id, w.teacher_id, "Fitting noise instead of signal.")
        .await
        .unwrap();

    // Same text modulo case and punctuation: score 1.0, above any threshold.
    let outcome = w
        .coordinator
        .submit_query(w.student_id, w.course_id, "what is overfitting??")
        .await
        .unwrap();
    match outcome {
        IntakeOutcome::AutoAnswered { query, score } => {
            assert_eq!(score, 1.0);
            assert_eq!(query.answer.as_deref(), Some("Fitting noise instead of signal."));
        }
        other => panic!("expected auto-answer, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_faq_never_matches() {
    let w = world().await;
    let outcome = w
        .coordinator
        .submit_query(w.student_id, w.course_id, "What is overfitting?")
        .await
        .unwrap();
    assert!(matches!(outcome, IntakeOutcome::Accepted { .. }));
}

#[tokio::test]
async fn test_pending_queries_are_not_match_candidates() {
    let w = world().await;
    w.coordinator
        .submit_query(w.student_id, w.course_id, "What is overfitting?")
        .await
        .unwrap();

    // The first query is still pending, so the duplicate is accepted too.
    let outcome = w
        .coordinator
        .submit_query(w.student_id, w.course_id, "What is overfitting?")
        .await
        .unwrap();
    assert!(matches!(outcome, IntakeOutcome::Accepted { .. }));
}

#[tokio::test]
async fn test_match_is_scoped_to_the_course() {
    let w = world().await;
    let q = match w
        .coordinator
        .submit_query(w.student_id, w.course_id, "What is overfitting?")
        .await
        .unwrap()
    {
        IntakeOutcome::Accepted { query } => query,
        other => panic!("expected acceptance, got {other:?}"),
    };
    w.coordinator
        .answer_query(q.id, w.teacher_id, "Fitting noise.")
        .await
        .unwrap();

    let other_course = w
        .coordinator
        .create_course("DB201", w.teacher_id, vec![])
        .await
        .unwrap();
    let outcome = w
        .coordinator
        .submit_query(w.student_id, other_course.id, "What is overfitting?")
        .await
        .unwrap();
    assert!(
        matches!(outcome, IntakeOutcome::Accepted { .. }),
        "answered query in another course must not resolve this one"
    );
}

#[tokio::test]
async fn test_profane_question_rejected_and_not_persisted() {
    let w = world().await;
    let outcome = w
        .coordinator
        .submit_query(w.student_id, w.course_id, "why is this course so stupid")
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        IntakeOutcome::Rejected {
            reason: RejectReason::Moderation
        }
    ));
    assert!(w
        .coordinator
        .queries_for_teacher(w.teacher_id, false)
        .await
        .unwrap()
        .is_empty());
    assert!(w
        .coordinator
        .notifications_for(w.teacher_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_off_topic_question_rejected() {
    let w = world_with_topics(vec![
        "overfitting".into(),
        "gradient".into(),
        "regression".into(),
    ])
    .await;

    let outcome = w
        .coordinator
        .submit_query(
            w.student_id,
            w.course_id,
            "When does the football tournament start this semester?",
        )
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        IntakeOutcome::Rejected {
            reason: RejectReason::OffTopic
        }
    ));
}

#[tokio::test]
async fn test_short_question_passes_relevance() {
    let w = world_with_topics(vec!["overfitting".into()]).await;
    // Two tokens carry too little signal to reject confidently.
    let outcome = w
        .coordinator
        .submit_query(w.student_id, w.course_id, "why though")
        .await
        .unwrap();
    assert!(matches!(outcome, IntakeOutcome::Accepted { .. }));
}

#[tokio::test]
async fn test_accepted_submission_notifies_teacher() {
    let w = world().await;
    w.coordinator
        .submit_query(w.student_id, w.course_id, "What is overfitting?")
        .await
        .unwrap();

    let inbox = w
        .coordinator
        .notifications_for(w.teacher_id)
        .await
        .unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].message, "R-001 Raised a Question on ML101");
}

#[tokio::test]
async fn test_auto_answer_creates_no_notification() {
    let w = world().await;
    let q = match w
        .coordinator
        .submit_query(w.student_id, w.course_id, "What is overfitting?")
        .await
        .unwrap()
    {
        IntakeOutcome::Accepted { query } => query,
        other => panic!("expected acceptance, got {other:?}"),
    };
    w.coordinator
        .answer_query(q.id, w.teacher_id, "Fitting noise.")
        .await
        .unwrap();
    let student_inbox_before = w
        .coordinator
        .notifications_for(w.student_id)
        .await
        .unwrap()
        .len();
    let teacher_inbox_before = w
        .coordinator
        .notifications_for(w.teacher_id)
        .await
        .unwrap()
        .len();

    w.coordinator
        .submit_query(w.student_id, w.course_id, "What is overfitting?")
        .await
        .unwrap();

    assert_eq!(
        w.coordinator
            .notifications_for(w.student_id)
            .await
            .unwrap()
            .len(),
        student_inbox_before
    );
    assert_eq!(
        w.coordinator
            .notifications_for(w.teacher_id)
            .await
            .unwrap()
            .len(),
        teacher_inbox_before
    );
}
