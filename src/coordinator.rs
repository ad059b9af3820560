//! Query coordinator orchestrating the full lifecycle.
//!
//! The coordinator wires the intake pipeline, the query store, the rating
//! aggregator, and the notification dispatcher behind one API surface:
//! - submission runs moderation → relevance → similarity, then persists
//! - answer transitions dispatch at most one student notification
//! - admin operations cascade through the ownership graph
//!   (course → query → {rating, notification})

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{EngineError, Result};
use crate::intake::{
    IntakeOutcome, ModerationFilter, RejectReason, RelevanceChecker, SimilarityMatcher,
    TokenOverlapMatcher,
};
use crate::metrics::get_metrics;
use crate::notify::NotificationDispatcher;
use crate::ratings::RatingAggregator;
use crate::store::{
    CascadeOutcome, Course, CourseStudent, EngineStore, MemoryStore, Notification, Query, Student,
    Teacher, TeacherRatingSummary,
};

/// Orchestrates intake, lifecycle transitions, ratings, and notifications.
pub struct QueryCoordinator {
    store: Arc<dyn EngineStore>,
    moderation: ModerationFilter,
    relevance: RelevanceChecker,
    matcher: Box<dyn SimilarityMatcher>,
    dispatcher: NotificationDispatcher,
    ratings: RatingAggregator,
}

impl QueryCoordinator {
    /// Build a coordinator with the in-memory store.
    pub fn new(config: Config) -> Self {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    /// Build a coordinator over an existing store.
    pub fn with_store(config: Config, store: Arc<dyn EngineStore>) -> Self {
        let intake = &config.intake;
        Self {
            moderation: ModerationFilter::new(&intake.moderation),
            relevance: RelevanceChecker::new(intake),
            matcher: Box::new(TokenOverlapMatcher::new(intake.similarity_threshold)),
            dispatcher: NotificationDispatcher::new(store.clone()),
            ratings: RatingAggregator::new(store.clone()),
            store,
        }
    }

    // ------------------------------------------------------------------
    // Intake
    // ------------------------------------------------------------------

    /// Submit a question on behalf of a student.
    ///
    /// Checks run in a fixed order: moderation, relevance, similarity.
    /// Rejections and FAQ matches persist nothing; an accepted submission
    /// creates a pending query and notifies the assigned teacher.
    pub async fn submit_query(
        &self,
        student_id: Uuid,
        course_id: Uuid,
        question: &str,
    ) -> Result<IntakeOutcome> {
        let started = Instant::now();
        let metrics = get_metrics();
        metrics.queries_submitted_total.inc();

        let question = question.trim();
        if question.is_empty() {
            return Err(EngineError::Validation(
                "Question text must not be empty".to_string(),
            ));
        }

        let student = self
            .store
            .get_student(student_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Student not found: {student_id}")))?;
        let course = self
            .store
            .get_course(course_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Course not found: {course_id}")))?;

        let verdict = self.moderation.check(question);
        if verdict.flagged {
            metrics.queries_rejected_moderation_total.inc();
            warn!(
                course_id = %course_id,
                student_id = %student_id,
                label = ?verdict.label,
                confidence = verdict.confidence,
                "submission rejected by moderation"
            );
            return Ok(IntakeOutcome::Rejected {
                reason: RejectReason::Moderation,
            });
        }

        let relevance = self.relevance.check(&course.topic_set(), question);
        if !relevance.on_topic {
            metrics.queries_rejected_off_topic_total.inc();
            warn!(
                course_id = %course_id,
                student_id = %student_id,
                overlap = relevance.overlap,
                "submission rejected as off-topic"
            );
            return Ok(IntakeOutcome::Rejected {
                reason: RejectReason::OffTopic,
            });
        }

        let candidates = self.store.faq_for_course(course_id).await?;
        if let Some(m) = self.matcher.best_match(question, &candidates) {
            metrics.queries_auto_answered_total.inc();
            metrics
                .intake_duration_seconds
                .observe(started.elapsed().as_secs_f64());
            // Auditable record of the synchronous resolution; the client
            // surfaces the match inline, so no notification is created.
            info!(
                course_id = %course_id,
                student_id = %student_id,
                matched_query_id = %m.query.id,
                score = m.score,
                "submission auto-answered from course FAQ"
            );
            return Ok(IntakeOutcome::AutoAnswered {
                query: m.query,
                score: m.score,
            });
        }

        let query = self
            .store
            .insert_query(Query::new(
                course.id,
                course.name.clone(),
                student.id,
                student.name.clone(),
                student.roll.clone(),
                course.teacher_id,
                question.to_string(),
            ))
            .await?;
        self.dispatcher.on_query_submitted(&query).await?;

        metrics.queries_accepted_total.inc();
        metrics.notifications_created_total.inc();
        metrics
            .intake_duration_seconds
            .observe(started.elapsed().as_secs_f64());
        info!(query_id = %query.id, course_id = %course_id, "query accepted as pending");
        Ok(IntakeOutcome::Accepted { query })
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Answer a pending query, or re-edit an already-answered one.
    ///
    /// Only the first transition into answered notifies the student; the
    /// notification insert is idempotent per query, so a crash-and-retry
    /// cannot double-notify and a retry after a partial failure converges.
    pub async fn answer_query(
        &self,
        query_id: Uuid,
        teacher_id: Uuid,
        answer_text: &str,
    ) -> Result<Query> {
        let outcome = self
            .store
            .answer_query(query_id, teacher_id, answer_text)
            .await?;

        let metrics = get_metrics();
        metrics.queries_answered_total.inc();
        if outcome.first_transition {
            self.dispatcher.on_query_answered(&outcome.query).await?;
            metrics.notifications_created_total.inc();
        }
        Ok(outcome.query)
    }

    pub async fn get_query(&self, query_id: Uuid) -> Result<Query> {
        self.store
            .get_query(query_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Query not found: {query_id}")))
    }

    // ------------------------------------------------------------------
    // Listings
    // ------------------------------------------------------------------

    pub async fn queries_for_student(&self, student_id: Uuid) -> Result<Vec<Query>> {
        self.store.queries_for_student(student_id).await
    }

    pub async fn queries_for_student_course(
        &self,
        student_id: Uuid,
        course_id: Uuid,
        answered_only: bool,
    ) -> Result<Vec<Query>> {
        self.store
            .queries_for_student_course(student_id, course_id, answered_only)
            .await
    }

    pub async fn queries_for_teacher(
        &self,
        teacher_id: Uuid,
        pending_only: bool,
    ) -> Result<Vec<Query>> {
        self.store.queries_for_teacher(teacher_id, pending_only).await
    }

    /// FAQ projection for one course.
    pub async fn faq_for_course(&self, course_id: Uuid) -> Result<Vec<Query>> {
        if self.store.get_course(course_id).await?.is_none() {
            return Err(EngineError::NotFound(format!(
                "Course not found: {course_id}"
            )));
        }
        self.store.faq_for_course(course_id).await
    }

    /// FAQ projection across all courses.
    pub async fn faq_all(&self) -> Result<Vec<Query>> {
        self.store.faq_all().await
    }

    pub async fn course_roster(
        &self,
        course_id: Uuid,
        teacher_id: Uuid,
    ) -> Result<Vec<CourseStudent>> {
        self.store.course_roster(course_id, teacher_id).await
    }

    pub async fn student_queries_in_course(
        &self,
        course_id: Uuid,
        student_id: Uuid,
        teacher_id: Uuid,
    ) -> Result<Vec<Query>> {
        self.store
            .student_queries_in_course(course_id, student_id, teacher_id)
            .await
    }

    // ------------------------------------------------------------------
    // Ratings
    // ------------------------------------------------------------------

    pub async fn rate_query(
        &self,
        query_id: Uuid,
        student_id: Uuid,
        teacher_id: Uuid,
        value: u8,
    ) -> Result<TeacherRatingSummary> {
        let summary = self
            .ratings
            .rate(query_id, student_id, teacher_id, value)
            .await?;
        get_metrics().ratings_recorded_total.inc();
        Ok(summary)
    }

    pub async fn rating_for_query(&self, query_id: Uuid) -> Result<Option<u8>> {
        self.ratings.rating_for_query(query_id).await
    }

    pub async fn teacher_rating(&self, teacher_id: Uuid) -> Result<TeacherRatingSummary> {
        self.ratings.teacher_rating(teacher_id).await
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    pub async fn notifications_for(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        self.dispatcher.notifications_for(user_id).await
    }

    pub async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        requesting_user_id: Uuid,
    ) -> Result<Notification> {
        self.dispatcher
            .mark_read(notification_id, requesting_user_id)
            .await
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    pub async fn create_teacher(&self, name: &str, email: &str) -> Result<Teacher> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() || email.is_empty() {
            return Err(EngineError::Validation(
                "Teacher name and email must not be empty".to_string(),
            ));
        }
        self.store
            .insert_teacher(Teacher::new(name.to_string(), email.to_string()))
            .await
    }

    pub async fn list_teachers(&self) -> Result<Vec<(Teacher, TeacherRatingSummary)>> {
        let teachers = self.store.list_teachers().await?;
        let mut out = Vec::with_capacity(teachers.len());
        for teacher in teachers {
            let summary = self.store.teacher_rating(teacher.id).await?;
            out.push((teacher, summary));
        }
        Ok(out)
    }

    pub async fn create_student(&self, name: &str, roll: &str) -> Result<Student> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::Validation(
                "Student name must not be empty".to_string(),
            ));
        }
        self.store
            .insert_student(Student::new(name.to_string(), roll.trim().to_string()))
            .await
    }

    /// Create a course assigned to an existing teacher.
    pub async fn create_course(
        &self,
        name: &str,
        teacher_id: Uuid,
        topics: Vec<String>,
    ) -> Result<Course> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::Validation(
                "Course name must not be empty".to_string(),
            ));
        }
        let teacher = self
            .store
            .get_teacher(teacher_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Teacher not found: {teacher_id}")))?;
        self.store
            .insert_course(Course::new(
                name.to_string(),
                teacher.id,
                teacher.name.clone(),
                topics,
            ))
            .await
    }

    pub async fn list_courses(&self) -> Result<Vec<Course>> {
        self.store.list_courses().await
    }

    pub async fn courses_for_teacher(&self, teacher_id: Uuid) -> Result<Vec<Course>> {
        self.store.courses_for_teacher(teacher_id).await
    }

    /// Delete a course and everything that depends on it.
    pub async fn delete_course(&self, course_id: Uuid) -> Result<CascadeOutcome> {
        let outcome = self
            .store
            .delete_course(course_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Course not found: {course_id}")))?;
        get_metrics().cascade_deletes_total.inc();
        Ok(outcome)
    }

    /// Delete a teacher, their courses, and everything that depends on them.
    pub async fn delete_teacher(&self, teacher_id: Uuid) -> Result<CascadeOutcome> {
        let outcome = self
            .store
            .delete_teacher(teacher_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Teacher not found: {teacher_id}")))?;
        get_metrics().cascade_deletes_total.inc();
        Ok(outcome)
    }

    /// Delete a student and everything that depends on them.
    pub async fn delete_student(&self, student_id: Uuid) -> Result<CascadeOutcome> {
        let outcome = self
            .store
            .delete_student(student_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Student not found: {student_id}")))?;
        get_metrics().cascade_deletes_total.inc();
        Ok(outcome)
    }
}
