//! Storage trait for the query lifecycle engine.
//!
//! The engine talks to storage through this seam only; the persistence
//! technology behind it is a backend choice. [`MemoryStore`] is the
//! reference implementation.
//!
//! [`MemoryStore`]: crate::store::MemoryStore

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::store::types::{
    AnswerOutcome, CascadeOutcome, Course, CourseStudent, Notification, Query, Rating, Student,
    Teacher, TeacherRatingSummary,
};

/// Storage backend for all engine records.
///
/// Multi-record mutations (answer transition, rating upsert plus summary
/// recompute, cascade deletes) must commit atomically: a failure may not
/// leave partial state behind.
#[async_trait]
pub trait EngineStore: Send + Sync {
    // ------------------------------------------------------------------
    // Teachers
    // ------------------------------------------------------------------

    async fn insert_teacher(&self, teacher: Teacher) -> Result<Teacher>;

    async fn get_teacher(&self, id: Uuid) -> Result<Option<Teacher>>;

    async fn list_teachers(&self) -> Result<Vec<Teacher>>;

    /// Remove a teacher, their courses, and every dependent query, rating,
    /// and notification. Returns `None` when the teacher does not exist.
    async fn delete_teacher(&self, id: Uuid) -> Result<Option<CascadeOutcome>>;

    // ------------------------------------------------------------------
    // Students
    // ------------------------------------------------------------------

    async fn insert_student(&self, student: Student) -> Result<Student>;

    async fn get_student(&self, id: Uuid) -> Result<Option<Student>>;

    /// Remove a student and every query, rating, and notification that
    /// depends on them. Returns `None` when the student does not exist.
    async fn delete_student(&self, id: Uuid) -> Result<Option<CascadeOutcome>>;

    // ------------------------------------------------------------------
    // Courses
    // ------------------------------------------------------------------

    async fn insert_course(&self, course: Course) -> Result<Course>;

    async fn get_course(&self, id: Uuid) -> Result<Option<Course>>;

    async fn list_courses(&self) -> Result<Vec<Course>>;

    async fn courses_for_teacher(&self, teacher_id: Uuid) -> Result<Vec<Course>>;

    /// Remove a course and every dependent query, rating, and notification.
    /// Returns `None` when the course does not exist.
    async fn delete_course(&self, id: Uuid) -> Result<Option<CascadeOutcome>>;

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    async fn insert_query(&self, query: Query) -> Result<Query>;

    async fn get_query(&self, id: Uuid) -> Result<Option<Query>>;

    /// Apply the answer transition.
    ///
    /// Fails with `NotFound` for an unknown query, `Authorization` when the
    /// teacher is not the one captured on the query, and `Validation` for a
    /// blank answer. Re-answering an already-answered query updates the
    /// answer text and timestamp in place.
    async fn answer_query(
        &self,
        query_id: Uuid,
        teacher_id: Uuid,
        answer_text: &str,
    ) -> Result<AnswerOutcome>;

    /// All of a student's queries, newest first.
    async fn queries_for_student(&self, student_id: Uuid) -> Result<Vec<Query>>;

    /// A student's queries in one course, newest first. With
    /// `answered_only`, restricted to answered queries, newest answered
    /// first.
    async fn queries_for_student_course(
        &self,
        student_id: Uuid,
        course_id: Uuid,
        answered_only: bool,
    ) -> Result<Vec<Query>>;

    /// Queries assigned to a teacher, newest first; optionally only the
    /// pending ones.
    async fn queries_for_teacher(&self, teacher_id: Uuid, pending_only: bool)
        -> Result<Vec<Query>>;

    /// Answered queries for a course, newest answered first. This is the
    /// FAQ projection and the similarity matcher's candidate pool.
    async fn faq_for_course(&self, course_id: Uuid) -> Result<Vec<Query>>;

    /// Answered queries across all courses, newest answered first.
    async fn faq_all(&self) -> Result<Vec<Query>>;

    /// Students who asked in a course, with pending status.
    async fn course_roster(&self, course_id: Uuid, teacher_id: Uuid)
        -> Result<Vec<CourseStudent>>;

    /// One student's queries in a course, scoped to the assigned teacher.
    async fn student_queries_in_course(
        &self,
        course_id: Uuid,
        student_id: Uuid,
        teacher_id: Uuid,
    ) -> Result<Vec<Query>>;

    // ------------------------------------------------------------------
    // Ratings
    // ------------------------------------------------------------------

    /// Insert or replace the rating for a query and recompute the teacher's
    /// summary in the same commit.
    async fn upsert_rating(&self, rating: Rating) -> Result<TeacherRatingSummary>;

    async fn rating_for_query(&self, query_id: Uuid) -> Result<Option<Rating>>;

    async fn teacher_rating(&self, teacher_id: Uuid) -> Result<TeacherRatingSummary>;

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    /// Insert a notification unless one with the same (query, kind,
    /// recipient) already exists; returns the surviving record either way.
    async fn insert_notification_once(&self, notification: Notification) -> Result<Notification>;

    /// A user's notifications, newest first.
    async fn notifications_for(&self, user_id: Uuid) -> Result<Vec<Notification>>;

    /// Mark a notification read. Only the recipient may do this; marking an
    /// already-read notification again is a no-op success.
    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> Result<Notification>;
}
