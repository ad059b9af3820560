//! Record types held by the query store.
//!
//! Queries denormalize course and student display fields at creation time,
//! so listings render without joins and survive later renames.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A teacher account, created by an administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teacher {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl Teacher {
    pub fn new(name: String, email: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            created_at: Utc::now(),
        }
    }
}

/// A student known to the engine. Registration itself happens upstream;
/// the engine only needs the reference and display fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub roll: String,
    pub created_at: DateTime<Utc>,
}

impl Student {
    pub fn new(name: String, roll: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            roll,
            created_at: Utc::now(),
        }
    }
}

/// A course (subject) with its assigned teacher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub name: String,
    pub teacher_id: Uuid,
    pub teacher_name: String,
    /// Topic keywords for the relevance check. Empty means the course
    /// accepts any question.
    #[serde(default)]
    pub topics: Vec<String>,
}

impl Course {
    pub fn new(name: String, teacher_id: Uuid, teacher_name: String, topics: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            teacher_id,
            teacher_name,
            topics,
        }
    }

    /// Normalized topic keywords as a set.
    pub fn topic_set(&self) -> HashSet<String> {
        self.topics.iter().map(|t| t.to_lowercase()).collect()
    }
}

/// A student-submitted question, progressing from pending to answered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub id: Uuid,
    pub course_id: Uuid,
    pub course_name: String,
    pub student_id: Uuid,
    pub student_name: String,
    pub student_roll: String,
    /// The course's assigned teacher, captured at creation time.
    pub teacher_id: Uuid,
    pub question: String,
    pub answer: Option<String>,
    pub answered: bool,
    pub created_at: DateTime<Utc>,
    pub answered_at: Option<DateTime<Utc>>,
}

impl Query {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        course_id: Uuid,
        course_name: String,
        student_id: Uuid,
        student_name: String,
        student_roll: String,
        teacher_id: Uuid,
        question: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            course_id,
            course_name,
            student_id,
            student_name,
            student_roll,
            teacher_id,
            question,
            answer: None,
            answered: false,
            created_at: Utc::now(),
            answered_at: None,
        }
    }

    /// `answered` must agree with the presence of `answer` and `answered_at`.
    pub fn invariant_holds(&self) -> bool {
        self.answered == (self.answer.is_some() && self.answered_at.is_some())
    }
}

/// Result of an answer transition.
#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    pub query: Query,
    /// True only for the first pending → answered transition; re-edits of
    /// an already-answered query report false.
    pub first_transition: bool,
}

/// A 1-5 evaluation of a teacher's answer to one query. At most one per
/// query; resubmission replaces the value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
    pub query_id: Uuid,
    pub teacher_id: Uuid,
    pub student_id: Uuid,
    pub value: u8,
    pub updated_at: DateTime<Utc>,
}

/// Derived per-teacher rating summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeacherRatingSummary {
    pub average: f64,
    pub total: usize,
}

impl TeacherRatingSummary {
    pub fn empty() -> Self {
        Self {
            average: 0.0,
            total: 0,
        }
    }
}

/// What a notification announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A student's query received its first answer.
    QueryAnswered,
    /// A new question landed in one of the teacher's courses.
    QueryRaised,
}

/// A per-user record announcing a query event. Mutated only by its
/// recipient (mark-read); removed only by cascade deletes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub query_id: Uuid,
    pub course_id: Uuid,
    pub kind: NotificationKind,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: Uuid,
        message: String,
        query_id: Uuid,
        course_id: Uuid,
        kind: NotificationKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            message,
            query_id,
            course_id,
            kind,
            read: false,
            created_at: Utc::now(),
        }
    }
}

/// Roster entry: a student who asked in a course, with pending status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseStudent {
    pub student_id: Uuid,
    pub student_name: String,
    pub student_roll: String,
    pub has_pending: bool,
}

/// Tally of records removed by a cascade delete.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CascadeOutcome {
    pub courses_removed: usize,
    pub queries_removed: usize,
    pub ratings_removed: usize,
    pub notifications_removed: usize,
}
