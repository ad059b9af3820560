//! In-memory storage backend.
//!
//! All tables live behind a single `RwLock`, so every multi-record
//! mutation (the answer transition, rating upsert with summary recompute,
//! the three cascade deletes) commits under one write guard and can never
//! be observed half-applied.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::store::traits::EngineStore;
use crate::store::types::{
    AnswerOutcome, CascadeOutcome, Course, CourseStudent, Notification, Query, Rating, Student,
    Teacher, TeacherRatingSummary,
};

/// Listing caps, matching what the client pages through.
const QUERY_LIST_LIMIT: usize = 100;
const FAQ_COURSE_LIMIT: usize = 50;
const FAQ_ALL_LIMIT: usize = 200;
const NOTIFICATION_LIST_LIMIT: usize = 50;

#[derive(Default)]
struct Tables {
    teachers: HashMap<Uuid, Teacher>,
    students: HashMap<Uuid, Student>,
    courses: HashMap<Uuid, Course>,
    queries: HashMap<Uuid, Query>,
    /// Keyed by query id: at most one rating per query.
    ratings: HashMap<Uuid, Rating>,
    notifications: HashMap<Uuid, Notification>,
}

impl Tables {
    fn summary_for(&self, teacher_id: Uuid) -> TeacherRatingSummary {
        let values: Vec<u8> = self
            .ratings
            .values()
            .filter(|r| r.teacher_id == teacher_id)
            .map(|r| r.value)
            .collect();
        if values.is_empty() {
            return TeacherRatingSummary::empty();
        }
        let sum: u64 = values.iter().map(|v| *v as u64).sum();
        TeacherRatingSummary {
            average: sum as f64 / values.len() as f64,
            total: values.len(),
        }
    }

    /// Remove the given queries along with their ratings and notifications.
    fn remove_query_set(&mut self, query_ids: &[Uuid], outcome: &mut CascadeOutcome) {
        for id in query_ids {
            if self.queries.remove(id).is_some() {
                outcome.queries_removed += 1;
            }
            if self.ratings.remove(id).is_some() {
                outcome.ratings_removed += 1;
            }
        }
        let before = self.notifications.len();
        self.notifications
            .retain(|_, n| !query_ids.contains(&n.query_id));
        outcome.notifications_removed += before - self.notifications.len();
    }

    /// Remove notifications addressed to a deleted user.
    fn remove_notifications_for_user(&mut self, user_id: Uuid, outcome: &mut CascadeOutcome) {
        let before = self.notifications.len();
        self.notifications.retain(|_, n| n.user_id != user_id);
        outcome.notifications_removed += before - self.notifications.len();
    }
}

/// In-memory [`EngineStore`] implementation.
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sorted_newest_first(mut queries: Vec<Query>, by_answered_at: bool) -> Vec<Query> {
    if by_answered_at {
        queries.sort_by(|a, b| b.answered_at.cmp(&a.answered_at));
    } else {
        queries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }
    queries
}

#[async_trait]
impl EngineStore for MemoryStore {
    // ------------------------------------------------------------------
    // Teachers
    // ------------------------------------------------------------------

    async fn insert_teacher(&self, teacher: Teacher) -> Result<Teacher> {
        let mut tables = self.tables.write().await;
        if tables.teachers.values().any(|t| t.email == teacher.email) {
            return Err(EngineError::Validation(
                "Email already registered".to_string(),
            ));
        }
        tables.teachers.insert(teacher.id, teacher.clone());
        Ok(teacher)
    }

    async fn get_teacher(&self, id: Uuid) -> Result<Option<Teacher>> {
        Ok(self.tables.read().await.teachers.get(&id).cloned())
    }

    async fn list_teachers(&self) -> Result<Vec<Teacher>> {
        let tables = self.tables.read().await;
        let mut teachers: Vec<Teacher> = tables.teachers.values().cloned().collect();
        teachers.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(teachers)
    }

    async fn delete_teacher(&self, id: Uuid) -> Result<Option<CascadeOutcome>> {
        let mut tables = self.tables.write().await;
        if tables.teachers.remove(&id).is_none() {
            return Ok(None);
        }
        let mut outcome = CascadeOutcome::default();

        let course_ids: Vec<Uuid> = tables
            .courses
            .values()
            .filter(|c| c.teacher_id == id)
            .map(|c| c.id)
            .collect();
        for course_id in &course_ids {
            tables.courses.remove(course_id);
        }
        outcome.courses_removed = course_ids.len();

        // Queries captured this teacher at creation time, so the filter also
        // covers queries whose course was reassigned since.
        let query_ids: Vec<Uuid> = tables
            .queries
            .values()
            .filter(|q| q.teacher_id == id || course_ids.contains(&q.course_id))
            .map(|q| q.id)
            .collect();
        tables.remove_query_set(&query_ids, &mut outcome);
        tables.remove_notifications_for_user(id, &mut outcome);

        info!(teacher_id = %id, ?outcome, "teacher removed with cascade");
        Ok(Some(outcome))
    }

    // ------------------------------------------------------------------
    // Students
    // ------------------------------------------------------------------

    async fn insert_student(&self, student: Student) -> Result<Student> {
        let mut tables = self.tables.write().await;
        tables.students.insert(student.id, student.clone());
        Ok(student)
    }

    async fn get_student(&self, id: Uuid) -> Result<Option<Student>> {
        Ok(self.tables.read().await.students.get(&id).cloned())
    }

    async fn delete_student(&self, id: Uuid) -> Result<Option<CascadeOutcome>> {
        let mut tables = self.tables.write().await;
        if tables.students.remove(&id).is_none() {
            return Ok(None);
        }
        let mut outcome = CascadeOutcome::default();
        let query_ids: Vec<Uuid> = tables
            .queries
            .values()
            .filter(|q| q.student_id == id)
            .map(|q| q.id)
            .collect();
        tables.remove_query_set(&query_ids, &mut outcome);
        tables.remove_notifications_for_user(id, &mut outcome);

        info!(student_id = %id, ?outcome, "student removed with cascade");
        Ok(Some(outcome))
    }

    // ------------------------------------------------------------------
    // Courses
    // ------------------------------------------------------------------

    async fn insert_course(&self, course: Course) -> Result<Course> {
        let mut tables = self.tables.write().await;
        tables.courses.insert(course.id, course.clone());
        Ok(course)
    }

    async fn get_course(&self, id: Uuid) -> Result<Option<Course>> {
        Ok(self.tables.read().await.courses.get(&id).cloned())
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        let tables = self.tables.read().await;
        let mut courses: Vec<Course> = tables.courses.values().cloned().collect();
        courses.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(courses)
    }

    async fn courses_for_teacher(&self, teacher_id: Uuid) -> Result<Vec<Course>> {
        let tables = self.tables.read().await;
        let mut courses: Vec<Course> = tables
            .courses
            .values()
            .filter(|c| c.teacher_id == teacher_id)
            .cloned()
            .collect();
        courses.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(courses)
    }

    async fn delete_course(&self, id: Uuid) -> Result<Option<CascadeOutcome>> {
        let mut tables = self.tables.write().await;
        if tables.courses.remove(&id).is_none() {
            return Ok(None);
        }
        let mut outcome = CascadeOutcome {
            courses_removed: 1,
            ..Default::default()
        };
        let query_ids: Vec<Uuid> = tables
            .queries
            .values()
            .filter(|q| q.course_id == id)
            .map(|q| q.id)
            .collect();
        tables.remove_query_set(&query_ids, &mut outcome);

        info!(course_id = %id, ?outcome, "course removed with cascade");
        Ok(Some(outcome))
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    async fn insert_query(&self, query: Query) -> Result<Query> {
        let mut tables = self.tables.write().await;
        tables.queries.insert(query.id, query.clone());
        Ok(query)
    }

    async fn get_query(&self, id: Uuid) -> Result<Option<Query>> {
        Ok(self.tables.read().await.queries.get(&id).cloned())
    }

    async fn answer_query(
        &self,
        query_id: Uuid,
        teacher_id: Uuid,
        answer_text: &str,
    ) -> Result<AnswerOutcome> {
        let answer_text = answer_text.trim();
        if answer_text.is_empty() {
            return Err(EngineError::Validation(
                "Answer text must not be empty".to_string(),
            ));
        }

        let mut tables = self.tables.write().await;
        let query = tables
            .queries
            .get_mut(&query_id)
            .ok_or_else(|| EngineError::NotFound(format!("Query not found: {query_id}")))?;
        if query.teacher_id != teacher_id {
            return Err(EngineError::Authorization(
                "This query is not assigned to you".to_string(),
            ));
        }

        let first_transition = !query.answered;
        query.answer = Some(answer_text.to_string());
        query.answered = true;
        query.answered_at = Some(Utc::now());
        debug_assert!(query.invariant_holds());

        Ok(AnswerOutcome {
            query: query.clone(),
            first_transition,
        })
    }

    async fn queries_for_student(&self, student_id: Uuid) -> Result<Vec<Query>> {
        let tables = self.tables.read().await;
        let queries = tables
            .queries
            .values()
            .filter(|q| q.student_id == student_id)
            .cloned()
            .collect();
        Ok(sorted_newest_first(queries, false)
            .into_iter()
            .take(QUERY_LIST_LIMIT)
            .collect())
    }

    async fn queries_for_student_course(
        &self,
        student_id: Uuid,
        course_id: Uuid,
        answered_only: bool,
    ) -> Result<Vec<Query>> {
        let tables = self.tables.read().await;
        let queries = tables
            .queries
            .values()
            .filter(|q| {
                q.student_id == student_id
                    && q.course_id == course_id
                    && (!answered_only || q.answered)
            })
            .cloned()
            .collect();
        Ok(sorted_newest_first(queries, answered_only)
            .into_iter()
            .take(QUERY_LIST_LIMIT)
            .collect())
    }

    async fn queries_for_teacher(
        &self,
        teacher_id: Uuid,
        pending_only: bool,
    ) -> Result<Vec<Query>> {
        let tables = self.tables.read().await;
        let queries = tables
            .queries
            .values()
            .filter(|q| q.teacher_id == teacher_id && (!pending_only || !q.answered))
            .cloned()
            .collect();
        Ok(sorted_newest_first(queries, false)
            .into_iter()
            .take(QUERY_LIST_LIMIT)
            .collect())
    }

    async fn faq_for_course(&self, course_id: Uuid) -> Result<Vec<Query>> {
        let tables = self.tables.read().await;
        let queries = tables
            .queries
            .values()
            .filter(|q| q.course_id == course_id && q.answered)
            .cloned()
            .collect();
        Ok(sorted_newest_first(queries, true)
            .into_iter()
            .take(FAQ_COURSE_LIMIT)
            .collect())
    }

    async fn faq_all(&self) -> Result<Vec<Query>> {
        let tables = self.tables.read().await;
        let queries = tables
            .queries
            .values()
            .filter(|q| q.answered)
            .cloned()
            .collect();
        Ok(sorted_newest_first(queries, true)
            .into_iter()
            .take(FAQ_ALL_LIMIT)
            .collect())
    }

    async fn course_roster(
        &self,
        course_id: Uuid,
        teacher_id: Uuid,
    ) -> Result<Vec<CourseStudent>> {
        let tables = self.tables.read().await;
        let mut roster: HashMap<Uuid, CourseStudent> = HashMap::new();
        for q in tables
            .queries
            .values()
            .filter(|q| q.course_id == course_id && q.teacher_id == teacher_id)
        {
            let entry = roster.entry(q.student_id).or_insert_with(|| CourseStudent {
                student_id: q.student_id,
                student_name: q.student_name.clone(),
                student_roll: q.student_roll.clone(),
                has_pending: false,
            });
            if !q.answered {
                entry.has_pending = true;
            }
        }
        let mut students: Vec<CourseStudent> = roster.into_values().collect();
        students.sort_by(|a, b| a.student_roll.cmp(&b.student_roll));
        Ok(students)
    }

    async fn student_queries_in_course(
        &self,
        course_id: Uuid,
        student_id: Uuid,
        teacher_id: Uuid,
    ) -> Result<Vec<Query>> {
        let tables = self.tables.read().await;
        let queries = tables
            .queries
            .values()
            .filter(|q| {
                q.course_id == course_id
                    && q.student_id == student_id
                    && q.teacher_id == teacher_id
            })
            .cloned()
            .collect();
        Ok(sorted_newest_first(queries, false)
            .into_iter()
            .take(QUERY_LIST_LIMIT)
            .collect())
    }

    // ------------------------------------------------------------------
    // Ratings
    // ------------------------------------------------------------------

    async fn upsert_rating(&self, rating: Rating) -> Result<TeacherRatingSummary> {
        let mut tables = self.tables.write().await;
        let teacher_id = rating.teacher_id;
        tables.ratings.insert(rating.query_id, rating);
        // Recompute inside the same write guard: concurrent ratings for one
        // teacher serialize here, so no update is lost.
        Ok(tables.summary_for(teacher_id))
    }

    async fn rating_for_query(&self, query_id: Uuid) -> Result<Option<Rating>> {
        Ok(self.tables.read().await.ratings.get(&query_id).cloned())
    }

    async fn teacher_rating(&self, teacher_id: Uuid) -> Result<TeacherRatingSummary> {
        Ok(self.tables.read().await.summary_for(teacher_id))
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    async fn insert_notification_once(&self, notification: Notification) -> Result<Notification> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .notifications
            .values()
            .find(|n| {
                n.query_id == notification.query_id
                    && n.kind == notification.kind
                    && n.user_id == notification.user_id
            })
            .cloned()
        {
            return Ok(existing);
        }
        tables
            .notifications
            .insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn notifications_for(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        let tables = self.tables.read().await;
        let mut notifications: Vec<Notification> = tables
            .notifications
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notifications.truncate(NOTIFICATION_LIST_LIMIT);
        Ok(notifications)
    }

    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> Result<Notification> {
        let mut tables = self.tables.write().await;
        let notification = tables.notifications.get_mut(&notification_id).ok_or_else(|| {
            EngineError::NotFound(format!("Notification not found: {notification_id}"))
        })?;
        if notification.user_id != user_id {
            return Err(EngineError::Authorization(
                "Notification belongs to another user".to_string(),
            ));
        }
        notification.read = true;
        Ok(notification.clone())
    }
}
