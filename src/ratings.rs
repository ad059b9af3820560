//! Per-teacher rating aggregation.
//!
//! Ratings attach to answered queries, one per query, upserted on
//! resubmission. The teacher summary is recomputed from all of the
//! teacher's ratings on every write, inside the store's commit, so a
//! re-rating strictly replaces the old contribution.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::store::{EngineStore, Rating, TeacherRatingSummary};

/// Validates and records ratings, maintaining teacher summaries.
pub struct RatingAggregator {
    store: Arc<dyn EngineStore>,
}

impl RatingAggregator {
    pub fn new(store: Arc<dyn EngineStore>) -> Self {
        Self { store }
    }

    /// Upsert a student's rating for one answered query.
    ///
    /// Preconditions: value in 1..=5, the query answered, `teacher_id` the
    /// query's captured teacher, `student_id` the asking student.
    /// Resubmitting the same value is a no-op success.
    pub async fn rate(
        &self,
        query_id: Uuid,
        student_id: Uuid,
        teacher_id: Uuid,
        value: u8,
    ) -> Result<TeacherRatingSummary> {
        if !(1..=5).contains(&value) {
            return Err(EngineError::Validation(
                "Rating must be between 1 and 5".to_string(),
            ));
        }

        let query = self
            .store
            .get_query(query_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Query not found: {query_id}")))?;

        if !query.answered {
            return Err(EngineError::Validation(
                "Only answered queries can be rated".to_string(),
            ));
        }
        if query.teacher_id != teacher_id {
            return Err(EngineError::Authorization(
                "Rating targets a teacher not assigned to this query".to_string(),
            ));
        }
        if query.student_id != student_id {
            return Err(EngineError::Authorization(
                "Only the asking student can rate this answer".to_string(),
            ));
        }

        let summary = self
            .store
            .upsert_rating(Rating {
                query_id,
                teacher_id,
                student_id,
                value,
                updated_at: Utc::now(),
            })
            .await?;

        info!(
            query_id = %query_id,
            teacher_id = %teacher_id,
            value,
            average = summary.average,
            total = summary.total,
            "rating recorded"
        );
        Ok(summary)
    }

    /// The rating value a query currently holds, if any.
    pub async fn rating_for_query(&self, query_id: Uuid) -> Result<Option<u8>> {
        Ok(self
            .store
            .rating_for_query(query_id)
            .await?
            .map(|r| r.value))
    }

    /// A teacher's current average and rating count.
    pub async fn teacher_rating(&self, teacher_id: Uuid) -> Result<TeacherRatingSummary> {
        self.store.teacher_rating(teacher_id).await
    }
}
