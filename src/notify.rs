//! Notification dispatcher.
//!
//! One notification per state transition relevant to a user: the asking
//! student when their query is first answered, the assigned teacher when a
//! new question lands. Auto-answered submissions produce none; the match
//! is already in the response.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::store::{EngineStore, Notification, NotificationKind, Query};

/// Builds and records notifications for query events.
pub struct NotificationDispatcher {
    store: Arc<dyn EngineStore>,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn EngineStore>) -> Self {
        Self { store }
    }

    /// Notify the asking student that their query was answered.
    ///
    /// Idempotent per query: the store keys the insert on (query, kind,
    /// recipient), so a retry or a re-answer can never produce a second
    /// notification.
    pub async fn on_query_answered(&self, query: &Query) -> Result<Notification> {
        let notification = Notification::new(
            query.student_id,
            format!("Your {} Query has been answered!!", query.course_name),
            query.id,
            query.course_id,
            NotificationKind::QueryAnswered,
        );
        let stored = self.store.insert_notification_once(notification).await?;
        debug!(query_id = %query.id, student_id = %query.student_id, "answer notification recorded");
        Ok(stored)
    }

    /// Notify the assigned teacher that a new question was raised.
    pub async fn on_query_submitted(&self, query: &Query) -> Result<Notification> {
        let notification = Notification::new(
            query.teacher_id,
            format!(
                "{} Raised a Question on {}",
                query.student_roll, query.course_name
            ),
            query.id,
            query.course_id,
            NotificationKind::QueryRaised,
        );
        self.store.insert_notification_once(notification).await
    }

    /// A user's notifications, newest first.
    pub async fn notifications_for(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        self.store.notifications_for(user_id).await
    }

    /// Mark a notification read on behalf of its recipient.
    pub async fn mark_read(
        &self,
        notification_id: Uuid,
        requesting_user_id: Uuid,
    ) -> Result<Notification> {
        self.store
            .mark_notification_read(notification_id, requesting_user_id)
            .await
    }
}
