//! Lyceum: Query Lifecycle & Feedback Engine
//!
//! Server-side domain logic for course Q&A: submission intake (moderation,
//! subject relevance, duplicate detection), the pending → answered query
//! state machine, per-teacher rating aggregation, and per-student
//! notifications, exposed over an HTTP contract.

pub mod api;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod intake;
pub mod metrics;
pub mod notify;
pub mod ratings;
pub mod store;

pub use api::{create_rest_router, ApiState, RestApiConfig};
pub use config::Config;
pub use coordinator::QueryCoordinator;
pub use error::{ConfigError, EngineError, Result};
pub use intake::{
    FaqMatch, IntakeOutcome, ModerationFilter, RejectReason, RelevanceChecker, SimilarityMatcher,
    TokenOverlapMatcher,
};
pub use metrics::{get_metrics, HealthStatus, Metrics};
pub use notify::NotificationDispatcher;
pub use ratings::RatingAggregator;
pub use store::{
    CascadeOutcome, Course, CourseStudent, EngineStore, MemoryStore, Notification,
    NotificationKind, Query, Rating, Student, Teacher, TeacherRatingSummary,
};
