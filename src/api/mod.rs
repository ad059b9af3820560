//! HTTP boundary: router and request handlers.

pub mod handlers;
pub mod rest;

pub use handlers::{Actor, ApiState, Role};
pub use rest::{create_rest_router, RestApiConfig};
