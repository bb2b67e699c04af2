//! Route definitions for customer-assignment rules.
//!
//! ```text
//! GET    /                  -> list_rules
//! POST   /                  -> create_rule
//! POST   /{id}/deactivate   -> deactivate_rule
//! POST   /execute           -> execute_rules
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::rules;
use crate::state::AppState;

/// Administration routes, mounted at `/rules`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(rules::list_rules).post(rules::create_rule))
        .route("/{id}/deactivate", post(rules::deactivate_rule))
}

/// Engine route, mounted at `/rules`.
pub fn execution_router() -> Router<AppState> {
    Router::new().route("/execute", post(rules::execute_rules))
}
