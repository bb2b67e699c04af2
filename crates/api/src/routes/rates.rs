use axum::routing::get;
use axum::Router;

use crate::handlers::rates;
use crate::state::AppState;

/// Rate routes, mounted at `/rates`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(rates::list_rates))
}
