//! Shared response envelope types for API handlers.
//!
//! Listings and single resources use a `{ "data": ... }` envelope. Rule
//! executions use `{ "success", "message", "results" }`.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// Envelope for a completed rule execution.
#[derive(Debug, Serialize)]
pub struct ExecutionResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub results: T,
}
