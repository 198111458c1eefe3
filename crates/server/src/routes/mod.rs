//! HTTP route handlers for the export API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health        - Liveness check
//! GET  /health/ready  - Readiness check (verifies database connectivity)
//!
//! POST /api/orders    - Query orders by filter criteria
//! GET  /api/info      - Service and host shop version info
//! ```

pub mod info;
pub mod orders;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router.
pub fn router() -> Router<AppState> {
    Router::new().merge(orders::router()).merge(info::router())
}
