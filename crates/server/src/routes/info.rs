//! Service info endpoint.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::state::AppState;

/// Build the info router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/info", get(info))
}

/// Version info reported to export consumers.
#[derive(Debug, Serialize)]
pub struct InfoResponse {
    /// Version of this service.
    pub module_version: String,
    /// Version of the host shop the database belongs to.
    pub shop_version: String,
    /// Edition of the host shop; empty when not configured.
    pub shop_edition: String,
}

/// Report the service version and the configured host shop version.
pub async fn info(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        module_version: env!("CARGO_PKG_VERSION").to_string(),
        shop_version: state.config().shop_version.clone(),
        shop_edition: state.config().shop_edition.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_version_matches_the_crate() {
        let response = InfoResponse {
            module_version: env!("CARGO_PKG_VERSION").to_string(),
            shop_version: "1.9.4.5".into(),
            shop_edition: String::new(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["module_version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(json["shop_edition"], "");
    }
}
