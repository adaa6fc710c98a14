use actix_web::{http::StatusCode, web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::database::UserStore;

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    /// "ok" when the user store answered, "unavailable" otherwise
    pub storage: String,
    pub timestamp: i64,
}

fn health_report(storage_ok: bool) -> (StatusCode, HealthResponse) {
    let (status, code, storage) = if storage_ok {
        ("healthy", StatusCode::OK, "ok")
    } else {
        ("degraded", StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };

    (
        code,
        HealthResponse {
            status: status.to_string(),
            service: "scamurai".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            storage: storage.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        },
    )
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service and user store are up", body = HealthResponse),
        (status = 503, description = "User store is unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(store: web::Data<dyn UserStore>) -> HttpResponse {
    let storage_ok = match store.ping().await {
        Ok(()) => true,
        Err(e) => {
            log::error!("❌ Health check: user store unreachable: {}", e);
            false
        }
    };

    let (code, report) = health_report(storage_ok);
    HttpResponse::build(code).json(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_when_store_is_down() {
        let (code, report) = health_report(false);
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(report.status, "degraded");
        assert_eq!(report.storage, "unavailable");

        let (code, report) = health_report(true);
        assert_eq!(code, StatusCode::OK);
        assert_eq!(report.storage, "ok");
    }
}
