use actix_web::{
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    Error,
};

use crate::api::metrics::{increment_error_count, increment_request_count};

/// Counts every request, and every 4xx/5xx or failed request as an error
pub async fn track_requests(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    increment_request_count();

    let res = next.call(req).await;
    match &res {
        Ok(response) if response.status().is_client_error() || response.status().is_server_error() => {
            increment_error_count()
        }
        Err(_) => increment_error_count(),
        Ok(_) => {}
    }

    res
}
