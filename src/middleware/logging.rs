use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::{error, info, warn};

/// Outcome a handler attaches to its response for the logging middleware.
#[derive(Clone, Debug)]
pub enum ApiOutcome {
    Ok,
    Rejected(String),
    Failed(String),
}

pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    let elapsed = start.elapsed();
    match response.extensions().get::<ApiOutcome>() {
        Some(ApiOutcome::Ok) => info!(
            method = %method,
            uri = %uri,
            status = %status,
            elapsed = ?elapsed,
            "Processed request"
        ),
        Some(ApiOutcome::Rejected(reason)) => warn!(
            method = %method,
            uri = %uri,
            status = %status,
            elapsed = ?elapsed,
            reason = %reason,
            "Rejected request"
        ),
        Some(ApiOutcome::Failed(value)) => error!(
            method = %method,
            uri = %uri,
            status = %status,
            elapsed = ?elapsed,
            value = %value,
            "Failed to process request"
        ),
        None => warn!(
            method = %method,
            uri = %uri,
            status = %status,
            elapsed = ?elapsed,
            "Processed request, but no Response extension is set"
        ),
    }

    response
}

pub fn to_response<T: IntoResponse>(
    response: T,       //The response that we are sending + StatusCode
    ext: ApiOutcome,   //What the logging middleware should report
) -> Response {
    let mut response = response.into_response();

    response.extensions_mut().insert(ext);

    response
}
