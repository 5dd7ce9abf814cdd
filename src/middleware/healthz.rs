use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Path of the liveness probe.
pub const HEALTHZ_PATH: &str = "/healthz";

/// Answers `204 No Content` for the probe path (query included in the
/// comparison) and forwards everything else untouched.
pub async fn healthz(req: Request, next: Next) -> Response {
    let target = req.uri().path_and_query().map(|pq| pq.as_str());
    if target == Some(HEALTHZ_PATH) {
        return StatusCode::NO_CONTENT.into_response();
    }
    next.run(req).await
}
