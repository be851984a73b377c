use axum::http::StatusCode;

/// GET /livez
pub async fn livez() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// GET /readyz
///
/// The dispatcher is built before the listener binds, so a serving process
/// is always ready.
pub async fn readyz() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}
