use crate::api::APP_USER_AGENT;
use axum::response::IntoResponse;

// axum handler for the bare root, useful as a cheap reachability probe
pub async fn root() -> impl IntoResponse {
    APP_USER_AGENT
}
