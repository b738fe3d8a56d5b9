pub mod store;

mod cancel;
mod review;
mod send;

use axum::{routing::{delete, post}, Router};
use uuid::Uuid;

use crate::{AppError, AppResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/request/send/{status}/{to_user_id}", post(send::send_request))
        .route("/request/review/{status}/{request_id}", post(review::review_request))
        .route("/request/cancel/{to_user_id}", delete(cancel::cancel_request))
}

pub(crate) fn parse_id(id: &str, what: &str) -> AppResult<String> {
    Uuid::parse_str(id)
        .map(|uuid| uuid.to_string())
        .map_err(|_| AppError::InvalidArgument(format!("Invalid {what} ID format")))
}

pub(crate) fn parse_status(status: &str) -> AppResult<store::RequestStatus> {
    store::RequestStatus::parse(status)
        .ok_or(AppError::InvalidArgument(format!("Invalid status: {status}")))
}
