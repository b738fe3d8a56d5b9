use axum::{debug_handler, extract::{Path, State}, response::IntoResponse, Json};
use serde_json::json;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{session, AppResult};

use super::store::{self, RequestStatus};

#[debug_handler]
pub(crate) async fn review_request(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path((status, request_id)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let reviewing_user_id = session::require_user(&session).await?;
    let status = super::parse_status(&status)?;
    let request_id = super::parse_id(&request_id, "request")?;

    let request = store::review(&db_pool, &reviewing_user_id, &request_id, status).await?;

    let message = match request.status {
        RequestStatus::Accepted => "Connection request accepted successfully",
        _ => "Connection request rejected successfully",
    };
    Ok(Json(json!({ "message": message, "data": request })))
}
