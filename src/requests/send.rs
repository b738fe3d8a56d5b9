use axum::{debug_handler, extract::{Path, State}, response::IntoResponse, Json};
use serde_json::json;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{session, AppResult};

use super::store::{self, RequestStatus};

#[debug_handler]
pub(crate) async fn send_request(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path((status, to_user_id)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let from_user_id = session::require_user(&session).await?;
    let status = super::parse_status(&status)?;
    let to_user_id = super::parse_id(&to_user_id, "user")?;

    let request = store::send(&db_pool, &from_user_id, &to_user_id, status).await?;

    tracing::info!(from = %request.from_user_id, to = %request.to_user_id, status = %request.status, "connection request sent");

    let message = match request.status {
        RequestStatus::Interested => "Interest shown successfully",
        _ => "Profile ignored successfully",
    };
    Ok(Json(json!({ "message": message, "data": request })))
}
