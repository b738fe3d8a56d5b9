use axum::{debug_handler, extract::{Path, State}, response::IntoResponse, Json};
use serde_json::json;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{session, AppResult};

use super::store;

#[debug_handler]
pub(crate) async fn cancel_request(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(to_user_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let user_id = session::require_user(&session).await?;
    let to_user_id = super::parse_id(&to_user_id, "user")?;

    store::cancel(&db_pool, &user_id, &to_user_id).await?;

    Ok(Json(json!({ "message": "Connection request cancelled successfully" })))
}
