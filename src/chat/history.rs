use axum::{debug_handler, extract::{Path, Query, State}, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{requests, session, users, AppResult};

use super::store;

#[derive(Deserialize)]
pub(crate) struct HistoryQuery {
    page: Option<i64>,
    limit: Option<i64>,
}

/// Reverse-paginated chat history. Viewing history is not gated on the
/// connection state; only sending is. The conversation is created lazily on
/// first view.
#[debug_handler]
pub(crate) async fn chat_history(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(target_user_id): Path<String>,
    Query(HistoryQuery { page, limit }): Query<HistoryQuery>,
) -> AppResult<impl IntoResponse> {
    let user_id = session::require_user(&session).await?;
    let target_user_id = requests::parse_id(&target_user_id, "user")?;

    let conversation = store::get_or_create(&db_pool, &user_id, &target_user_id).await?;

    let page = page.unwrap_or(1).max(1);
    let limit = match limit {
        Some(limit) if limit >= 1 => limit,
        _ => store::DEFAULT_LIMIT,
    };
    let chat_page = store::paginate(&db_pool, &conversation.id, page, limit).await?;

    let mut sender_ids: Vec<String> =
        chat_page.messages.iter().map(|m| m.sender_id.clone()).collect();
    sender_ids.sort();
    sender_ids.dedup();
    let senders = users::cards_by_ids(&db_pool, &sender_ids).await?;

    let messages: Vec<_> = chat_page
        .messages
        .iter()
        .map(|message| {
            let sender = senders.get(&message.sender_id);
            json!({
                "senderId": message.sender_id,
                "firstName": sender.map(|c| c.first_name.as_str()).unwrap_or(""),
                "lastName": sender.map(|c| c.last_name.as_str()).unwrap_or(""),
                "text": message.text,
                "timestamp": message.timestamp,
            })
        })
        .collect();

    Ok(Json(json!({
        "message": "Chat found",
        "data": {
            "conversationId": conversation.id,
            "participants": [user_id, target_user_id],
            "messages": messages,
            "pagination": chat_page.pagination,
        },
    })))
}
