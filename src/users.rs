use std::collections::{HashMap, HashSet};

use axum::{debug_handler, extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use serde_json::json;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{requests::store, session, AppResult, AppState};

/// The card projection: the profile fields other users may see. Nothing
/// credential-shaped ever leaves this module.
pub const CARD_COLUMNS: &str =
    "id,first_name,last_name,profile_picture,bio,skills,experience_level,location,social_links";

type CardRow = (
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
    String,
);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCard {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub experience_level: Option<String>,
    pub location: Option<String>,
    pub social_links: Vec<String>,
}

fn card(row: CardRow) -> UserCard {
    let (id, first_name, last_name, profile_picture, bio, skills, experience_level, location, social_links) = row;
    UserCard {
        id,
        first_name,
        last_name,
        profile_picture,
        bio,
        skills: serde_json::from_str(&skills).unwrap_or_default(),
        experience_level,
        location,
        social_links: serde_json::from_str(&social_links).unwrap_or_default(),
    }
}

pub async fn exists(db_pool: &SqlitePool, user_id: &str) -> AppResult<bool> {
    Ok(sqlx::query_as::<_, (i64,)>("SELECT 1 FROM users WHERE id=?")
        .bind(user_id)
        .fetch_optional(db_pool)
        .await?
        .is_some())
}

/// One batched lookup for a set of ids, keyed for zipping back onto whatever
/// referenced them.
pub async fn cards_by_ids(
    db_pool: &SqlitePool,
    ids: &[String],
) -> AppResult<HashMap<String, UserCard>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders = vec!["?"; ids.len()].join(",");
    let sql = format!("SELECT {CARD_COLUMNS} FROM users WHERE id IN ({placeholders})");
    let mut query = sqlx::query_as::<_, CardRow>(&sql);
    for id in ids {
        query = query.bind(id);
    }

    let rows = query.fetch_all(db_pool).await?;
    Ok(rows.into_iter().map(card).map(|c| (c.id.clone(), c)).collect())
}

/// Candidate population minus the exclusion set, in stable insertion order.
pub async fn cards_excluding(
    db_pool: &SqlitePool,
    exclude: &HashSet<String>,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<UserCard>> {
    let placeholders = vec!["?"; exclude.len()].join(",");
    let sql = format!(
        "SELECT {CARD_COLUMNS} FROM users WHERE id NOT IN ({placeholders}) ORDER BY rowid LIMIT ? OFFSET ?"
    );
    let mut query = sqlx::query_as::<_, CardRow>(&sql);
    for id in exclude {
        query = query.bind(id);
    }
    let rows = query.bind(limit).bind(offset).fetch_all(db_pool).await?;
    Ok(rows.into_iter().map(card).collect())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/requests/received", get(received_requests))
        .route("/user/connections", get(connections))
}

#[debug_handler]
async fn received_requests(
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<impl IntoResponse> {
    let user_id = session::require_user(&session).await?;

    let pending = store::pending_received(&db_pool, &user_id).await?;
    let sender_ids: Vec<String> = pending.iter().map(|r| r.from_user_id.clone()).collect();
    let cards = cards_by_ids(&db_pool, &sender_ids).await?;

    let data: Vec<_> = pending
        .iter()
        .filter_map(|request| {
            let from_user = cards.get(&request.from_user_id)?;
            Some(json!({
                "requestId": request.id,
                "fromUser": from_user,
                "status": request.status,
                "createdAt": request.created_at,
            }))
        })
        .collect();

    let message = if data.is_empty() { "No requests found" } else { "Connection requests found" };
    Ok(Json(json!({ "message": message, "data": data })))
}

#[debug_handler]
async fn connections(
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<impl IntoResponse> {
    let user_id = session::require_user(&session).await?;

    let accepted = store::accepted_for(&db_pool, &user_id).await?;
    let counterpart_ids: Vec<String> = accepted
        .iter()
        .map(|r| r.counterpart(&user_id).to_owned())
        .collect();
    let cards = cards_by_ids(&db_pool, &counterpart_ids).await?;

    let data: Vec<_> = accepted
        .iter()
        .filter_map(|request| {
            let user = cards.get(request.counterpart(&user_id))?;
            Some(json!({
                "connectionId": request.id,
                "user": user,
                "status": request.status,
            }))
        })
        .collect();

    Ok(Json(json!({
        "message": "Connected users fetched successfully",
        "data": data,
    })))
}
