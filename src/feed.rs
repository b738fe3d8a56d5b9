use std::collections::HashSet;

use axum::{debug_handler, extract::{Query, State}, response::IntoResponse, routing::get, Json, Router};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{requests::store, session, users, AppResult, AppState};

const MAX_LIMIT: i64 = 30;
const DEFAULT_LIMIT: i64 = 10;

pub fn router() -> Router<AppState> {
    Router::new().route("/feed", get(feed))
}

#[derive(Deserialize)]
struct FeedQuery {
    page: Option<i64>,
    limit: Option<i64>,
}

/// Candidates the user has not touched yet: everyone minus self and minus the
/// counterpart of every connection request in either direction, any status.
/// The exclusion set is rebuilt on every call; there is no snapshot across
/// pages, so a request sent between fetches shifts later pages.
pub async fn feed_page(
    db_pool: &SqlitePool,
    user_id: &str,
    page: i64,
    limit: i64,
) -> AppResult<Vec<users::UserCard>> {
    let page = page.max(1);
    let limit = limit.min(MAX_LIMIT);

    let mut exclude = HashSet::new();
    exclude.insert(user_id.to_owned());
    for (from_user_id, to_user_id) in store::touching(db_pool, user_id).await? {
        exclude.insert(from_user_id);
        exclude.insert(to_user_id);
    }

    let offset = (page - 1).saturating_mul(limit);
    users::cards_excluding(db_pool, &exclude, limit, offset).await
}

#[debug_handler]
async fn feed(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Query(FeedQuery { page, limit }): Query<FeedQuery>,
) -> AppResult<impl IntoResponse> {
    let user_id = session::require_user(&session).await?;

    let page = page.unwrap_or(1).max(1);
    let limit = match limit {
        Some(limit) if limit >= 1 => limit.min(MAX_LIMIT),
        _ => DEFAULT_LIMIT,
    };

    let cards = feed_page(&db_pool, &user_id, page, limit).await?;
    Ok(Json(json!({
        "message": "Feed users fetched successfully",
        "data": cards,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{seed_user, test_pool};
    use crate::requests::store::RequestStatus;

    async fn pool_with_population(n: usize) -> SqlitePool {
        let db_pool = test_pool().await;
        for i in 0..n {
            seed_user(&db_pool, &format!("user{i}"), &format!("User{i}")).await;
        }
        db_pool
    }

    fn ids(cards: &[users::UserCard]) -> Vec<&str> {
        cards.iter().map(|c| c.id.as_str()).collect()
    }

    #[tokio::test]
    async fn excludes_self_and_every_touched_pair_regardless_of_status() {
        let db_pool = pool_with_population(5).await;

        store::send(&db_pool, "user0", "user1", RequestStatus::Interested).await.unwrap();
        store::send(&db_pool, "user2", "user0", RequestStatus::Ignored).await.unwrap();

        let page = feed_page(&db_pool, "user0", 1, 30).await.unwrap();
        assert_eq!(ids(&page), vec!["user3", "user4"]);

        // the exclusion is symmetric
        let page = feed_page(&db_pool, "user1", 1, 30).await.unwrap();
        assert!(!ids(&page).contains(&"user0"));
        let page = feed_page(&db_pool, "user2", 1, 30).await.unwrap();
        assert!(!ids(&page).contains(&"user0"));
    }

    #[tokio::test]
    async fn pages_are_stable_windows_over_insertion_order() {
        let db_pool = pool_with_population(7).await;

        let first = feed_page(&db_pool, "user0", 1, 3).await.unwrap();
        assert_eq!(ids(&first), vec!["user1", "user2", "user3"]);

        let second = feed_page(&db_pool, "user0", 2, 3).await.unwrap();
        assert_eq!(ids(&second), vec!["user4", "user5", "user6"]);

        // same call, same order
        let again = feed_page(&db_pool, "user0", 1, 3).await.unwrap();
        assert_eq!(ids(&again), ids(&first));

        // exhausted pages are empty, not an error
        let third = feed_page(&db_pool, "user0", 3, 3).await.unwrap();
        assert!(third.is_empty());

        // a page number near i64::MAX must not blow up the offset math
        let far = feed_page(&db_pool, "user0", i64::MAX, MAX_LIMIT).await.unwrap();
        assert!(far.is_empty());
    }

    #[tokio::test]
    async fn exclusion_set_is_recomputed_between_pages() {
        let db_pool = pool_with_population(5).await;

        let before = feed_page(&db_pool, "user0", 1, 2).await.unwrap();
        assert_eq!(ids(&before), vec!["user1", "user2"]);

        store::send(&db_pool, "user0", "user1", RequestStatus::Interested).await.unwrap();

        // user1 drops out and the window shifts
        let after = feed_page(&db_pool, "user0", 1, 2).await.unwrap();
        assert_eq!(ids(&after), vec!["user2", "user3"]);
    }
}
