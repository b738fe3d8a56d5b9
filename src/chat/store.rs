use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{db, AppResult};

pub const MAX_LIMIT: i64 = 50;
pub const DEFAULT_LIMIT: i64 = 50;

pub struct Conversation {
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub sender_id: String,
    pub text: String,
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total_messages: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
    pub has_more: bool,
}

pub struct ChatPage {
    pub messages: Vec<ChatMessage>,
    pub pagination: Pagination,
}

/// Look up the pair's conversation, creating an empty one on first touch.
/// Idempotent; the unique pair index absorbs concurrent creators.
pub async fn get_or_create(db_pool: &SqlitePool, a: &str, b: &str) -> AppResult<Conversation> {
    let (pair_lo, pair_hi) = db::pair_key(a, b);

    sqlx::query("INSERT OR IGNORE INTO conversations (id,pair_lo,pair_hi) VALUES (?,?,?)")
        .bind(Uuid::now_v7().to_string())
        .bind(pair_lo)
        .bind(pair_hi)
        .execute(db_pool)
        .await?;

    let (id,): (String,) =
        sqlx::query_as("SELECT id FROM conversations WHERE pair_lo=? AND pair_hi=?")
            .bind(pair_lo)
            .bind(pair_hi)
            .fetch_one(db_pool)
            .await?;

    Ok(Conversation { id })
}

/// Append-only; rowid carries the order, the timestamp is advisory. No size
/// cap and no content checks.
pub async fn append(
    db_pool: &SqlitePool,
    conversation_id: &str,
    sender_id: &str,
    text: &str,
    timestamp: i64,
) -> AppResult<()> {
    sqlx::query("INSERT INTO messages (conversation_id,sender_id,body,sent_at) VALUES (?,?,?,?)")
        .bind(conversation_id)
        .bind(sender_id)
        .bind(text)
        .bind(timestamp)
        .execute(db_pool)
        .await?;
    Ok(())
}

/// Reverse window over the message log: page 1 is the newest `limit`
/// messages, page 2 the `limit` before those, scrolling upward into history.
/// `skip` counts the messages older than the requested window; `has_more`
/// means another page of history exists below it.
pub async fn paginate(
    db_pool: &SqlitePool,
    conversation_id: &str,
    page: i64,
    limit: i64,
) -> AppResult<ChatPage> {
    let page = page.max(1);
    let limit = limit.clamp(1, MAX_LIMIT);

    let (total,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM messages WHERE conversation_id=?")
            .bind(conversation_id)
            .fetch_one(db_pool)
            .await?;

    // page comes straight from the query string; saturate instead of
    // trusting page * limit to stay inside i64
    let skip = total.saturating_sub(page.saturating_mul(limit)).max(0);
    let end = total
        .saturating_sub((page - 1).saturating_mul(limit))
        .max(skip);
    let window = end - skip;

    let rows: Vec<(String, String, i64)> = sqlx::query_as(
        "SELECT sender_id,body,sent_at FROM messages WHERE conversation_id=?
         ORDER BY rowid LIMIT ? OFFSET ?",
    )
    .bind(conversation_id)
    .bind(window)
    .bind(skip)
    .fetch_all(db_pool)
    .await?;

    let messages = rows
        .into_iter()
        .map(|(sender_id, text, timestamp)| ChatMessage { sender_id, text, timestamp })
        .collect();

    Ok(ChatPage {
        messages,
        pagination: Pagination {
            total_messages: total,
            page,
            limit,
            total_pages: (total + limit - 1) / limit,
            has_more: skip > 0,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    async fn conversation_with_messages(db_pool: &SqlitePool, n: i64) -> Conversation {
        let conversation = get_or_create(db_pool, "alice", "bob").await.unwrap();
        for i in 1..=n {
            append(db_pool, &conversation.id, "alice", &format!("m{i}"), i).await.unwrap();
        }
        conversation
    }

    fn texts(page: &ChatPage) -> Vec<&str> {
        page.messages.iter().map(|m| m.text.as_str()).collect()
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent_and_symmetric() {
        let db_pool = test_pool().await;

        let first = get_or_create(&db_pool, "alice", "bob").await.unwrap();
        let second = get_or_create(&db_pool, "bob", "alice").await.unwrap();
        assert_eq!(first.id, second.id);

        let other = get_or_create(&db_pool, "alice", "carol").await.unwrap();
        assert_ne!(first.id, other.id);
    }

    #[tokio::test]
    async fn reverse_pagination_scrolls_upward_into_history() {
        let db_pool = test_pool().await;
        let conversation = conversation_with_messages(&db_pool, 10).await;

        let page1 = paginate(&db_pool, &conversation.id, 1, 4).await.unwrap();
        assert_eq!(texts(&page1), vec!["m7", "m8", "m9", "m10"]);
        assert!(page1.pagination.has_more);
        assert_eq!(page1.pagination.total_pages, 3);
        assert_eq!(page1.pagination.total_messages, 10);

        let page2 = paginate(&db_pool, &conversation.id, 2, 4).await.unwrap();
        assert_eq!(texts(&page2), vec!["m3", "m4", "m5", "m6"]);
        assert!(page2.pagination.has_more);

        let page3 = paginate(&db_pool, &conversation.id, 3, 4).await.unwrap();
        assert_eq!(texts(&page3), vec!["m1", "m2"]);
        assert!(!page3.pagination.has_more);

        let beyond = paginate(&db_pool, &conversation.id, 4, 4).await.unwrap();
        assert!(beyond.messages.is_empty());
        assert!(!beyond.pagination.has_more);
    }

    #[tokio::test]
    async fn absurdly_large_page_numbers_yield_an_empty_window() {
        let db_pool = test_pool().await;
        let conversation = conversation_with_messages(&db_pool, 10).await;

        let page = paginate(&db_pool, &conversation.id, 200_000_000_000_000_000, 50)
            .await
            .unwrap();
        assert!(page.messages.is_empty());
        assert!(!page.pagination.has_more);

        let page = paginate(&db_pool, &conversation.id, i64::MAX, MAX_LIMIT).await.unwrap();
        assert!(page.messages.is_empty());
    }

    #[tokio::test]
    async fn empty_conversation_paginates_to_nothing() {
        let db_pool = test_pool().await;
        let conversation = get_or_create(&db_pool, "alice", "bob").await.unwrap();

        let page = paginate(&db_pool, &conversation.id, 1, 50).await.unwrap();
        assert!(page.messages.is_empty());
        assert_eq!(page.pagination.total_messages, 0);
        assert_eq!(page.pagination.total_pages, 0);
        assert!(!page.pagination.has_more);
    }

    #[tokio::test]
    async fn limit_is_clamped_to_the_cap() {
        let db_pool = test_pool().await;
        let conversation = conversation_with_messages(&db_pool, 60).await;

        let page = paginate(&db_pool, &conversation.id, 1, 500).await.unwrap();
        assert_eq!(page.pagination.limit, MAX_LIMIT);
        assert_eq!(page.messages.len(), MAX_LIMIT as usize);
        assert_eq!(page.messages.last().unwrap().text, "m60");
        assert!(page.pagination.has_more);
    }
}
