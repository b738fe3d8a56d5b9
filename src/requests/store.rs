use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{db, users, AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Interested,
    Ignored,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn parse(s: &str) -> Option<Self> {
        use RequestStatus::*;
        match s {
            "interested" => Some(Interested),
            "ignored" => Some(Ignored),
            "accepted" => Some(Accepted),
            "rejected" => Some(Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        use RequestStatus::*;
        match self {
            Interested => "interested",
            Ignored => "ignored",
            Accepted => "accepted",
            Rejected => "rejected",
        }
    }

    /// Only the sender-chosen initial states.
    pub fn is_initial(&self) -> bool {
        matches!(self, Self::Interested | Self::Ignored)
    }

    /// Only the target-chosen review verdicts. Both are terminal.
    pub fn is_verdict(&self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub status: RequestStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ConnectionRequest {
    pub fn counterpart<'a>(&'a self, user_id: &str) -> &'a str {
        if self.from_user_id == user_id { &self.to_user_id } else { &self.from_user_id }
    }
}

type RequestRow = (String, String, String, String, i64, i64);

fn from_row(row: RequestRow) -> AppResult<ConnectionRequest> {
    let (id, from_user_id, to_user_id, status, created_at, updated_at) = row;
    let status = RequestStatus::parse(&status)
        .ok_or(format!("unknown status {status} in connection_requests"))?;
    Ok(ConnectionRequest { id, from_user_id, to_user_id, status, created_at, updated_at })
}

const REQUEST_COLUMNS: &str = "id,from_user_id,to_user_id,status,created_at,updated_at";

/// Create a request with a sender-chosen initial status. Pairwise uniqueness
/// rides on the (pair_lo, pair_hi) unique index, so two users racing to send
/// to each other cannot both succeed; the loser sees `Conflict`.
pub async fn send(
    db_pool: &SqlitePool,
    from_user_id: &str,
    to_user_id: &str,
    status: RequestStatus,
) -> AppResult<ConnectionRequest> {
    if !status.is_initial() {
        return Err(AppError::InvalidArgument(format!("Invalid status: {status}")));
    }

    if from_user_id == to_user_id {
        return Err(AppError::InvalidArgument(
            "You cannot send a connection request to yourself".to_owned(),
        ));
    }

    if !users::exists(db_pool, to_user_id).await? {
        return Err(AppError::NotFound("User not found".to_owned()));
    }

    let id = Uuid::now_v7().to_string();
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let (pair_lo, pair_hi) = db::pair_key(from_user_id, to_user_id);

    let inserted = sqlx::query(
        "INSERT INTO connection_requests
            (id,from_user_id,to_user_id,pair_lo,pair_hi,status,created_at,updated_at)
         VALUES (?,?,?,?,?,?,?,?)",
    )
    .bind(&id)
    .bind(from_user_id)
    .bind(to_user_id)
    .bind(pair_lo)
    .bind(pair_hi)
    .bind(status.as_str())
    .bind(now)
    .bind(now)
    .execute(db_pool)
    .await;

    match inserted {
        Ok(_) => Ok(ConnectionRequest {
            id,
            from_user_id: from_user_id.to_owned(),
            to_user_id: to_user_id.to_owned(),
            status,
            created_at: now,
            updated_at: now,
        }),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(AppError::Conflict("Connection request already exists".to_owned()))
        }
        Err(err) => Err(err.into()),
    }
}

/// The target of a pending `interested` request accepts or rejects it. The
/// conditional UPDATE is the whole transition check: wrong reviewer, wrong
/// state, or a concurrent cancel all land on zero rows affected.
pub async fn review(
    db_pool: &SqlitePool,
    reviewing_user_id: &str,
    request_id: &str,
    status: RequestStatus,
) -> AppResult<ConnectionRequest> {
    if !status.is_verdict() {
        return Err(AppError::InvalidArgument(format!("Invalid status: {status}")));
    }

    let now = OffsetDateTime::now_utc().unix_timestamp();
    let updated = sqlx::query(
        "UPDATE connection_requests SET status=?, updated_at=?
         WHERE id=? AND to_user_id=? AND status='interested'",
    )
    .bind(status.as_str())
    .bind(now)
    .bind(request_id)
    .bind(reviewing_user_id)
    .execute(db_pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("Connection request not found".to_owned()));
    }

    let sql = format!("SELECT {REQUEST_COLUMNS} FROM connection_requests WHERE id=?");
    let row: RequestRow = sqlx::query_as(&sql).bind(request_id).fetch_one(db_pool).await?;
    from_row(row)
}

/// Destructive removal of the pair record, whatever its state.
pub async fn cancel(
    db_pool: &SqlitePool,
    user_id: &str,
    other_user_id: &str,
) -> AppResult<()> {
    let (pair_lo, pair_hi) = db::pair_key(user_id, other_user_id);
    let deleted = sqlx::query("DELETE FROM connection_requests WHERE pair_lo=? AND pair_hi=?")
        .bind(pair_lo)
        .bind(pair_hi)
        .execute(db_pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Connection request not found".to_owned()));
    }

    Ok(())
}

/// Whether the pair holds an accepted connection. This is the chat gate.
pub async fn accepted_between(db_pool: &SqlitePool, a: &str, b: &str) -> AppResult<bool> {
    let (pair_lo, pair_hi) = db::pair_key(a, b);
    Ok(sqlx::query_as::<_, (i64,)>(
        "SELECT 1 FROM connection_requests WHERE pair_lo=? AND pair_hi=? AND status='accepted'",
    )
    .bind(pair_lo)
    .bind(pair_hi)
    .fetch_optional(db_pool)
    .await?
    .is_some())
}

/// Every request touching the user in either direction, any status. The feed
/// builds its exclusion set from this.
pub async fn touching(db_pool: &SqlitePool, user_id: &str) -> AppResult<Vec<(String, String)>> {
    Ok(sqlx::query_as(
        "SELECT from_user_id,to_user_id FROM connection_requests WHERE from_user_id=? OR to_user_id=?",
    )
    .bind(user_id)
    .bind(user_id)
    .fetch_all(db_pool)
    .await?)
}

/// Pending `interested` requests addressed to the user.
pub async fn pending_received(
    db_pool: &SqlitePool,
    user_id: &str,
) -> AppResult<Vec<ConnectionRequest>> {
    let sql = format!(
        "SELECT {REQUEST_COLUMNS} FROM connection_requests
         WHERE to_user_id=? AND status='interested' ORDER BY rowid"
    );
    let rows: Vec<RequestRow> = sqlx::query_as(&sql).bind(user_id).fetch_all(db_pool).await?;
    rows.into_iter().map(from_row).collect()
}

/// Accepted connections where the user is either endpoint.
pub async fn accepted_for(
    db_pool: &SqlitePool,
    user_id: &str,
) -> AppResult<Vec<ConnectionRequest>> {
    let sql = format!(
        "SELECT {REQUEST_COLUMNS} FROM connection_requests
         WHERE (from_user_id=? OR to_user_id=?) AND status='accepted' ORDER BY rowid"
    );
    let rows: Vec<RequestRow> = sqlx::query_as(&sql)
        .bind(user_id)
        .bind(user_id)
        .fetch_all(db_pool)
        .await?;
    rows.into_iter().map(from_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{seed_user, test_pool};

    async fn pool_with_users() -> SqlitePool {
        let db_pool = test_pool().await;
        seed_user(&db_pool, "alice", "Alice").await;
        seed_user(&db_pool, "bob", "Bob").await;
        seed_user(&db_pool, "carol", "Carol").await;
        db_pool
    }

    #[tokio::test]
    async fn duplicate_pair_conflicts_in_both_directions() {
        let db_pool = pool_with_users().await;

        send(&db_pool, "alice", "bob", RequestStatus::Interested).await.unwrap();

        let same_direction = send(&db_pool, "alice", "bob", RequestStatus::Interested).await;
        assert!(matches!(same_direction, Err(AppError::Conflict(_))));

        let reversed = send(&db_pool, "bob", "alice", RequestStatus::Ignored).await;
        assert!(matches!(reversed, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn self_request_is_invalid() {
        let db_pool = pool_with_users().await;
        let result = send(&db_pool, "alice", "alice", RequestStatus::Interested).await;
        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn send_rejects_verdict_statuses_and_missing_targets() {
        let db_pool = pool_with_users().await;

        let accepted = send(&db_pool, "alice", "bob", RequestStatus::Accepted).await;
        assert!(matches!(accepted, Err(AppError::InvalidArgument(_))));

        let ghost = send(&db_pool, "alice", "nobody", RequestStatus::Interested).await;
        assert!(matches!(ghost, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn review_only_by_target_of_pending_interested() {
        let db_pool = pool_with_users().await;
        let request = send(&db_pool, "alice", "bob", RequestStatus::Interested).await.unwrap();

        // the sender cannot review their own request
        let by_sender = review(&db_pool, "alice", &request.id, RequestStatus::Accepted).await;
        assert!(matches!(by_sender, Err(AppError::NotFound(_))));

        // a verdict outside {accepted, rejected} is malformed
        let bad_status = review(&db_pool, "bob", &request.id, RequestStatus::Interested).await;
        assert!(matches!(bad_status, Err(AppError::InvalidArgument(_))));

        let accepted = review(&db_pool, "bob", &request.id, RequestStatus::Accepted).await.unwrap();
        assert_eq!(accepted.status, RequestStatus::Accepted);

        // terminal states are not reviewable again
        let again = review(&db_pool, "bob", &request.id, RequestStatus::Rejected).await;
        assert!(matches!(again, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn ignored_requests_are_not_reviewable() {
        let db_pool = pool_with_users().await;
        let request = send(&db_pool, "alice", "bob", RequestStatus::Ignored).await.unwrap();

        let result = review(&db_pool, "bob", &request.id, RequestStatus::Accepted).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn cancel_removes_the_pair_record_in_any_state() {
        let db_pool = pool_with_users().await;

        let missing = cancel(&db_pool, "alice", "bob").await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let request = send(&db_pool, "alice", "bob", RequestStatus::Interested).await.unwrap();
        review(&db_pool, "bob", &request.id, RequestStatus::Accepted).await.unwrap();

        // either party may cancel, even after acceptance
        cancel(&db_pool, "bob", "alice").await.unwrap();
        assert!(!accepted_between(&db_pool, "alice", "bob").await.unwrap());

        // and the pair becomes sendable again
        send(&db_pool, "bob", "alice", RequestStatus::Interested).await.unwrap();
    }

    #[tokio::test]
    async fn accepted_between_tracks_the_state_machine() {
        let db_pool = pool_with_users().await;
        assert!(!accepted_between(&db_pool, "alice", "bob").await.unwrap());

        let request = send(&db_pool, "alice", "bob", RequestStatus::Interested).await.unwrap();
        assert!(!accepted_between(&db_pool, "alice", "bob").await.unwrap());

        review(&db_pool, "bob", &request.id, RequestStatus::Accepted).await.unwrap();
        assert!(accepted_between(&db_pool, "alice", "bob").await.unwrap());
        assert!(accepted_between(&db_pool, "bob", "alice").await.unwrap());
        assert!(!accepted_between(&db_pool, "alice", "carol").await.unwrap());
    }
}
