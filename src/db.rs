use sqlx::SqlitePool;

/// Normalized unordered pair of user ids. Both connection requests and
/// conversations key on this so the at-most-one-per-pair invariants hold as
/// unique indexes, whichever side initiated.
pub fn pair_key<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

pub async fn init(db_pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL DEFAULT '',
            profile_picture TEXT,
            bio TEXT,
            skills TEXT NOT NULL DEFAULT '[]',
            experience_level TEXT,
            location TEXT,
            social_links TEXT NOT NULL DEFAULT '[]'
        )",
    )
    .execute(db_pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS connection_requests (
            id TEXT PRIMARY KEY,
            from_user_id TEXT NOT NULL,
            to_user_id TEXT NOT NULL,
            pair_lo TEXT NOT NULL,
            pair_hi TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            UNIQUE (pair_lo, pair_hi)
        )",
    )
    .execute(db_pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS conversations (
            id TEXT PRIMARY KEY,
            pair_lo TEXT NOT NULL,
            pair_hi TEXT NOT NULL,
            UNIQUE (pair_lo, pair_hi)
        )",
    )
    .execute(db_pool)
    .await?;

    // rowid is the append order; sent_at is advisory
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS messages (
            conversation_id TEXT NOT NULL,
            sender_id TEXT NOT NULL,
            body TEXT NOT NULL,
            sent_at INTEGER NOT NULL
        )",
    )
    .execute(db_pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS messages_conversation_id ON messages (conversation_id)",
    )
    .execute(db_pool)
    .await?;

    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    // one connection, or every statement sees its own empty :memory: db
    let db_pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init(&db_pool).await.unwrap();
    db_pool
}

#[cfg(test)]
pub(crate) async fn seed_user(db_pool: &SqlitePool, id: &str, first_name: &str) {
    sqlx::query("INSERT INTO users (id,first_name,last_name) VALUES (?,?,?)")
        .bind(id)
        .bind(first_name)
        .bind("Test")
        .execute(db_pool)
        .await
        .unwrap();
}
