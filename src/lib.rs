pub mod appresult;
pub mod chat;
pub mod db;
pub mod feed;
pub mod requests;
pub mod session;
pub mod users;

use axum::extract::FromRef;
use sqlx::SqlitePool;

pub use appresult::{AppError, AppResult};

use chat::registry::RoomRegistry;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub rooms: RoomRegistry,
}
