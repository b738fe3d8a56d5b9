pub mod registry;
pub mod room;
pub mod store;
pub mod ws;

mod history;

use axum::{routing::get, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chat/{target_user_id}", get(history::chat_history))
        .route("/ws", get(ws::chat_ws))
}
