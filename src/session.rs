use tower_sessions::Session;

use crate::{AppError, AppResult};

pub const USER_ID: &str = "user_id";

/// Resolves the acting user from the session. The login flow that writes
/// `USER_ID` lives outside this crate; here it is read-only.
pub async fn require_user(session: &Session) -> AppResult<String> {
    session
        .get::<String>(USER_ID)
        .await?
        .ok_or(AppError::Unauthorized("Please log in".to_owned()))
}
