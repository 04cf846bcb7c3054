pub mod health;
pub mod pages;
pub mod student;
pub mod teacher;

use crate::{error::AppError, types::SessionId};

pub(crate) fn parse_session_id(raw: &str) -> Result<SessionId, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest("Invalid session ID".into()))
}
