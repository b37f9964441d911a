pub mod cart;
pub mod catalog;
pub mod orders;
pub mod sessions;
pub mod users;

use actix_web::HttpRequest;
use uuid::Uuid;

use crate::domain::cart::Identity;
use crate::errors::AppError;

/// Authenticated user id, set by the identity gateway.
pub const USER_HEADER: &str = "X-User-Id";
/// Anonymous session key, used when no user id is present.
pub const SESSION_HEADER: &str = "X-Session-Key";

const MAX_SESSION_KEY_LEN: usize = 255;

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub(crate) fn validate_session_key(key: &str) -> Result<(), AppError> {
    if key.trim().is_empty() || key.len() > MAX_SESSION_KEY_LEN {
        return Err(AppError::BadRequest(format!(
            "session key must be 1 to {MAX_SESSION_KEY_LEN} characters"
        )));
    }
    Ok(())
}

/// Resolves who is calling: an authenticated user wins over a session.
pub fn identity(req: &HttpRequest) -> Result<Identity, AppError> {
    if let Some(raw) = header(req, USER_HEADER) {
        let id = Uuid::parse_str(raw).map_err(|_| AppError::Unauthorized)?;
        return Ok(Identity::User(id));
    }
    if let Some(key) = header(req, SESSION_HEADER) {
        validate_session_key(key)?;
        return Ok(Identity::Anonymous(key.to_string()));
    }
    Err(AppError::Unauthorized)
}

/// Like [`identity`], but anonymous callers are refused.
pub fn user_id(req: &HttpRequest) -> Result<Uuid, AppError> {
    match identity(req)? {
        Identity::User(id) => Ok(id),
        Identity::Anonymous(_) => Err(AppError::Unauthorized),
    }
}
