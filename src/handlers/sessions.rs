use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

use super::{user_id, validate_session_key};

#[derive(Debug, Deserialize, ToSchema)]
pub struct MergeSessionRequest {
    /// The user who just signed in.
    pub user_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MergeSessionResponse {
    /// Lines added to (or summed into) the user's cart.
    pub merged: usize,
    /// Session entries dropped because the product is gone or inactive.
    pub skipped: usize,
}

/// A signed-in caller may only merge into their own cart.
fn merge_target(req: &HttpRequest, requested: Uuid) -> Result<Uuid, AppError> {
    if user_id(req)? != requested {
        return Err(AppError::Forbidden);
    }
    Ok(requested)
}

/// POST /sessions/{session_key}/merge
///
/// Called by the login flow once credentials are verified. Moves every
/// resolvable session line into the user's cart and empties the session.
/// A second call for the same session merges nothing. The gateway's
/// `X-User-Id` must name the user the cart is merged into.
#[utoipa::path(
    post,
    path = "/sessions/{session_key}/merge",
    params(
        ("session_key" = String, Path, description = "Anonymous session key"),
    ),
    request_body = MergeSessionRequest,
    responses(
        (status = 200, description = "Merge summary", body = MergeSessionResponse),
        (status = 400, description = "Invalid session key or unknown user"),
        (status = 401, description = "Caller is not signed in"),
        (status = 403, description = "Caller is not the target user"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cart"
)]
pub async fn merge_session(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<MergeSessionRequest>,
) -> Result<HttpResponse, AppError> {
    let session_key = path.into_inner();
    validate_session_key(&session_key)?;
    let user_id = merge_target(&req, body.into_inner().user_id)?;

    let report = web::block(move || state.merges.merge(&session_key, user_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(MergeSessionResponse {
        merged: report.merged,
        skipped: report.skipped,
    }))
}
