use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::user::{NewUser, Profile, Role, UserView};
use crate::errors::AppError;
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct ProfileBody {
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub company_name: String,
    pub newsletter: bool,
}

impl From<ProfileBody> for Profile {
    fn from(p: ProfileBody) -> Self {
        Self {
            phone: p.phone,
            address: p.address,
            city: p.city,
            postal_code: p.postal_code,
            country: p.country,
            company_name: p.company_name,
            newsletter: p.newsletter,
        }
    }
}

impl From<Profile> for ProfileBody {
    fn from(p: Profile) -> Self {
        Self {
            phone: p.phone,
            address: p.address,
            city: p.city,
            postal_code: p.postal_code,
            country: p.country,
            company_name: p.company_name,
            newsletter: p.newsletter,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    /// `client` (default), `vendeur` or `staff`.
    pub role: Option<String>,
    #[serde(default)]
    pub profile: ProfileBody,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: String,
    pub created_at: String,
    pub profile: ProfileBody,
}

impl From<UserView> for UserResponse {
    fn from(u: UserView) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            role: u.role.to_string(),
            created_at: u.created_at.to_rfc3339(),
            profile: u.profile.into(),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /users
///
/// Creates the account and its profile together.
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid input, or username/email already taken"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "users"
)]
pub async fn create_user(
    state: web::Data<AppState>,
    body: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let role = match body.role.as_deref().map(str::trim) {
        None | Some("") => Role::default(),
        Some(raw) => raw.parse()?,
    };
    let new_user = NewUser {
        username: body.username,
        email: body.email,
        role,
        profile: body.profile.into(),
    };

    let user = web::block(move || state.users.register(new_user))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}
