//! services/api/src/web/auth.rs
//!
//! Session endpoints: registration, login, logout and profile edits.
//!
//! There is a single session per running process, held by the `SessionContext`.

use crate::{error::port_error_response, web::state::AppState};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use yourroom_core::{ProfileUpdate, Registration, Session, UserRole};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Agent,
    Client,
}

impl From<Role> for UserRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Admin => UserRole::Admin,
            Role::Agent => UserRole::Agent,
            Role::Client => UserRole::Client,
        }
    }
}

impl From<UserRole> for Role {
    fn from(role: UserRole) -> Self {
        match role {
            UserRole::Admin => Role::Admin,
            UserRole::Agent => Role::Agent,
            UserRole::Client => Role::Client,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// A session identity, used both to log in and to report the current session.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl From<Session> for SessionPayload {
    fn from(session: Session) -> Self {
        Self {
            id: session.id,
            name: session.name,
            email: session.email,
            role: session.role.into(),
            avatar: session.avatar,
            phone_number: session.phone_number,
        }
    }
}

impl From<SessionPayload> for Session {
    fn from(payload: SessionPayload) -> Self {
        Self {
            id: payload.id,
            name: payload.name,
            email: payload.email,
            role: payload.role.into(),
            avatar: payload.avatar,
            phone_number: payload.phone_number,
        }
    }
}

/// Fields left out are kept as they are.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register - Create a new identity and make it the current session
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Session established", body = SessionPayload),
        (status = 400, description = "Missing name or email")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = state
        .sessions
        .register(Registration {
            name: req.name,
            email: req.email,
            role: req.role.into(),
            phone_number: req.phone_number,
        })
        .await
        .map_err(port_error_response)?;

    Ok((StatusCode::CREATED, Json(SessionPayload::from(session))))
}

/// POST /auth/login - Establish an existing identity as the current session
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = SessionPayload,
    responses(
        (status = 200, description = "Session established", body = SessionPayload),
        (status = 400, description = "Invalid identity")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SessionPayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.id.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "id is required".to_string()));
    }
    let session = state
        .sessions
        .establish(req.into())
        .await
        .map_err(port_error_response)?;

    Ok(Json(SessionPayload::from(session)))
}

/// POST /auth/logout - Clear the current session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Logged out, or no session was active")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state.sessions.clear().await.map_err(port_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/session - The current session
#[utoipa::path(
    get,
    path = "/auth/session",
    responses(
        (status = 200, description = "The current session", body = SessionPayload),
        (status = 404, description = "No active session")
    )
)]
pub async fn session_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = state
        .sessions
        .current()
        .await
        .ok_or((StatusCode::NOT_FOUND, "No active session".to_string()))?;
    Ok(Json(SessionPayload::from(session)))
}

/// PUT /auth/profile - Edit the current session's profile
#[utoipa::path(
    put,
    path = "/auth/profile",
    request_body = ProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = SessionPayload),
        (status = 400, description = "Invalid profile"),
        (status = 401, description = "No active session")
    )
)]
pub async fn profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(req): Json<ProfileRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let updated = state
        .sessions
        .update_profile(ProfileUpdate {
            name: req.name,
            phone_number: req.phone_number,
            avatar: req.avatar,
        })
        .await
        .map_err(port_error_response)?;
    info!("Profile of {} updated", session.id);

    Ok(Json(SessionPayload::from(updated)))
}
