/// Authentication and profile endpoints
///
/// # Endpoints
///
/// - `POST /api/register/` - Register and receive tokens
/// - `POST /api/login/` - Login with email and password
/// - `POST /api/token/refresh/` - Exchange a refresh token for an access token
/// - `POST /api/token/verify/` - Check a token's validity
/// - `POST /api/logout/` - Blacklist a refresh token (authenticated)
/// - `GET/PUT /api/profile/` - Read or update the caller (authenticated)
///
/// The register/login/refresh/verify logic is shared with the GraphQL
/// mutations.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use casho_shared::{
    auth::{
        jwt::{self, Claims},
        middleware::AuthContext,
        password,
    },
    models::{
        revoked_token::RevokedToken,
        user::{CreateUser, UpdateUser, User},
    },
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 150, message = "Username must be 1-150 characters"))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    pub password_confirm: String,

    #[validate(length(max = 15, message = "Phone must be at most 15 characters"))]
    pub phone: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

/// User plus a fresh token pair
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,

    /// Access token (24h)
    pub access: String,

    /// Refresh token (30d)
    pub refresh: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access: String,
}

/// Verify request
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

/// Logout request
#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

/// Plain message body
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Profile update; absent fields are left alone, `null` clears phone/avatar
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 150, message = "Username must be 1-150 characters"))]
    pub username: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub avatar_url: Option<Option<String>>,
}

/// Distinguishes a missing field (None) from an explicit null (Some(None))
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Creates a user after checking the confirmation and strength rules
pub(crate) async fn register_user(
    pool: &PgPool,
    secret: &str,
    req: RegisterRequest,
) -> ApiResult<AuthResponse> {
    req.validate()?;

    if req.password != req.password_confirm {
        return Err(ApiError::invalid_field("password_confirm", "Passwords do not match"));
    }

    password::validate_password_strength(&req.password)
        .map_err(|e| ApiError::invalid_field("password", e))?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        pool,
        CreateUser {
            username: req.username,
            email: req.email.trim().to_string(),
            password_hash,
            phone: req.phone.filter(|p| !p.is_empty()),
        },
    )
    .await?;

    let tokens = jwt::issue_token_pair(user.id, secret)?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok(AuthResponse {
        user,
        access: tokens.access,
        refresh: tokens.refresh,
    })
}

/// Checks credentials and issues tokens
pub(crate) async fn login_user(
    pool: &PgPool,
    secret: &str,
    req: LoginRequest,
) -> ApiResult<AuthResponse> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = User::find_by_email(pool, req.email.trim())
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(invalid());
    }

    User::update_last_login(pool, user.id).await?;

    let tokens = jwt::issue_token_pair(user.id, secret)?;

    Ok(AuthResponse {
        user,
        access: tokens.access,
        refresh: tokens.refresh,
    })
}

/// Validates a refresh token, including the blacklist
pub(crate) async fn live_refresh_claims(
    pool: &PgPool,
    secret: &str,
    refresh_token: &str,
) -> ApiResult<Claims> {
    let claims = jwt::validate_refresh_token(refresh_token, secret)?;

    if RevokedToken::is_revoked(pool, claims.jti).await? {
        return Err(ApiError::Unauthorized("Token is blacklisted".to_string()));
    }

    Ok(claims)
}

/// Mints a new access token from a live refresh token
pub(crate) async fn exchange_refresh_token(
    pool: &PgPool,
    secret: &str,
    refresh_token: &str,
) -> ApiResult<String> {
    let claims = live_refresh_claims(pool, secret, refresh_token).await?;
    Ok(jwt::access_token_for(&claims, secret)?)
}

/// Validates a token of either type
pub(crate) async fn verify_any_token(pool: &PgPool, secret: &str, token: &str) -> ApiResult<Claims> {
    let claims = jwt::validate_token(token, secret)?;

    if claims.token_type == jwt::TokenType::Refresh && RevokedToken::is_revoked(pool, claims.jti).await? {
        return Err(ApiError::Unauthorized("Token is blacklisted".to_string()));
    }

    Ok(claims)
}

/// `POST /api/register/`
///
/// ```text
/// {"username": "jane", "email": "jane@example.com",
///  "password": "testpass123", "password_confirm": "testpass123"}
/// ```
///
/// Responds 201 with `{user, access, refresh}`.
///
/// # Errors
///
/// - `422`: validation failed or passwords differ
/// - `409`: email already registered
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let response = register_user(&state.db, state.jwt_secret(), req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// `POST /api/login/`
///
/// # Errors
///
/// - `401`: unknown email or wrong password (same message for both)
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let response = login_user(&state.db, state.jwt_secret(), req).await?;
    Ok(Json(response))
}

/// `POST /api/token/refresh/`
///
/// ```text
/// {"refresh": "eyJ..."}  ->  {"access": "eyJ..."}
/// ```
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access = exchange_refresh_token(&state.db, state.jwt_secret(), &req.refresh).await?;
    Ok(Json(RefreshResponse { access }))
}

/// `POST /api/token/verify/`
///
/// 200 with an empty object when the token is valid, 401 otherwise.
pub async fn verify(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    verify_any_token(&state.db, state.jwt_secret(), &req.token).await?;
    Ok(Json(serde_json::json!({})))
}

/// `POST /api/logout/`
///
/// Blacklists the given refresh token. It must belong to the caller.
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<LogoutRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let failed = || ApiError::BadRequest("Logout failed".to_string());

    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())
        .map_err(|_| failed())?;

    if claims.sub != auth.user_id {
        return Err(failed());
    }

    RevokedToken::revoke(&state.db, claims.jti, claims.sub, claims.expires_at()).await?;

    tracing::info!(user_id = %auth.user_id, jti = %claims.jti, "Refresh token revoked");

    Ok(Json(MessageResponse {
        message: "Logout successful".to_string(),
    }))
}

/// `GET /api/profile/`
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<User>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// `PUT /api/profile/`
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<User>> {
    req.validate()?;

    if let Some(Some(phone)) = &req.phone {
        if phone.chars().count() > 15 {
            return Err(ApiError::invalid_field("phone", "Phone must be at most 15 characters"));
        }
    }

    let changes = UpdateUser {
        username: req.username,
        email: req.email.map(|e| e.trim().to_string()),
        password_hash: None,
        phone: req.phone,
        avatar_url: req.avatar_url,
    };

    let updated = if changes.is_empty() {
        User::find_by_id(&state.db, auth.user_id).await?
    } else {
        User::update(&state.db, auth.user_id, changes).await?
    };

    updated
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}
