/// Bearer-token guard for the REST routes
///
/// Validates the access token and stores the caller's [`AuthContext`] in
/// the request extensions. Anything else is a 401.

use crate::{app::AppState, error::ApiError};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use casho_shared::auth::middleware::authenticate;

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate(req.headers(), state.jwt_secret())?;

    tracing::Span::current().record("user_id", tracing::field::display(auth_context.user_id));
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
