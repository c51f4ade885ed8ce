/// GraphQL endpoint
///
/// `POST /graphql` executes queries and mutations; `GET /graphql` serves
/// GraphiQL. A bearer token is optional: a missing or invalid token makes
/// the caller anonymous, queries then return empty lists or null, and the
/// create mutations fail with "Authentication required".

mod mutation;
mod query;
mod types;

pub use mutation::MutationRoot;
pub use query::QueryRoot;

use crate::{app::AppState, error::ApiError};
use async_graphql::{http::GraphiQLSource, Context, EmptySubscription, Schema};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    extract::State,
    http::HeaderMap,
    response::{Html, IntoResponse},
};
use casho_shared::auth::middleware::{optional_auth, AuthContext};
use sqlx::PgPool;

pub type CashoSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Signing secret made available to resolvers
#[derive(Clone)]
pub struct JwtSecret(pub String);

/// Builds the schema with the pool and JWT secret as context data
pub fn build_schema(pool: PgPool, jwt_secret: String) -> CashoSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(pool)
        .data(JwtSecret(jwt_secret))
        .finish()
}

/// `POST /graphql`
pub async fn graphql_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let mut request = req.into_inner();

    if let Some(auth) = optional_auth(&headers, state.jwt_secret()) {
        request = request.data(auth);
    }

    state.schema.execute(request).await.into()
}

/// `GET /graphql`
pub async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

/// Converts REST-layer errors into GraphQL errors with client-safe text
pub(crate) trait GqlResultExt<T> {
    fn gql(self) -> async_graphql::Result<T>;
}

impl<T, E> GqlResultExt<T> for Result<T, E>
where
    E: Into<ApiError>,
{
    fn gql(self) -> async_graphql::Result<T> {
        self.map_err(|e| {
            let err: ApiError = e.into();
            if let ApiError::InternalError(msg) = &err {
                tracing::error!(error = %msg, "GraphQL resolver failed");
            }
            async_graphql::Error::new(err.client_message())
        })
    }
}

pub(crate) fn pool<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a PgPool> {
    ctx.data::<PgPool>()
}

pub(crate) fn secret<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a str> {
    ctx.data::<JwtSecret>().map(|s| s.0.as_str())
}

/// The caller, if the request carried a valid access token
pub(crate) fn viewer(ctx: &Context<'_>) -> Option<AuthContext> {
    ctx.data_opt::<AuthContext>().copied()
}

/// The caller, or the "Authentication required" error
pub(crate) fn require_viewer(ctx: &Context<'_>) -> async_graphql::Result<AuthContext> {
    viewer(ctx).ok_or_else(|| async_graphql::Error::new("Authentication required"))
}
