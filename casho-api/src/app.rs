/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use casho_api::{app::{AppState, build_router}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let app = build_router(AppState::new(pool, config));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    graphql::{self, CashoSchema},
    middleware::auth::require_auth,
};
use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,

    pub config: Arc<Config>,

    pub schema: CashoSchema,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        let schema = graphql::build_schema(db.clone(), config.jwt.secret.clone());
        Self {
            db,
            config: Arc::new(config),
            schema,
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete router
///
/// ```text
/// /health                         GET   (public)
/// /graphql                        GET GraphiQL, POST queries (token optional)
/// /api/register/                  POST  (public)
/// /api/login/                     POST  (public)
/// /api/token/refresh/             POST  (public)
/// /api/token/verify/              POST  (public)
/// /api/logout/                    POST
/// /api/profile/                   GET PUT
/// /api/categories/[:id/]          CRUD
/// /api/transactions/[:id/]        CRUD
/// /api/transactions/stats/        GET
/// /api/accounts/[:id/]            CRUD
/// /api/reports/monthly/           POST
/// /api/jobs/:id/                  GET
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let public_api = Router::new()
        .route("/register/", post(routes::auth::register))
        .route("/login/", post(routes::auth::login))
        .route("/token/refresh/", post(routes::auth::refresh))
        .route("/token/verify/", post(routes::auth::verify));

    let protected_api = Router::new()
        .route("/logout/", post(routes::auth::logout))
        .route(
            "/profile/",
            get(routes::auth::get_profile).put(routes::auth::update_profile),
        )
        .route(
            "/categories/",
            get(routes::categories::list_categories).post(routes::categories::create_category),
        )
        .route(
            "/categories/:id/",
            get(routes::categories::get_category)
                .put(routes::categories::update_category)
                .delete(routes::categories::delete_category),
        )
        .route(
            "/transactions/",
            get(routes::transactions::list_transactions)
                .post(routes::transactions::create_transaction),
        )
        .route(
            "/transactions/stats/",
            get(routes::transactions::transaction_stats),
        )
        .route(
            "/transactions/:id/",
            get(routes::transactions::get_transaction)
                .put(routes::transactions::update_transaction)
                .delete(routes::transactions::delete_transaction),
        )
        .route(
            "/accounts/",
            get(routes::accounts::list_accounts).post(routes::accounts::create_account),
        )
        .route(
            "/accounts/:id/",
            get(routes::accounts::get_account)
                .put(routes::accounts::update_account)
                .delete(routes::accounts::delete_account),
        )
        .route(
            "/reports/monthly/",
            post(routes::reports::request_monthly_report),
        )
        .route("/jobs/:id/", get(routes::reports::get_job))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let cors = if state.config.cors_allows_any() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route(
            "/graphql",
            get(graphql::graphiql).post(graphql::graphql_handler),
        )
        .nest("/api", public_api.merge(protected_api))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %req.method(),
                        uri = %req.uri(),
                        user_id = tracing::field::Empty,
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}
