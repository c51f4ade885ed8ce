/// Category endpoints
///
/// - `GET /api/categories/?type=income|expense`
/// - `POST /api/categories/`
/// - `GET/PUT/DELETE /api/categories/<id>/`
///
/// All scoped to the caller; someone else's category is a 404.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{parse_optional, validate_color},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use casho_shared::{
    auth::middleware::AuthContext,
    models::category::{Category, CategoryKind, CreateCategory, UpdateCategory},
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct CategoryListParams {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[serde(rename = "type")]
    pub kind: CategoryKind,

    #[validate(length(max = 50, message = "Icon must be at most 50 characters"))]
    pub icon: Option<String>,

    #[validate(custom(function = "validate_color"))]
    pub color: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[serde(rename = "type")]
    pub kind: Option<CategoryKind>,

    #[validate(length(max = 50, message = "Icon must be at most 50 characters"))]
    pub icon: Option<String>,

    #[validate(custom(function = "validate_color"))]
    pub color: Option<String>,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Category not found".to_string())
}

pub async fn list_categories(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<CategoryListParams>,
) -> ApiResult<Json<Vec<Category>>> {
    let kind = parse_optional::<CategoryKind>("type", params.kind.as_deref())?;
    let categories = Category::list_by_user(&state.db, auth.user_id, kind).await?;
    Ok(Json(categories))
}

pub async fn create_category(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateCategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    req.validate()?;

    let category = Category::create(
        &state.db,
        CreateCategory {
            user_id: auth.user_id,
            name: req.name.trim().to_string(),
            kind: req.kind,
            icon: req.icon,
            color: req.color,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn get_category(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Category>> {
    Category::find_for_user(&state.db, id, auth.user_id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// `PUT /api/categories/<id>/`
///
/// Changing the type leaves existing transactions as they are.
pub async fn update_category(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCategoryRequest>,
) -> ApiResult<Json<Category>> {
    req.validate()?;

    Category::update_for_user(
        &state.db,
        id,
        auth.user_id,
        UpdateCategory {
            name: req.name.map(|n| n.trim().to_string()),
            kind: req.kind,
            icon: req.icon,
            color: req.color,
        },
    )
    .await?
    .map(Json)
    .ok_or_else(not_found)
}

/// `DELETE /api/categories/<id>/`
///
/// Removes the category's transactions too.
pub async fn delete_category(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if Category::delete_for_user(&state.db, id, auth.user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found())
    }
}
