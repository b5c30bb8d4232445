//! Category endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::{AppResult, ErrorResponse},
    models::{Category, CreateCategory},
    AppState,
};

/// List all categories
#[utoipa::path(
    get,
    path = "/categories",
    tag = "categories",
    responses(
        (status = 200, description = "All categories", body = Vec<Category>)
    )
)]
pub async fn list_categories(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    let categories = state.services.catalog.list_categories().await?;
    Ok(Json(categories))
}

/// Create a category
#[utoipa::path(
    post,
    path = "/categories",
    tag = "categories",
    request_body = CreateCategory,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    )
)]
pub async fn create_category(
    State(state): State<AppState>,
    payload: Result<Json<CreateCategory>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Category>)> {
    let Json(data) = payload?;
    data.validate()?;
    let category = state.services.catalog.create_category(&data.name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}
