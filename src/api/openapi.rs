//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, categories, health};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bookstore API",
        version = "1.0.0",
        description = "Bookstore catalog REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::books_by_category,
        books::books_by_author_and_title,
        books::create_book,
        books::get_book,
        books::set_status,
        books::update_categories,
        // Categories
        categories::list_categories,
        categories::create_category,
    ),
    components(
        schemas(
            // Books
            crate::models::BookResponse,
            crate::models::BookStatus,
            crate::models::BookSearchQuery,
            crate::models::CreateBook,
            crate::models::UpdateBookCategories,
            // Categories
            crate::models::Category,
            crate::models::CreateCategory,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Book registration, search and status"),
        (name = "categories", description = "Category management")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
