//! API handlers for the bookstore REST endpoints

pub mod books;
pub mod categories;
pub mod health;
pub mod openapi;

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Books
        .route("/books", post(books::create_book))
        .route("/books/by-category/:category_id", get(books::books_by_category))
        .route("/books/by-author-and-title", get(books::books_by_author_and_title))
        .route("/books/:book_id", get(books::get_book))
        .route("/books/:book_id/status/:status", patch(books::set_status))
        .route("/books/:book_id/categories", put(books::update_categories))
        // Categories
        .route("/categories", get(categories::list_categories))
        .route("/categories", post(categories::create_category))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
