//! Book endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::{AppResult, ErrorResponse},
    models::{
        BookId, BookResponse, BookSearchQuery, BookStatus, CategoryId, CreateBook,
        UpdateBookCategories,
    },
    AppState,
};

/// Search books by category
#[utoipa::path(
    get,
    path = "/books/by-category/{category_id}",
    tag = "books",
    params(("category_id" = i64, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Books in the category", body = Vec<BookResponse>),
        (status = 404, description = "Category not found", body = ErrorResponse)
    )
)]
pub async fn books_by_category(
    State(state): State<AppState>,
    Path(category_id): Path<CategoryId>,
) -> AppResult<Json<Vec<BookResponse>>> {
    let books = state.services.catalog.books_by_category(category_id).await?;
    Ok(Json(books))
}

/// Search books by author and title
#[utoipa::path(
    get,
    path = "/books/by-author-and-title",
    tag = "books",
    params(BookSearchQuery),
    responses(
        (status = 200, description = "Matching books", body = Vec<BookResponse>)
    )
)]
pub async fn books_by_author_and_title(
    State(state): State<AppState>,
    Query(query): Query<BookSearchQuery>,
) -> AppResult<Json<Vec<BookResponse>>> {
    let books = state.services.catalog.books_by_author_and_title(&query).await?;
    Ok(Json(books))
}

/// Register a new book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book registered", body = BookResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "None of the categories exist", body = ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    payload: Result<Json<CreateBook>, JsonRejection>,
) -> AppResult<(StatusCode, Json<BookResponse>)> {
    let Json(data) = payload?;
    data.validate()?;
    let book = state.services.catalog.register(data).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// Get book details
#[utoipa::path(
    get,
    path = "/books/{book_id}",
    tag = "books",
    params(("book_id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = BookResponse),
        (status = 404, description = "Book not found", body = ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    Path(book_id): Path<BookId>,
) -> AppResult<Json<BookResponse>> {
    let book = state.services.catalog.get_book(book_id).await?;
    Ok(Json(book))
}

/// Withdraw a book from lending or make it available again
#[utoipa::path(
    patch,
    path = "/books/{book_id}/status/{status}",
    tag = "books",
    params(
        ("book_id" = i64, Path, description = "Book ID"),
        ("status" = BookStatus, Path, description = "AVAILABLE or UNAVAILABLE")
    ),
    responses(
        (status = 204, description = "Status updated"),
        (status = 400, description = "Unknown status value", body = ErrorResponse),
        (status = 404, description = "Book not found", body = ErrorResponse)
    )
)]
pub async fn set_status(
    State(state): State<AppState>,
    params: Result<Path<(BookId, BookStatus)>, PathRejection>,
) -> AppResult<StatusCode> {
    let Path((book_id, status)) = params?;
    state.services.catalog.set_status(book_id, status).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Replace the categories of a book
#[utoipa::path(
    put,
    path = "/books/{book_id}/categories",
    tag = "books",
    params(("book_id" = i64, Path, description = "Book ID")),
    request_body = UpdateBookCategories,
    responses(
        (status = 204, description = "Categories updated"),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Book not found or has no categories", body = ErrorResponse)
    )
)]
pub async fn update_categories(
    State(state): State<AppState>,
    Path(book_id): Path<BookId>,
    payload: Result<Json<UpdateBookCategories>, JsonRejection>,
) -> AppResult<StatusCode> {
    let Json(data) = payload?;
    data.validate()?;
    state.services.catalog.change_categories(book_id, data).await?;
    Ok(StatusCode::NO_CONTENT)
}
