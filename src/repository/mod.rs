//! Catalog store: persistence for books, categories and their links
//!
//! The service layer only talks to [`CatalogStore`]. Two backends exist:
//! [`postgres::PgCatalogStore`] for production and [`memory::MemoryCatalogStore`]
//! for tests and database-less runs. Ids are always assigned by the store.

pub mod memory;
pub mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{
        Book, BookCategoryLink, BookId, Category, CategoryId, LinkId, NewBook, TitleMatch,
    },
};

pub use memory::MemoryCatalogStore;
pub use postgres::PgCatalogStore;

/// Link mutations computed by the reconciler for one book
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkChanges {
    /// Existing links to remove
    pub to_delete: Vec<BookCategoryLink>,
    /// Category ids to link
    pub to_insert: Vec<CategoryId>,
    /// Category ids linked before and after; never touched
    pub unchanged: Vec<CategoryId>,
}

impl LinkChanges {
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_insert.is_empty()
    }

    pub fn delete_ids(&self) -> Vec<LinkId> {
        self.to_delete.iter().map(|link| link.id).collect()
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Connectivity check used by the readiness endpoint
    async fn ping(&self) -> AppResult<()>;

    async fn find_book_by_id(&self, id: BookId) -> AppResult<Option<Book>>;

    async fn find_category_by_id(&self, id: CategoryId) -> AppResult<Option<Category>>;

    /// Returns only the categories that exist, ordered by id; unknown ids are dropped.
    async fn find_categories_by_ids(&self, ids: &[CategoryId]) -> AppResult<Vec<Category>>;

    async fn list_categories(&self) -> AppResult<Vec<Category>>;

    async fn insert_category(&self, name: &str) -> AppResult<Category>;

    async fn find_links_by_book_id(&self, book_id: BookId) -> AppResult<Vec<BookCategoryLink>>;

    /// Category index for a batch of books. Books without links are absent from the map.
    async fn find_categories_by_book_ids(
        &self,
        book_ids: &[BookId],
    ) -> AppResult<HashMap<BookId, Vec<Category>>>;

    async fn find_books_by_category_id(&self, category_id: CategoryId) -> AppResult<Vec<Book>>;

    async fn find_books_by_author_and_title(
        &self,
        author: &str,
        title: &str,
        mode: TitleMatch,
    ) -> AppResult<Vec<Book>>;

    async fn insert_book(&self, book: &NewBook) -> AppResult<Book>;

    /// Update an existing book by identity. Fails with `BookNotFound` if it is gone.
    async fn save_book(&self, book: &Book) -> AppResult<Book>;

    /// Link a book to categories. Pairs that already exist are skipped.
    async fn insert_links(
        &self,
        book_id: BookId,
        category_ids: &[CategoryId],
    ) -> AppResult<Vec<BookCategoryLink>>;

    /// Returns the number of links removed.
    async fn delete_links(&self, link_ids: &[LinkId]) -> AppResult<u64>;

    /// Deletes then inserts as one unit of work.
    async fn apply_link_changes(&self, book_id: BookId, changes: &LinkChanges) -> AppResult<()>;

    /// Creates the book and one link per category as one unit of work.
    async fn register_book(&self, book: &NewBook, category_ids: &[CategoryId]) -> AppResult<Book>;
}
