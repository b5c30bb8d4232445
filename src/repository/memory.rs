//! In-memory catalog store for tests and database-less runs.
//!
//! All tables live behind a single `RwLock`, so every multi-row mutation
//! happens under one write guard and is atomic with respect to readers.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{CatalogStore, LinkChanges};
use crate::{
    error::{AppError, AppResult},
    models::{
        Book, BookCategoryLink, BookId, BookStatus, Category, CategoryId, LinkId, NewBook,
        TitleMatch,
    },
};

#[derive(Debug, Default)]
struct Tables {
    books: BTreeMap<BookId, Book>,
    categories: BTreeMap<CategoryId, Category>,
    links: BTreeMap<LinkId, BookCategoryLink>,
    next_book_id: BookId,
    next_category_id: CategoryId,
    next_link_id: LinkId,
}

impl Tables {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn insert_book(&mut self, book: &NewBook) -> Book {
        let now = Utc::now();
        let book = Book {
            id: Self::next_id(&mut self.next_book_id),
            title: book.title.clone(),
            author: book.author.clone(),
            status: BookStatus::Available,
            created_at: now,
            updated_at: now,
        };
        self.books.insert(book.id, book.clone());
        book
    }

    fn insert_links(&mut self, book_id: BookId, category_ids: &[CategoryId]) -> Vec<BookCategoryLink> {
        let mut inserted = Vec::new();
        for &category_id in category_ids {
            let exists = self
                .links
                .values()
                .any(|l| l.book_id == book_id && l.category_id == category_id);
            if exists {
                continue;
            }
            let link = BookCategoryLink {
                id: Self::next_id(&mut self.next_link_id),
                book_id,
                category_id,
                created_at: Utc::now(),
            };
            self.links.insert(link.id, link.clone());
            inserted.push(link);
        }
        inserted
    }

    fn delete_links(&mut self, link_ids: &[LinkId]) -> u64 {
        link_ids
            .iter()
            .filter(|id| self.links.remove(*id).is_some())
            .count() as u64
    }
}

/// An in-memory implementation of [`CatalogStore`]. Data is lost on drop.
#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    tables: RwLock<Tables>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> AppResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| AppError::Internal(format!("catalog store lock poisoned: {e}")))
    }

    fn write(&self) -> AppResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| AppError::Internal(format!("catalog store lock poisoned: {e}")))
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn ping(&self) -> AppResult<()> {
        self.read().map(|_| ())
    }

    async fn find_book_by_id(&self, id: BookId) -> AppResult<Option<Book>> {
        Ok(self.read()?.books.get(&id).cloned())
    }

    async fn find_category_by_id(&self, id: CategoryId) -> AppResult<Option<Category>> {
        Ok(self.read()?.categories.get(&id).cloned())
    }

    async fn find_categories_by_ids(&self, ids: &[CategoryId]) -> AppResult<Vec<Category>> {
        let tables = self.read()?;
        Ok(tables
            .categories
            .values()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn list_categories(&self) -> AppResult<Vec<Category>> {
        Ok(self.read()?.categories.values().cloned().collect())
    }

    async fn insert_category(&self, name: &str) -> AppResult<Category> {
        let mut tables = self.write()?;
        let category = Category {
            id: Tables::next_id(&mut tables.next_category_id),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn find_links_by_book_id(&self, book_id: BookId) -> AppResult<Vec<BookCategoryLink>> {
        let tables = self.read()?;
        Ok(tables
            .links
            .values()
            .filter(|l| l.book_id == book_id)
            .cloned()
            .collect())
    }

    async fn find_categories_by_book_ids(
        &self,
        book_ids: &[BookId],
    ) -> AppResult<HashMap<BookId, Vec<Category>>> {
        let tables = self.read()?;
        let mut index: HashMap<BookId, Vec<Category>> = HashMap::new();
        for link in tables.links.values().filter(|l| book_ids.contains(&l.book_id)) {
            if let Some(category) = tables.categories.get(&link.category_id) {
                index.entry(link.book_id).or_default().push(category.clone());
            }
        }
        for categories in index.values_mut() {
            categories.sort_by_key(|c| c.id);
        }
        Ok(index)
    }

    async fn find_books_by_category_id(&self, category_id: CategoryId) -> AppResult<Vec<Book>> {
        let tables = self.read()?;
        let mut books: Vec<Book> = tables
            .links
            .values()
            .filter(|l| l.category_id == category_id)
            .filter_map(|l| tables.books.get(&l.book_id).cloned())
            .collect();
        books.sort_by_key(|b| b.id);
        books.dedup_by_key(|b| b.id);
        Ok(books)
    }

    async fn find_books_by_author_and_title(
        &self,
        author: &str,
        title: &str,
        mode: TitleMatch,
    ) -> AppResult<Vec<Book>> {
        let tables = self.read()?;
        Ok(tables
            .books
            .values()
            .filter(|b| mode.matches(&b.author, author) && mode.matches(&b.title, title))
            .cloned()
            .collect())
    }

    async fn insert_book(&self, book: &NewBook) -> AppResult<Book> {
        Ok(self.write()?.insert_book(book))
    }

    async fn save_book(&self, book: &Book) -> AppResult<Book> {
        let mut tables = self.write()?;
        let stored = tables
            .books
            .get_mut(&book.id)
            .ok_or(AppError::BookNotFound(book.id))?;
        stored.title = book.title.clone();
        stored.author = book.author.clone();
        stored.status = book.status;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn insert_links(
        &self,
        book_id: BookId,
        category_ids: &[CategoryId],
    ) -> AppResult<Vec<BookCategoryLink>> {
        if category_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.write()?.insert_links(book_id, category_ids))
    }

    async fn delete_links(&self, link_ids: &[LinkId]) -> AppResult<u64> {
        if link_ids.is_empty() {
            return Ok(0);
        }
        Ok(self.write()?.delete_links(link_ids))
    }

    async fn apply_link_changes(&self, book_id: BookId, changes: &LinkChanges) -> AppResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let mut tables = self.write()?;
        tables.delete_links(&changes.delete_ids());
        tables.insert_links(book_id, &changes.to_insert);
        Ok(())
    }

    async fn register_book(&self, book: &NewBook, category_ids: &[CategoryId]) -> AppResult<Book> {
        let mut tables = self.write()?;
        let book = tables.insert_book(book);
        tables.insert_links(book.id, category_ids);
        Ok(book)
    }
}
