//! Catalog management service

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{
        Book, BookId, BookResponse, BookSearchQuery, BookStatus, Category, CategoryChanges,
        CategoryId, CreateBook, NewBook, TitleMatch, UpdateBookCategories,
    },
    repository::CatalogStore,
};

use super::reconcile::reconcile;

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    title_match: TitleMatch,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>, title_match: TitleMatch) -> Self {
        Self { store, title_match }
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.store.ping().await
    }

    async fn get_book_record(&self, book_id: BookId) -> AppResult<Book> {
        self.store
            .find_book_by_id(book_id)
            .await?
            .ok_or(AppError::BookNotFound(book_id))
    }

    /// Attach each book's categories using one index lookup
    async fn to_responses(&self, books: Vec<Book>) -> AppResult<Vec<BookResponse>> {
        let ids: Vec<BookId> = books.iter().map(|b| b.id).collect();
        let mut index: HashMap<BookId, Vec<Category>> =
            self.store.find_categories_by_book_ids(&ids).await?;

        Ok(books
            .into_iter()
            .map(|book| {
                let categories = index.remove(&book.id).unwrap_or_default();
                BookResponse::new(book, categories)
            })
            .collect())
    }

    /// Get a single book with its categories
    pub async fn get_book(&self, book_id: BookId) -> AppResult<BookResponse> {
        let book = self.get_book_record(book_id).await?;
        let mut responses = self.to_responses(vec![book]).await?;
        responses
            .pop()
            .ok_or_else(|| AppError::Internal(format!("book {} vanished during lookup", book_id)))
    }

    /// All books linked to a category
    pub async fn books_by_category(&self, category_id: CategoryId) -> AppResult<Vec<BookResponse>> {
        self.store
            .find_category_by_id(category_id)
            .await?
            .ok_or_else(|| {
                AppError::CategoryNotFound(format!("Category not found with id: {}", category_id))
            })?;

        let books = self.store.find_books_by_category_id(category_id).await?;
        self.to_responses(books).await
    }

    /// Books matching author and title, compared per the configured match mode
    pub async fn books_by_author_and_title(
        &self,
        query: &BookSearchQuery,
    ) -> AppResult<Vec<BookResponse>> {
        let books = self
            .store
            .find_books_by_author_and_title(&query.author, &query.title, self.title_match)
            .await?;
        self.to_responses(books).await
    }

    /// Toggle loan availability
    pub async fn set_status(&self, book_id: BookId, status: BookStatus) -> AppResult<()> {
        let mut book = self.get_book_record(book_id).await?;
        if book.status == status {
            tracing::debug!("Book {} already {}", book_id, status);
            return Ok(());
        }

        book.status = status;
        self.store.save_book(&book).await?;
        tracing::info!("Book {} status set to {}", book_id, status);
        Ok(())
    }

    /// Register a new book. Unknown category ids are dropped; if none remain
    /// nothing is created.
    pub async fn register(&self, data: CreateBook) -> AppResult<BookResponse> {
        let requested: BTreeSet<CategoryId> = data.category_ids.iter().copied().collect();
        let requested: Vec<CategoryId> = requested.into_iter().collect();

        let categories = self.store.find_categories_by_ids(&requested).await?;
        if categories.is_empty() {
            return Err(AppError::CategoryNotFound(format!(
                "None of the categories {:?} exist",
                requested
            )));
        }

        let new_book = NewBook {
            title: data.title,
            author: data.author,
        };
        let category_ids: Vec<CategoryId> = categories.iter().map(|c| c.id).collect();
        let book = self.store.register_book(&new_book, &category_ids).await?;

        tracing::info!(
            "Registered book {} '{}' in categories {:?}",
            book.id,
            book.title,
            category_ids
        );
        Ok(BookResponse::new(book, categories))
    }

    /// Replace a book's category set with the minimal number of link changes
    pub async fn change_categories(
        &self,
        book_id: BookId,
        data: UpdateBookCategories,
    ) -> AppResult<CategoryChanges> {
        self.get_book_record(book_id).await?;

        let requested: BTreeSet<CategoryId> = data.category_ids.iter().copied().collect();
        let requested: Vec<CategoryId> = requested.into_iter().collect();
        let resolved: BTreeSet<CategoryId> = self
            .store
            .find_categories_by_ids(&requested)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();

        let current = self.store.find_links_by_book_id(book_id).await?;
        let changes = reconcile(book_id, &current, &resolved).inspect_err(|e| {
            tracing::warn!("Category reconciliation rejected for book {}: {}", book_id, e);
        })?;

        let summary = CategoryChanges {
            added: changes.to_insert.clone(),
            removed: changes.to_delete.iter().map(|l| l.category_id).collect(),
            unchanged: changes.unchanged.clone(),
        };

        if changes.is_empty() {
            tracing::debug!("Book {} categories already up to date", book_id);
            return Ok(summary);
        }

        self.store.apply_link_changes(book_id, &changes).await?;
        tracing::info!(
            "Book {} categories updated: added {:?}, removed {:?}",
            book_id,
            summary.added,
            summary.removed
        );
        Ok(summary)
    }

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.store.list_categories().await
    }

    pub async fn create_category(&self, name: &str) -> AppResult<Category> {
        let category = self.store.insert_category(name).await?;
        tracing::info!("Created category {} '{}'", category.id, category.name);
        Ok(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookCategoryLink;
    use crate::repository::{MemoryCatalogStore, MockCatalogStore};
    use chrono::Utc;
    use mockall::predicate::eq;
    use tokio_test::{assert_err, assert_ok};

    fn book(id: BookId, status: BookStatus) -> Book {
        let now = Utc::now();
        Book {
            id,
            title: "Test Title".into(),
            author: "Test Author".into(),
            status,
            created_at: now,
            updated_at: now,
        }
    }

    fn category(id: CategoryId, name: &str) -> Category {
        Category {
            id,
            name: name.into(),
            created_at: Utc::now(),
        }
    }

    fn link(id: i64, book_id: BookId, category_id: CategoryId) -> BookCategoryLink {
        BookCategoryLink {
            id,
            book_id,
            category_id,
            created_at: Utc::now(),
        }
    }

    fn service(store: MockCatalogStore) -> CatalogService {
        CatalogService::new(Arc::new(store), TitleMatch::Exact)
    }

    #[tokio::test]
    async fn test_books_by_category() {
        let mut store = MockCatalogStore::new();
        store
            .expect_find_category_by_id()
            .with(eq(1))
            .returning(|id| Ok(Some(category(id, "Humanities"))));
        store.expect_find_books_by_category_id().returning(|_| {
            Ok(vec![
                book(1, BookStatus::Available),
                book(2, BookStatus::Unavailable),
            ])
        });
        store
            .expect_find_categories_by_book_ids()
            .returning(|_| Ok(HashMap::new()));

        let books = service(store).books_by_category(1).await.unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(books[1].status, BookStatus::Unavailable);
    }

    #[tokio::test]
    async fn test_books_by_unknown_category() {
        let mut store = MockCatalogStore::new();
        store.expect_find_category_by_id().returning(|_| Ok(None));
        store.expect_find_books_by_category_id().never();

        let err = service(store).books_by_category(5).await.unwrap_err();
        assert!(matches!(err, AppError::CategoryNotFound(_)));
    }

    #[tokio::test]
    async fn test_books_by_author_and_title_uses_configured_mode() {
        let mut store = MockCatalogStore::new();
        store
            .expect_find_books_by_author_and_title()
            .withf(|author, title, mode| {
                author == "Author" && title == "Title" && *mode == TitleMatch::Exact
            })
            .returning(|_, _, _| Ok(vec![book(1, BookStatus::Available)]));
        store
            .expect_find_categories_by_book_ids()
            .returning(|_| Ok(HashMap::new()));

        let query = BookSearchQuery {
            author: "Author".into(),
            title: "Title".into(),
        };
        let books = service(store).books_by_author_and_title(&query).await.unwrap();
        assert_eq!(books.len(), 1);
    }

    #[tokio::test]
    async fn test_set_status_saves_once() {
        let mut store = MockCatalogStore::new();
        store
            .expect_find_book_by_id()
            .returning(|id| Ok(Some(book(id, BookStatus::Available))));
        store
            .expect_save_book()
            .withf(|b| b.status == BookStatus::Unavailable)
            .times(1)
            .returning(|b| Ok(b.clone()));

        assert_ok!(service(store).set_status(1, BookStatus::Unavailable).await);
    }

    #[tokio::test]
    async fn test_set_same_status_does_not_write() {
        let mut store = MockCatalogStore::new();
        store
            .expect_find_book_by_id()
            .returning(|id| Ok(Some(book(id, BookStatus::Available))));
        store.expect_save_book().never();

        assert_ok!(service(store).set_status(1, BookStatus::Available).await);
    }

    #[tokio::test]
    async fn test_set_status_unknown_book() {
        let mut store = MockCatalogStore::new();
        store.expect_find_book_by_id().returning(|_| Ok(None));
        store.expect_save_book().never();

        let err = service(store)
            .set_status(3, BookStatus::Unavailable)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BookNotFound(3)));
    }

    #[tokio::test]
    async fn test_register_links_resolved_categories() {
        let mut store = MockCatalogStore::new();
        store
            .expect_find_categories_by_ids()
            .withf(|ids| ids == [1, 2, 999])
            .returning(|_| Ok(vec![category(1, "Category1"), category(2, "Category2")]));
        store
            .expect_register_book()
            .withf(|new_book, ids| new_book.title == "New Book" && ids == [1, 2])
            .times(1)
            .returning(|_, _| Ok(book(7, BookStatus::Available)));

        let response = service(store)
            .register(CreateBook {
                title: "New Book".into(),
                author: "New Author".into(),
                category_ids: vec![2, 999, 1, 2],
            })
            .await
            .unwrap();
        assert_eq!(response.book_id, 7);
        assert_eq!(response.categories.len(), 2);
    }

    #[tokio::test]
    async fn test_register_without_resolved_categories_creates_nothing() {
        let mut store = MockCatalogStore::new();
        store
            .expect_find_categories_by_ids()
            .returning(|_| Ok(vec![]));
        store.expect_register_book().never();
        store.expect_insert_book().never();

        let result = service(store)
            .register(CreateBook {
                title: "New Book".into(),
                author: "New Author".into(),
                category_ids: vec![999],
            })
            .await;
        let err = assert_err!(result);
        assert!(matches!(err, AppError::CategoryNotFound(_)));
    }

    #[tokio::test]
    async fn test_change_categories_applies_diff() {
        let mut store = MockCatalogStore::new();
        store
            .expect_find_book_by_id()
            .returning(|id| Ok(Some(book(id, BookStatus::Available))));
        store
            .expect_find_categories_by_ids()
            .returning(|_| Ok(vec![category(2, "B"), category(3, "C")]));
        store
            .expect_find_links_by_book_id()
            .returning(|book_id| Ok(vec![link(10, book_id, 1), link(11, book_id, 2)]));
        store
            .expect_apply_link_changes()
            .withf(|book_id, changes| {
                *book_id == 1 && changes.delete_ids() == vec![10] && changes.to_insert == vec![3]
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let summary = service(store)
            .change_categories(1, UpdateBookCategories { category_ids: vec![2, 3] })
            .await
            .unwrap();
        assert_eq!(summary.added, vec![3]);
        assert_eq!(summary.removed, vec![1]);
        assert_eq!(summary.unchanged, vec![2]);
    }

    #[tokio::test]
    async fn test_change_categories_without_links_never_mutates() {
        let mut store = MockCatalogStore::new();
        store
            .expect_find_book_by_id()
            .returning(|id| Ok(Some(book(id, BookStatus::Available))));
        store
            .expect_find_categories_by_ids()
            .returning(|_| Ok(vec![category(1, "A")]));
        store.expect_find_links_by_book_id().returning(|_| Ok(vec![]));
        store.expect_apply_link_changes().never();
        store.expect_insert_links().never();
        store.expect_delete_links().never();

        let err = service(store)
            .change_categories(1, UpdateBookCategories { category_ids: vec![1] })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BookCategoryNotFound(1)));
        assert_eq!(err.to_string(), "Book 1 has no categories assigned");
    }

    #[tokio::test]
    async fn test_change_categories_unknown_book() {
        let mut store = MockCatalogStore::new();
        store.expect_find_book_by_id().returning(|_| Ok(None));
        store.expect_apply_link_changes().never();

        let err = service(store)
            .change_categories(4, UpdateBookCategories { category_ids: vec![1] })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BookNotFound(4)));
    }

    #[tokio::test]
    async fn test_reconciliation_against_memory_store() {
        let store = Arc::new(MemoryCatalogStore::new());
        let service = CatalogService::new(store.clone(), TitleMatch::Exact);
        let c1 = service.create_category("One").await.unwrap();
        let c2 = service.create_category("Two").await.unwrap();
        let c3 = service.create_category("Three").await.unwrap();

        let registered = service
            .register(CreateBook {
                title: "T".into(),
                author: "A".into(),
                category_ids: vec![c1.id, c2.id],
            })
            .await
            .unwrap();
        let book_id = registered.book_id;
        let before = store.find_links_by_book_id(book_id).await.unwrap();
        let kept = before.iter().find(|l| l.category_id == c2.id).unwrap().clone();

        let first = service
            .change_categories(book_id, UpdateBookCategories { category_ids: vec![c2.id, c3.id] })
            .await
            .unwrap();
        assert_eq!(first.added, vec![c3.id]);
        assert_eq!(first.removed, vec![c1.id]);

        let after = store.find_links_by_book_id(book_id).await.unwrap();
        let mut linked: Vec<_> = after.iter().map(|l| l.category_id).collect();
        linked.sort();
        assert_eq!(linked, vec![c2.id, c3.id]);
        assert!(after.contains(&kept));

        let second = service
            .change_categories(book_id, UpdateBookCategories { category_ids: vec![c3.id, c2.id] })
            .await
            .unwrap();
        assert!(second.is_noop());
        assert_eq!(store.find_links_by_book_id(book_id).await.unwrap(), after);
    }

    #[tokio::test]
    async fn test_dangling_category_ids_are_dropped() {
        let store = Arc::new(MemoryCatalogStore::new());
        let service = CatalogService::new(store.clone(), TitleMatch::Exact);
        let c1 = service.create_category("One").await.unwrap();
        let c2 = service.create_category("Two").await.unwrap();

        let registered = service
            .register(CreateBook {
                title: "T".into(),
                author: "A".into(),
                category_ids: vec![c1.id],
            })
            .await
            .unwrap();

        service
            .change_categories(
                registered.book_id,
                UpdateBookCategories { category_ids: vec![c2.id, 999] },
            )
            .await
            .unwrap();

        let book = service.get_book(registered.book_id).await.unwrap();
        let ids: Vec<_> = book.categories.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![c2.id]);
    }

    #[tokio::test]
    async fn test_status_round_trip() {
        let store = Arc::new(MemoryCatalogStore::new());
        let service = CatalogService::new(store, TitleMatch::Exact);
        let c1 = service.create_category("One").await.unwrap();
        let registered = service
            .register(CreateBook {
                title: "T".into(),
                author: "A".into(),
                category_ids: vec![c1.id],
            })
            .await
            .unwrap();

        service
            .set_status(registered.book_id, BookStatus::Unavailable)
            .await
            .unwrap();
        assert_eq!(
            service.get_book(registered.book_id).await.unwrap().status,
            BookStatus::Unavailable
        );

        service
            .set_status(registered.book_id, BookStatus::Available)
            .await
            .unwrap();
        let book = service.get_book(registered.book_id).await.unwrap();
        assert_eq!(book.status, BookStatus::Available);
        assert_eq!(book.title, "T");
        assert_eq!(book.author, "A");
        assert_eq!(book.categories.len(), 1);
    }
}
