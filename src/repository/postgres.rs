//! PostgreSQL catalog store.
//!
//! Link mutations go through helpers taking a `PgConnection` so the same SQL
//! runs either on a pooled connection or inside a transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, Pool, Postgres, Row};

use super::{CatalogStore, LinkChanges};
use crate::{
    error::{AppError, AppResult},
    models::{
        Book, BookCategoryLink, BookId, BookStatus, Category, CategoryId, LinkId, NewBook,
        TitleMatch,
    },
};

const BOOK_COLUMNS: &str = "b.id, b.title, b.author, b.status, b.created_at, b.updated_at";

/// Raw `books` row; status is stored as text
#[derive(Debug, FromRow)]
struct BookRow {
    id: BookId,
    title: String,
    author: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookRow> for Book {
    type Error = AppError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<BookStatus>()
            .map_err(|e| AppError::Internal(format!("book {}: {}", row.id, e)))?;
        Ok(Book {
            id: row.id,
            title: row.title,
            author: row.author,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_books(rows: Vec<BookRow>) -> AppResult<Vec<Book>> {
    rows.into_iter().map(Book::try_from).collect()
}

async fn insert_book(conn: &mut PgConnection, book: &NewBook) -> AppResult<Book> {
    let row = sqlx::query_as::<_, BookRow>(
        r#"
        INSERT INTO books (title, author, status)
        VALUES ($1, $2, $3)
        RETURNING id, title, author, status, created_at, updated_at
        "#,
    )
    .bind(&book.title)
    .bind(&book.author)
    .bind(BookStatus::Available.as_str())
    .fetch_one(conn)
    .await?;
    row.try_into()
}

async fn insert_links(
    conn: &mut PgConnection,
    book_id: BookId,
    category_ids: &[CategoryId],
) -> AppResult<Vec<BookCategoryLink>> {
    if category_ids.is_empty() {
        return Ok(Vec::new());
    }
    let links = sqlx::query_as::<_, BookCategoryLink>(
        r#"
        INSERT INTO book_categories (book_id, category_id)
        SELECT $1, UNNEST($2::bigint[])
        ON CONFLICT (book_id, category_id) DO NOTHING
        RETURNING id, book_id, category_id, created_at
        "#,
    )
    .bind(book_id)
    .bind(category_ids)
    .fetch_all(conn)
    .await?;
    Ok(links)
}

async fn delete_links(conn: &mut PgConnection, link_ids: &[LinkId]) -> AppResult<u64> {
    if link_ids.is_empty() {
        return Ok(0);
    }
    let result = sqlx::query("DELETE FROM book_categories WHERE id = ANY($1)")
        .bind(link_ids)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

#[derive(Clone)]
pub struct PgCatalogStore {
    pool: Pool<Postgres>,
}

impl PgCatalogStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_book_by_id(&self, id: BookId) -> AppResult<Option<Book>> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {} FROM books b WHERE b.id = $1",
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Book::try_from).transpose()
    }

    async fn find_category_by_id(&self, id: CategoryId) -> AppResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn find_categories_by_ids(&self, ids: &[CategoryId]) -> AppResult<Vec<Category>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at FROM categories WHERE id = ANY($1) ORDER BY id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at FROM categories ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn insert_category(&self, name: &str) -> AppResult<Category> {
        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(category)
    }

    async fn find_links_by_book_id(&self, book_id: BookId) -> AppResult<Vec<BookCategoryLink>> {
        let links = sqlx::query_as::<_, BookCategoryLink>(
            r#"
            SELECT id, book_id, category_id, created_at
            FROM book_categories
            WHERE book_id = $1
            ORDER BY id
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(links)
    }

    async fn find_categories_by_book_ids(
        &self,
        book_ids: &[BookId],
    ) -> AppResult<HashMap<BookId, Vec<Category>>> {
        if book_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query(
            r#"
            SELECT bc.book_id, c.id, c.name, c.created_at
            FROM book_categories bc
            JOIN categories c ON c.id = bc.category_id
            WHERE bc.book_id = ANY($1)
            ORDER BY bc.book_id, c.id
            "#,
        )
        .bind(book_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut index: HashMap<BookId, Vec<Category>> = HashMap::new();
        for row in rows {
            index.entry(row.get("book_id")).or_default().push(Category {
                id: row.get("id"),
                name: row.get("name"),
                created_at: row.get("created_at"),
            });
        }
        Ok(index)
    }

    async fn find_books_by_category_id(&self, category_id: CategoryId) -> AppResult<Vec<Book>> {
        let rows = sqlx::query_as::<_, BookRow>(&format!(
            r#"
            SELECT {}
            FROM books b
            JOIN book_categories bc ON bc.book_id = b.id
            WHERE bc.category_id = $1
            ORDER BY b.id
            "#,
            BOOK_COLUMNS
        ))
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;
        into_books(rows)
    }

    async fn find_books_by_author_and_title(
        &self,
        author: &str,
        title: &str,
        mode: TitleMatch,
    ) -> AppResult<Vec<Book>> {
        let condition = match mode {
            TitleMatch::Exact => "b.author = $1 AND b.title = $2",
            TitleMatch::Contains => "strpos(b.author, $1) > 0 AND strpos(b.title, $2) > 0",
        };
        let rows = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {} FROM books b WHERE {} ORDER BY b.id",
            BOOK_COLUMNS, condition
        ))
        .bind(author)
        .bind(title)
        .fetch_all(&self.pool)
        .await?;
        into_books(rows)
    }

    async fn insert_book(&self, book: &NewBook) -> AppResult<Book> {
        let mut conn = self.pool.acquire().await?;
        insert_book(&mut conn, book).await
    }

    async fn save_book(&self, book: &Book) -> AppResult<Book> {
        let row = sqlx::query_as::<_, BookRow>(
            r#"
            UPDATE books
            SET title = $2, author = $3, status = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, author, status, created_at, updated_at
            "#,
        )
        .bind(book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.status.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::BookNotFound(book.id))?;
        row.try_into()
    }

    async fn insert_links(
        &self,
        book_id: BookId,
        category_ids: &[CategoryId],
    ) -> AppResult<Vec<BookCategoryLink>> {
        let mut conn = self.pool.acquire().await?;
        insert_links(&mut conn, book_id, category_ids).await
    }

    async fn delete_links(&self, link_ids: &[LinkId]) -> AppResult<u64> {
        let mut conn = self.pool.acquire().await?;
        delete_links(&mut conn, link_ids).await
    }

    async fn apply_link_changes(&self, book_id: BookId, changes: &LinkChanges) -> AppResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        delete_links(&mut tx, &changes.delete_ids()).await?;
        insert_links(&mut tx, book_id, &changes.to_insert).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn register_book(&self, book: &NewBook, category_ids: &[CategoryId]) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;
        let created = insert_book(&mut tx, book).await?;
        insert_links(&mut tx, created.id, category_ids).await?;
        tx.commit().await?;
        Ok(created)
    }
}
