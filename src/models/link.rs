//! Book-category link model

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::{book::BookId, category::CategoryId};

pub type LinkId = i64;

/// Membership of a book in a category. At most one per (book, category) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct BookCategoryLink {
    pub id: LinkId,
    pub book_id: BookId,
    pub category_id: CategoryId,
    pub created_at: DateTime<Utc>,
}
