//! Book model and request/response types

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::category::{Category, CategoryId};

pub type BookId = i64;

/// Loan availability of a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookStatus {
    #[default]
    Available,
    /// Damaged, lost or otherwise withdrawn from lending
    Unavailable,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "AVAILABLE",
            BookStatus::Unavailable => "UNAVAILABLE",
        }
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(BookStatus::Available),
            "UNAVAILABLE" => Ok(BookStatus::Unavailable),
            other => Err(format!("unknown book status '{}'", other)),
        }
    }
}

/// How author/title search compares its inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleMatch {
    /// Case- and whitespace-sensitive equality on both fields
    #[default]
    Exact,
    /// Case-sensitive substring match on both fields
    Contains,
}

impl TitleMatch {
    pub fn matches(&self, value: &str, wanted: &str) -> bool {
        match self {
            TitleMatch::Exact => value == wanted,
            TitleMatch::Contains => value.contains(wanted),
        }
    }
}

/// Book record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub status: BookStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A book that has not been persisted yet; the store assigns its id
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
}

/// Register book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author must not be empty"))]
    pub author: String,
    /// Categories the book belongs to (at least one)
    #[serde(default)]
    #[validate(length(min = 1, message = "At least one category is required"))]
    pub category_ids: Vec<CategoryId>,
}

/// Replace the category set of a book
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBookCategories {
    #[serde(default)]
    #[validate(length(min = 1, message = "At least one category is required"))]
    pub category_ids: Vec<CategoryId>,
}

/// Author and title search parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookSearchQuery {
    pub author: String,
    pub title: String,
}

/// Book as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookResponse {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub status: BookStatus,
    pub categories: Vec<Category>,
}

impl BookResponse {
    pub fn new(book: Book, categories: Vec<Category>) -> Self {
        Self {
            book_id: book.id,
            title: book.title,
            author: book.author,
            status: book.status,
            categories,
        }
    }
}

/// Outcome of a category reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryChanges {
    pub added: Vec<CategoryId>,
    pub removed: Vec<CategoryId>,
    pub unchanged: Vec<CategoryId>,
}

impl CategoryChanges {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&BookStatus::Unavailable).unwrap(),
            "\"UNAVAILABLE\""
        );
        let parsed: BookStatus = serde_json::from_str("\"AVAILABLE\"").unwrap();
        assert_eq!(parsed, BookStatus::Available);
        assert!("available".parse::<BookStatus>().is_err());
        assert_eq!("UNAVAILABLE".parse::<BookStatus>(), Ok(BookStatus::Unavailable));
    }

    #[test]
    fn test_title_match() {
        assert!(TitleMatch::Exact.matches("Dune", "Dune"));
        assert!(!TitleMatch::Exact.matches("Dune ", "Dune"));
        assert!(!TitleMatch::Exact.matches("dune", "Dune"));
        assert!(TitleMatch::Contains.matches("Dune Messiah", "Dune"));
        assert!(!TitleMatch::Contains.matches("Dune Messiah", "dune"));
    }

    #[test]
    fn test_create_book_requires_a_category() {
        let request = CreateBook {
            title: "Title".into(),
            author: "Author".into(),
            category_ids: vec![],
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("category_ids"));
    }

    #[test]
    fn test_create_book_rejects_empty_title() {
        let request = CreateBook {
            title: String::new(),
            author: "Author".into(),
            category_ids: vec![1],
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_missing_category_list_fails_validation() {
        let request: CreateBook =
            serde_json::from_str(r#"{"title": "Title", "author": "Author"}"#).unwrap();
        assert!(request.category_ids.is_empty());
        assert!(request.validate().is_err());

        let update: UpdateBookCategories = serde_json::from_str("{}").unwrap();
        assert!(update.validate().is_err());
    }
}
