//! Data models for the bookstore catalog

pub mod book;
pub mod category;
pub mod link;

pub use book::{
    Book, BookId, BookResponse, BookSearchQuery, BookStatus, CategoryChanges, CreateBook,
    NewBook, TitleMatch, UpdateBookCategories,
};
pub use category::{Category, CategoryId, CreateCategory};
pub use link::{BookCategoryLink, LinkId};
