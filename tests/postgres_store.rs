//! PostgreSQL catalog store tests
//!
//! Needs a disposable database: `DATABASE_URL=postgres://... cargo test -- --ignored`

use sqlx::postgres::PgPoolOptions;

use bookstore_server::{
    models::{BookStatus, NewBook, TitleMatch},
    repository::{CatalogStore, LinkChanges, PgCatalogStore},
};

async fn store() -> PgCatalogStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("Failed to connect to database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    PgCatalogStore::new(pool)
}

fn new_book(title: &str) -> NewBook {
    NewBook {
        title: title.to_string(),
        author: "Postgres Test Author".to_string(),
    }
}

#[tokio::test]
#[ignore]
async fn test_register_and_search() {
    let store = store().await;
    let category = store.insert_category("pg-search").await.unwrap();
    let title = format!("pg-search-{}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0));

    let book = store
        .register_book(&new_book(&title), &[category.id])
        .await
        .unwrap();
    assert_eq!(book.status, BookStatus::Available);

    let found = store
        .find_books_by_author_and_title("Postgres Test Author", &title, TitleMatch::Exact)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, book.id);

    let by_category = store.find_books_by_category_id(category.id).await.unwrap();
    assert!(by_category.iter().any(|b| b.id == book.id));

    let index = store.find_categories_by_book_ids(&[book.id]).await.unwrap();
    assert_eq!(index[&book.id][0].id, category.id);
}

#[tokio::test]
#[ignore]
async fn test_apply_link_changes_keeps_common_link() {
    let store = store().await;
    let c1 = store.insert_category("pg-1").await.unwrap();
    let c2 = store.insert_category("pg-2").await.unwrap();
    let c3 = store.insert_category("pg-3").await.unwrap();
    let book = store
        .register_book(&new_book("pg-reconcile"), &[c1.id, c2.id])
        .await
        .unwrap();

    let before = store.find_links_by_book_id(book.id).await.unwrap();
    let kept = before.iter().find(|l| l.category_id == c2.id).unwrap().clone();
    let changes = LinkChanges {
        to_delete: before.iter().filter(|l| l.category_id == c1.id).cloned().collect(),
        to_insert: vec![c3.id],
        unchanged: vec![c2.id],
    };
    store.apply_link_changes(book.id, &changes).await.unwrap();

    let after = store.find_links_by_book_id(book.id).await.unwrap();
    let mut ids: Vec<_> = after.iter().map(|l| l.category_id).collect();
    ids.sort();
    assert_eq!(ids, vec![c2.id, c3.id]);
    assert!(after.contains(&kept));

    let duplicate = store.insert_links(book.id, &[c3.id]).await.unwrap();
    assert!(duplicate.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_save_book_status() {
    let store = store().await;
    let mut book = store.insert_book(&new_book("pg-status")).await.unwrap();
    book.status = BookStatus::Unavailable;
    let saved = store.save_book(&book).await.unwrap();
    assert_eq!(saved.status, BookStatus::Unavailable);
    assert_eq!(saved.title, "pg-status");
}
