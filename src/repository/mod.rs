//! Catalog store: persistence for authors and books.
//!
//! Every mutation is atomic. Deleting an author removes their books in the
//! same unit of work. The store re-checks the book → author reference when it
//! writes, so a reference that disappears after validation is still refused.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;

use crate::{
    config::{DatabaseConfig, StoreBackend},
    error::{AppError, AppResult},
    models::{Author, AuthorWithBooks, Book, BookChanges, NewAuthor, NewBook},
    query::BookQuery,
};

pub use memory::MemoryCatalogStore;
pub use postgres::PgCatalogStore;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Cheap round trip used by the readiness probe
    async fn ping(&self) -> AppResult<()>;

    /// Authors with their books, read from one consistent state. `None` means
    /// every author, ordered by name; `Some(id)` that author alone, or
    /// `NotFound`.
    async fn authors_with_books(&self, id: Option<i32>) -> AppResult<Vec<AuthorWithBooks>>;
    async fn authors_exist(&self, id: i32) -> AppResult<bool>;
    async fn authors_create(&self, data: &NewAuthor) -> AppResult<Author>;
    /// Delete an author and their books; returns how many books went with them.
    async fn authors_delete(&self, id: i32) -> AppResult<u64>;

    async fn books_get(&self, id: i32) -> AppResult<Book>;
    /// One page of matching books and the total number of matches, both
    /// taken from the same state
    async fn books_search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)>;
    async fn books_count(&self) -> AppResult<i64>;
    async fn books_create(&self, data: &NewBook) -> AppResult<Book>;
    async fn books_update(&self, id: i32, changes: &BookChanges) -> AppResult<Book>;
    async fn books_delete(&self, id: i32) -> AppResult<()>;
}

/// Open the configured store. PostgreSQL stores get the embedded schema applied.
pub async fn open_store(config: &DatabaseConfig) -> AppResult<Arc<dyn CatalogStore>> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory catalog store; data is lost on exit");
            Ok(Arc::new(MemoryCatalogStore::new()))
        }
        StoreBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .min_connections(config.min_connections)
                .connect(&config.url)
                .await?;
            tracing::info!("Connected to database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| AppError::Internal(format!("migration failed: {}", e)))?;
            tracing::info!("Database migrations completed");

            Ok(Arc::new(PgCatalogStore::new(pool)))
        }
    }
}
