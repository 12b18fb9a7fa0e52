//! Catalog service: validation, store calls and query handling behind the
//! HTTP handlers.

use std::sync::Arc;

use validator::Validate;

use crate::{
    config::PaginationConfig,
    error::{AppError, AppResult, FieldErrors},
    models::{Author, AuthorWithBooks, Book, NewAuthor, NewBook},
    query::{BookListParams, BookQuery, PageRequest},
    repository::CatalogStore,
    validation::{self, BookDraft, FieldPresence},
};

/// One page of a book listing
#[derive(Debug, Clone)]
pub struct BookPage {
    pub books: Vec<Book>,
    pub total: i64,
    pub page: PageRequest,
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    pagination: PaginationConfig,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>, pagination: PaginationConfig) -> Self {
        Self { store, pagination }
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.store.ping().await
    }

    // =========================================================================
    // BOOKS
    // =========================================================================

    /// Filter, search, order and paginate books
    pub async fn list_books(&self, params: &BookListParams) -> AppResult<BookPage> {
        let query = BookQuery::from_params(params, &self.pagination)?;
        let (books, total) = self.store.books_search(&query).await?;

        if query.page.is_out_of_range(total) {
            return Err(AppError::InvalidPage(query.page.page));
        }

        Ok(BookPage {
            books,
            total,
            page: query.page,
        })
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.store.books_get(id).await
    }

    pub async fn create_book(&self, draft: BookDraft) -> AppResult<Book> {
        let changes =
            validation::validate_book(self.store.as_ref(), draft, FieldPresence::Required).await?;
        let created = self.store.books_create(&NewBook::try_from(changes)?).await?;
        tracing::info!(book_id = created.id, author_id = created.author, "Book created");
        Ok(created)
    }

    /// Replace (`Required`) or patch (`Optional`) a book's fields
    pub async fn update_book(
        &self,
        id: i32,
        draft: BookDraft,
        presence: FieldPresence,
    ) -> AppResult<Book> {
        // Unknown ids are 404 before any field is looked at
        let current = self.store.books_get(id).await?;

        let changes = validation::validate_book(self.store.as_ref(), draft, presence).await?;
        if changes.is_empty() {
            return Ok(current);
        }

        let updated = self.store.books_update(id, &changes).await?;
        tracing::info!(book_id = id, "Book updated");
        Ok(updated)
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.store.books_delete(id).await?;
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }

    // =========================================================================
    // AUTHORS
    // =========================================================================

    /// All authors with their nested books
    pub async fn list_authors(&self) -> AppResult<Vec<AuthorWithBooks>> {
        self.store.authors_with_books(None).await
    }

    pub async fn get_author(&self, id: i32) -> AppResult<AuthorWithBooks> {
        self.store
            .authors_with_books(Some(id))
            .await?
            .pop()
            .ok_or_else(|| AppError::author_not_found(id))
    }

    pub async fn create_author(&self, data: NewAuthor) -> AppResult<Author> {
        data.validate().map_err(|e| AppError::Validation(FieldErrors::from(e)))?;
        let author = self.store.authors_create(&data).await?;
        tracing::info!(author_id = author.id, "Author created");
        Ok(author)
    }

    /// Delete an author and, with them, all of their books
    pub async fn delete_author(&self, id: i32) -> AppResult<u64> {
        let books = self.store.authors_delete(id).await?;
        tracing::info!(author_id = id, books_deleted = books, "Author deleted");
        Ok(books)
    }
}
