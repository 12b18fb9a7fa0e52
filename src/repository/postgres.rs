//! PostgreSQL catalog store

use async_trait::async_trait;
use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

use super::CatalogStore;
use crate::{
    error::{AppError, AppResult},
    models::{Author, AuthorWithBooks, Book, BookChanges, NewAuthor, NewBook},
    query::{BookFilter, BookQuery},
    validation::invalid_author_message,
};

const BOOK_COLUMNS: &str = "b.id, b.title, b.publication_year, b.author_id AS author";

/// Foreign-key violations become a field error on `author`, unique
/// violations a conflict; everything else stays a database error.
fn map_write_error(e: sqlx::Error, author: Option<i32>) -> AppError {
    if let sqlx::Error::Database(ref db) = e {
        match db.code().as_deref() {
            Some("23503") => {
                let message = match author {
                    Some(id) => invalid_author_message(id),
                    None => "Author does not exist.".to_string(),
                };
                return AppError::field("author", message);
            }
            Some("23505") => {
                tracing::debug!("Unique violation: {}", db.message());
                return AppError::Conflict("Duplicate entry".to_string());
            }
            _ => {}
        }
    }
    AppError::Database(e)
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &BookFilter) {
    if let Some(ref title) = filter.title {
        qb.push(" AND b.title = ").push_bind(title.clone());
    }
    if let Some(author) = filter.author {
        qb.push(" AND b.author_id = ").push_bind(author);
    }
    if let Some(year) = filter.publication_year {
        qb.push(" AND b.publication_year = ").push_bind(year);
    }
    if let Some(ref term) = filter.search {
        qb.push(" AND (strpos(lower(b.title), ")
            .push_bind(term.clone())
            .push(") > 0 OR strpos(lower(a.name), ")
            .push_bind(term.clone())
            .push(") > 0)");
    }
}

#[derive(Clone)]
pub struct PgCatalogStore {
    pool: Pool<Postgres>,
}

impl PgCatalogStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Read-only transaction whose statements all see one snapshot
    async fn begin_snapshot(&self) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // =========================================================================
    // AUTHORS
    // =========================================================================

    async fn authors_with_books(&self, id: Option<i32>) -> AppResult<Vec<AuthorWithBooks>> {
        let mut tx = self.begin_snapshot().await?;

        let authors = sqlx::query_as::<_, Author>(
            "SELECT id, name FROM authors WHERE ($1::INTEGER IS NULL OR id = $1) ORDER BY name, id",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        if let Some(id) = id {
            if authors.is_empty() {
                tx.rollback().await?;
                return Err(AppError::author_not_found(id));
            }
        }

        let ids: Vec<i32> = authors.iter().map(|a| a.id).collect();
        let query = format!("SELECT {} FROM books b WHERE b.author_id = ANY($1)", BOOK_COLUMNS);
        let books = sqlx::query_as::<_, Book>(&query)
            .bind(ids)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(AuthorWithBooks::assemble(authors, books))
    }

    async fn authors_exist(&self, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM authors WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn authors_create(&self, data: &NewAuthor) -> AppResult<Author> {
        sqlx::query_as::<_, Author>("INSERT INTO authors (name) VALUES ($1) RETURNING id, name")
            .bind(&data.name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, None))
    }

    async fn authors_delete(&self, id: i32) -> AppResult<u64> {
        let mut tx = self.pool.begin().await?;

        let books = sqlx::query("DELETE FROM books WHERE author_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let deleted = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Err(AppError::author_not_found(id));
        }

        tx.commit().await?;
        Ok(books)
    }

    // =========================================================================
    // BOOKS
    // =========================================================================

    async fn books_get(&self, id: i32) -> AppResult<Book> {
        let query = format!("SELECT {} FROM books b WHERE b.id = $1", BOOK_COLUMNS);
        sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::book_not_found(id))
    }

    async fn books_search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        // Count and page read the same snapshot
        let mut tx = self.begin_snapshot().await?;

        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM books b JOIN authors a ON a.id = b.author_id WHERE 1=1",
        );
        push_filter(&mut count, &query.filter);
        let total: i64 = count.build_query_scalar().fetch_one(&mut *tx).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM books b JOIN authors a ON a.id = b.author_id WHERE 1=1",
            BOOK_COLUMNS
        ));
        push_filter(&mut select, &query.filter);
        select.push(" ORDER BY ");
        for key in &query.ordering {
            select.push(key.sql()).push(", ");
        }
        select
            .push("b.id ASC LIMIT ")
            .push_bind(query.page.page_size)
            .push(" OFFSET ")
            .push_bind(query.page.offset());

        let books = select
            .build_query_as::<Book>()
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((books, total))
    }

    async fn books_count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn books_create(&self, data: &NewBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, publication_year, author_id)
            VALUES ($1, $2, $3)
            RETURNING id, title, publication_year, author_id AS author
            "#,
        )
        .bind(&data.title)
        .bind(data.publication_year)
        .bind(data.author)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, Some(data.author)))
    }

    async fn books_update(&self, id: i32, changes: &BookChanges) -> AppResult<Book> {
        // Single statement: omitted fields keep their stored value
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = COALESCE($1, title),
                publication_year = COALESCE($2, publication_year),
                author_id = COALESCE($3, author_id)
            WHERE id = $4
            RETURNING id, title, publication_year, author_id AS author
            "#,
        )
        .bind(&changes.title)
        .bind(changes.publication_year)
        .bind(changes.author)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, changes.author))?
        .ok_or_else(|| AppError::book_not_found(id))
    }

    async fn books_delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::book_not_found(id));
        }
        Ok(())
    }
}
