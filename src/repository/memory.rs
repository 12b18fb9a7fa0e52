//! In-memory catalog store.
//!
//! The whole catalog sits behind one `RwLock`; each write holds the lock for
//! its full check-and-apply, so readers see either the old or the new state.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::CatalogStore;
use crate::{
    error::{AppError, AppResult},
    models::{Author, AuthorWithBooks, Book, BookChanges, NewAuthor, NewBook},
    query::BookQuery,
    validation::invalid_author_message,
};

#[derive(Default)]
struct Catalog {
    authors: BTreeMap<i32, Author>,
    books: BTreeMap<i32, Book>,
    last_author_id: i32,
    last_book_id: i32,
}

impl Catalog {
    fn require_author(&self, id: i32) -> AppResult<()> {
        if self.authors.contains_key(&id) {
            Ok(())
        } else {
            Err(AppError::field("author", invalid_author_message(id)))
        }
    }
}

#[derive(Default)]
pub struct MemoryCatalogStore {
    catalog: RwLock<Catalog>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn authors_with_books(&self, id: Option<i32>) -> AppResult<Vec<AuthorWithBooks>> {
        let catalog = self.catalog.read().await;

        let authors: Vec<Author> = match id {
            Some(id) => vec![catalog
                .authors
                .get(&id)
                .cloned()
                .ok_or_else(|| AppError::author_not_found(id))?],
            None => {
                let mut all: Vec<Author> = catalog.authors.values().cloned().collect();
                all.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
                all
            }
        };

        let books = catalog
            .books
            .values()
            .filter(|book| authors.iter().any(|a| a.id == book.author))
            .cloned()
            .collect();

        Ok(AuthorWithBooks::assemble(authors, books))
    }

    async fn authors_exist(&self, id: i32) -> AppResult<bool> {
        Ok(self.catalog.read().await.authors.contains_key(&id))
    }

    async fn authors_create(&self, data: &NewAuthor) -> AppResult<Author> {
        let mut catalog = self.catalog.write().await;
        catalog.last_author_id += 1;
        let author = Author {
            id: catalog.last_author_id,
            name: data.name.clone(),
        };
        catalog.authors.insert(author.id, author.clone());
        Ok(author)
    }

    async fn authors_delete(&self, id: i32) -> AppResult<u64> {
        let mut catalog = self.catalog.write().await;
        if catalog.authors.remove(&id).is_none() {
            return Err(AppError::author_not_found(id));
        }
        let before = catalog.books.len();
        catalog.books.retain(|_, book| book.author != id);
        Ok((before - catalog.books.len()) as u64)
    }

    async fn books_get(&self, id: i32) -> AppResult<Book> {
        self.catalog
            .read()
            .await
            .books
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::book_not_found(id))
    }

    async fn books_search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let catalog = self.catalog.read().await;

        let mut matched: Vec<&Book> = catalog
            .books
            .values()
            .filter(|book| {
                let author_name = catalog
                    .authors
                    .get(&book.author)
                    .map(|a| a.name.as_str())
                    .unwrap_or_default();
                query.filter.matches(book, author_name)
            })
            .collect();
        matched.sort_by(|a, b| query.compare(a, b));

        let total = matched.len() as i64;
        let page = matched
            .into_iter()
            .skip(query.page.offset().max(0) as usize)
            .take(query.page.page_size.max(0) as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn books_count(&self) -> AppResult<i64> {
        Ok(self.catalog.read().await.books.len() as i64)
    }

    async fn books_create(&self, data: &NewBook) -> AppResult<Book> {
        let mut catalog = self.catalog.write().await;
        catalog.require_author(data.author)?;
        catalog.last_book_id += 1;
        let book = Book {
            id: catalog.last_book_id,
            title: data.title.clone(),
            publication_year: data.publication_year,
            author: data.author,
        };
        catalog.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn books_update(&self, id: i32, changes: &BookChanges) -> AppResult<Book> {
        let mut catalog = self.catalog.write().await;
        let current = catalog
            .books
            .get(&id)
            .ok_or_else(|| AppError::book_not_found(id))?;
        let updated = changes.apply_to(current);
        if let Some(author) = changes.author {
            catalog.require_author(author)?;
        }
        catalog.books.insert(id, updated.clone());
        Ok(updated)
    }

    async fn books_delete(&self, id: i32) -> AppResult<()> {
        self.catalog
            .write()
            .await
            .books
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::book_not_found(id))
    }
}
