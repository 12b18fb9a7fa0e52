//! Book model and write payloads

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::AppError;

/// Book in its flat wire shape: the author is referenced by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub publication_year: i32,
    /// Id of the owning author
    pub author: i32,
}

impl Book {
    /// Natural ordering: newest first, then title, then id.
    pub fn natural_cmp(a: &Book, b: &Book) -> Ordering {
        b.publication_year
            .cmp(&a.publication_year)
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.id.cmp(&b.id))
    }
}

/// Fully validated fields for a new book
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub publication_year: i32,
    pub author: i32,
}

/// Validated subset of book fields to replace; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookChanges {
    pub title: Option<String>,
    pub publication_year: Option<i32>,
    pub author: Option<i32>,
}

impl BookChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.publication_year.is_none() && self.author.is_none()
    }

    /// Apply onto an existing book, yielding the post-update record.
    pub fn apply_to(&self, book: &Book) -> Book {
        Book {
            id: book.id,
            title: self.title.clone().unwrap_or_else(|| book.title.clone()),
            publication_year: self.publication_year.unwrap_or(book.publication_year),
            author: self.author.unwrap_or(book.author),
        }
    }
}

impl TryFrom<BookChanges> for NewBook {
    type Error = AppError;

    fn try_from(changes: BookChanges) -> Result<Self, Self::Error> {
        match changes {
            BookChanges {
                title: Some(title),
                publication_year: Some(publication_year),
                author: Some(author),
            } => Ok(NewBook {
                title,
                publication_year,
                author,
            }),
            _ => Err(AppError::Internal(
                "book fields missing after full validation".to_string(),
            )),
        }
    }
}
