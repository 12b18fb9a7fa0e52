//! Author model and the nested author representation

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::book::Book;

/// Author row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i32,
    pub name: String,
}

/// Create author request (operator tooling only; the HTTP surface is read-only)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewAuthor {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
}

impl NewAuthor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
        }
    }
}

/// Author with every book they wrote, books in natural book order.
///
/// `books` is output-only and never read from a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AuthorWithBooks {
    pub id: i32,
    pub name: String,
    pub books: Vec<Book>,
}

impl AuthorWithBooks {
    /// Nest `books` under their authors, keeping the order of `authors`.
    /// Books whose author is not in `authors` are dropped.
    pub fn assemble(authors: Vec<Author>, books: Vec<Book>) -> Vec<AuthorWithBooks> {
        let mut by_author: HashMap<i32, Vec<Book>> = HashMap::new();
        for book in books {
            by_author.entry(book.author).or_default().push(book);
        }

        authors
            .into_iter()
            .map(|author| {
                let mut books = by_author.remove(&author.id).unwrap_or_default();
                books.sort_by(Book::natural_cmp);
                AuthorWithBooks {
                    id: author.id,
                    name: author.name,
                    books,
                }
            })
            .collect()
    }
}
