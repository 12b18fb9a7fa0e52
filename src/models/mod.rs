//! Data models for the Bookshelf catalog

pub mod author;
pub mod book;
pub mod identity;

// Re-export commonly used types
pub use author::{Author, AuthorWithBooks, NewAuthor};
pub use book::{Book, BookChanges, NewBook};
pub use identity::IdentityClaims;
