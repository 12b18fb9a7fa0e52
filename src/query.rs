//! Book listing queries: exact filters, free-text search, ordering and
//! pagination.
//!
//! Raw query-string values arrive as [`BookListParams`] and are checked into a
//! typed [`BookQuery`]. Unknown query keys are ignored; malformed values for
//! known keys are reported as field errors.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    config::PaginationConfig,
    error::{AppResult, FieldErrors},
    models::Book,
};

/// Query-string parameters accepted by `GET /books`
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookListParams {
    /// Exact title
    pub title: Option<String>,
    /// Author id
    pub author: Option<String>,
    /// Exact publication year
    pub publication_year: Option<String>,
    /// Case-insensitive substring of the title or the author name
    pub search: Option<String>,
    /// Comma-separated `title` / `publication_year`, `-` prefix for descending
    pub ordering: Option<String>,
    /// Page number, starting at 1
    pub page: Option<String>,
    /// Results per page
    pub page_size: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Title,
    PublicationYear,
}

impl FromStr for SortField {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(SortField::Title),
            "publication_year" => Ok(SortField::PublicationYear),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub descending: bool,
}

impl SortKey {
    pub const fn asc(field: SortField) -> Self {
        Self { field, descending: false }
    }

    pub const fn desc(field: SortField) -> Self {
        Self { field, descending: true }
    }

    /// `ORDER BY` fragment over the `books b` alias
    pub fn sql(&self) -> &'static str {
        match (self.field, self.descending) {
            (SortField::Title, false) => "b.title ASC",
            (SortField::Title, true) => "b.title DESC",
            (SortField::PublicationYear, false) => "b.publication_year ASC",
            (SortField::PublicationYear, true) => "b.publication_year DESC",
        }
    }

    fn compare(&self, a: &Book, b: &Book) -> Ordering {
        let ord = match self.field {
            SortField::Title => a.title.cmp(&b.title),
            SortField::PublicationYear => a.publication_year.cmp(&b.publication_year),
        };
        if self.descending {
            ord.reverse()
        } else {
            ord
        }
    }
}

/// Conjunctive filters over books
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    pub title: Option<String>,
    pub author: Option<i32>,
    pub publication_year: Option<i32>,
    /// Lowercased search term
    pub search: Option<String>,
}

impl BookFilter {
    /// Whether `book`, written by an author called `author_name`, passes every filter.
    pub fn matches(&self, book: &Book, author_name: &str) -> bool {
        if let Some(ref title) = self.title {
            if &book.title != title {
                return false;
            }
        }
        if self.author.is_some_and(|author| book.author != author) {
            return false;
        }
        if self
            .publication_year
            .is_some_and(|year| book.publication_year != year)
        {
            return false;
        }
        if let Some(ref term) = self.search {
            let in_title = book.title.to_lowercase().contains(term.as_str());
            let in_author = author_name.to_lowercase().contains(term.as_str());
            if !in_title && !in_author {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    /// Rows to skip; saturates for pages too large to address
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    /// A page is out of range when it starts past the last result.
    /// Page 1 always exists, even for an empty listing.
    pub fn is_out_of_range(&self, total: i64) -> bool {
        self.page > 1 && self.offset() >= total
    }

    pub fn next(&self, total: i64) -> Option<i64> {
        (self.page.saturating_mul(self.page_size) < total).then_some(self.page + 1)
    }

    pub fn previous(&self) -> Option<i64> {
        (self.page > 1).then_some(self.page - 1)
    }
}

/// Checked book listing query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookQuery {
    pub filter: BookFilter,
    /// Never empty; `id` ascending is implied as the last tie-breaker.
    pub ordering: Vec<SortKey>,
    pub page: PageRequest,
}

pub const DEFAULT_ORDERING: SortKey = SortKey::asc(SortField::Title);

impl BookQuery {
    pub fn from_params(params: &BookListParams, pagination: &PaginationConfig) -> AppResult<Self> {
        let mut errors = FieldErrors::new();

        let filter = BookFilter {
            title: non_empty(&params.title).map(str::to_string),
            author: parse_int(&mut errors, "author", &params.author),
            publication_year: parse_int(&mut errors, "publication_year", &params.publication_year),
            search: non_empty(&params.search).map(|s| s.trim().to_lowercase()),
        };

        let ordering = match non_empty(&params.ordering) {
            Some(raw) => parse_ordering(&mut errors, raw),
            None => vec![DEFAULT_ORDERING],
        };

        let page = parse_int::<i64>(&mut errors, "page", &params.page).unwrap_or(1);
        if page < 1 {
            errors.add("page", "Ensure this value is greater than or equal to 1.");
        }
        let page_size = parse_int::<i64>(&mut errors, "page_size", &params.page_size)
            .unwrap_or(pagination.default_page_size);
        if page_size < 1 {
            errors.add("page_size", "Ensure this value is greater than or equal to 1.");
        }

        errors.into_result()?;

        Ok(BookQuery {
            filter,
            ordering,
            page: PageRequest {
                page,
                page_size: page_size.min(pagination.max_page_size),
            },
        })
    }

    /// Compare two books under the requested ordering, falling back to id.
    pub fn compare(&self, a: &Book, b: &Book) -> Ordering {
        self.ordering
            .iter()
            .map(|key| key.compare(a, b))
            .find(|ord| ord.is_ne())
            .unwrap_or_else(|| a.id.cmp(&b.id))
    }
}

fn non_empty(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().filter(|s| !s.trim().is_empty())
}

fn parse_int<T: FromStr>(errors: &mut FieldErrors, field: &str, raw: &Option<String>) -> Option<T> {
    let raw = non_empty(raw)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.add(field, "Enter a whole number.");
            None
        }
    }
}

fn parse_ordering(errors: &mut FieldErrors, raw: &str) -> Vec<SortKey> {
    let mut keys = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (descending, name) = match part.strip_prefix('-') {
            Some(name) => (true, name),
            None => (false, part),
        };
        match name.parse::<SortField>() {
            Ok(field) => keys.push(SortKey { field, descending }),
            Err(()) => errors.add(
                "ordering",
                format!(
                    "Cannot order by \"{}\"; choose from title, publication_year.",
                    name
                ),
            ),
        }
    }
    if keys.is_empty() {
        keys.push(DEFAULT_ORDERING);
    }
    keys
}
