//! Book validation.
//!
//! Request bodies are read into a [`BookDraft`], recording type errors per
//! field, then checked against the book rules. Every violated field is
//! reported in one [`FieldErrors`] map.

use chrono::{Datelike, Utc};
use serde_json::Value;
use validator::Validate;

use crate::{
    error::{AppError, AppResult, FieldErrors},
    models::BookChanges,
    repository::CatalogStore,
};

pub const MIN_PUBLICATION_YEAR: i32 = 1000;

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const BLANK: &str = "This field may not be blank.";

/// Whether a write must carry every field (POST, PUT) or any subset (PATCH)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPresence {
    Required,
    Optional,
}

/// Book fields as supplied by the caller, before the book rules run
#[derive(Debug, Clone, Default, Validate)]
pub struct BookDraft {
    #[validate(length(max = 200, message = "Ensure this field has no more than 200 characters."))]
    pub title: Option<String>,
    pub publication_year: Option<i32>,
    pub author: Option<i32>,
    /// Fields that were present but unreadable; their rules are skipped.
    parse_errors: FieldErrors,
}

impl BookDraft {
    pub fn new(title: Option<String>, publication_year: Option<i32>, author: Option<i32>) -> Self {
        Self {
            title: title.map(|t| t.trim().to_string()),
            publication_year,
            author,
            parse_errors: FieldErrors::new(),
        }
    }

    /// Read a JSON object body. `id` and unknown keys are ignored.
    pub fn from_json(body: &Value) -> AppResult<Self> {
        let object = body.as_object().ok_or_else(|| {
            AppError::BadRequest("Invalid data. Expected a JSON object.".to_string())
        })?;

        let mut draft = BookDraft::default();

        match object.get("title") {
            None => {}
            Some(Value::Null) => draft.parse_errors.add("title", NOT_NULL),
            Some(Value::String(s)) => draft.title = Some(s.trim().to_string()),
            Some(_) => draft.parse_errors.add("title", "Not a valid string."),
        }

        match object.get("publication_year") {
            None => {}
            Some(Value::Null) => draft.parse_errors.add("publication_year", NOT_NULL),
            Some(value) => match read_integer(value) {
                Some(year) => draft.publication_year = Some(year),
                None => draft
                    .parse_errors
                    .add("publication_year", "A valid integer is required."),
            },
        }

        match object.get("author") {
            None => {}
            Some(Value::Null) => draft.parse_errors.add("author", NOT_NULL),
            Some(value) => match read_integer(value) {
                Some(author) => draft.author = Some(author),
                None => draft.parse_errors.add(
                    "author",
                    format!("Incorrect type. Expected pk value, received {}.", json_type(value)),
                ),
            },
        }

        Ok(draft)
    }
}

/// JSON integers, or strings holding one
fn read_integer(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Current calendar year on the UTC clock
pub fn current_year() -> i32 {
    Utc::now().year()
}

/// Year bounds: `1000 ..= current_year`
pub fn check_publication_year(year: i32, current_year: i32) -> Result<(), String> {
    if year < MIN_PUBLICATION_YEAR {
        return Err("must be 1000 or later".to_string());
    }
    if year > current_year {
        return Err(format!("cannot be in the future, current year is {}", current_year));
    }
    Ok(())
}

/// Validate a draft against the book rules, reading the clock now.
pub async fn validate_book(
    store: &dyn CatalogStore,
    draft: BookDraft,
    presence: FieldPresence,
) -> AppResult<BookChanges> {
    validate_book_at(store, draft, presence, current_year()).await
}

/// Validate a draft against the book rules for a given current year.
pub async fn validate_book_at(
    store: &dyn CatalogStore,
    draft: BookDraft,
    presence: FieldPresence,
    current_year: i32,
) -> AppResult<BookChanges> {
    let mut errors = draft.parse_errors.clone();

    if presence == FieldPresence::Required {
        let supplied = [
            ("title", draft.title.is_some()),
            ("publication_year", draft.publication_year.is_some()),
            ("author", draft.author.is_some()),
        ];
        for (field, present) in supplied {
            if !present && !errors.contains(field) {
                errors.add(field, REQUIRED);
            }
        }
    }

    if let Some(ref title) = draft.title {
        if title.is_empty() {
            errors.add("title", BLANK);
        }
    }
    if let Err(e) = draft.validate() {
        errors.merge(e.into());
    }

    if let Some(year) = draft.publication_year {
        if let Err(message) = check_publication_year(year, current_year) {
            errors.add("publication_year", message);
        }
    }

    if let Some(author) = draft.author {
        if !store.authors_exist(author).await? {
            errors.add("author", invalid_author_message(author));
        }
    }

    errors.into_result()?;

    Ok(BookChanges {
        title: draft.title,
        publication_year: draft.publication_year,
        author: draft.author,
    })
}

pub fn invalid_author_message(author: i32) -> String {
    format!("Invalid pk \"{}\" - object does not exist.", author)
}
