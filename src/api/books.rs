//! Book endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult, ErrorResponse, FieldErrors},
    models::Book,
    policy::{self, Operation},
    query::BookListParams,
    services::catalog::BookPage,
    validation::{BookDraft, FieldPresence},
    AppState,
};

use super::{resource_id, OptionalIdentity};

/// Paginated response wrapper
#[derive(Serialize, ToSchema)]
#[aliases(BookListResponse = PaginatedResponse<Book>)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Total number of matching results
    pub count: i64,
    /// Current page number
    pub page: i64,
    /// Results per page
    pub page_size: i64,
    /// Next page number, if any
    pub next: Option<i64>,
    /// Previous page number, if any
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl From<BookPage> for PaginatedResponse<Book> {
    fn from(page: BookPage) -> Self {
        Self {
            count: page.total,
            page: page.page.page,
            page_size: page.page.page_size,
            next: page.page.next(page.total),
            previous: page.page.previous(),
            results: page.books,
        }
    }
}

/// Book write body. POST and PUT need every field, PATCH any subset.
#[derive(Deserialize, ToSchema)]
pub struct BookInput {
    pub title: String,
    /// Between 1000 and the current year
    pub publication_year: i32,
    /// Id of an existing author
    pub author: i32,
}

fn read_draft(body: Result<Json<Value>, JsonRejection>) -> AppResult<BookDraft> {
    let Json(value) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    BookDraft::from_json(&value)
}

/// List books with filtering, search, ordering and pagination
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookListParams),
    responses(
        (status = 200, description = "One page of books", body = BookListResponse),
        (status = 400, description = "Malformed query parameter", body = FieldErrors),
        (status = 404, description = "Invalid page", body = ErrorResponse)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    OptionalIdentity(identity): OptionalIdentity,
    Query(params): Query<BookListParams>,
) -> AppResult<Json<PaginatedResponse<Book>>> {
    policy::authorize(Operation::ListBooks, identity.as_ref())?;

    let page = state.services.catalog.list_books(&params).await?;
    Ok(Json(PaginatedResponse::from(page)))
}

/// Get a book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found", body = ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    OptionalIdentity(identity): OptionalIdentity,
    Path(id): Path<String>,
) -> AppResult<Json<Book>> {
    policy::authorize(Operation::GetBook, identity.as_ref())?;

    let id = resource_id(&id, "Book")?;
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Create a new book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = BookInput,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Validation failed", body = FieldErrors),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    OptionalIdentity(identity): OptionalIdentity,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Book>)> {
    policy::authorize(Operation::CreateBook, identity.as_ref())?;

    let draft = read_draft(body)?;
    let created = state.services.catalog.create_book(draft).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Replace every field of a book
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body = BookInput,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Validation failed", body = FieldErrors),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Book not found", body = ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    OptionalIdentity(identity): OptionalIdentity,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<Book>> {
    policy::authorize(Operation::UpdateBook, identity.as_ref())?;

    let id = resource_id(&id, "Book")?;
    let draft = read_draft(body)?;
    let updated = state
        .services
        .catalog
        .update_book(id, draft, FieldPresence::Required)
        .await?;
    Ok(Json(updated))
}

/// Update some fields of a book
#[utoipa::path(
    patch,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body = BookInput,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Validation failed", body = FieldErrors),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Book not found", body = ErrorResponse)
    )
)]
pub async fn partial_update_book(
    State(state): State<AppState>,
    OptionalIdentity(identity): OptionalIdentity,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<Book>> {
    policy::authorize(Operation::PartialUpdateBook, identity.as_ref())?;

    let id = resource_id(&id, "Book")?;
    let draft = read_draft(body)?;
    let updated = state
        .services
        .catalog
        .update_book(id, draft, FieldPresence::Optional)
        .await?;
    Ok(Json(updated))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Book not found", body = ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    OptionalIdentity(identity): OptionalIdentity,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    policy::authorize(Operation::DeleteBook, identity.as_ref())?;

    let id = resource_id(&id, "Book")?;
    state.services.catalog.delete_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
