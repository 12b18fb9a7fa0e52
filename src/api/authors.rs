//! Author endpoints. Authors are read-only over HTTP and always carry their books.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::{AppResult, ErrorResponse},
    models::AuthorWithBooks,
    policy::{self, Operation},
    AppState,
};

use super::{resource_id, OptionalIdentity};

/// List all authors with their books
#[utoipa::path(
    get,
    path = "/authors",
    tag = "authors",
    responses(
        (status = 200, description = "Authors with nested books", body = Vec<AuthorWithBooks>)
    )
)]
pub async fn list_authors(
    State(state): State<AppState>,
    OptionalIdentity(identity): OptionalIdentity,
) -> AppResult<Json<Vec<AuthorWithBooks>>> {
    policy::authorize(Operation::ListAuthors, identity.as_ref())?;

    let authors = state.services.catalog.list_authors().await?;
    Ok(Json(authors))
}

/// Get an author by ID
#[utoipa::path(
    get,
    path = "/authors/{id}",
    tag = "authors",
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author with books, newest first", body = AuthorWithBooks),
        (status = 404, description = "Author not found", body = ErrorResponse)
    )
)]
pub async fn get_author(
    State(state): State<AppState>,
    OptionalIdentity(identity): OptionalIdentity,
    Path(id): Path<String>,
) -> AppResult<Json<AuthorWithBooks>> {
    policy::authorize(Operation::GetAuthor, identity.as_ref())?;

    let id = resource_id(&id, "Author")?;
    let author = state.services.catalog.get_author(id).await?;
    Ok(Json(author))
}
