//! Permission policy for catalog operations.
//!
//! Reads are open to everyone. Book writes need an identity, any identity:
//! there is no role or ownership check.

use crate::{
    error::{AppError, AppResult},
    models::IdentityClaims,
};

/// Every operation exposed by the HTTP surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListBooks,
    GetBook,
    CreateBook,
    UpdateBook,
    PartialUpdateBook,
    DeleteBook,
    ListAuthors,
    GetAuthor,
}

impl Operation {
    pub fn is_write(self) -> bool {
        matches!(
            self,
            Operation::CreateBook
                | Operation::UpdateBook
                | Operation::PartialUpdateBook
                | Operation::DeleteBook
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RequireAuthentication,
}

pub fn decide(operation: Operation, identity: Option<&IdentityClaims>) -> Decision {
    if operation.is_write() && identity.is_none() {
        Decision::RequireAuthentication
    } else {
        Decision::Allow
    }
}

/// Gate an operation; called first thing in every handler.
pub fn authorize(operation: Operation, identity: Option<&IdentityClaims>) -> AppResult<()> {
    match decide(operation, identity) {
        Decision::Allow => Ok(()),
        Decision::RequireAuthentication => {
            tracing::debug!(?operation, "anonymous write rejected");
            Err(AppError::AuthenticationRequired)
        }
    }
}
