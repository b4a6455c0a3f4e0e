//! The module contains the error the engine can throw.
//!
//! The variants map one-to-one onto the failure taxonomy of the service:
//!
//! - [`NotFound`] for a missing wish, offer, wishlist or user on a direct
//!   lookup.
//! - [`Forbidden`] for an authenticated caller that is not the resource
//!   owner.
//! - [`Validation`] for self-funding attempts, contributions exceeding the
//!   remaining amount, price changes after funding and malformed input.
//! - [`Conflict`] for duplicate usernames or emails at signup.
//!
//!  [`NotFound`]: EngineError::NotFound
//!  [`Forbidden`]: EngineError::Forbidden
//!  [`Validation`]: EngineError::Validation
//!  [`Conflict`]: EngineError::Conflict
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
