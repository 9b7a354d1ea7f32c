//! Convenience result type alias for Librarian.

use crate::error::AppError;

/// A specialized `Result` type for Librarian operations.
pub type AppResult<T> = Result<T, AppError>;
