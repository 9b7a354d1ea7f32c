//! Legacy document entities.

pub mod model;

pub use model::{Document, DocumentBody};
