//! Core traits defined in `librarian-core` and implemented by other crates.

pub mod events;

pub use events::EventPublisher;
