//! Background job processing for Librarian.
//!
//! This crate provides:
//! - A job queue over the job store
//! - A job executor that dispatches jobs to the correct handler
//! - A worker runner that polls for and executes queued jobs
//! - An event publisher that delivers domain events as jobs
//! - Handlers for provisioning, document migration, and completion bookkeeping

pub mod executor;
pub mod jobs;
pub mod publisher;
pub mod queue;
pub mod runner;

pub use executor::{JobExecutionError, JobExecutor, JobHandler};
pub use publisher::JobQueuePublisher;
pub use queue::JobQueue;
pub use runner::WorkerRunner;
