//! Background job entities.

pub mod model;
pub mod payload;
pub mod status;

pub use model::Job;
pub use payload::JobPayload;
pub use status::{JobPriority, JobStatus};
