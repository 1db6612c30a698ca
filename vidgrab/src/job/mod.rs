//! Job model and the process-wide job registry.

mod model;
mod registry;

pub use model::{Job, JobKind, JobPatch, JobSnapshot, JobStatus, UpdateOutcome};
pub use registry::{CANCELLED_MESSAGE, JobRegistry};
