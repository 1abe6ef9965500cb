//! Domain model (ids, records, jobs, delivery errors).

pub mod errors;
pub mod ids;
pub mod job;
pub mod record;

pub use errors::{DeliveryError, FailureClass, FailureInfo, ReasonCode};
pub use ids::{IdParseError, JobId};
pub use job::{Job, JobOp, Target};
pub use record::{RecordError, VisitorRecord};
