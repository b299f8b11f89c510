//! Domain models: job statuses, stored records and bus messages.

pub mod messages;
pub mod records;
pub mod status;
pub mod validation;

pub use messages::{CompletionNotification, JobKind, ProcessingJob, ValidationJob};
pub use records::{UserSummary, WriteMode};
pub use status::{display_or_na, InvalidStatus, ProcessingStatus, ValidationStatus, NOT_AVAILABLE};
pub use validation::ValidationResult;
