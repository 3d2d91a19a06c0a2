//! Typed views of the integer codes and derived fields stored by Telebugs.

pub mod period;
pub mod platform;
pub mod severity;
pub mod status;

pub use period::Period;
pub use platform::Platform;
pub use severity::Severity;
pub use status::{GroupStatus, StatusFilter};

pub type UserId = i64;
pub type ProjectId = i64;
pub type GroupId = i64;
pub type ReportId = i64;
pub type ReleaseId = i64;
pub type NoteId = i64;
