//! Domain model (task paths, state machine, records, failures).

pub mod failure;
pub mod path;
pub mod record;
pub mod state;

pub use failure::{BuildFailure, BuildResult, TaskFailure};
pub use path::TaskPath;
pub use record::TaskRecord;
pub use state::{TaskState, TaskStatus};
