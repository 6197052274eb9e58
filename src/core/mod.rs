/// Core functionality modules
///
/// The event recording boundary and the task snapshot the
/// suggestion generators read.

pub mod recorder;
pub mod task;

pub use recorder::{validate_user_id, EventRecorder};
pub use task::{Task, TaskStatus};
