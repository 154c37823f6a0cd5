use std::{error::Error as StdError, io};

use tracing::error;

use super::{error::Error, task::TaskValue};

/// Failure types usable by tasks.
///
/// [`TaskFailure::report`] is called when a task fails and no failure callback was given for it,
/// so unhandled failures are always observed. The default implementation only logs the task name,
/// implement it for your own failure types to log something more useful.
pub trait TaskFailure: TaskValue {
	fn report(task_name: &str, failure: &Self) {
		let _ = failure;
		error!(%task_name, "Async task failed");
	}
}

impl TaskFailure for () {}

impl TaskFailure for String {
	fn report(task_name: &str, failure: &Self) {
		error!(%task_name, %failure, "Async task failed");
	}
}

impl TaskFailure for &'static str {
	fn report(task_name: &str, failure: &Self) {
		error!(%task_name, %failure, "Async task failed");
	}
}

impl TaskFailure for io::Error {
	fn report(task_name: &str, failure: &Self) {
		error!(%task_name, ?failure, "Async task failed");
	}
}

impl TaskFailure for Box<dyn StdError + Send + Sync> {
	fn report(task_name: &str, failure: &Self) {
		error!(%task_name, %failure, "Async task failed");
	}
}

impl TaskFailure for Error {
	fn report(task_name: &str, failure: &Self) {
		error!(%task_name, ?failure, "Async task failed");
	}
}
