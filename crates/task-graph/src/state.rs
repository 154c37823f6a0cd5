use std::fmt;

/// Lifecycle of a single task.
///
/// `NotStarted` can move to `Cancelled` or `InProgress`, and `InProgress` ends in `Successful` or
/// `Failed`. Terminal states never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaskState {
	#[default]
	NotStarted,
	Cancelled,
	InProgress,
	Successful,
	Failed,
}

impl TaskState {
	/// The task function already ran or is running.
	#[must_use]
	pub const fn is_started(self) -> bool {
		matches!(self, Self::InProgress | Self::Successful | Self::Failed)
	}

	/// The task produced a result.
	#[must_use]
	pub const fn is_finished(self) -> bool {
		matches!(self, Self::Successful | Self::Failed)
	}

	#[must_use]
	pub const fn is_terminal(self) -> bool {
		matches!(self, Self::Successful | Self::Failed | Self::Cancelled)
	}
}

impl fmt::Display for TaskState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::NotStarted => "not started",
			Self::Cancelled => "cancelled",
			Self::InProgress => "in progress",
			Self::Successful => "successful",
			Self::Failed => "failed",
		};

		f.write_str(name)
	}
}

/// Why a task ended up cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancellationReason {
	/// Explicitly cancelled by the user, or by an ancestor that was cancelled.
	Cancelled,
	/// The parent task failed, so there is no value to continue with.
	ParentFailed,
	/// The awaited task was cancelled before delivering a result.
	AwaitTaskCancelled,
	/// The awaited task was dropped before delivering a result.
	AwaitTaskEmpty,
	/// The awaited task depends on the awaiting task itself.
	AwaitCycle,
	/// The executor refused to run the task.
	ExecutorShutdown,
}

impl fmt::Display for CancellationReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let reason = match self {
			Self::Cancelled => "cancelled",
			Self::ParentFailed => "parent failed",
			Self::AwaitTaskCancelled => "awaited task was cancelled",
			Self::AwaitTaskEmpty => "awaited task was dropped",
			Self::AwaitCycle => "awaited task depends on the awaiting one",
			Self::ExecutorShutdown => "executor is shutdown",
		};

		f.write_str(reason)
	}
}

/// Outcome of a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use = "a task can only be cancelled before it starts, check if it was"]
pub enum CancellationResult {
	Success,
	FailInProgress,
	FailFinished,
}

impl CancellationResult {
	#[must_use]
	pub const fn is_success(self) -> bool {
		matches!(self, Self::Success)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn state_predicates() {
		assert!(!TaskState::NotStarted.is_started());
		assert!(!TaskState::Cancelled.is_started());
		assert!(TaskState::InProgress.is_started());
		assert!(TaskState::Failed.is_started());

		assert!(TaskState::Successful.is_finished());
		assert!(!TaskState::Cancelled.is_finished());

		assert!(TaskState::Cancelled.is_terminal());
		assert!(!TaskState::InProgress.is_terminal());
	}
}
