use std::fmt;

use super::{
	config,
	executor::ExecutionPolicy,
	node::{CancellationCallback, FailureCallback},
	state::CancellationReason,
	task::TaskValue,
};

/// Optional settings for a new task.
///
/// Tasks are named after the place they were created at unless a name is given, and use
/// [`config::default_policy`] unless a policy is given.
pub struct TaskOptions<F = String> {
	pub(crate) name: Option<String>,
	pub(crate) policy: Option<ExecutionPolicy>,
	pub(crate) on_failure: Option<FailureCallback<F>>,
	pub(crate) on_cancel: Option<CancellationCallback>,
}

impl<F> Default for TaskOptions<F> {
	fn default() -> Self {
		Self {
			name: None,
			policy: None,
			on_failure: None,
			on_cancel: None,
		}
	}
}

impl<F> fmt::Debug for TaskOptions<F> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TaskOptions")
			.field("name", &self.name)
			.field("policy", &self.policy)
			.field("on_failure", &self.on_failure.is_some())
			.field("on_cancel", &self.on_cancel.is_some())
			.finish()
	}
}

impl<F: TaskValue> TaskOptions<F> {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	#[must_use]
	pub fn with_policy(mut self, policy: ExecutionPolicy) -> Self {
		self.policy = Some(policy);
		self
	}

	/// Called with the task name and its failure, instead of [`TaskFailure::report`](crate::TaskFailure::report).
	#[must_use]
	pub fn on_failure(mut self, callback: impl FnOnce(&str, &F) + Send + 'static) -> Self {
		self.on_failure = Some(Box::new(callback));
		self
	}

	/// Called with the name of the task that caused the cancellation and its reason.
	#[must_use]
	pub fn on_cancel(
		mut self,
		callback: impl FnOnce(&str, CancellationReason) + Send + 'static,
	) -> Self {
		self.on_cancel = Some(Box::new(callback));
		self
	}

	pub(crate) fn policy_or_default(&self) -> ExecutionPolicy {
		self.policy.unwrap_or_else(config::default_policy)
	}
}
