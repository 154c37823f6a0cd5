use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::{
	error::Error,
	executor::ExecutionPolicy,
	result::TaskResult,
	state::{CancellationReason, CancellationResult, TaskState},
	task::{TaskId, TaskValue},
};

use super::{cancellation_refused, Awaiter, Continuation, GraphNode, TaskCore};

/// Service continuation registered on an awaited task, handing its result to the awaiting one.
///
/// It holds the awaiting task alive until the awaited result is delivered. If the awaited task is
/// dropped first, the awaiting task is cancelled with [`CancellationReason::AwaitTaskEmpty`].
pub(crate) struct AwaitLink<T: 'static, F: 'static> {
	core: TaskCore,
	awaiter: Mutex<Option<Arc<dyn Awaiter<T, F>>>>,
}

impl<T: TaskValue, F: TaskValue> AwaitLink<T, F> {
	pub fn new(awaiter: Arc<dyn Awaiter<T, F>>, awaited_name: &str) -> Arc<Self> {
		Arc::new(Self {
			core: TaskCore::new(
				format!("Awaiting task of {awaited_name}"),
				ExecutionPolicy::Inline,
			),
			awaiter: Mutex::new(Some(awaiter)),
		})
	}

	fn take_awaiter(&self) -> Option<Arc<dyn Awaiter<T, F>>> {
		self.awaiter.lock().take()
	}
}

impl<T: TaskValue, F: TaskValue> GraphNode for AwaitLink<T, F> {
	fn core(&self) -> &TaskCore {
		&self.core
	}

	fn as_graph_node(self: Arc<Self>) -> Arc<dyn GraphNode> {
		self
	}

	fn start_root(self: Arc<Self>) -> Result<(), Error> {
		Err(Error::MissingArgument(self.core.name()))
	}

	fn cancel(&self, causer: &str, reason: CancellationReason) -> CancellationResult {
		if let Err(state) = self
			.core
			.transition(|state| state == TaskState::NotStarted, TaskState::Cancelled)
		{
			return cancellation_refused(&self.core.name(), state);
		}

		trace!(task_name = %self.core.name(), %causer, %reason, "Awaited task was cancelled");

		if let Some(awaiter) = self.take_awaiter() {
			awaiter.abandon(causer, CancellationReason::AwaitTaskCancelled);
		}

		self.core.detach_from_parent();

		CancellationResult::Success
	}

	fn children(&self) -> Vec<Arc<dyn GraphNode>> {
		Vec::new()
	}

	fn remove_child(&self, _id: TaskId) {}
}

impl<T: TaskValue, F: TaskValue> Continuation<T, F> for AwaitLink<T, F> {
	fn invoke(self: Arc<Self>, arg: Arc<T>) -> Result<(), Error> {
		let name = self.core.name();

		for (from, to) in [
			(TaskState::NotStarted, TaskState::InProgress),
			(TaskState::InProgress, TaskState::Successful),
		] {
			if self.core.transition(|state| state == from, to).is_err() {
				return Err(Error::GraphAlreadyStarted(name));
			}
		}

		if let Some(awaiter) = self.take_awaiter() {
			awaiter.adopt(TaskResult::Success(arg));
		}

		Ok(())
	}

	fn parent_failed(&self, causer: &str, failure: &Arc<F>) {
		if self
			.core
			.transition(|state| state == TaskState::NotStarted, TaskState::Cancelled)
			.is_err()
		{
			return;
		}

		trace!(task_name = %self.core.name(), %causer, "Awaited task failed");

		if let Some(awaiter) = self.take_awaiter() {
			awaiter.adopt(TaskResult::Failure(Arc::clone(failure)));
		}

		self.core.detach_from_parent();
	}
}

impl<T: 'static, F: 'static> Drop for AwaitLink<T, F> {
	fn drop(&mut self) {
		if let Some(awaiter) = self.awaiter.get_mut().take() {
			awaiter.abandon(&self.core.name(), CancellationReason::AwaitTaskEmpty);
		}
	}
}
