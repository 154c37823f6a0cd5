use std::sync::{
	atomic::{AtomicBool, AtomicUsize, Ordering},
	Arc,
};

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::{
	create::create_empty_task_with,
	executor::ExecutionPolicy,
	node::{GraphNode, TaskFn, TaskNode},
	options::TaskOptions,
	result::{TaskResult, TaskReturn},
	state::{CancellationReason, TaskState},
	task::{Task, TaskValue},
};

/// How an input of [`when_all`] or [`when_any`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Completion {
	Succeeded,
	Failed,
	Cancelled,
}

pub type CompletionCallback = Arc<dyn Fn(Completion) + Send + Sync>;

/// Anything that can tell when it's done, whatever its value types.
pub trait CompletionSource {
	/// Registers `notify` to be called exactly once, when this source ends.
	fn on_completion(&self, notify: CompletionCallback);
}

/// Fires its callback once, with [`Completion::Cancelled`] if nobody fired it before it was dropped.
struct Notifier {
	notify: Mutex<Option<CompletionCallback>>,
}

impl Notifier {
	fn new(notify: CompletionCallback) -> Arc<Self> {
		Arc::new(Self {
			notify: Mutex::new(Some(notify)),
		})
	}

	fn fire(&self, completion: Completion) {
		let notify = self.notify.lock().take();
		if let Some(notify) = notify {
			notify(completion);
		}
	}
}

impl Drop for Notifier {
	fn drop(&mut self) {
		if let Some(notify) = self.notify.get_mut().take() {
			notify(Completion::Cancelled);
		}
	}
}

impl<T: TaskValue, A: TaskValue, F: TaskValue> CompletionSource for Task<T, A, F> {
	fn on_completion(&self, notify: CompletionCallback) {
		let notifier = Notifier::new(notify);
		let input = Arc::downgrade(self.node());

		let on_success = Arc::clone(&notifier);
		let on_cancel = Arc::clone(&notifier);

		let watcher = TaskNode::<(), T, F>::new(
			format!("Completion of {}", self.name()),
			ExecutionPolicy::Inline,
			TaskFn::WithArg(Box::new(move |_: &T| {
				on_success.fire(Completion::Succeeded);
				TaskReturn::Ready(TaskResult::Success(()))
			})),
			None,
			Some(Box::new(move |_causer: &str, reason: CancellationReason| {
				let input_failed = reason == CancellationReason::ParentFailed
					&& input
						.upgrade()
						.is_some_and(|input| input.core().state() == TaskState::Failed);

				on_cancel.fire(if input_failed {
					Completion::Failed
				} else {
					Completion::Cancelled
				});
			})),
		);

		// The watcher now owns the callback, dropping it without running fires a cancellation.
		drop(notifier);

		self.node().add_child(watcher, true);
	}
}

fn combined_task(name: &str) -> Task {
	create_empty_task_with(
		TaskOptions::new()
			.with_name(name)
			.with_policy(ExecutionPolicy::Inline),
	)
}

/// A task that starts once every one of `tasks` is done, however they ended.
///
/// The returned task is started by the inputs, never start it yourself.
pub fn when_all<'a, S>(tasks: impl IntoIterator<Item = &'a S>) -> Task
where
	S: CompletionSource + ?Sized + 'a,
{
	let tasks = tasks.into_iter().collect::<Vec<_>>();
	let combined = combined_task("WhenAll");

	if tasks.is_empty() {
		trace!("WhenAll over no tasks, resolving right away");
		combined.start_graph();
		return combined;
	}

	let pending = Arc::new(AtomicUsize::new(tasks.len()));

	for task in tasks {
		let pending = Arc::clone(&pending);
		let combined = combined.clone();

		task.on_completion(Arc::new(move |completion| {
			let remaining = pending.fetch_sub(1, Ordering::AcqRel) - 1;
			trace!(?completion, %remaining, "WhenAll input done");

			if remaining == 0 {
				combined.start_graph();
			}
		}));
	}

	combined
}

/// A task that starts once any of `tasks` succeeds or fails, cancelled inputs don't count.
///
/// The returned task is started by the inputs, never start it yourself.
pub fn when_any<'a, S>(tasks: impl IntoIterator<Item = &'a S>) -> Task
where
	S: CompletionSource + ?Sized + 'a,
{
	let tasks = tasks.into_iter().collect::<Vec<_>>();
	let combined = combined_task("WhenAny");

	if tasks.is_empty() {
		warn!("WhenAny over no tasks, resolving right away");
		combined.start_graph();
		return combined;
	}

	let fired = Arc::new(AtomicBool::new(false));

	for task in tasks {
		let fired = Arc::clone(&fired);
		let combined = combined.clone();

		task.on_completion(Arc::new(move |completion| {
			if completion == Completion::Cancelled {
				trace!("WhenAny input cancelled, still waiting");
				return;
			}

			if !fired.swap(true, Ordering::AcqRel) {
				trace!(?completion, "WhenAny resolved");
				combined.start_graph();
			}
		}));
	}

	combined
}

/// [`when_all`] over a fixed pack of tasks with different value types.
#[macro_export]
macro_rules! when_all {
	($($task:expr),+ $(,)?) => {
		$crate::when_all([$(&$task as &dyn $crate::CompletionSource),+])
	};
}

/// [`when_any`] over a fixed pack of tasks with different value types.
#[macro_export]
macro_rules! when_any {
	($($task:expr),+ $(,)?) => {
		$crate::when_any([$(&$task as &dyn $crate::CompletionSource),+])
	};
}
