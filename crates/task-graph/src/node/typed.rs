use std::{mem, sync::Arc};

use parking_lot::Mutex;
use tracing::{error, trace, trace_span, warn};

use crate::{
	error::Error,
	executor::{self, ExecutionPolicy, Job},
	result::{AwaitTarget, TaskResult, TaskReturn},
	state::{CancellationReason, CancellationResult, TaskState},
	task::{TaskId, TaskValue},
};

use super::{
	cancellation_refused, depends_on, graph_root, is_graph_started, log_invoke_error, start_graph,
	AwaitLink, AwaitSource, Awaiter, CancellationCallback, Continuation, FailureCallback,
	GraphNode, TaskCore,
};

type Call<T, F> = Box<dyn FnOnce() -> TaskReturn<T, F> + Send>;

/// The user function of a task, either standalone or fed with its parent's success value.
pub(crate) enum TaskFn<T, A, F> {
	NoArg(Call<T, F>),
	WithArg(Box<dyn FnOnce(&A) -> TaskReturn<T, F> + Send>),
}

struct Inner<T, A, F> {
	function: Option<TaskFn<T, A, F>>,
	on_failure: Option<FailureCallback<F>>,
	on_cancel: Option<CancellationCallback>,
	result: Option<TaskResult<Arc<T>, Arc<F>>>,
	children: Vec<Arc<dyn Continuation<T, F>>>,
}

/// A task producing `T` or failing with `F`, after a parent producing `A`.
pub(crate) struct TaskNode<T, A, F> {
	core: TaskCore,
	inner: Mutex<Inner<T, A, F>>,
}

impl<T: TaskValue, A: TaskValue, F: TaskValue> TaskNode<T, A, F> {
	pub fn new(
		name: String,
		policy: ExecutionPolicy,
		function: TaskFn<T, A, F>,
		on_failure: Option<FailureCallback<F>>,
		on_cancel: Option<CancellationCallback>,
	) -> Arc<Self> {
		Arc::new(Self {
			core: TaskCore::new(name, policy),
			inner: Mutex::new(Inner {
				function: Some(function),
				on_failure,
				on_cancel,
				result: None,
				children: Vec::new(),
			}),
		})
	}

	/// A node that is already finished with `result`.
	pub fn resolved(name: String, result: TaskResult<Arc<T>, Arc<F>>) -> Arc<Self> {
		let state = if result.is_success() {
			TaskState::Successful
		} else {
			TaskState::Failed
		};

		Arc::new(Self {
			core: TaskCore::with_state(name, ExecutionPolicy::Inline, state),
			inner: Mutex::new(Inner {
				function: None,
				on_failure: None,
				on_cancel: None,
				result: Some(result),
				children: Vec::new(),
			}),
		})
	}

	pub fn result(&self) -> Option<TaskResult<Arc<T>, Arc<F>>> {
		self.inner.lock().result.clone()
	}

	/// Registers `child` to run once this node succeeds.
	///
	/// A child added to a finished node runs (or is cancelled, if this node failed) right away.
	pub fn add_child(self: &Arc<Self>, child: Arc<dyn Continuation<T, F>>, at_start: bool) -> bool {
		let name = self.core.name();
		let child_core = child.core();
		let child_state = child_core.state();

		if child_state != TaskState::NotStarted {
			error!(
				task_name = %name,
				child_name = %child_core.name(),
				%child_state,
				"Can't add a continuation that already started or was cancelled"
			);
			return false;
		}

		if child_core.has_parent() {
			error!(
				task_name = %name,
				child_name = %child_core.name(),
				"Continuation already belongs to a task graph"
			);
			return false;
		}

		if depends_on(Arc::clone(self).as_graph_node(), child_core.id()) {
			error!(
				task_name = %name,
				child_name = %child_core.name(),
				"Continuation is an ancestor of the task it would continue"
			);
			return false;
		}

		let parent = Arc::downgrade(self);
		child_core.set_parent(parent);

		let settled = {
			let mut inner = self.inner.lock();

			if self.core.state() == TaskState::Cancelled {
				drop(inner);
				child_core.clear_parent();
				error!(
					task_name = %name,
					child_name = %child_core.name(),
					"Can't add a continuation to a cancelled task"
				);
				return false;
			}

			if at_start {
				inner.children.insert(0, Arc::clone(&child));
			} else {
				inner.children.push(Arc::clone(&child));
			}

			inner.result.clone()
		};

		trace!(
			task_id = %self.core.id(),
			child_id = %child_core.id(),
			%at_start,
			"Continuation added"
		);

		match settled {
			Some(TaskResult::Success(value)) => {
				if let Err(e) = child.invoke(value) {
					log_invoke_error(&name, &e);
				}
			}
			Some(TaskResult::Failure(failure)) => child.parent_failed(&name, &failure),
			None => {}
		}

		true
	}

	fn invoke_with(self: Arc<Self>, arg: Option<Arc<A>>) -> Result<(), Error> {
		let name = self.core.name();

		let call: Call<T, F> = {
			let mut inner = self.inner.lock();

			match self.core.state() {
				TaskState::NotStarted => {}
				TaskState::Cancelled => {
					trace!(task_name = %name, "Skipping cancelled task");
					return Err(Error::TaskCancelled(name));
				}
				_ => return Err(Error::GraphAlreadyStarted(name)),
			}

			let call: Call<T, F> = match (inner.function.take(), arg) {
				(Some(TaskFn::NoArg(function)), _) => function,
				(Some(TaskFn::WithArg(function)), Some(arg)) => Box::new(move || function(&arg)),
				(Some(function @ TaskFn::WithArg(_)), None) => {
					inner.function = Some(function);
					return Err(Error::MissingArgument(name));
				}
				(None, _) => {
					error!(task_name = %name, "Task has nothing to run");
					return Err(Error::GraphAlreadyStarted(name));
				}
			};

			if let Err(state) = self
				.core
				.transition(|state| state == TaskState::NotStarted, TaskState::InProgress)
			{
				error!(task_name = %name, %state, "Task changed state while being invoked");
				return Err(Error::GraphAlreadyStarted(name));
			}

			call
		};

		// Keeps the whole graph alive while this job is pending.
		let graph_lock = graph_root(Arc::clone(&self).as_graph_node()).ok();

		let span = trace_span!("task", task_id = %self.core.id(), task_name = %name);
		let this = Arc::clone(&self);
		let job: Job = Box::new(move || {
			let _graph_lock = graph_lock;
			span.in_scope(|| this.run(call));
		});

		if let Err(e) = executor::execute(self.core.policy(), job) {
			error!(task_name = %name, ?e, "Executor refused task, cancelling it");
			self.abandon(&name, CancellationReason::ExecutorShutdown);
			return Err(e);
		}

		Ok(())
	}

	fn run(self: Arc<Self>, call: Call<T, F>) {
		trace!("Running task");

		match call() {
			TaskReturn::Ready(result) => self.settle(result.map(Arc::new).map_failure(Arc::new)),
			TaskReturn::Await(target) => self.await_target(target),
		}
	}

	fn settle(&self, result: TaskResult<Arc<T>, Arc<F>>) {
		let name = self.core.name();
		let to = if result.is_success() {
			TaskState::Successful
		} else {
			TaskState::Failed
		};

		let (children, on_failure) = {
			let mut inner = self.inner.lock();

			if let Err(state) = self
				.core
				.transition(|state| state == TaskState::InProgress, to)
			{
				error!(task_name = %name, %state, "Task can't finish from its current state");
				return;
			}

			inner.result = Some(result.clone());
			inner.function = None;
			inner.on_cancel = None;

			let children = if result.is_success() {
				inner.children.clone()
			} else {
				mem::take(&mut inner.children)
			};

			(children, inner.on_failure.take())
		};

		self.core.clear_awaiting();

		match result {
			TaskResult::Success(value) => {
				for child in children {
					if let Err(e) = child.invoke(Arc::clone(&value)) {
						log_invoke_error(&name, &e);
					}
				}
			}

			TaskResult::Failure(failure) => {
				if let Some(on_failure) = on_failure {
					on_failure(&name, &*failure);
				}

				for child in children.into_iter().rev() {
					child.parent_failed(&name, &failure);
				}
			}
		}
	}

	fn await_target(self: Arc<Self>, target: AwaitTarget<T, F>) {
		let AwaitTarget {
			source,
			start_if_not_started,
		} = target;

		let name = self.core.name();
		let awaited = Arc::clone(&source).as_graph_node();
		let awaited_id = awaited.core().id();

		if depends_on(Arc::clone(&awaited), self.core.id()) {
			error!(
				task_name = %name,
				%awaited_id,
				"Task awaits a task that can't finish before itself"
			);
			self.abandon(&name, CancellationReason::AwaitCycle);
			return;
		}

		self.core.set_awaiting(Arc::downgrade(&awaited));

		trace!(task_name = %name, %awaited_id, %start_if_not_started, "Awaiting task");

		source.attach_awaiter(self, start_if_not_started);
	}

	fn cancel_from(
		&self,
		from: TaskState,
		causer: &str,
		reason: CancellationReason,
	) -> CancellationResult {
		let name = self.core.name();

		let (children, on_cancel) = {
			let mut inner = self.inner.lock();

			if let Err(state) = self
				.core
				.transition(|state| state == from, TaskState::Cancelled)
			{
				return cancellation_refused(&name, state);
			}

			inner.function = None;
			inner.on_failure = None;

			(mem::take(&mut inner.children), inner.on_cancel.take())
		};

		self.core.clear_awaiting();

		trace!(task_name = %name, %causer, %reason, "Task cancelled");

		if let Some(on_cancel) = on_cancel {
			on_cancel(causer, reason);
		}

		for child in children.into_iter().rev() {
			let _ = child.cancel(causer, reason);
		}

		self.core.detach_from_parent();

		CancellationResult::Success
	}
}

impl<T: TaskValue, A: TaskValue, F: TaskValue> GraphNode for TaskNode<T, A, F> {
	fn core(&self) -> &TaskCore {
		&self.core
	}

	fn as_graph_node(self: Arc<Self>) -> Arc<dyn GraphNode> {
		self
	}

	fn start_root(self: Arc<Self>) -> Result<(), Error> {
		self.invoke_with(None)
	}

	fn cancel(&self, causer: &str, reason: CancellationReason) -> CancellationResult {
		self.cancel_from(TaskState::NotStarted, causer, reason)
	}

	fn children(&self) -> Vec<Arc<dyn GraphNode>> {
		self.inner
			.lock()
			.children
			.iter()
			.map(|child| Arc::clone(child).as_graph_node())
			.collect()
	}

	fn remove_child(&self, id: TaskId) {
		self.inner
			.lock()
			.children
			.retain(|child| child.core().id() != id);
	}
}

impl<T: TaskValue, A: TaskValue, F: TaskValue, G: TaskValue> Continuation<A, G>
	for TaskNode<T, A, F>
{
	fn invoke(self: Arc<Self>, arg: Arc<A>) -> Result<(), Error> {
		self.invoke_with(Some(arg))
	}

	fn parent_failed(&self, causer: &str, _failure: &Arc<G>) {
		let _ = self.cancel(causer, CancellationReason::ParentFailed);
	}
}

impl<T: TaskValue, A: TaskValue, F: TaskValue> Awaiter<T, F> for TaskNode<T, A, F> {
	fn adopt(&self, result: TaskResult<Arc<T>, Arc<F>>) {
		self.settle(result);
	}

	fn abandon(&self, causer: &str, reason: CancellationReason) {
		if !self
			.cancel_from(TaskState::InProgress, causer, reason)
			.is_success()
		{
			warn!(
				task_name = %self.core.name(),
				%reason,
				"Task wasn't waiting anymore when its awaited task went away"
			);
		}
	}
}

impl<T: TaskValue, A: TaskValue, F: TaskValue> AwaitSource<T, F> for TaskNode<T, A, F> {
	fn attach_awaiter(
		self: Arc<Self>,
		awaiter: Arc<dyn Awaiter<T, F>>,
		start_if_not_started: bool,
	) {
		let name = self.core.name();

		if self.core.state() == TaskState::Cancelled {
			awaiter.abandon(&name, CancellationReason::AwaitTaskCancelled);
			return;
		}

		if !self.add_child(AwaitLink::new(awaiter, &name), true) {
			return;
		}

		if start_if_not_started && !is_graph_started(Arc::clone(&self).as_graph_node()) {
			match start_graph(self.as_graph_node()) {
				Ok(()) | Err(Error::GraphAlreadyStarted(_)) => {}
				Err(e) => warn!(task_name = %name, ?e, "Failed to start awaited task graph"),
			}
		}
	}
}
