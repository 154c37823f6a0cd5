use std::{fmt, panic::Location, sync::Arc};

use tracing::{error, instrument, trace};
use uuid::Uuid;

use super::{
	error::Error,
	executor::ExecutionPolicy,
	failure::TaskFailure,
	node::{self, Continuation, FailureCallback, GraphNode, TaskFn, TaskNode},
	options::TaskOptions,
	result::{IntoTaskReturn, TaskResult, TaskReturn},
	state::{CancellationReason, CancellationResult, TaskState},
};

/// A unique identifier for a task using the [`uuid`](https://docs.rs/uuid) crate.
pub type TaskId = Uuid;

/// Anything that can flow through a task graph, shared between threads once produced.
pub trait TaskValue: Send + Sync + 'static {}

/// Blanket implementation for all types that implements `Send + Sync + 'static`
impl<T: Send + Sync + 'static> TaskValue for T {}

/// Handle to a task producing `T` or failing with `F`, continuing a parent that produces `A`.
///
/// Handles are cheap to clone and all clones refer to the same task. A task is kept alive by its
/// handles and by its parent, while a child only refers weakly to its parent: keep a handle to the
/// root of a graph until it is started.
pub struct Task<T = (), A = (), F = String> {
	node: Arc<TaskNode<T, A, F>>,
}

impl<T, A, F> Clone for Task<T, A, F> {
	fn clone(&self) -> Self {
		Self {
			node: Arc::clone(&self.node),
		}
	}
}

impl<T: TaskValue, A: TaskValue, F: TaskValue> fmt::Debug for Task<T, A, F> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Task")
			.field("id", &self.id())
			.field("name", &self.name())
			.field("state", &self.state())
			.finish()
	}
}

fn default_name(location: &Location<'_>) -> String {
	format!("{}:{}", location.file(), location.line())
}

impl<T: TaskValue, A: TaskValue, F: TaskValue> Task<T, A, F> {
	pub(crate) const fn from_node(node: Arc<TaskNode<T, A, F>>) -> Self {
		Self { node }
	}

	pub(crate) const fn node(&self) -> &Arc<TaskNode<T, A, F>> {
		&self.node
	}

	pub(crate) fn into_node(self) -> Arc<TaskNode<T, A, F>> {
		self.node
	}

	fn graph_node(&self) -> Arc<dyn GraphNode> {
		Arc::clone(&self.node).as_graph_node()
	}

	#[must_use]
	pub fn id(&self) -> TaskId {
		self.node.core().id()
	}

	#[must_use]
	pub fn name(&self) -> String {
		self.node.core().name()
	}

	pub fn set_name(&self, name: impl Into<String>) {
		self.node.core().set_name(name.into());
	}

	#[must_use]
	pub fn policy(&self) -> ExecutionPolicy {
		self.node.core().policy()
	}

	#[must_use]
	pub fn state(&self) -> TaskState {
		self.node.core().state()
	}

	/// The task function already ran or is running.
	#[must_use]
	pub fn is_started(&self) -> bool {
		self.state().is_started()
	}

	#[must_use]
	pub fn is_cancelled(&self) -> bool {
		self.state() == TaskState::Cancelled
	}

	#[must_use]
	pub fn is_in_progress(&self) -> bool {
		self.state() == TaskState::InProgress
	}

	/// The task has a result, successful or not.
	#[must_use]
	pub fn is_finished(&self) -> bool {
		self.state().is_finished()
	}

	#[must_use]
	pub fn is_successful(&self) -> bool {
		self.state() == TaskState::Successful
	}

	#[must_use]
	pub fn is_failed(&self) -> bool {
		self.state() == TaskState::Failed
	}

	/// Whether the root of this task's graph started, even if this task didn't have its turn yet.
	#[must_use]
	pub fn is_graph_started(&self) -> bool {
		node::is_graph_started(self.graph_node())
	}

	/// Whether the root of this task's graph and every task reachable from it are done.
	#[must_use]
	pub fn is_graph_finished(&self) -> bool {
		node::is_graph_finished(self.graph_node())
	}

	#[must_use]
	pub fn result(&self) -> Option<TaskResult<Arc<T>, Arc<F>>> {
		self.node.result()
	}

	#[must_use]
	pub fn success(&self) -> Option<Arc<T>> {
		self.result().and_then(TaskResult::into_success)
	}

	#[must_use]
	pub fn failure(&self) -> Option<Arc<F>> {
		self.result().and_then(TaskResult::into_failure)
	}

	/// Cancels this task and every continuation after it, only possible before it starts.
	#[instrument(skip(self), fields(task_id = %self.id()))]
	pub fn cancel(&self) -> CancellationResult {
		self.node
			.cancel(&self.name(), CancellationReason::Cancelled)
	}

	/// Starts the graph this task belongs to, from its root.
	///
	/// Starting an already started graph, or one whose root was dropped, is logged and ignored.
	pub fn start_graph(&self) {
		if let Err(e) = self.try_start_graph() {
			error!(task_name = %self.name(), ?e, "Failed to start task graph");
		}
	}

	#[instrument(skip(self), fields(task_id = %self.id()), err)]
	pub fn try_start_graph(&self) -> Result<(), Error> {
		node::start_graph(self.graph_node())
	}

	/// Blocks the calling thread until this task reaches a terminal state, and returns it.
	pub fn wait(&self) -> TaskState {
		if self.log_early_wait() {
			return self.state();
		}

		self.node.core().wait_finished()
	}

	/// Waits until this task reaches a terminal state, and returns it.
	pub async fn wait_async(&self) -> TaskState {
		if self.log_early_wait() {
			return self.state();
		}

		self.node.core().finished().await
	}

	fn log_early_wait(&self) -> bool {
		let state = self.state();
		if state.is_terminal() {
			return true;
		}

		if !self.is_graph_started() {
			trace!(
				task_name = %self.name(),
				"Waiting on a task whose graph didn't start yet"
			);
		}

		false
	}
}

impl<T: TaskValue, A: TaskValue, F: TaskFailure> Task<T, A, F> {
	pub(crate) fn build(
		options: TaskOptions<F>,
		location: &Location<'_>,
		function: TaskFn<T, A, F>,
	) -> Self {
		let policy = options.policy_or_default();
		let TaskOptions {
			name,
			on_failure,
			on_cancel,
			..
		} = options;

		let on_failure: FailureCallback<F> = match on_failure {
			Some(on_failure) => on_failure,
			None => Box::new(|task_name: &str, failure: &F| F::report(task_name, failure)),
		};

		Self::from_node(TaskNode::new(
			name.unwrap_or_else(|| default_name(location)),
			policy,
			function,
			Some(on_failure),
			on_cancel,
		))
	}

	pub(crate) fn attach<U: TaskValue, G: TaskValue>(
		&self,
		task: &Task<U, T, G>,
		at_start: bool,
	) -> bool {
		let child: Arc<dyn Continuation<T, F>> = task.node.clone();
		self.node.add_child(child, at_start)
	}

	/// Chains a continuation receiving this task's success value.
	///
	/// Calling it many times on the same task fans out: every continuation gets the same value.
	#[track_caller]
	pub fn next<R, Func>(&self, function: Func) -> Task<R::Success, T, F>
	where
		Func: FnOnce(&T) -> R + Send + 'static,
		R: IntoTaskReturn<F>,
	{
		self.next_with(TaskOptions::default(), function)
	}

	#[track_caller]
	pub fn next_with<R, Func>(
		&self,
		options: TaskOptions<F>,
		function: Func,
	) -> Task<R::Success, T, F>
	where
		Func: FnOnce(&T) -> R + Send + 'static,
		R: IntoTaskReturn<F>,
	{
		self.next_with_failure(options, function)
	}

	/// Same as [`Task::next_with`], for a continuation failing with its own failure type `G`.
	///
	/// A failure of this task still cancels the continuation, whatever `G` is.
	#[track_caller]
	pub fn next_with_failure<G, R, Func>(
		&self,
		options: TaskOptions<G>,
		function: Func,
	) -> Task<R::Success, T, G>
	where
		G: TaskFailure,
		Func: FnOnce(&T) -> R + Send + 'static,
		R: IntoTaskReturn<G>,
	{
		let task = Task::build(
			options,
			Location::caller(),
			TaskFn::WithArg(Box::new(move |value: &T| function(value).into_task_return())),
		);

		self.attach(&task, false);

		task
	}

	/// Chains a continuation that doesn't care about this task's success value.
	#[track_caller]
	pub fn next_void<R, Func>(&self, function: Func) -> Task<R::Success, T, F>
	where
		Func: FnOnce() -> R + Send + 'static,
		R: IntoTaskReturn<F>,
	{
		self.next_void_with(TaskOptions::default(), function)
	}

	#[track_caller]
	pub fn next_void_with<R, Func>(
		&self,
		options: TaskOptions<F>,
		function: Func,
	) -> Task<R::Success, T, F>
	where
		Func: FnOnce() -> R + Send + 'static,
		R: IntoTaskReturn<F>,
	{
		self.next_with(options, move |_: &T| function())
	}

	/// Chains a continuation that can't fail, mapping this task's success value.
	#[track_caller]
	pub fn map<U, Func>(&self, function: Func) -> Task<U, T, F>
	where
		U: TaskValue,
		Func: FnOnce(&T) -> U + Send + 'static,
	{
		self.map_with(TaskOptions::default(), function)
	}

	#[track_caller]
	pub fn map_with<U, Func>(&self, options: TaskOptions<F>, function: Func) -> Task<U, T, F>
	where
		U: TaskValue,
		Func: FnOnce(&T) -> U + Send + 'static,
	{
		self.next_with(options, move |value: &T| {
			TaskResult::<U, F>::Success(function(value))
		})
	}

	/// Wires an existing task, that wasn't started yet, as a continuation of this one.
	pub fn next_task<U: TaskValue, G: TaskValue>(&self, task: Task<U, T, G>) -> Task<U, T, G> {
		self.attach(&task, false);
		task
	}

	/// Chains a continuation finishing with the result of `task`, starting its graph if needed.
	#[track_caller]
	pub fn await_task<U: TaskValue, B: TaskValue>(&self, task: Task<U, B, F>) -> Task<U, T, F> {
		let options = TaskOptions::default()
			.with_name(format!("Await {}", task.name()))
			.with_policy(ExecutionPolicy::Inline);

		self.await_task_with(options, task)
	}

	#[track_caller]
	pub fn await_task_with<U: TaskValue, B: TaskValue>(
		&self,
		options: TaskOptions<F>,
		task: Task<U, B, F>,
	) -> Task<U, T, F> {
		self.next_with(options, move |_: &T| TaskReturn::awaiting(task, true))
	}
}

impl<T: TaskValue, F: TaskFailure> Task<T, (), F> {
	/// A task that already succeeded with `value`.
	pub fn make_success(value: T) -> Self {
		Self::from_node(TaskNode::resolved(
			"MakeSuccess".to_string(),
			TaskResult::Success(Arc::new(value)),
		))
	}

	/// A task that already failed with `failure`.
	pub fn make_failure(failure: F) -> Self {
		Self::from_node(TaskNode::resolved(
			"MakeFailure".to_string(),
			TaskResult::Failure(Arc::new(failure)),
		))
	}

	/// A started task that will finish with the result of `task`.
	#[track_caller]
	pub fn make_await<B: TaskValue>(task: Task<T, B, F>, start_if_not_started: bool) -> Self {
		let options = TaskOptions::default()
			.with_name(format!("Awaiting {}", task.name()))
			.with_policy(ExecutionPolicy::Inline);

		let awaiting = Self::build(
			options,
			Location::caller(),
			TaskFn::NoArg(Box::new(move || {
				TaskReturn::awaiting(task, start_if_not_started)
			})),
		);

		awaiting.start_graph();

		awaiting
	}
}
