use std::{
	collections::HashSet,
	sync::{Arc, Weak},
};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{error, trace};
use uuid::Uuid;

use super::{
	diagnostics,
	error::Error,
	executor::ExecutionPolicy,
	result::TaskResult,
	state::{CancellationReason, CancellationResult, TaskState},
	task::TaskId,
};

mod await_link;
mod typed;

pub(crate) use await_link::AwaitLink;
pub(crate) use typed::{TaskFn, TaskNode};

pub(crate) type FailureCallback<F> = Box<dyn FnOnce(&str, &F) + Send>;
pub(crate) type CancellationCallback = Box<dyn FnOnce(&str, CancellationReason) + Send>;

/// Identity, name, state and parent link shared by every node of a graph, whatever its value types.
pub(crate) struct TaskCore {
	id: TaskId,
	name: Arc<Mutex<String>>,
	policy: ExecutionPolicy,
	state: watch::Sender<TaskState>,
	parent: Mutex<Option<Weak<dyn GraphNode>>>,
	awaiting: Mutex<Option<Weak<dyn GraphNode>>>,
}

impl TaskCore {
	pub fn new(name: String, policy: ExecutionPolicy) -> Self {
		Self::with_state(name, policy, TaskState::NotStarted)
	}

	pub fn with_state(name: String, policy: ExecutionPolicy, state: TaskState) -> Self {
		let id = Uuid::new_v4();
		let (state, _) = watch::channel(state);

		trace!(task_id = %id, task_name = %name, ?policy, "Task created");

		let name = Arc::new(Mutex::new(name));
		diagnostics::track(id, &name);

		Self {
			id,
			name,
			policy,
			state,
			parent: Mutex::new(None),
			awaiting: Mutex::new(None),
		}
	}

	pub const fn id(&self) -> TaskId {
		self.id
	}

	pub fn name(&self) -> String {
		self.name.lock().clone()
	}

	pub fn set_name(&self, name: String) {
		*self.name.lock() = name;
	}

	pub const fn policy(&self) -> ExecutionPolicy {
		self.policy
	}

	pub fn state(&self) -> TaskState {
		*self.state.borrow()
	}

	/// Moves to `to` if the current state is accepted by `from`.
	///
	/// Returns the previous state on success, or the current one if the transition was refused.
	pub fn transition(
		&self,
		from: impl Fn(TaskState) -> bool,
		to: TaskState,
	) -> Result<TaskState, TaskState> {
		let mut previous = TaskState::NotStarted;

		let changed = self.state.send_if_modified(|state| {
			previous = *state;
			if from(*state) {
				*state = to;
				true
			} else {
				false
			}
		});

		if changed {
			trace!(task_id = %self.id, %previous, current = %to, "Task state changed");
			Ok(previous)
		} else {
			Err(previous)
		}
	}

	pub async fn finished(&self) -> TaskState {
		let mut state_rx = self.state.subscribe();

		if let Ok(state) = state_rx.wait_for(|state| state.is_terminal()).await {
			return *state;
		}

		self.state()
	}

	pub fn wait_finished(&self) -> TaskState {
		futures::executor::block_on(self.finished())
	}

	pub fn parent(&self) -> Option<Arc<dyn GraphNode>> {
		self.parent.lock().as_ref().and_then(Weak::upgrade)
	}

	fn parent_link(&self) -> Option<Weak<dyn GraphNode>> {
		self.parent.lock().clone()
	}

	pub fn has_parent(&self) -> bool {
		self.parent.lock().is_some()
	}

	pub fn set_parent(&self, parent: Weak<dyn GraphNode>) {
		*self.parent.lock() = Some(parent);
	}

	pub fn clear_parent(&self) {
		self.parent.lock().take();
	}

	pub fn awaiting(&self) -> Option<Arc<dyn GraphNode>> {
		self.awaiting.lock().as_ref().and_then(Weak::upgrade)
	}

	pub fn set_awaiting(&self, awaited: Weak<dyn GraphNode>) {
		*self.awaiting.lock() = Some(awaited);
	}

	pub fn clear_awaiting(&self) {
		self.awaiting.lock().take();
	}

	/// Detaches this node from its parent's children, keeping the parent link itself.
	pub fn detach_from_parent(&self) {
		if let Some(parent) = self.parent() {
			parent.remove_child(self.id);
		}
	}
}

impl Drop for TaskCore {
	fn drop(&mut self) {
		diagnostics::untrack(self.id);
		trace!(task_id = %self.id, task_name = %self.name.lock(), "Task dropped");
	}
}

/// Type erased view of a node, used to walk and drive the graph.
pub(crate) trait GraphNode: Send + Sync + 'static {
	fn core(&self) -> &TaskCore;

	fn as_graph_node(self: Arc<Self>) -> Arc<dyn GraphNode>;

	/// Runs this node as the root of its graph.
	fn start_root(self: Arc<Self>) -> Result<(), Error>;

	fn cancel(&self, causer: &str, reason: CancellationReason) -> CancellationResult;

	fn children(&self) -> Vec<Arc<dyn GraphNode>>;

	fn remove_child(&self, id: TaskId);
}

/// A node that runs after a parent producing `A`, whose failures are of type `F`.
pub(crate) trait Continuation<A, F>: GraphNode {
	fn invoke(self: Arc<Self>, arg: Arc<A>) -> Result<(), Error>;

	fn parent_failed(&self, causer: &str, failure: &Arc<F>);
}

/// A node waiting on the result of another task.
pub(crate) trait Awaiter<T, F>: GraphNode {
	fn adopt(&self, result: TaskResult<Arc<T>, Arc<F>>);

	/// Cancels the node while it's in progress, as the awaited result will never come.
	fn abandon(&self, causer: &str, reason: CancellationReason);
}

/// A node whose result can be awaited.
pub(crate) trait AwaitSource<T, F>: GraphNode {
	fn attach_awaiter(
		self: Arc<Self>,
		awaiter: Arc<dyn Awaiter<T, F>>,
		start_if_not_started: bool,
	);
}

/// Walks parent links up to the root of the graph.
pub(crate) fn graph_root(node: Arc<dyn GraphNode>) -> Result<Arc<dyn GraphNode>, Error> {
	let mut current = node;

	loop {
		let Some(parent) = current.core().parent_link() else {
			return Ok(current);
		};

		current = parent
			.upgrade()
			.ok_or_else(|| Error::AncestorDropped(current.core().name()))?;
	}
}

pub(crate) fn start_graph(node: Arc<dyn GraphNode>) -> Result<(), Error> {
	let root = graph_root(node)?;

	match root.core().state() {
		TaskState::NotStarted => {}
		TaskState::Cancelled => return Err(Error::TaskCancelled(root.core().name())),
		_ => return Err(Error::GraphAlreadyStarted(root.core().name())),
	}

	trace!(root_id = %root.core().id(), root_name = %root.core().name(), "Starting task graph");

	root.start_root()
}

pub(crate) fn is_graph_started(node: Arc<dyn GraphNode>) -> bool {
	graph_root(node).is_ok_and(|root| root.core().state().is_started())
}

/// The root and every node reachable from it reached a terminal state.
pub(crate) fn is_graph_finished(node: Arc<dyn GraphNode>) -> bool {
	let Ok(root) = graph_root(node) else {
		return false;
	};

	let mut pending = vec![root];

	while let Some(node) = pending.pop() {
		if !node.core().state().is_terminal() {
			return false;
		}

		pending.extend(node.children());
	}

	true
}

/// Whether `node` can't finish before the task identified by `id`, following parent and await links.
pub(crate) fn depends_on(node: Arc<dyn GraphNode>, id: TaskId) -> bool {
	let mut visited = HashSet::new();
	let mut pending = vec![node];

	while let Some(node) = pending.pop() {
		let core = node.core();

		if core.id() == id {
			return true;
		}

		if !visited.insert(core.id()) {
			continue;
		}

		pending.extend(core.parent());
		pending.extend(core.awaiting());
	}

	false
}

pub(crate) fn cancellation_refused(task_name: &str, state: TaskState) -> CancellationResult {
	if state.is_terminal() {
		trace!(%task_name, %state, "Failed to cancel task: already finished");
		CancellationResult::FailFinished
	} else {
		trace!(%task_name, %state, "Failed to cancel task: already in progress");
		CancellationResult::FailInProgress
	}
}

pub(crate) fn log_invoke_error(task_name: &str, e: &Error) {
	match e {
		Error::TaskCancelled(_) => {}
		e => error!(%task_name, ?e, "Failed to run continuation"),
	}
}
