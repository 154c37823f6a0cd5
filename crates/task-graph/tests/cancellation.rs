use std::sync::mpsc;

use sd_task_graph::{
	create_task, create_task_with, CancellationReason, CancellationResult, Error, ExecutionPolicy,
	TaskOptions, TaskState,
};

use tracing_test::traced_test;

mod common;

use common::inline;

#[tokio::test]
#[traced_test]
async fn cancelled_child_and_its_subtree_never_run() {
	let root = create_task(|| Ok::<_, String>(1));
	let child = root.map(|n| n + 1);
	let grandchild = child.map(|n| n * 2);
	let sibling = root.map(|n| n + 10);

	assert_eq!(child.cancel(), CancellationResult::Success);

	assert!(child.is_cancelled());
	assert!(grandchild.is_cancelled());
	assert!(!child.is_started());
	assert!(!child.is_finished());
	assert!(!root.is_graph_started());

	root.start_graph();

	assert_eq!(sibling.wait_async().await, TaskState::Successful);
	assert_eq!(root.state(), TaskState::Successful);
	assert_eq!(child.state(), TaskState::Cancelled);
	assert!(child.is_graph_started());
	assert!(root.is_graph_finished());
}

#[test]
fn cancel_callbacks_know_who_and_why() {
	let (reason_tx, reason_rx) = mpsc::channel();

	let root = create_task_with(inline("root"), || Ok::<_, String>(()));
	let child = root.next_void_with(
		TaskOptions::new().on_cancel(move |causer: &str, reason: CancellationReason| {
			let _ = reason_tx.send((causer.to_string(), reason));
		}),
		|| (),
	);

	assert_eq!(root.cancel(), CancellationResult::Success);
	assert_eq!(
		reason_rx.recv().ok(),
		Some(("root".to_string(), CancellationReason::Cancelled))
	);
	assert!(child.is_cancelled());
	assert!(matches!(root.try_start_graph(), Err(Error::TaskCancelled(_))));

	// Cancellation is single shot.
	assert_eq!(root.cancel(), CancellationResult::FailFinished);
}

#[test]
fn failed_parent_cancels_with_parent_failed() {
	let (reason_tx, reason_rx) = mpsc::channel();

	let root = create_task_with(inline("failing root"), || Err::<(), _>("nope".to_string()));
	let _child = root.next_void_with(
		TaskOptions::new().on_cancel(move |causer: &str, reason: CancellationReason| {
			let _ = reason_tx.send((causer.to_string(), reason));
		}),
		|| (),
	);

	root.start_graph();

	assert_eq!(
		reason_rx.recv().ok(),
		Some(("failing root".to_string(), CancellationReason::ParentFailed))
	);
}

#[test]
fn cancel_after_start_is_refused() {
	let (release_tx, release_rx) = mpsc::channel::<()>();

	let root = create_task(move || release_rx.recv().map_err(|e| e.to_string()));
	let child = root.map(|_| "done");

	root.start_graph();

	assert_eq!(root.state(), TaskState::InProgress);
	assert_eq!(root.cancel(), CancellationResult::FailInProgress);
	assert_eq!(root.state(), TaskState::InProgress);

	release_tx.send(()).unwrap();

	assert_eq!(child.wait(), TaskState::Successful);
	assert_eq!(root.cancel(), CancellationResult::FailFinished);
	assert_eq!(child.cancel(), CancellationResult::FailFinished);
	assert_eq!(root.state(), TaskState::Successful);
	assert_eq!(child.success().as_deref(), Some(&"done"));
}

#[test]
fn main_thread_task_without_queue_is_cancelled() {
	let (reason_tx, reason_rx) = mpsc::channel();

	let task = create_task_with(
		TaskOptions::new()
			.with_name("nowhere to run")
			.with_policy(ExecutionPolicy::MainThread)
			.on_cancel(move |causer: &str, reason: CancellationReason| {
				let _ = reason_tx.send((causer.to_string(), reason));
			}),
		|| Ok::<_, String>(1),
	);
	let child = task.map(|n| n + 1);

	assert!(matches!(
		task.try_start_graph(),
		Err(Error::ExecutorShutdown)
	));

	assert_eq!(task.wait(), TaskState::Cancelled);
	assert_eq!(child.wait(), TaskState::Cancelled);
	assert_eq!(
		reason_rx.recv().ok(),
		Some((
			"nowhere to run".to_string(),
			CancellationReason::ExecutorShutdown
		))
	);
}
