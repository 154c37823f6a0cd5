use sd_task_graph::{
	create_continuation, create_empty_task, create_task, create_task_with, Error, Task,
	TaskOptions, TaskResult, TaskState,
};

use tokio::sync::oneshot;
use tracing_test::traced_test;

mod common;

use common::{inline, Counter, SampleError};

#[tokio::test]
#[traced_test]
async fn chain_converts_values_forward() {
	let root = create_task(|| Ok::<_, String>(4));

	let answer = root
		.map(|answer| format!("{answer}0"))
		.next(|answer| {
			answer
				.parse::<i32>()
				.map(|n| n + 5)
				.map_err(|e| e.to_string())
		})
		.map(|answer| answer - 3);

	answer.start_graph();

	assert_eq!(answer.wait_async().await, TaskState::Successful);
	assert_eq!(answer.success().as_deref(), Some(&42));
	assert!(root.is_successful());
	assert!(answer.is_graph_finished());
}

#[tokio::test]
#[traced_test]
async fn start_from_any_node_runs_the_root() {
	let root = create_task(|| Ok::<_, String>(2));
	let doubled = root.next_task(create_continuation(|n: &i32| Ok::<_, String>(n * 2)));
	let tripled = doubled.map(|n| n * 3);

	assert!(!tripled.is_graph_started());

	tripled.start_graph();

	assert_eq!(tripled.wait_async().await, TaskState::Successful);
	assert_eq!(tripled.success().as_deref(), Some(&12));
	assert!(doubled.is_graph_started());
	assert!(matches!(
		root.try_start_graph(),
		Err(Error::GraphAlreadyStarted(_))
	));
}

#[test]
fn fan_out_every_child_sees_the_value() {
	let counter = Counter::default();
	let root = create_task_with(inline("root"), || Ok::<_, String>(10));

	let children = (0..5)
		.map(|_| {
			let counter = counter.clone();
			root.next_void(move || {
				counter.increment();
			})
		})
		.collect::<Vec<_>>();

	root.start_graph();

	for child in &children {
		assert_eq!(child.wait(), TaskState::Successful);
	}

	assert_eq!(counter.get(), 5);
}

#[tokio::test]
#[traced_test]
async fn graph_started_in_one_expression_stays_alive() {
	let (done_tx, done_rx) = oneshot::channel();

	create_task(|| Ok::<_, String>(21))
		.map(move |n| {
			let _ = done_tx.send(n * 2);
		})
		.start_graph();

	assert_eq!(done_rx.await, Ok(42));
}

#[test]
fn dropped_root_cant_be_started() {
	let last = create_task(|| ()).map(|_| 1);

	assert!(!last.is_graph_started());
	assert!(matches!(
		last.try_start_graph(),
		Err(Error::AncestorDropped(_))
	));
	assert_eq!(last.state(), TaskState::NotStarted);
}

#[tokio::test]
#[traced_test]
async fn failure_short_circuits_the_chain() {
	let invoked = Counter::default();

	let root = create_task(|| Err::<i32, _>("boom".to_string()));
	let child = {
		let invoked = invoked.clone();
		root.map(move |n| {
			invoked.increment();
			*n
		})
	};
	let grandchild = child.map(|n| n + 1);

	root.start_graph();

	assert_eq!(root.wait_async().await, TaskState::Failed);
	assert_eq!(child.wait_async().await, TaskState::Cancelled);
	assert_eq!(grandchild.wait_async().await, TaskState::Cancelled);

	assert!(!child.is_failed());
	assert!(child.result().is_none());
	assert_eq!(invoked.get(), 0);
	assert_eq!(root.failure().as_deref().map(String::as_str), Some("boom"));
}

#[tokio::test]
#[traced_test]
async fn custom_failure_goes_to_its_callback() {
	let (failure_tx, failure_rx) = oneshot::channel();

	let root = create_task_with(
		TaskOptions::new()
			.with_name("broken")
			.on_failure(move |task_name: &str, failure: &SampleError| {
				let _ = failure_tx.send((task_name.to_string(), failure.clone()));
			}),
		|| Err::<u8, _>(SampleError::Broken(7)),
	);

	let child = root.next(|n| TaskResult::<u8, SampleError>::Success(n + 1));

	root.start_graph();

	assert_eq!(
		failure_rx.await,
		Ok(("broken".to_string(), SampleError::Broken(7)))
	);
	assert_eq!(child.wait_async().await, TaskState::Cancelled);
	assert_eq!(root.failure().as_deref(), Some(&SampleError::Broken(7)));
}

#[tokio::test]
#[traced_test]
async fn continuation_with_its_own_failure_type() {
	let root = create_task(|| Ok::<_, String>(3));

	let checked = root.next_with_failure(
		TaskOptions::<SampleError>::new().with_name("checked"),
		|n: &i32| {
			if *n > 2 {
				Err(SampleError::Refused)
			} else {
				Ok(*n)
			}
		},
	);
	let recovered = checked.map(|n| n * 2);

	root.start_graph();

	assert_eq!(checked.wait_async().await, TaskState::Failed);
	assert_eq!(checked.failure().as_deref(), Some(&SampleError::Refused));
	assert_eq!(recovered.wait_async().await, TaskState::Cancelled);
	assert_eq!(checked.name(), "checked");

	let failed_root = create_task(|| Err::<i32, _>("upstream".to_string()));
	let skipped = failed_root.next_with_failure(TaskOptions::<SampleError>::new(), |n: &i32| {
		Ok::<_, SampleError>(*n)
	});

	failed_root.start_graph();

	assert_eq!(skipped.wait_async().await, TaskState::Cancelled);
	assert!(skipped.failure().is_none());
}

#[tokio::test]
#[traced_test]
async fn continuation_of_finished_task_runs_right_away() {
	let root = create_task(|| Ok::<_, String>(1));
	root.start_graph();
	assert_eq!(root.wait_async().await, TaskState::Successful);

	let late = root.map(|n| n + 1);

	assert_eq!(late.wait_async().await, TaskState::Successful);
	assert_eq!(late.success().as_deref(), Some(&2));
}

#[test]
fn continuation_of_failed_task_is_cancelled() {
	let failed: Task<i32> = Task::make_failure("nope".to_string());
	let late = failed.map(|n| n + 1);

	assert!(failed.is_failed());
	assert_eq!(late.state(), TaskState::Cancelled);
	assert_eq!(late.wait(), TaskState::Cancelled);
}

#[test]
fn ready_made_tasks() {
	let ready: Task<&str> = Task::make_success("ready");
	let next = ready.map_with(inline("shout"), |word| word.to_uppercase());

	assert_eq!(next.wait(), TaskState::Successful);
	assert_eq!(next.success().as_deref().map(String::as_str), Some("READY"));
	assert_eq!(next.name(), "shout");

	let empty = create_empty_task();
	let after = empty.next_void_with(inline("after empty"), || ());
	empty.start_graph();

	assert_eq!(after.wait(), TaskState::Successful);
	assert!(empty.is_graph_finished());
}

#[test]
fn tasks_are_named_after_their_call_site() {
	let task = create_task(|| ());
	assert!(task.name().starts_with(file!()));

	task.set_name("renamed");
	assert_eq!(task.name(), "renamed");
	assert!(format!("{task:?}").contains("renamed"));
}
