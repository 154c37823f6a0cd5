use std::panic::Location;

use super::{
	failure::TaskFailure,
	node::TaskFn,
	options::TaskOptions,
	result::{IntoTaskReturn, TaskResult},
	task::{Task, TaskValue},
};

/// Creates a root task that won't run until its graph is started.
#[track_caller]
pub fn create_task<R, Func>(function: Func) -> Task<R::Success, (), String>
where
	Func: FnOnce() -> R + Send + 'static,
	R: IntoTaskReturn<String>,
{
	create_task_with(TaskOptions::default(), function)
}

#[track_caller]
pub fn create_task_with<F, R, Func>(
	options: TaskOptions<F>,
	function: Func,
) -> Task<R::Success, (), F>
where
	F: TaskFailure,
	Func: FnOnce() -> R + Send + 'static,
	R: IntoTaskReturn<F>,
{
	Task::build(
		options,
		Location::caller(),
		TaskFn::NoArg(Box::new(move || function().into_task_return())),
	)
}

/// Creates a root task and starts it right away.
#[track_caller]
pub fn run<R, Func>(function: Func) -> Task<R::Success, (), String>
where
	Func: FnOnce() -> R + Send + 'static,
	R: IntoTaskReturn<String>,
{
	run_with(TaskOptions::default(), function)
}

#[track_caller]
pub fn run_with<F, R, Func>(options: TaskOptions<F>, function: Func) -> Task<R::Success, (), F>
where
	F: TaskFailure,
	Func: FnOnce() -> R + Send + 'static,
	R: IntoTaskReturn<F>,
{
	let task = create_task_with(options, function);
	task.start_graph();
	task
}

/// A root task that does nothing but succeed, handy as the head of a graph built later.
#[track_caller]
pub fn create_empty_task() -> Task<(), (), String> {
	create_empty_task_with(TaskOptions::default())
}

#[track_caller]
pub fn create_empty_task_with<F: TaskFailure>(options: TaskOptions<F>) -> Task<(), (), F> {
	Task::build(
		options,
		Location::caller(),
		TaskFn::NoArg(Box::new(|| TaskResult::Success(()).into_task_return())),
	)
}

/// Creates a task expecting a `A` from a parent, to be wired later with [`Task::next_task`].
#[track_caller]
pub fn create_continuation<A, R, Func>(function: Func) -> Task<R::Success, A, String>
where
	A: TaskValue,
	Func: FnOnce(&A) -> R + Send + 'static,
	R: IntoTaskReturn<String>,
{
	create_continuation_with(TaskOptions::default(), function)
}

#[track_caller]
pub fn create_continuation_with<A, F, R, Func>(
	options: TaskOptions<F>,
	function: Func,
) -> Task<R::Success, A, F>
where
	A: TaskValue,
	F: TaskFailure,
	Func: FnOnce(&A) -> R + Send + 'static,
	R: IntoTaskReturn<F>,
{
	Task::build(
		options,
		Location::caller(),
		TaskFn::WithArg(Box::new(move |arg: &A| function(arg).into_task_return())),
	)
}
