use std::{iter, sync::Arc};

use tracing::trace;

use crate::{
	create::create_task_with,
	error::Error,
	executor::{self, ExecutionPolicy},
	options::TaskOptions,
	result::IntoTaskReturn,
	task::{Task, TaskValue},
};

use super::when::when_all;

/// Creates one task per job, all of them started, and the [`when_all`] task tracking them.
fn spawn_all<R, Job>(label: &str, policy: ExecutionPolicy, jobs: impl Iterator<Item = Job>) -> Task
where
	R: IntoTaskReturn<String>,
	Job: FnOnce() -> R + Send + 'static,
{
	let tasks = jobs
		.enumerate()
		.map(|(index, job)| {
			create_task_with(
				TaskOptions::<String>::new()
					.with_name(format!("{label} #{index}"))
					.with_policy(policy),
				job,
			)
		})
		.collect::<Vec<_>>();

	trace!(%label, count = tasks.len(), ?policy, "Spawning iteration tasks");

	let all = when_all(&tasks);

	for task in &tasks {
		task.start_graph();
	}

	all
}

fn execute_all<Job>(
	label: &str,
	policy: ExecutionPolicy,
	jobs: impl Iterator<Item = Job>,
) -> Result<(), Error>
where
	Job: FnOnce() + Send + 'static,
{
	let mut count = 0usize;

	for job in jobs {
		executor::execute(policy, Box::new(job))?;
		count += 1;
	}

	trace!(%label, %count, ?policy, "Iterations handed to the executor");

	Ok(())
}

/// Indices from `first` (inclusive) to `last` (exclusive), moving by `step`.
fn range_indices(first: i64, last: i64, step: i64) -> Result<impl Iterator<Item = i64>, Error> {
	let ascending = last > first;

	if first != last && (step == 0 || (step > 0) != ascending) {
		return Err(Error::InvalidStep { first, last, step });
	}

	Ok(
		iter::successors((first != last).then_some(first), move |&index| {
			index.checked_add(step)
		})
		.take_while(move |&index| if ascending { index < last } else { index > last }),
	)
}

/// Runs `body` for every index of the range in its own task.
///
/// The returned task starts once every iteration is done.
pub fn for_range<R, Func>(
	first: i64,
	last: i64,
	step: i64,
	policy: ExecutionPolicy,
	body: Func,
) -> Result<Task, Error>
where
	R: IntoTaskReturn<String>,
	Func: Fn(i64) -> R + Send + Sync + 'static,
{
	let body = Arc::new(body);

	Ok(spawn_all(
		"For",
		policy,
		range_indices(first, last, step)?.map(move |index| {
			let body = Arc::clone(&body);
			move || body(index)
		}),
	))
}

/// Same as [`for_range`], without task bookkeeping: nothing tells when the iterations are done.
pub fn for_range_no_task<Func>(
	first: i64,
	last: i64,
	step: i64,
	policy: ExecutionPolicy,
	body: Func,
) -> Result<(), Error>
where
	Func: Fn(i64) + Send + Sync + 'static,
{
	let body = Arc::new(body);

	execute_all(
		"For",
		policy,
		range_indices(first, last, step)?.map(move |index| {
			let body = Arc::clone(&body);
			move || body(index)
		}),
	)
}

/// Runs `body` for every item in its own task, each item moved into its task.
pub fn for_each<V, R, Func>(
	items: impl IntoIterator<Item = V>,
	policy: ExecutionPolicy,
	body: Func,
) -> Task
where
	V: Send + 'static,
	R: IntoTaskReturn<String>,
	Func: Fn(V) -> R + Send + Sync + 'static,
{
	let body = Arc::new(body);

	spawn_all(
		"ForEach",
		policy,
		items.into_iter().map(move |item| {
			let body = Arc::clone(&body);
			move || body(item)
		}),
	)
}

pub fn for_each_no_task<V, Func>(
	items: impl IntoIterator<Item = V>,
	policy: ExecutionPolicy,
	body: Func,
) -> Result<(), Error>
where
	V: Send + 'static,
	Func: Fn(V) + Send + Sync + 'static,
{
	let body = Arc::new(body);

	execute_all(
		"ForEach",
		policy,
		items.into_iter().map(move |item| {
			let body = Arc::clone(&body);
			move || body(item)
		}),
	)
}

/// Runs `body` for every item in its own task, tasks borrowing items from the shared container.
pub fn for_each_no_copy<V, R, Func>(items: Arc<[V]>, policy: ExecutionPolicy, body: Func) -> Task
where
	V: TaskValue,
	R: IntoTaskReturn<String>,
	Func: Fn(&V) -> R + Send + Sync + 'static,
{
	let body = Arc::new(body);

	spawn_all(
		"ForEach",
		policy,
		(0..items.len()).map(move |index| {
			let body = Arc::clone(&body);
			let items = Arc::clone(&items);
			move || body(&items[index])
		}),
	)
}

pub fn for_each_no_copy_no_task<V, Func>(
	items: Arc<[V]>,
	policy: ExecutionPolicy,
	body: Func,
) -> Result<(), Error>
where
	V: TaskValue,
	Func: Fn(&V) + Send + Sync + 'static,
{
	let body = Arc::new(body);

	execute_all(
		"ForEach",
		policy,
		(0..items.len()).map(move |index| {
			let body = Arc::clone(&body);
			let items = Arc::clone(&items);
			move || body(&items[index])
		}),
	)
}
