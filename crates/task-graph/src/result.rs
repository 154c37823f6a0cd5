use std::{fmt, sync::Arc};

use super::{
	node::{AwaitSource, GraphNode},
	task::{Task, TaskValue},
};

/// The result of a finished task, either a success value or a failure value.
///
/// Tasks without a meaningful value use `()` on either side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskResult<T, F> {
	Success(T),
	Failure(F),
}

impl<T, F> TaskResult<T, F> {
	pub const fn success(value: T) -> Self {
		Self::Success(value)
	}

	pub const fn failure(failure: F) -> Self {
		Self::Failure(failure)
	}

	pub const fn is_success(&self) -> bool {
		matches!(self, Self::Success(_))
	}

	pub const fn is_failure(&self) -> bool {
		matches!(self, Self::Failure(_))
	}

	pub const fn as_ref(&self) -> TaskResult<&T, &F> {
		match self {
			Self::Success(value) => TaskResult::Success(value),
			Self::Failure(failure) => TaskResult::Failure(failure),
		}
	}

	pub fn map<U>(self, f: impl FnOnce(T) -> U) -> TaskResult<U, F> {
		match self {
			Self::Success(value) => TaskResult::Success(f(value)),
			Self::Failure(failure) => TaskResult::Failure(failure),
		}
	}

	pub fn map_failure<G>(self, f: impl FnOnce(F) -> G) -> TaskResult<T, G> {
		match self {
			Self::Success(value) => TaskResult::Success(value),
			Self::Failure(failure) => TaskResult::Failure(f(failure)),
		}
	}

	pub fn into_success(self) -> Option<T> {
		match self {
			Self::Success(value) => Some(value),
			Self::Failure(_) => None,
		}
	}

	pub fn into_failure(self) -> Option<F> {
		match self {
			Self::Success(_) => None,
			Self::Failure(failure) => Some(failure),
		}
	}
}

impl<T, F> From<Result<T, F>> for TaskResult<T, F> {
	fn from(result: Result<T, F>) -> Self {
		result.map_or_else(Self::Failure, Self::Success)
	}
}

impl<T, F> From<TaskResult<T, F>> for Result<T, F> {
	fn from(result: TaskResult<T, F>) -> Self {
		match result {
			TaskResult::Success(value) => Ok(value),
			TaskResult::Failure(failure) => Err(failure),
		}
	}
}

/// Another task whose result will be adopted by the task that returns it.
pub struct AwaitTarget<T, F> {
	pub(crate) source: Arc<dyn AwaitSource<T, F>>,
	pub(crate) start_if_not_started: bool,
}

impl<T: 'static, F: 'static> fmt::Debug for AwaitTarget<T, F> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AwaitTarget")
			.field("task_id", &self.source.core().id())
			.field("start_if_not_started", &self.start_if_not_started)
			.finish()
	}
}

/// What a task function hands back to the graph.
pub enum TaskReturn<T, F> {
	/// The task is done, with this result.
	Ready(TaskResult<T, F>),
	/// The task will finish with the result of another task.
	Await(AwaitTarget<T, F>),
}

impl<T: fmt::Debug + 'static, F: fmt::Debug + 'static> fmt::Debug for TaskReturn<T, F> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
			Self::Await(target) => f.debug_tuple("Await").field(target).finish(),
		}
	}
}

impl<T: TaskValue, F: TaskValue> TaskReturn<T, F> {
	/// Finish with the result of `task`, starting its graph first if asked to and it isn't running yet.
	pub fn awaiting<A: TaskValue>(task: Task<T, A, F>, start_if_not_started: bool) -> Self {
		Self::Await(AwaitTarget {
			source: task.into_node(),
			start_if_not_started,
		})
	}
}

/// Conversion of whatever a task function returns into a [`TaskReturn`].
///
/// Implemented for `()`, [`TaskResult`], [`Result`], [`Task`] (awaited without being started) and
/// [`TaskReturn`] itself. Functions returning a plain value go through [`Task::map`].
pub trait IntoTaskReturn<F> {
	type Success: TaskValue;

	fn into_task_return(self) -> TaskReturn<Self::Success, F>;
}

impl<F> IntoTaskReturn<F> for () {
	type Success = ();

	fn into_task_return(self) -> TaskReturn<(), F> {
		TaskReturn::Ready(TaskResult::Success(()))
	}
}

impl<T: TaskValue, F> IntoTaskReturn<F> for TaskResult<T, F> {
	type Success = T;

	fn into_task_return(self) -> TaskReturn<T, F> {
		TaskReturn::Ready(self)
	}
}

impl<T: TaskValue, F> IntoTaskReturn<F> for Result<T, F> {
	type Success = T;

	fn into_task_return(self) -> TaskReturn<T, F> {
		TaskReturn::Ready(self.into())
	}
}

impl<T: TaskValue, F> IntoTaskReturn<F> for TaskReturn<T, F> {
	type Success = T;

	fn into_task_return(self) -> Self {
		self
	}
}

impl<T: TaskValue, A: TaskValue, F: TaskValue> IntoTaskReturn<F> for Task<T, A, F> {
	type Success = T;

	fn into_task_return(self) -> TaskReturn<T, F> {
		TaskReturn::awaiting(self, false)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn result_conversions() {
		let ok: TaskResult<i32, String> = Ok(7).into();
		assert_eq!(ok, TaskResult::Success(7));
		assert_eq!(ok.clone().map(|n| n * 6).into_success(), Some(42));

		let failed: TaskResult<i32, String> = Err("boom".to_string()).into();
		assert!(failed.is_failure());
		assert_eq!(
			Result::from(failed.map_failure(|e| e.len())),
			Err::<i32, usize>(4)
		);
	}

	#[test]
	fn unit_return_is_success() {
		assert!(matches!(
			IntoTaskReturn::<String>::into_task_return(()),
			TaskReturn::Ready(TaskResult::Success(()))
		));
	}
}
