//! Tasks built out of other tasks: joins over many inputs and parallel iterations.

mod for_each;
mod transform;
mod when;

pub use for_each::{
	for_each, for_each_no_copy, for_each_no_copy_no_task, for_each_no_task, for_range,
	for_range_no_task,
};
pub use transform::{
	transform, transform_if, transform_if_no_copy, transform_if_no_copy_no_task,
	transform_if_no_task, transform_no_copy, transform_no_copy_no_task, transform_no_task,
	Collector,
};
pub use when::{when_all, when_any, Completion, CompletionCallback, CompletionSource};
