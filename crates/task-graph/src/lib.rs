//!
//! # Task Graph
//!
//! Spacedrive's Task Graph is a library to build graphs of deferred computations, where each task
//! produces a typed success or failure result and hands it forward to its continuations.
//!
//! Build a chain (or a tree) of tasks, start it from any node and the graph will be executed on the
//! installed [`Executor`], following the [`ExecutionPolicy`] chosen for each task. Aside from plain
//! chaining, the library offers:
//! - Awaiting the result of another task from inside a task body;
//! - Pre-start cancellation, cascading through every continuation that didn't run yet;
//! - Failures that short-circuit the rest of the chain and are always reported;
//! - Combinators like [`when_all`], [`when_any`], [`for_range`], [`for_each`] and [`transform`];
//!
//!
//! ## Basic example
//!
//! ```
//! use sd_task_graph::{create_task, TaskState};
//!
//! let root = create_task(|| Ok::<_, String>(4));
//!
//! let answer = root
//!     .map(|answer| format!("{answer}0"))
//!     .next(|answer| answer.parse::<i32>().map(|n| n + 5).map_err(|e| e.to_string()))
//!     .map(|answer| answer - 3);
//!
//! answer.start_graph();
//!
//! assert_eq!(answer.wait(), TaskState::Successful);
//! assert_eq!(answer.success().as_deref(), Some(&42));
//! ```

#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::unnecessary_cast,
	clippy::cast_lossless,
	clippy::cast_possible_truncation,
	clippy::cast_possible_wrap,
	clippy::cast_precision_loss,
	clippy::cast_sign_loss,
	clippy::dbg_macro,
	clippy::deprecated_cfg_attr,
	clippy::separated_literal_suffix,
	deprecated
)]
#![forbid(deprecated_in_future)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod combinators;
mod create;
mod error;
mod failure;
mod node;
mod options;
mod result;
mod state;
mod task;

pub mod config;
pub mod diagnostics;
pub mod executor;

pub use combinators::{
	for_each, for_each_no_copy, for_each_no_copy_no_task, for_each_no_task, for_range,
	for_range_no_task, transform, transform_if, transform_if_no_copy, transform_if_no_copy_no_task,
	transform_if_no_task, transform_no_copy, transform_no_copy_no_task, transform_no_task,
	when_all, when_any, Collector, Completion, CompletionCallback, CompletionSource,
};
pub use config::GraphConfig;
pub use create::{
	create_continuation, create_continuation_with, create_empty_task, create_empty_task_with,
	create_task, create_task_with, run, run_with,
};
pub use error::Error;
pub use executor::{ExecutionPolicy, Executor, Job, MainThreadQueue, TokioExecutor};
pub use failure::TaskFailure;
pub use options::TaskOptions;
pub use result::{AwaitTarget, IntoTaskReturn, TaskResult, TaskReturn};
pub use state::{CancellationReason, CancellationResult, TaskState};
pub use task::{Task, TaskId, TaskValue};
