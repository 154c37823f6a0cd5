use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{
	diagnostics,
	error::Error,
	executor::{self, ExecutionPolicy, Executor, TokioExecutor},
};

/// Process wide settings for the task graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
	/// Policy used by tasks created without an explicit one.
	pub default_policy: ExecutionPolicy,
	/// Worker threads of the default runtime, one per core when unset.
	pub worker_threads: Option<usize>,
	pub thread_name: String,
	/// Keeps a registry of alive tasks, see [`diagnostics`].
	pub track_alive_tasks: bool,
}

impl Default for GraphConfig {
	fn default() -> Self {
		Self {
			default_policy: ExecutionPolicy::ThreadPool,
			worker_threads: None,
			thread_name: "sd-task-graph".to_string(),
			track_alive_tasks: false,
		}
	}
}

impl GraphConfig {
	pub fn from_json(json: &str) -> Result<Self, Error> {
		serde_json::from_str(json).map_err(Into::into)
	}
}

static DEFAULT_POLICY: OnceCell<ExecutionPolicy> = OnceCell::new();

/// Sets up the task graph with a [`TokioExecutor`] built from `config`.
///
/// Must run before the first task is started, and only once.
pub fn init(config: GraphConfig) -> Result<(), Error> {
	let executor = TokioExecutor::new(&config)?;
	init_with(config, executor)
}

/// Same as [`init`], with an executor provided by the host.
///
/// Nothing from `config` is applied if the executor can't be installed, which is the case once
/// any task ran before this call.
pub fn init_with(config: GraphConfig, executor: impl Executor) -> Result<(), Error> {
	executor::install(executor)?;

	DEFAULT_POLICY
		.set(config.default_policy)
		.map_err(|_| Error::AlreadyInitialized)?;

	if config.track_alive_tasks {
		diagnostics::enable();
	}

	trace!(?config, "Task graph initialized");

	Ok(())
}

/// The policy used when a task is created without one.
#[must_use]
pub fn default_policy() -> ExecutionPolicy {
	DEFAULT_POLICY.get().copied().unwrap_or_default()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn partial_json_keeps_defaults() {
		let config = GraphConfig::from_json(r#"{ "worker_threads": 2, "track_alive_tasks": true }"#)
			.unwrap();

		assert_eq!(config.worker_threads, Some(2));
		assert!(config.track_alive_tasks);
		assert_eq!(config.default_policy, ExecutionPolicy::ThreadPool);
		assert_eq!(config.thread_name, "sd-task-graph");
	}

	#[test]
	fn bad_json_is_a_config_error() {
		assert!(matches!(
			GraphConfig::from_json(r#"{ "default_policy": "elsewhere" }"#),
			Err(Error::Config(_))
		));
	}
}
