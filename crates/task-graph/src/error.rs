use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("an ancestor of task <name='{0}'> was already dropped")]
	AncestorDropped(String),
	#[error("task graph already started <root='{0}'>")]
	GraphAlreadyStarted(String),
	#[error("task was cancelled <name='{0}'>")]
	TaskCancelled(String),
	#[error("task <name='{0}'> expects an argument and can't start a graph")]
	MissingArgument(String),
	#[error("executor is shutdown, can't run more jobs")]
	ExecutorShutdown,
	#[error("an executor is already installed")]
	ExecutorAlreadyInstalled,
	#[error("task graph was already initialized")]
	AlreadyInitialized,
	#[error("loop from {first} to {last} never ends with step {step}")]
	InvalidStep { first: i64, last: i64, step: i64 },

	#[error("failed to build executor runtime: {0}")]
	Runtime(#[from] std::io::Error),
	#[error("invalid task graph configuration: {0}")]
	Config(#[from] serde_json::Error),
}
