use std::thread;

use sd_task_graph::{
	config, create_task, ExecutionPolicy, GraphConfig, TaskOptions, TaskState, TokioExecutor,
};

use tracing_subscriber::EnvFilter;

#[test]
fn main_thread_jobs_wait_for_the_pump() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();

	let executor = TokioExecutor::new(&GraphConfig::default()).unwrap();
	let queue = executor.main_thread().unwrap().clone();

	config::init_with(
		GraphConfig {
			default_policy: ExecutionPolicy::MainThread,
			..Default::default()
		},
		executor,
	)
	.unwrap();

	assert!(config::init(GraphConfig::default()).is_err());

	let task = create_task(|| Ok::<_, String>(thread::current().id()));
	let same_thread = task.map_with(
		TaskOptions::new().with_policy(ExecutionPolicy::Inline),
		|id| *id == thread::current().id(),
	);

	assert_eq!(task.policy(), ExecutionPolicy::MainThread);

	task.start_graph();

	assert_eq!(task.state(), TaskState::InProgress);
	assert_eq!(queue.len(), 1);

	assert_eq!(queue.pump(), 1);

	assert_eq!(task.state(), TaskState::Successful);
	assert_eq!(task.success().as_deref(), Some(&thread::current().id()));
	assert_eq!(same_thread.success().as_deref(), Some(&true));
	assert!(queue.is_empty());
}
