#![allow(dead_code)]

use std::{
	fmt,
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc,
	},
	time::Duration,
};

use sd_task_graph::{ExecutionPolicy, TaskFailure, TaskOptions};

use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleError {
	Broken(u32),
	Refused,
}

impl fmt::Display for SampleError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Broken(code) => write!(f, "broken with code {code}"),
			Self::Refused => write!(f, "refused"),
		}
	}
}

impl TaskFailure for SampleError {
	fn report(task_name: &str, failure: &Self) {
		warn!(%task_name, %failure, "Sample task failed");
	}
}

/// Options for a task running on the calling thread, with the given name.
pub fn inline(name: &str) -> TaskOptions {
	TaskOptions::new()
		.with_name(name)
		.with_policy(ExecutionPolicy::Inline)
}

#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
	pub fn increment(&self) -> usize {
		self.0.fetch_add(1, Ordering::SeqCst) + 1
	}

	pub fn get(&self) -> usize {
		self.0.load(Ordering::SeqCst)
	}
}

pub fn random_delay() -> Duration {
	use rand::Rng;

	Duration::from_millis(rand::thread_rng().gen_range(1..20))
}
