//! The executor service that runs task jobs.
//!
//! The task graph never spawns threads by itself, every job goes through an [`Executor`] along with
//! the [`ExecutionPolicy`] chosen for its task. Install one with [`install`] (or through
//! [`config::init`](crate::config::init)), otherwise a [`TokioExecutor`] with default settings is
//! built the first time a task needs to run. That one has no [`MainThreadQueue`] anyone could pump,
//! so it refuses [`ExecutionPolicy::MainThread`] jobs.

use std::{fmt, sync::Arc};

use async_channel as chan;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{error, trace, Instrument};

use super::{config::GraphConfig, error::Error};

/// A unit of work handed to the executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Where a task function should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPolicy {
	/// Right away, on the thread that scheduled the task.
	Inline,
	/// On a worker pool that tolerates blocking work.
	#[default]
	ThreadPool,
	/// On the host's main thread, whenever it pumps its [`MainThreadQueue`].
	MainThread,
}

pub trait Executor: Send + Sync + 'static {
	fn execute(&self, policy: ExecutionPolicy, job: Job) -> Result<(), Error>;
}

/// Jobs waiting for the host's main thread.
///
/// The host decides when they run, calling [`MainThreadQueue::pump`] from its own loop or driving
/// [`MainThreadQueue::run`] on a task pinned to that thread.
#[derive(Clone)]
pub struct MainThreadQueue {
	jobs_tx: chan::Sender<Job>,
	jobs_rx: chan::Receiver<Job>,
}

impl fmt::Debug for MainThreadQueue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MainThreadQueue")
			.field("pending", &self.jobs_rx.len())
			.field("closed", &self.jobs_rx.is_closed())
			.finish()
	}
}

impl Default for MainThreadQueue {
	fn default() -> Self {
		Self::new()
	}
}

impl MainThreadQueue {
	#[must_use]
	pub fn new() -> Self {
		let (jobs_tx, jobs_rx) = chan::unbounded();

		Self { jobs_tx, jobs_rx }
	}

	pub fn push(&self, job: Job) -> Result<(), Error> {
		self.jobs_tx
			.try_send(job)
			.map_err(|_| Error::ExecutorShutdown)
	}

	/// Runs every job queued so far on the calling thread, returning how many ran.
	pub fn pump(&self) -> usize {
		let mut count = 0;

		while let Ok(job) = self.jobs_rx.try_recv() {
			job();
			count += 1;
		}

		if count > 0 {
			trace!(%count, "Pumped main thread jobs");
		}

		count
	}

	/// Runs jobs as they arrive, until the queue is closed.
	pub async fn run(&self) {
		while let Ok(job) = self.jobs_rx.recv().await {
			job();
		}

		trace!("Main thread queue closed");
	}

	/// Closes the queue, jobs pushed afterwards are refused with [`Error::ExecutorShutdown`].
	pub fn close(&self) -> bool {
		self.jobs_tx.close()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.jobs_rx.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.jobs_rx.is_empty()
	}
}

/// The default executor, running pool jobs on the blocking pool of a `tokio` runtime.
pub struct TokioExecutor {
	handle: Handle,
	runtime: Option<Runtime>,
	main_thread: Option<MainThreadQueue>,
}

impl fmt::Debug for TokioExecutor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TokioExecutor")
			.field("owns_runtime", &self.runtime.is_some())
			.field("main_thread", &self.main_thread)
			.finish_non_exhaustive()
	}
}

impl TokioExecutor {
	/// Builds an executor owning its own multi-threaded runtime.
	pub fn new(config: &GraphConfig) -> Result<Self, Error> {
		let mut builder = Builder::new_multi_thread();
		builder.thread_name(config.thread_name.clone()).enable_all();

		if let Some(worker_threads) = config.worker_threads.filter(|&threads| threads > 0) {
			builder.worker_threads(worker_threads);
		}

		let runtime = builder.build()?;

		trace!(
			worker_threads = ?config.worker_threads,
			thread_name = %config.thread_name,
			"Built task graph runtime"
		);

		Ok(Self {
			handle: runtime.handle().clone(),
			runtime: Some(runtime),
			main_thread: Some(MainThreadQueue::new()),
		})
	}

	/// Uses a runtime owned by someone else. It must outlive every task scheduled on it.
	#[must_use]
	pub fn with_handle(handle: Handle) -> Self {
		Self {
			handle,
			runtime: None,
			main_thread: Some(MainThreadQueue::new()),
		}
	}

	/// Drops the main thread queue, [`ExecutionPolicy::MainThread`] jobs are then refused with
	/// [`Error::ExecutorShutdown`].
	#[must_use]
	pub fn without_main_thread(mut self) -> Self {
		self.main_thread = None;
		self
	}

	#[must_use]
	pub const fn main_thread(&self) -> Option<&MainThreadQueue> {
		self.main_thread.as_ref()
	}

	#[must_use]
	pub const fn handle(&self) -> &Handle {
		&self.handle
	}
}

impl Executor for TokioExecutor {
	fn execute(&self, policy: ExecutionPolicy, job: Job) -> Result<(), Error> {
		match policy {
			ExecutionPolicy::Inline => {
				job();
				Ok(())
			}

			ExecutionPolicy::ThreadPool => {
				let handle = self.handle.spawn_blocking(job);

				self.handle.spawn(
					async move {
						if let Err(e) = handle.await {
							if e.is_panic() {
								error!(?e, "Task job panicked");
							}
						}
					}
					.in_current_span(),
				);

				Ok(())
			}

			ExecutionPolicy::MainThread => match &self.main_thread {
				Some(main_thread) => main_thread.push(job),
				None => {
					error!("Main thread job refused, this executor has no main thread queue");
					Err(Error::ExecutorShutdown)
				}
			},
		}
	}
}

impl Drop for TokioExecutor {
	fn drop(&mut self) {
		if let Some(runtime) = self.runtime.take() {
			runtime.shutdown_background();
		}
	}
}

static EXECUTOR: OnceCell<Arc<dyn Executor>> = OnceCell::new();

/// Installs the executor used by every task, can only happen once per process.
pub fn install(executor: impl Executor) -> Result<(), Error> {
	EXECUTOR
		.set(Arc::new(executor))
		.map_err(|_| Error::ExecutorAlreadyInstalled)
}

/// The installed executor, building the default one if nothing was installed yet.
pub fn current() -> Result<Arc<dyn Executor>, Error> {
	EXECUTOR
		.get_or_try_init(|| {
			trace!("No executor installed, building the default one");
			TokioExecutor::new(&GraphConfig::default()).map(|executor| {
				Arc::new(executor.without_main_thread()) as Arc<dyn Executor>
			})
		})
		.cloned()
}

pub(crate) fn execute(policy: ExecutionPolicy, job: Job) -> Result<(), Error> {
	current()?.execute(policy, job)
}

#[cfg(test)]
mod tests {
	use std::sync::{
		atomic::{AtomicUsize, Ordering},
		mpsc,
	};

	use super::*;

	#[test]
	fn inline_runs_on_caller_thread() {
		let executor = TokioExecutor::new(&GraphConfig::default()).unwrap();
		let caller = std::thread::current().id();
		let (tx, rx) = mpsc::channel();

		executor
			.execute(
				ExecutionPolicy::Inline,
				Box::new(move || tx.send(std::thread::current().id()).unwrap()),
			)
			.unwrap();

		assert_eq!(rx.try_recv().unwrap(), caller);
	}

	#[test]
	fn thread_pool_runs_elsewhere() {
		let executor = TokioExecutor::new(&GraphConfig::default()).unwrap();
		let caller = std::thread::current().id();
		let (tx, rx) = mpsc::channel();

		executor
			.execute(
				ExecutionPolicy::ThreadPool,
				Box::new(move || tx.send(std::thread::current().id()).unwrap()),
			)
			.unwrap();

		assert_ne!(rx.recv().unwrap(), caller);
	}

	#[test]
	fn main_thread_jobs_wait_for_pump() {
		let executor = TokioExecutor::new(&GraphConfig::default()).unwrap();
		let main_thread = executor.main_thread().unwrap().clone();
		let counter = Arc::new(AtomicUsize::new(0));

		for _ in 0..3 {
			let counter = Arc::clone(&counter);
			executor
				.execute(
					ExecutionPolicy::MainThread,
					Box::new(move || {
						counter.fetch_add(1, Ordering::Relaxed);
					}),
				)
				.unwrap();
		}

		assert_eq!(counter.load(Ordering::Relaxed), 0);
		assert_eq!(main_thread.len(), 3);
		assert_eq!(main_thread.pump(), 3);
		assert_eq!(counter.load(Ordering::Relaxed), 3);

		assert!(main_thread.close());
		assert!(matches!(
			executor.execute(ExecutionPolicy::MainThread, Box::new(|| {})),
			Err(Error::ExecutorShutdown)
		));
	}

	#[test]
	fn main_thread_jobs_refused_without_queue() {
		let executor = TokioExecutor::new(&GraphConfig::default())
			.unwrap()
			.without_main_thread();

		assert!(executor.main_thread().is_none());
		assert!(matches!(
			executor.execute(ExecutionPolicy::MainThread, Box::new(|| {})),
			Err(Error::ExecutorShutdown)
		));
	}

	#[test]
	fn policy_from_config_names() {
		let policy: ExecutionPolicy = serde_json::from_str("\"main_thread\"").unwrap();
		assert_eq!(policy, ExecutionPolicy::MainThread);
	}
}
