//! Registry of alive tasks, to find graphs that were never released.
//!
//! Disabled by default. Once [`enable`]d, every task node created afterwards is tracked until it's
//! dropped.

use std::{
	collections::HashMap,
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::trace;

use super::task::TaskId;

#[derive(Default)]
struct AliveTasks {
	enabled: AtomicBool,
	tasks: Mutex<HashMap<TaskId, Arc<Mutex<String>>>>,
}

static ALIVE_TASKS: Lazy<AliveTasks> = Lazy::new(AliveTasks::default);

pub fn enable() {
	ALIVE_TASKS.enabled.store(true, Ordering::Release);
	trace!("Alive tasks tracking enabled");
}

/// Stops tracking and forgets every task tracked so far.
pub fn disable() {
	ALIVE_TASKS.enabled.store(false, Ordering::Release);
	ALIVE_TASKS.tasks.lock().clear();
}

#[must_use]
pub fn is_enabled() -> bool {
	ALIVE_TASKS.enabled.load(Ordering::Acquire)
}

/// Names of every tracked task still alive.
#[must_use]
pub fn alive_tasks() -> Vec<String> {
	ALIVE_TASKS
		.tasks
		.lock()
		.values()
		.map(|name| name.lock().clone())
		.collect()
}

#[must_use]
pub fn alive_count() -> usize {
	ALIVE_TASKS.tasks.lock().len()
}

pub(crate) fn track(id: TaskId, name: &Arc<Mutex<String>>) {
	if is_enabled() {
		ALIVE_TASKS.tasks.lock().insert(id, Arc::clone(name));
	}
}

pub(crate) fn untrack(id: TaskId) {
	if is_enabled() {
		ALIVE_TASKS.tasks.lock().remove(&id);
	}
}
