use std::{fmt, iter, mem, sync::Arc};

use parking_lot::{Mutex, MutexGuard};

use crate::{
	error::Error,
	executor::ExecutionPolicy,
	task::{Task, TaskValue},
};

use super::for_each::{for_each, for_each_no_copy, for_each_no_copy_no_task, for_each_no_task};

/// Output container shared by the iterations of a transform, behind its own lock.
pub struct Collector<C> {
	inner: Arc<Mutex<C>>,
}

impl<C> Clone for Collector<C> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<C: Default> Default for Collector<C> {
	fn default() -> Self {
		Self::new(C::default())
	}
}

impl<C: fmt::Debug> fmt::Debug for Collector<C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Collector").field(&*self.inner.lock()).finish()
	}
}

impl<C> Collector<C> {
	pub fn new(container: C) -> Self {
		Self {
			inner: Arc::new(Mutex::new(container)),
		}
	}

	pub fn lock(&self) -> MutexGuard<'_, C> {
		self.inner.lock()
	}

	/// Takes the collected values, leaving an empty container behind.
	pub fn take(&self) -> C
	where
		C: Default,
	{
		mem::take(&mut *self.inner.lock())
	}

	/// The container, if no other clone of this collector is alive.
	pub fn into_inner(self) -> Result<C, Self> {
		Arc::try_unwrap(self.inner)
			.map(Mutex::into_inner)
			.map_err(|inner| Self { inner })
	}

	pub(crate) fn push<U>(&self, value: U)
	where
		C: Extend<U>,
	{
		self.inner.lock().extend(iter::once(value));
	}
}

/// Maps every item in its own task, collecting the results into `output` in no particular order.
pub fn transform<V, U, C, Map>(
	items: impl IntoIterator<Item = V>,
	output: &Collector<C>,
	policy: ExecutionPolicy,
	map: Map,
) -> Task
where
	V: Send + 'static,
	C: Extend<U> + Send + 'static,
	Map: Fn(V) -> U + Send + Sync + 'static,
{
	let output = output.clone();
	for_each(items, policy, move |item| output.push(map(item)))
}

/// Like [`transform`], only collecting items accepted by `predicate`.
pub fn transform_if<V, U, C, Predicate, Map>(
	items: impl IntoIterator<Item = V>,
	output: &Collector<C>,
	policy: ExecutionPolicy,
	predicate: Predicate,
	map: Map,
) -> Task
where
	V: Send + 'static,
	C: Extend<U> + Send + 'static,
	Predicate: Fn(&V) -> bool + Send + Sync + 'static,
	Map: Fn(V) -> U + Send + Sync + 'static,
{
	let output = output.clone();
	for_each(items, policy, move |item| {
		if predicate(&item) {
			output.push(map(item));
		}
	})
}

pub fn transform_no_copy<V, U, C, Map>(
	items: Arc<[V]>,
	output: &Collector<C>,
	policy: ExecutionPolicy,
	map: Map,
) -> Task
where
	V: TaskValue,
	C: Extend<U> + Send + 'static,
	Map: Fn(&V) -> U + Send + Sync + 'static,
{
	let output = output.clone();
	for_each_no_copy(items, policy, move |item| output.push(map(item)))
}

pub fn transform_if_no_copy<V, U, C, Predicate, Map>(
	items: Arc<[V]>,
	output: &Collector<C>,
	policy: ExecutionPolicy,
	predicate: Predicate,
	map: Map,
) -> Task
where
	V: TaskValue,
	C: Extend<U> + Send + 'static,
	Predicate: Fn(&V) -> bool + Send + Sync + 'static,
	Map: Fn(&V) -> U + Send + Sync + 'static,
{
	let output = output.clone();
	for_each_no_copy(items, policy, move |item| {
		if predicate(item) {
			output.push(map(item));
		}
	})
}

pub fn transform_no_task<V, U, C, Map>(
	items: impl IntoIterator<Item = V>,
	output: &Collector<C>,
	policy: ExecutionPolicy,
	map: Map,
) -> Result<(), Error>
where
	V: Send + 'static,
	C: Extend<U> + Send + 'static,
	Map: Fn(V) -> U + Send + Sync + 'static,
{
	let output = output.clone();
	for_each_no_task(items, policy, move |item| output.push(map(item)))
}

pub fn transform_if_no_task<V, U, C, Predicate, Map>(
	items: impl IntoIterator<Item = V>,
	output: &Collector<C>,
	policy: ExecutionPolicy,
	predicate: Predicate,
	map: Map,
) -> Result<(), Error>
where
	V: Send + 'static,
	C: Extend<U> + Send + 'static,
	Predicate: Fn(&V) -> bool + Send + Sync + 'static,
	Map: Fn(V) -> U + Send + Sync + 'static,
{
	let output = output.clone();
	for_each_no_task(items, policy, move |item| {
		if predicate(&item) {
			output.push(map(item));
		}
	})
}

pub fn transform_no_copy_no_task<V, U, C, Map>(
	items: Arc<[V]>,
	output: &Collector<C>,
	policy: ExecutionPolicy,
	map: Map,
) -> Result<(), Error>
where
	V: TaskValue,
	C: Extend<U> + Send + 'static,
	Map: Fn(&V) -> U + Send + Sync + 'static,
{
	let output = output.clone();
	for_each_no_copy_no_task(items, policy, move |item| output.push(map(item)))
}

pub fn transform_if_no_copy_no_task<V, U, C, Predicate, Map>(
	items: Arc<[V]>,
	output: &Collector<C>,
	policy: ExecutionPolicy,
	predicate: Predicate,
	map: Map,
) -> Result<(), Error>
where
	V: TaskValue,
	C: Extend<U> + Send + 'static,
	Predicate: Fn(&V) -> bool + Send + Sync + 'static,
	Map: Fn(&V) -> U + Send + Sync + 'static,
{
	let output = output.clone();
	for_each_no_copy_no_task(items, policy, move |item| {
		if predicate(item) {
			output.push(map(item));
		}
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn collector_hands_back_its_container() {
		let collector = Collector::<Vec<i32>>::default();
		let other = collector.clone();

		other.push(1);
		collector.push(2);
		assert_eq!(*collector.lock(), vec![1, 2]);

		let collector = collector.into_inner().unwrap_err();
		drop(other);

		assert_eq!(collector.into_inner().ok(), Some(vec![1, 2]));
	}

	#[test]
	fn take_leaves_empty_container() {
		let collector = Collector::new(vec!["a"]);
		assert_eq!(collector.take(), vec!["a"]);
		assert!(collector.lock().is_empty());
	}
}
