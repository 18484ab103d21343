// SPDX-License-Identifier: Apache-2.0

use std::fmt::{self, Debug, Formatter};
use std::ops::{Deref, DerefMut};
use tracing::trace;
use crate::linked::{Link, Linked, LinkedIndex};
use crate::monitor::{Conditional, Timeout};

struct Item<T> {
	link: Link<Item<T>>,
	value: T,
}

unsafe impl<T> Linked for Item<T> {
	fn link(&self) -> &Link<Self> { &self.link }
	fn link_mut(&mut self) -> &mut Link<Self> { &mut self.link }
}

/// A fixed pool of preallocated objects. Objects are checked out with
/// [`get`](Self::get), blocking while none are free, and return to the pool when
/// the [`Pooled`] guard drops.
pub struct LinkedAllocator<T> {
	monitor: Conditional<LinkedIndex<Item<T>>>,
	count: usize,
}

impl<T> LinkedAllocator<T> {
	/// Creates a pool holding `items`.
	pub fn new(items: impl IntoIterator<Item = T>) -> Self {
		let mut free = LinkedIndex::new();
		let mut count = 0;
		for value in items {
			free.enlist(Box::new(Item { link: Link::new(), value }));
			count += 1;
		}

		Self {
			monitor: Conditional::new(free),
			count,
		}
	}

	/// Creates a pool of `count` objects built by `init`.
	pub fn with_count(count: usize, mut init: impl FnMut() -> T) -> Self {
		Self::new((0..count).map(|_| init()))
	}

	/// Checks out a free object, waiting while the pool is exhausted. Returns `None`
	/// if the timeout expires first.
	pub fn get(&self, timeout: impl Into<Timeout>) -> Option<Pooled<'_, T>> {
		let mut free = self.monitor.lock();
		if !free.wait_while(timeout, LinkedIndex::is_empty) {
			trace!(count = self.count, "pool get timed out");
			return None
		}

		let item = free.pop()?;
		Some(Pooled {
			item: Some(item),
			pool: self,
		})
	}

	/// Returns the total number of objects.
	pub fn count(&self) -> usize { self.count }

	/// Returns the number of free objects. Advisory only.
	pub fn available(&self) -> usize { self.monitor.lock().len() }

	/// Returns `true` if no objects are free. Advisory only.
	pub fn is_empty(&self) -> bool { self.monitor.lock().is_empty() }

	/// Returns `true` if any object is free. Advisory only.
	pub fn has_free(&self) -> bool { !self.is_empty() }

	fn put(&self, item: Box<Item<T>>) {
		let mut free = self.monitor.lock();
		free.enlist(item);
		free.signal();
	}
}

impl<T> Debug for LinkedAllocator<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("LinkedAllocator")
			.field("count", &self.count)
			.field("available", &self.available())
			.finish()
	}
}

/// An object checked out of a [`LinkedAllocator`], returned when dropped.
pub struct Pooled<'a, T> {
	item: Option<Box<Item<T>>>,
	pool: &'a LinkedAllocator<T>,
}

impl<T> Pooled<'_, T> {
	/// Returns the object to the pool, waking one waiter.
	pub fn release(self) { }
}

impl<T> Deref for Pooled<'_, T> {
	type Target = T;

	fn deref(&self) -> &T {
		match &self.item {
			Some(item) => &item.value,
			None => unreachable!("pooled object already released")
		}
	}
}

impl<T> DerefMut for Pooled<'_, T> {
	fn deref_mut(&mut self) -> &mut T {
		match &mut self.item {
			Some(item) => &mut item.value,
			None => unreachable!("pooled object already released")
		}
	}
}

impl<T: Debug> Debug for Pooled<'_, T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Pooled")
			.field(self.deref())
			.finish()
	}
}

impl<T> Drop for Pooled<'_, T> {
	fn drop(&mut self) {
		if let Some(item) = self.item.take() {
			self.pool.put(item);
		}
	}
}

#[cfg(test)]
mod test {
	use crate::monitor::Timeout;
	use super::LinkedAllocator;

	#[test]
	fn exhaustion() {
		let pool = LinkedAllocator::with_count(2, Vec::<u8>::new);
		let mut a = pool.get(Timeout::Immediate).unwrap();
		let b = pool.get(Timeout::Immediate).unwrap();
		assert!(pool.get(Timeout::Immediate).is_none());
		assert!(!pool.has_free());

		a.push(1);
		drop(a);
		b.release();
		assert_eq!(pool.available(), 2);
		// The last object returned is the first handed out.
		let reused = pool.get(Timeout::Immediate).unwrap();
		assert!(reused.is_empty());
	}
}
