// SPDX-License-Identifier: Apache-2.0

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use tracing::trace;
use crate::linked::OrderedIndex;
use crate::monitor::{Conditional, Timeout};
use crate::pager::MemPager;
use super::member::{Member, MemberRef, Members, Occupancy, Occupied};

struct State<'p, T> {
	used: usize,
	list: OrderedIndex<Member<T>, MemberRef<'p, T>>,
	members: Members<'p, T>,
}

impl<T> Occupied for State<'_, T> {
	fn used(&mut self) -> &mut usize { &mut self.used }
}

impl<'p, T> Occupancy<'p, T> for State<'p, T> {
	fn members(&mut self) -> &mut Members<'p, T> { &mut self.members }
}

/// A bounded FIFO queue of shared payloads. Posting retains a reference to the
/// payload; taking it back hands that reference to the caller.
///
/// Payloads are wrapped in member nodes which are recycled through a freelist,
/// so memory is bounded by the most members ever in use at once. New members come
/// from the pager when the queue was created with one.
pub struct Queue<'p, T> {
	monitor: Conditional<State<'p, T>>,
	pager: Option<&'p MemPager>,
	limit: usize,
}

impl<T> Queue<'static, T> {
	/// Creates a queue holding at most `limit` payloads, `0` meaning unbounded.
	/// Members are allocated on the heap.
	pub fn new(limit: usize) -> Self {
		Self::create(None, limit)
	}
}

impl<'p, T> Queue<'p, T> {
	/// Creates a queue holding at most `limit` payloads, allocating members from
	/// `pager`.
	pub fn with_pager(pager: &'p MemPager, limit: usize) -> Self {
		Self::create(Some(pager), limit)
	}

	fn create(pager: Option<&'p MemPager>, limit: usize) -> Self {
		Self {
			monitor: Conditional::new(State {
				used: 0,
				list: OrderedIndex::new(),
				members: Members::new(pager),
			}),
			pager,
			limit,
		}
	}

	/// Appends `object`, blocking while the queue is full. Returns `false` if the
	/// timeout expired first.
	pub fn post(&self, object: &Arc<T>, timeout: impl Into<Timeout>) -> bool {
		let mut state = self.monitor.lock();
		if self.limit > 0 && !state.wait_while(timeout, |state| state.used >= self.limit) {
			trace!(limit = self.limit, "queue post timed out");
			return false
		}

		let member = Members::<T>::reserve(&mut state, self.pager);
		member.object = Some(object.clone());
		state.list.add(member);
		state.broadcast();
		true
	}

	/// Removes the oldest payload, blocking while the queue is empty.
	pub fn fifo(&self, timeout: impl Into<Timeout>) -> Option<Arc<T>> {
		self.take(timeout, false)
	}

	/// Removes the newest payload, blocking while the queue is empty. The order of
	/// the remaining payloads is undisturbed.
	pub fn lifo(&self, timeout: impl Into<Timeout>) -> Option<Arc<T>> {
		self.take(timeout, true)
	}

	fn take(&self, timeout: impl Into<Timeout>, newest: bool) -> Option<Arc<T>> {
		let mut state = self.monitor.lock();
		if !state.wait_while(timeout, |state| state.list.is_empty()) {
			trace!("queue take timed out");
			return None
		}

		let member = if newest {
			state.list.pop_back()
		} else {
			state.list.pop_front()
		}?;
		let object = member.object.take();
		state.used -= 1;
		state.members.recycle(member);
		state.broadcast();
		object
	}

	/// Removes `object` wherever it is in the queue, releasing the reference the
	/// queue held. Returns `false` if it isn't queued.
	pub fn remove(&self, object: &Arc<T>) -> bool {
		let mut state = self.monitor.lock();
		let Some(member) = state.list.remove_where(|member| member.holds(object)) else {
			return false
		};

		state.used -= 1;
		state.members.recycle(member);
		state.broadcast();
		true
	}

	/// Returns the number of queued payloads, including posts in progress.
	pub fn count(&self) -> usize { self.monitor.lock().used }

	/// Returns the capacity, `0` meaning unbounded.
	pub fn limit(&self) -> usize { self.limit }

	/// Returns `true` if nothing is queued. This is advisory: the state may change
	/// as soon as it returns.
	pub fn is_empty(&self) -> bool { self.count() == 0 }

	/// Returns the number of member nodes ever created.
	pub fn members(&self) -> usize { self.monitor.lock().members.created() }
}

impl<T> Debug for Queue<'_, T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Queue")
			.field("count", &self.count())
			.field("limit", &self.limit)
			.finish_non_exhaustive()
	}
}

impl<T> Drop for Queue<'_, T> {
	fn drop(&mut self) {
		let state = self.monitor.get_mut();
		while let Some(member) = state.list.pop_front() {
			state.members.recycle(member);
		}
	}
}

#[cfg(test)]
mod test {
	use std::sync::Arc;
	use crate::monitor::Timeout;
	use super::Queue;

	#[test]
	fn reuses_members() {
		let queue = Queue::new(0);
		let value = Arc::new(1);
		for _ in 0..4 {
			assert!(queue.post(&value, Timeout::Immediate));
			assert!(queue.fifo(Timeout::Immediate).is_some());
		}
		assert_eq!(queue.members(), 1);
	}

	#[test]
	fn drop_releases_payloads() {
		let value = Arc::new(());
		let queue = Queue::new(0);
		queue.post(&value, Timeout::Immediate);
		queue.post(&value, Timeout::Immediate);
		assert_eq!(Arc::strong_count(&value), 3);
		drop(queue);
		assert_eq!(Arc::strong_count(&value), 1);
	}
}
