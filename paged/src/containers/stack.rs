// SPDX-License-Identifier: Apache-2.0

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use tracing::trace;
use crate::linked::LinkedIndex;
use crate::monitor::{Conditional, Timeout};
use crate::pager::MemPager;
use super::member::{Member, MemberRef, Members, Occupancy, Occupied};

struct State<'p, T> {
	used: usize,
	list: LinkedIndex<Member<T>, MemberRef<'p, T>>,
	members: Members<'p, T>,
}

impl<T> Occupied for State<'_, T> {
	fn used(&mut self) -> &mut usize { &mut self.used }
}

impl<'p, T> Occupancy<'p, T> for State<'p, T> {
	fn members(&mut self) -> &mut Members<'p, T> { &mut self.members }
}

/// A bounded LIFO stack of shared payloads, recycling its member nodes like
/// [`Queue`](super::Queue).
pub struct Stack<'p, T> {
	monitor: Conditional<State<'p, T>>,
	pager: Option<&'p MemPager>,
	limit: usize,
}

impl<T> Stack<'static, T> {
	/// Creates a stack holding at most `limit` payloads, `0` meaning unbounded.
	pub fn new(limit: usize) -> Self {
		Self::create(None, limit)
	}
}

impl<'p, T> Stack<'p, T> {
	/// Creates a stack allocating its members from `pager`.
	pub fn with_pager(pager: &'p MemPager, limit: usize) -> Self {
		Self::create(Some(pager), limit)
	}

	fn create(pager: Option<&'p MemPager>, limit: usize) -> Self {
		Self {
			monitor: Conditional::new(State {
				used: 0,
				list: LinkedIndex::new(),
				members: Members::new(pager),
			}),
			pager,
			limit,
		}
	}

	/// Pushes `object`, blocking while the stack is full. Returns `false` on
	/// timeout.
	pub fn push(&self, object: &Arc<T>, timeout: impl Into<Timeout>) -> bool {
		let mut state = self.monitor.lock();
		if self.limit > 0 && !state.wait_while(timeout, |state| state.used >= self.limit) {
			trace!(limit = self.limit, "stack push timed out");
			return false
		}

		let member = Members::<T>::reserve(&mut state, self.pager);
		member.object = Some(object.clone());
		state.list.enlist(member);
		state.broadcast();
		true
	}

	/// Pops the most recently pushed payload, blocking while the stack is empty.
	pub fn pull(&self, timeout: impl Into<Timeout>) -> Option<Arc<T>> {
		let mut state = self.monitor.lock();
		if !state.wait_while(timeout, |state| state.list.is_empty()) {
			trace!("stack pull timed out");
			return None
		}

		let member = state.list.pop()?;
		let object = member.object.take();
		state.used -= 1;
		state.members.recycle(member);
		state.broadcast();
		object
	}

	/// Removes `object` from anywhere in the stack. Returns `false` if it isn't
	/// present.
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

	pub fn count(&self) -> usize { self.monitor.lock().used }

	pub fn limit(&self) -> usize { self.limit }

	/// Returns `true` if the stack is empty. Advisory only.
	pub fn is_empty(&self) -> bool { self.count() == 0 }

	/// Returns the number of member nodes ever created.
	pub fn members(&self) -> usize { self.monitor.lock().members.created() }
}

impl<T> Debug for Stack<'_, T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Stack")
			.field("count", &self.count())
			.field("limit", &self.limit)
			.finish_non_exhaustive()
	}
}

impl<T> Drop for Stack<'_, T> {
	fn drop(&mut self) {
		let state = self.monitor.get_mut();
		while let Some(member) = state.list.pop() {
			state.members.recycle(member);
		}
	}
}
