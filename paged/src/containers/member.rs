// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use crate::linked::{Link, Linked, LinkedIndex};
use crate::monitor::ConditionalGuard;
use crate::pager::{Arena, MemPager};

/// A list node holding one payload reference. Idle members hold nothing.
pub(crate) struct Member<T> {
	link: Link<Member<T>>,
	pub object: Option<Arc<T>>,
}

unsafe impl<T> Linked for Member<T> {
	fn link(&self) -> &Link<Self> { &self.link }
	fn link_mut(&mut self) -> &mut Link<Self> { &mut self.link }
}

impl<T> Member<T> {
	const fn new() -> Self {
		Self {
			link: Link::new(),
			object: None,
		}
	}

	/// Returns `true` if this member holds `object`, by identity.
	pub fn holds(&self, object: &Arc<T>) -> bool {
		self.object.as_ref().is_some_and(|held| Arc::ptr_eq(held, object))
	}
}

pub(crate) type MemberRef<'p, T> = &'p mut Member<T>;

/// Recycled member nodes. Members come from the freelist first, then the pager if
/// there is one, then the heap.
pub(crate) struct Members<'p, T> {
	free: LinkedIndex<Member<T>, MemberRef<'p, T>>,
	created: usize,
	heap: bool,
}

impl<'p, T> Members<'p, T> {
	pub fn new(pager: Option<&'p MemPager>) -> Self {
		Self {
			free: LinkedIndex::new(),
			created: 0,
			heap: pager.is_none(),
		}
	}

	/// Returns the number of members ever created.
	pub fn created(&self) -> usize { self.created }

	/// Returns an idle member to the freelist, releasing its payload.
	pub fn recycle(&mut self, member: MemberRef<'p, T>) {
		member.object = None;
		self.free.enlist(member);
	}

	/// Reserves a place in the container and takes an idle member for it,
	/// creating one if the freelist is empty. A new member is allocated with the
	/// container lock released, so other threads may use the container meanwhile.
	/// If the allocation panics, the reservation is returned and waiters woken.
	pub fn reserve<S: Occupancy<'p, T>>(
		state: &mut ConditionalGuard<'_, S>,
		pager: Option<&'p MemPager>
	) -> MemberRef<'p, T> {
		*state.used() += 1;
		if let Some(member) = state.members().free.pop() {
			return member
		}

		let mut reservation = Reservation { state, held: true };
		let member = reservation.state.unlocked(|| match pager {
			Some(pager) => pager.alloc_value(Member::new()),
			None => Box::leak(Box::new(Member::new())),
		});
		reservation.state.members().created += 1;
		reservation.held = false;
		member
	}
}

/// Container state with an occupancy count.
pub(crate) trait Occupied {
	fn used(&mut self) -> &mut usize;
}

/// Container state with an occupancy count and a member pool.
pub(crate) trait Occupancy<'p, T>: Occupied {
	fn members(&mut self) -> &mut Members<'p, T>;
}

/// Returns an occupancy reservation unless disarmed, so a panicking allocation
/// doesn't leak capacity. The lock is held again by the time this drops.
struct Reservation<'g, 'a, S: Occupied> {
	state: &'g mut ConditionalGuard<'a, S>,
	held: bool,
}

impl<S: Occupied> Drop for Reservation<'_, '_, S> {
	fn drop(&mut self) {
		if self.held {
			*self.state.used() -= 1;
			self.state.broadcast();
		}
	}
}

impl<T> Drop for Members<'_, T> {
	fn drop(&mut self) {
		while let Some(member) = self.free.pop() {
			member.object = None;
			if self.heap {
				// Safety: heap members were leaked from a box, and are on no list.
				drop(unsafe { Box::from_raw(member as *mut Member<T>) })
			}
		}
	}
}
