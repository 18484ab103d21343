// SPDX-License-Identifier: Apache-2.0

//! The monitor primitive: a mutex and a condition variable, always used together.

use std::fmt::{self, Debug, Formatter};
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};
use parking_lot::{Condvar, Mutex, MutexGuard};

/// How long a blocking operation may wait.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Timeout {
	/// Try once, never block.
	Immediate,
	/// Block for at most this long.
	After(Duration),
	/// Block until woken.
	#[default]
	Infinite,
}

impl Timeout {
	/// Blocks forever.
	pub const INF: Self = Self::Infinite;

	/// Creates a timeout of `millis` milliseconds, where zero means not to block.
	pub const fn from_millis(millis: u64) -> Self {
		if millis == 0 {
			Self::Immediate
		} else {
			Self::After(Duration::from_millis(millis))
		}
	}

	/// Returns `true` if the timeout never blocks.
	pub fn is_immediate(&self) -> bool {
		matches!(self, Self::Immediate) ||
		matches!(self, Self::After(duration) if duration.is_zero())
	}

	/// Returns `true` if the timeout never expires.
	pub fn is_infinite(&self) -> bool {
		matches!(self, Self::Infinite)
	}

	/// Computes the absolute deadline from now. Blocking loops compute this once
	/// and wait on the same deadline after every wakeup.
	pub(crate) fn deadline(self) -> Deadline {
		match self {
			_ if self.is_immediate() => Deadline::Expired,
			Self::After(duration) =>
				Instant::now()
					.checked_add(duration)
					.map_or(Deadline::Never, Deadline::At),
			_ => Deadline::Never,
		}
	}
}

impl From<Duration> for Timeout {
	fn from(value: Duration) -> Self {
		if value.is_zero() {
			Self::Immediate
		} else {
			Self::After(value)
		}
	}
}

impl From<Option<Duration>> for Timeout {
	/// Converts from an optional duration, where `None` blocks forever.
	fn from(value: Option<Duration>) -> Self {
		value.map_or(Self::Infinite, Into::into)
	}
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Deadline {
	Expired,
	At(Instant),
	Never,
}

/// A monitor guarding state `S` with a mutex and a condition variable.
#[derive(Default)]
pub struct Conditional<S> {
	state: Mutex<S>,
	cond: Condvar,
}

impl<S: Debug> Debug for Conditional<S> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Conditional")
			.field("state", &self.state)
			.finish_non_exhaustive()
	}
}

impl<S> Conditional<S> {
	/// Creates a new monitor around `state`.
	pub const fn new(state: S) -> Self {
		Self {
			state: Mutex::new(state),
			cond: Condvar::new(),
		}
	}

	/// Enters the critical section. The lock is released when the guard drops.
	pub fn lock(&self) -> ConditionalGuard<'_, S> {
		ConditionalGuard {
			guard: self.state.lock(),
			cond: &self.cond,
		}
	}

	/// Enters the critical section if the lock is free.
	pub fn try_lock(&self) -> Option<ConditionalGuard<'_, S>> {
		self.state.try_lock().map(|guard|
			ConditionalGuard {
				guard,
				cond: &self.cond,
			}
		)
	}

	/// Wakes one waiter. Prefer [`ConditionalGuard::signal`], which signals while
	/// holding the lock.
	pub fn signal(&self) {
		self.cond.notify_one();
	}

	/// Wakes all waiters.
	pub fn broadcast(&self) {
		self.cond.notify_all();
	}

	/// Returns the guarded state without locking.
	pub fn get_mut(&mut self) -> &mut S {
		self.state.get_mut()
	}

	/// Consumes the monitor, returning its state.
	pub fn into_inner(self) -> S {
		self.state.into_inner()
	}
}

/// A locked [`Conditional`]. Dereferences to the guarded state.
pub struct ConditionalGuard<'a, S> {
	guard: MutexGuard<'a, S>,
	cond: &'a Condvar,
}

impl<S> Deref for ConditionalGuard<'_, S> {
	type Target = S;

	fn deref(&self) -> &S { &self.guard }
}

impl<S> DerefMut for ConditionalGuard<'_, S> {
	fn deref_mut(&mut self) -> &mut S { &mut self.guard }
}

impl<S> ConditionalGuard<'_, S> {
	/// Blocks until signalled, releasing the lock while waiting and re-acquiring
	/// it before returning.
	pub fn wait(&mut self) {
		self.cond.wait(&mut self.guard);
	}

	/// Blocks until signalled or until `deadline` passes. Returns `false` on
	/// timeout.
	pub fn wait_until(&mut self, deadline: Instant) -> bool {
		!self.cond.wait_until(&mut self.guard, deadline).timed_out()
	}

	/// Blocks until signalled or until `timeout` expires. Returns `false` on
	/// timeout; an immediate timeout returns `false` without waiting.
	pub fn wait_for(&mut self, timeout: impl Into<Timeout>) -> bool {
		self.wait_deadline(timeout.into().deadline())
	}

	/// Blocks while `blocked` returns `true` for the guarded state, up to `timeout`.
	/// The deadline is computed once, so spurious wakeups don't extend the wait.
	/// Returns `true` if the condition cleared, `false` if the wait timed out with
	/// the condition still holding.
	pub fn wait_while(
		&mut self,
		timeout: impl Into<Timeout>,
		mut blocked: impl FnMut(&S) -> bool
	) -> bool {
		let deadline = timeout.into().deadline();
		while blocked(&*self.guard) {
			if !self.wait_deadline(deadline) {
				return !blocked(&*self.guard)
			}
		}
		true
	}

	/// Wakes one waiter.
	pub fn signal(&self) {
		self.cond.notify_one();
	}

	/// Wakes all waiters.
	pub fn broadcast(&self) {
		self.cond.notify_all();
	}

	/// Releases the lock while running `f`, re-acquiring it afterward.
	pub fn unlocked<R>(&mut self, f: impl FnOnce() -> R) -> R {
		MutexGuard::unlocked(&mut self.guard, f)
	}

	fn wait_deadline(&mut self, deadline: Deadline) -> bool {
		match deadline {
			Deadline::Expired => false,
			Deadline::At(instant) => self.wait_until(instant),
			Deadline::Never => {
				self.wait();
				true
			}
		}
	}
}
