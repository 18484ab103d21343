// SPDX-License-Identifier: Apache-2.0

//! A fixed-capacity ring of fixed-size byte slots.

use std::cell::UnsafeCell;
use std::fmt::{self, Debug, Formatter};
use std::ops::Deref;
use std::{mem, ptr, result, slice};
use all_asserts::{debug_assert_le, debug_assert_lt};
use amplify_derive::Display;
use bytemuck::Pod;
use tracing::trace;
use crate::error;
use crate::monitor::{Conditional, ConditionalGuard, Timeout};
use crate::util::fatal;

pub type Error = error::Error<OperationKind, ErrorKind>;
pub type Result<T = ()> = result::Result<T, Error>;

#[derive(Copy, Clone, Debug, Display, Eq, PartialEq)]
pub enum OperationKind {
	#[display("create ring buffer")]
	Create,
}

impl error::OperationKind for OperationKind { }

#[derive(Copy, Clone, Debug, Display, Eq, PartialEq)]
pub enum ErrorKind {
	#[display("object size and capacity must be non-zero")]
	ZeroSize,
	#[display("ring size overflows")]
	Overflow,
}

impl error::ErrorKind for ErrorKind { }

impl Error {
	/// Creates a new "zero size" error.
	pub const fn zero_size() -> Self { Self::new(OperationKind::Create, ErrorKind::ZeroSize) }

	/// Creates a new overflow error.
	pub const fn overflow() -> Self { Self::new(OperationKind::Create, ErrorKind::Overflow) }
}

struct Ring {
	head: usize,
	tail: usize,
	count: usize,
	/// Set while a [`Slot`] is reading the head.
	reading: bool,
}

/// A ring buffer of `capacity` slots, each `objsize` bytes. Producers copy into
/// the tail slot; consumers read the head slot in place and release it when done.
///
/// The cursors live in one monitor, which is only held for bookkeeping. A
/// [`Slot`] reads the head without the lock: the head is a filled slot and
/// producers only write the tail, which never reaches a filled slot. At most one
/// slot is outstanding at a time.
pub struct Buffer {
	monitor: Conditional<Ring>,
	data: Box<[UnsafeCell<u8>]>,
	objsize: usize,
	capacity: usize,
}

// Safety: slot bytes are written only at the tail, under the monitor, and read
// only at the head while it's filled and claimed by a single slot.
unsafe impl Sync for Buffer { }

impl Debug for Buffer {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Buffer")
			.field("objsize", &self.objsize)
			.field("capacity", &self.capacity)
			.field("count", &self.count())
			.finish()
	}
}

impl Buffer {
	/// Creates a ring of `capacity` slots of `objsize` bytes.
	///
	/// # Panics
	///
	/// Panics if either dimension is zero or the total size overflows.
	pub fn new(objsize: usize, capacity: usize) -> Self {
		fatal!(Self::try_new(objsize, capacity), "invalid ring buffer dimensions")
	}

	/// Creates a ring of `capacity` slots of `objsize` bytes, failing if either is
	/// zero or the total size overflows.
	pub fn try_new(objsize: usize, capacity: usize) -> Result<Self> {
		if objsize == 0 || capacity == 0 {
			return Err(Error::zero_size())
		}

		let size = objsize.checked_mul(capacity).ok_or_else(Error::overflow)?;
		Ok(Self {
			monitor: Conditional::new(Ring {
				head: 0,
				tail: 0,
				count: 0,
				reading: false,
			}),
			data: (0..size).map(|_| UnsafeCell::new(0)).collect(),
			objsize,
			capacity,
		})
	}

	/// Returns the size of each slot in bytes.
	pub fn objsize(&self) -> usize { self.objsize }

	/// Returns the number of slots.
	pub fn capacity(&self) -> usize { self.capacity }

	/// Returns the total size of the ring in bytes.
	pub fn size(&self) -> usize { self.objsize * self.capacity }

	/// Returns the number of filled slots.
	pub fn count(&self) -> usize { self.monitor.lock().count }

	/// Returns `true` if no slots are filled. This is advisory only: another thread
	/// may change the ring immediately after.
	pub fn is_empty(&self) -> bool { self.count() == 0 }

	/// Returns `true` if any slot is filled. Advisory, like [`is_empty`](Self::is_empty).
	pub fn has_data(&self) -> bool { !self.is_empty() }

	/// Waits for the head slot to fill, returning a view of it. Call
	/// [`Slot::release`] after reading to free the slot. Waits while another slot
	/// is outstanding.
	pub fn get(&self, timeout: impl Into<Timeout>) -> Option<Slot<'_>> {
		let mut ring = self.monitor.lock();
		if !ring.wait_while(timeout, |ring| ring.count == 0 || ring.reading) {
			trace!("ring get timed out");
			return None
		}

		ring.reading = true;
		Some(Slot {
			buffer: self,
			index: ring.head,
			advance: false,
		})
	}

	/// Frees the head slot without reading it. Returns `false` if the ring is empty
	/// or the head is being read through a [`Slot`].
	pub fn release(&self) -> bool {
		let mut ring = self.monitor.lock();
		if ring.count == 0 || ring.reading {
			return false
		}
		self.advance_head(&mut ring);
		true
	}

	/// Copies `objsize` bytes from `data` into the tail slot, waiting while the ring
	/// is full. Returns `false` on timeout.
	///
	/// # Panics
	///
	/// Panics if `data` is shorter than a slot.
	pub fn put(&self, data: &[u8], timeout: impl Into<Timeout>) -> bool {
		assert!(
			data.len() >= self.objsize,
			"ring put of {} bytes into a {} byte slot",
			data.len(),
			self.objsize
		);

		let mut ring = self.monitor.lock();
		if !ring.wait_while(timeout, |ring| ring.count == self.capacity) {
			trace!(capacity = self.capacity, "ring put timed out");
			return false
		}

		// Safety: the tail slot is empty, so no slot reads it, and the monitor keeps
		// other producers out.
		unsafe {
			ptr::copy_nonoverlapping(data.as_ptr(), self.slot_ptr(ring.tail), self.objsize);
		}
		ring.tail = (ring.tail + 1) % self.capacity;
		ring.count += 1;
		debug_assert_le!(ring.count, self.capacity);
		ring.broadcast();
		true
	}

	/// Copies the head slot into `out` and releases it. Returns `false` on timeout.
	///
	/// # Panics
	///
	/// Panics if `out` is shorter than a slot.
	pub fn copy(&self, out: &mut [u8], timeout: impl Into<Timeout>) -> bool {
		assert!(
			out.len() >= self.objsize,
			"ring copy of a {} byte slot into {} bytes",
			self.objsize,
			out.len()
		);

		let Some(slot) = self.get(timeout) else { return false };
		out[..self.objsize].copy_from_slice(&slot);
		slot.release();
		true
	}

	/// Puts the bytes of `value` into the tail slot.
	///
	/// # Panics
	///
	/// Panics if `T` isn't exactly one slot in size.
	pub fn put_value<T: Pod>(&self, value: &T, timeout: impl Into<Timeout>) -> bool {
		assert_eq!(mem::size_of::<T>(), self.objsize, "value size must match the slot size");
		self.put(bytemuck::bytes_of(value), timeout)
	}

	/// Reads a value from the head slot and releases it.
	///
	/// # Panics
	///
	/// Panics if `T` isn't exactly one slot in size.
	pub fn get_value<T: Pod>(&self, timeout: impl Into<Timeout>) -> Option<T> {
		assert_eq!(mem::size_of::<T>(), self.objsize, "value size must match the slot size");
		let slot = self.get(timeout)?;
		let value = bytemuck::pod_read_unaligned(&slot);
		slot.release();
		Some(value)
	}

	fn slot_ptr(&self, index: usize) -> *mut u8 {
		debug_assert_lt!(index, self.capacity);
		// Safety: the offset is within the data, which has `capacity` slots.
		unsafe { UnsafeCell::raw_get(self.data.as_ptr().add(index * self.objsize)) }
	}

	fn advance_head(&self, ring: &mut ConditionalGuard<'_, Ring>) {
		ring.head = (ring.head + 1) % self.capacity;
		ring.count -= 1;
		ring.broadcast();
	}
}

/// The filled head slot of a [`Buffer`], readable in place. Producers keep
/// filling other slots while it's held. Dropping it without releasing leaves
/// the data in place for the next reader.
pub struct Slot<'a> {
	buffer: &'a Buffer,
	index: usize,
	advance: bool,
}

impl Slot<'_> {
	/// Frees the slot, advancing the head.
	pub fn release(mut self) {
		self.advance = true;
	}
}

impl Deref for Slot<'_> {
	type Target = [u8];

	fn deref(&self) -> &[u8] {
		// Safety: the slot is filled and claimed by this view until it drops.
		unsafe { slice::from_raw_parts(self.buffer.slot_ptr(self.index), self.buffer.objsize) }
	}
}

impl Debug for Slot<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Slot")
			.field(&self.deref())
			.finish()
	}
}

impl Drop for Slot<'_> {
	fn drop(&mut self) {
		let mut ring = self.buffer.monitor.lock();
		ring.reading = false;
		if self.advance {
			self.buffer.advance_head(&mut ring);
		} else {
			ring.broadcast();
		}
	}
}
