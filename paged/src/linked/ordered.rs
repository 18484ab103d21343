// SPDX-License-Identifier: Apache-2.0

use std::fmt::{self, Debug, Formatter};
use std::marker::PhantomData;
use std::ptr::{self, NonNull};
use parking_lot::{Mutex, MutexGuard};
use super::{next_of, set_next, Iter, Linked, Owner};

/// A singly-linked chain with head and tail pointers, kept in insertion order.
/// Appending and popping from the front are constant-time; popping from the back
/// walks the chain.
pub struct OrderedIndex<N: Linked, P: Owner<N> = Box<N>> {
	head: Option<NonNull<N>>,
	tail: Option<NonNull<N>>,
	_owner: PhantomData<P>,
}

unsafe impl<N: Linked + Send, P: Owner<N> + Send> Send for OrderedIndex<N, P> { }
unsafe impl<N: Linked + Sync, P: Owner<N> + Sync> Sync for OrderedIndex<N, P> { }

impl<N: Linked, P: Owner<N>> Default for OrderedIndex<N, P> {
	fn default() -> Self { Self::new() }
}

impl<N: Linked + Debug, P: Owner<N>> Debug for OrderedIndex<N, P> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.iter()).finish()
	}
}

impl<N: Linked, P: Owner<N>> OrderedIndex<N, P> {
	/// Creates an empty index.
	pub const fn new() -> Self {
		Self {
			head: None,
			tail: None,
			_owner: PhantomData,
		}
	}

	pub fn is_empty(&self) -> bool { self.head.is_none() }

	/// Counts the enlisted nodes.
	pub fn len(&self) -> usize { self.iter().count() }

	pub fn front(&self) -> Option<&N> {
		self.head.map(|ptr| unsafe { &*ptr.as_ptr() })
	}

	pub fn back(&self) -> Option<&N> {
		self.tail.map(|ptr| unsafe { &*ptr.as_ptr() })
	}

	/// Returns the node at `index` from the front.
	pub fn get(&self, index: usize) -> Option<&N> {
		self.iter().nth(index)
	}

	/// Returns the node at `index` from the front, mutably.
	pub fn get_mut(&mut self, index: usize) -> Option<&mut N> {
		let mut cur = self.head;
		for _ in 0..index {
			cur = unsafe { next_of(cur?) };
		}
		cur.map(|mut ptr| unsafe { ptr.as_mut() })
	}

	/// Appends `node` at the tail.
	pub fn add(&mut self, node: P) {
		let ptr = node.into_raw();
		unsafe { set_next(ptr, None) }
		match self.tail {
			Some(tail) => unsafe { set_next(tail, Some(ptr)) },
			None => self.head = Some(ptr)
		}
		self.tail = Some(ptr);
	}

	/// Prepends `node` at the head.
	pub fn push_front(&mut self, node: P) {
		let ptr = node.into_raw();
		unsafe { set_next(ptr, self.head) }
		self.head = Some(ptr);
		if self.tail.is_none() {
			self.tail = Some(ptr);
		}
	}

	/// Removes the head node.
	pub fn pop_front(&mut self) -> Option<P> {
		let ptr = self.head?;
		unsafe {
			self.head = next_of(ptr);
			if self.head.is_none() {
				self.tail = None;
			}
			set_next(ptr, None);
			Some(P::from_raw(ptr))
		}
	}

	/// Removes the tail node.
	pub fn pop_back(&mut self) -> Option<P> {
		let tail = self.tail?;
		self.remove_where(|node| ptr::eq(node, tail.as_ptr()))
	}

	/// Removes `node` if it's enlisted here.
	pub fn delist(&mut self, node: &N) -> Option<P> {
		self.remove_where(|other| ptr::eq(other, node))
	}

	/// Removes the first node matching `predicate`, keeping the tail pointer
	/// consistent.
	pub fn remove_where(&mut self, mut predicate: impl FnMut(&N) -> bool) -> Option<P> {
		let mut prev: Option<NonNull<N>> = None;
		let mut cur = self.head;
		while let Some(ptr) = cur {
			let next = unsafe { next_of(ptr) };
			if predicate(unsafe { ptr.as_ref() }) {
				match prev {
					Some(prev) => unsafe { set_next(prev, next) },
					None => self.head = next
				}

				if self.tail == Some(ptr) {
					self.tail = prev;
				}

				unsafe {
					set_next(ptr, None);
					return Some(P::from_raw(ptr))
				}
			}
			prev = cur;
			cur = next;
		}
		None
	}

	pub fn is_member(&self, node: &N) -> bool {
		self.iter().any(|other| ptr::eq(other, node))
	}

	/// Returns the first node matching `predicate`, mutably.
	pub fn find_mut(&mut self, mut predicate: impl FnMut(&N) -> bool) -> Option<&mut N> {
		let mut cur = self.head;
		while let Some(mut ptr) = cur {
			if predicate(unsafe { ptr.as_ref() }) {
				return Some(unsafe { ptr.as_mut() })
			}
			cur = unsafe { next_of(ptr) };
		}
		None
	}

	/// Iterates from the head.
	pub fn iter(&self) -> Iter<'_, N> {
		Iter::new(self.head)
	}

	/// Releases every node, leaving the index empty.
	pub fn purge(&mut self) {
		while let Some(node) = self.pop_front() {
			drop(node)
		}
	}
}

impl<N: Linked, P: Owner<N>> Drop for OrderedIndex<N, P> {
	fn drop(&mut self) { self.purge() }
}

impl<'a, N: Linked, P: Owner<N>> IntoIterator for &'a OrderedIndex<N, P> {
	type Item = &'a N;
	type IntoIter = Iter<'a, N>;

	fn into_iter(self) -> Iter<'a, N> { self.iter() }
}

/// An [`OrderedIndex`] behind a lock, for sharing between threads.
pub struct LockedIndex<N: Linked, P: Owner<N> = Box<N>> {
	index: Mutex<OrderedIndex<N, P>>,
}

impl<N: Linked, P: Owner<N>> Default for LockedIndex<N, P> {
	fn default() -> Self { Self::new() }
}

impl<N: Linked + Debug, P: Owner<N>> Debug for LockedIndex<N, P> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("LockedIndex")
			.field("index", &self.index)
			.finish()
	}
}

impl<N: Linked, P: Owner<N>> LockedIndex<N, P> {
	pub const fn new() -> Self {
		Self { index: Mutex::new(OrderedIndex::new()) }
	}

	/// Locks the index for a compound operation.
	pub fn lock(&self) -> MutexGuard<'_, OrderedIndex<N, P>> {
		self.index.lock()
	}

	pub fn add(&self, node: P) { self.lock().add(node) }

	pub fn push_front(&self, node: P) { self.lock().push_front(node) }

	pub fn pop_front(&self) -> Option<P> { self.lock().pop_front() }

	pub fn pop_back(&self) -> Option<P> { self.lock().pop_back() }

	pub fn remove_where(&self, predicate: impl FnMut(&N) -> bool) -> Option<P> {
		self.lock().remove_where(predicate)
	}

	pub fn len(&self) -> usize { self.lock().len() }

	pub fn is_empty(&self) -> bool { self.lock().is_empty() }

	pub fn purge(&self) { self.lock().purge() }

	/// Consumes the lock, returning the index.
	pub fn into_inner(self) -> OrderedIndex<N, P> { self.index.into_inner() }
}

#[cfg(test)]
mod test {
	use crate::linked::{Link, Linked};
	use super::OrderedIndex;

	#[derive(Default)]
	struct Node {
		link: Link<Node>,
		value: u32,
	}

	unsafe impl Linked for Node {
		fn link(&self) -> &Link<Self> { &self.link }
		fn link_mut(&mut self) -> &mut Link<Self> { &mut self.link }
	}

	fn filled(count: u32) -> OrderedIndex<Node> {
		let mut index = OrderedIndex::new();
		for value in 0..count {
			index.add(Box::new(Node { value, ..Node::default() }));
		}
		index
	}

	#[test]
	fn tail_follows_removal() {
		let mut index = filled(3);
		assert_eq!(index.pop_back().map(|node| node.value), Some(2));
		assert_eq!(index.back().map(|node| node.value), Some(1));
		index.add(Box::new(Node { value: 9, ..Node::default() }));
		assert_eq!(index.iter().map(|node| node.value).collect::<Vec<_>>(), [0, 1, 9]);
	}

	#[test]
	fn single_node() {
		let mut index = filled(1);
		assert!(index.pop_back().is_some());
		assert!(index.front().is_none());
		assert!(index.back().is_none());
		assert!(index.pop_front().is_none());
	}
}
