// Copyright 2023 Strixpyrr
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Intrusive singly-linked lists. Nodes embed their own [`Link`]; an index holds
//! only the chain's end pointers and owns the nodes enlisted on it through an
//! [`Owner`] pointer. A node is on at most one index at a time, since enlisting
//! consumes its owner.

mod named;
mod ordered;

pub use named::*;
pub use ordered::*;

use std::fmt::{self, Debug, Formatter};
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

/// The "next" slot embedded in a list node.
pub struct Link<N> {
	next: Option<NonNull<N>>,
}

// Safety: a link is only followed by the index owning the node.
unsafe impl<N: Send> Send for Link<N> { }
unsafe impl<N: Sync> Sync for Link<N> { }

impl<N> Link<N> {
	/// Creates an unlinked slot.
	pub const fn new() -> Self { Self { next: None } }
}

impl<N> Default for Link<N> {
	fn default() -> Self { Self::new() }
}

impl<N> Debug for Link<N> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Link")
			.field("next", &self.next)
			.finish()
	}
}

/// A type which can be enlisted on an index.
///
/// # Safety
///
/// Both methods must return the same embedded link every time, and nothing else
/// may modify it.
pub unsafe trait Linked: Sized {
	fn link(&self) -> &Link<Self>;
	fn link_mut(&mut self) -> &mut Link<Self>;
}

/// An owning pointer to a node, transferred to an index on enlist and back on
/// removal. Dropping the owner releases the node.
///
/// # Safety
///
/// `from_raw` must accept any pointer returned by `into_raw`, which must point to
/// a live node that stays in place until reconstructed.
pub unsafe trait Owner<N>: Sized {
	fn into_raw(self) -> NonNull<N>;

	/// # Safety
	///
	/// `ptr` must have come from [`Owner::into_raw`] on the same pointer type.
	unsafe fn from_raw(ptr: NonNull<N>) -> Self;
}

unsafe impl<N> Owner<N> for Box<N> {
	fn into_raw(self) -> NonNull<N> { NonNull::from(Box::leak(self)) }

	unsafe fn from_raw(ptr: NonNull<N>) -> Self { Box::from_raw(ptr.as_ptr()) }
}

/// Arena-allocated nodes, which are never freed individually.
unsafe impl<N> Owner<N> for &mut N {
	fn into_raw(self) -> NonNull<N> { NonNull::from(self) }

	unsafe fn from_raw(mut ptr: NonNull<N>) -> Self { ptr.as_mut() }
}

/// Nodes whose storage is managed by whatever owns the index.
unsafe impl<N> Owner<N> for NonNull<N> {
	fn into_raw(self) -> NonNull<N> { self }

	unsafe fn from_raw(ptr: NonNull<N>) -> Self { ptr }
}

#[inline]
unsafe fn next_of<N: Linked>(ptr: NonNull<N>) -> Option<NonNull<N>> {
	ptr.as_ref().link().next
}

#[inline]
unsafe fn set_next<N: Linked>(mut ptr: NonNull<N>, next: Option<NonNull<N>>) {
	ptr.as_mut().link_mut().next = next;
}

/// A singly-linked chain with a root pointer. Nodes are enlisted at the head, so
/// iteration runs in reverse insertion order.
pub struct LinkedIndex<N: Linked, P: Owner<N> = Box<N>> {
	root: Option<NonNull<N>>,
	_owner: PhantomData<P>,
}

unsafe impl<N: Linked + Send, P: Owner<N> + Send> Send for LinkedIndex<N, P> { }
unsafe impl<N: Linked + Sync, P: Owner<N> + Sync> Sync for LinkedIndex<N, P> { }

impl<N: Linked, P: Owner<N>> Default for LinkedIndex<N, P> {
	fn default() -> Self { Self::new() }
}

impl<N: Linked + Debug, P: Owner<N>> Debug for LinkedIndex<N, P> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.iter()).finish()
	}
}

impl<N: Linked, P: Owner<N>> LinkedIndex<N, P> {
	/// Creates an empty index.
	pub const fn new() -> Self {
		Self {
			root: None,
			_owner: PhantomData,
		}
	}

	/// Returns `true` if no nodes are enlisted.
	pub fn is_empty(&self) -> bool { self.root.is_none() }

	/// Counts the enlisted nodes.
	pub fn len(&self) -> usize { self.iter().count() }

	/// Returns the head node.
	pub fn front(&self) -> Option<&N> {
		// Safety: enlisted nodes are live while the index is borrowed.
		self.root.map(|ptr| unsafe { &*ptr.as_ptr() })
	}

	/// Pushes `node` to the head.
	pub fn enlist(&mut self, node: P) {
		let ptr = node.into_raw();
		unsafe { set_next(ptr, self.root) }
		self.root = Some(ptr);
	}

	/// Removes the head node.
	pub fn pop(&mut self) -> Option<P> {
		let ptr = self.root?;
		unsafe {
			self.root = next_of(ptr);
			set_next(ptr, None);
			Some(P::from_raw(ptr))
		}
	}

	/// Removes `node` if it's enlisted here. The index is scanned by identity.
	pub fn delist(&mut self, node: &N) -> Option<P> {
		self.remove_where(|other| ptr::eq(other, node))
	}

	/// Removes the first node matching `predicate`.
	pub fn remove_where(&mut self, mut predicate: impl FnMut(&N) -> bool) -> Option<P> {
		let mut prev: Option<NonNull<N>> = None;
		let mut cur = self.root;
		while let Some(ptr) = cur {
			let next = unsafe { next_of(ptr) };
			if predicate(unsafe { ptr.as_ref() }) {
				match prev {
					Some(prev) => unsafe { set_next(prev, next) },
					None => self.root = next
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

	/// Returns `true` if `node` is enlisted here.
	pub fn is_member(&self, node: &N) -> bool {
		self.iter().any(|other| ptr::eq(other, node))
	}

	/// Returns the first node matching `predicate`, mutably.
	pub fn find_mut(&mut self, mut predicate: impl FnMut(&N) -> bool) -> Option<&mut N> {
		let mut cur = self.root;
		while let Some(mut ptr) = cur {
			if predicate(unsafe { ptr.as_ref() }) {
				return Some(unsafe { ptr.as_mut() })
			}
			cur = unsafe { next_of(ptr) };
		}
		None
	}

	/// Iterates over enlisted nodes from the head.
	pub fn iter(&self) -> Iter<'_, N> {
		Iter::new(self.root)
	}

	/// Releases every node, leaving the index empty.
	pub fn purge(&mut self) {
		while let Some(node) = self.pop() {
			drop(node)
		}
	}
}

impl<N: Linked, P: Owner<N>> Drop for LinkedIndex<N, P> {
	fn drop(&mut self) { self.purge() }
}

impl<'a, N: Linked, P: Owner<N>> IntoIterator for &'a LinkedIndex<N, P> {
	type Item = &'a N;
	type IntoIter = Iter<'a, N>;

	fn into_iter(self) -> Iter<'a, N> { self.iter() }
}

/// An iterator over the nodes of an index.
pub struct Iter<'a, N: Linked> {
	next: Option<NonNull<N>>,
	_index: PhantomData<&'a N>,
}

impl<N: Linked> Iter<'_, N> {
	fn new(next: Option<NonNull<N>>) -> Self {
		Self {
			next,
			_index: PhantomData,
		}
	}
}

impl<'a, N: Linked> Iterator for Iter<'a, N> {
	type Item = &'a N;

	fn next(&mut self) -> Option<&'a N> {
		let ptr = self.next?;
		// Safety: the index is borrowed for 'a, keeping its nodes alive.
		unsafe {
			self.next = next_of(ptr);
			Some(&*ptr.as_ptr())
		}
	}
}
