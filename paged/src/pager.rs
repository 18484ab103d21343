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

//! Arena allocators serving storage from a chain of fixed-size pages.

mod options;
pub mod string;

pub use options::*;

use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::cell::RefCell;
use std::ptr::NonNull;
use std::{fmt, ptr, result, slice, str};
use std::fmt::{Debug, Formatter};
use all_asserts::debug_assert_le;
use amplify_derive::Display;
use parking_lot::Mutex;
use tracing::debug;
use crate::error;
use crate::util::{align_up, fatal, ALIGN};

/// The alignment of every page. Allocations may request any alignment up to this.
pub const PAGE_ALIGN: usize = 16;

pub type Error = error::Error<OperationKind, ErrorKind>;
pub type Result<T = ()> = result::Result<T, Error>;

#[derive(Copy, Clone, Debug, Display, Eq, PartialEq)]
pub enum OperationKind {
	#[display("allocate from arena")]
	Alloc,
	#[display("create arena page")]
	Page,
}

impl error::OperationKind for OperationKind { }

#[derive(Copy, Clone, Debug, Display, Eq, PartialEq)]
pub enum ErrorKind {
	#[display("allocation larger than the page size")]
	TooLarge,
	#[display("alignment exceeds the page alignment")]
	Alignment,
	#[display("page limit reached")]
	PageLimit,
}

impl error::ErrorKind for ErrorKind { }

impl Error {
	/// Creates a new "too large" error.
	pub const fn too_large() -> Self { Self::new(OperationKind::Alloc, ErrorKind::TooLarge) }

	/// Creates a new alignment error.
	pub const fn alignment() -> Self { Self::new(OperationKind::Alloc, ErrorKind::Alignment) }

	/// Creates a new "page limit reached" error.
	pub const fn page_limit() -> Self { Self::new(OperationKind::Page, ErrorKind::PageLimit) }
}

/// A snapshot of arena usage.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PagerStats {
	/// The number of pages created.
	pub pages: usize,
	/// The size of each page in bytes.
	pub page_size: usize,
	/// The page limit, `0` meaning unlimited.
	pub limit: usize,
	/// The number of bytes carved out of all pages, including alignment padding.
	pub used: usize,
	/// The number of allocations served.
	pub allocations: usize,
}

impl PagerStats {
	/// Returns the total number of bytes held in pages.
	pub fn capacity(&self) -> usize { self.pages * self.page_size }

	/// Returns the percentage of page memory in use, from `[0,100]`.
	pub fn utilization(&self) -> u8 {
		match self.capacity() {
			0 => 0,
			capacity => (self.used * 100 / capacity) as u8
		}
	}
}

/// An arena: storage is carved from pages and never freed individually, only all
/// at once when the arena is purged or dropped. Values moved into the arena are
/// never dropped.
///
/// # Safety
///
/// Implementors must return memory that is valid for `layout`, stays valid and in
/// place for as long as the arena is borrowed, and never overlaps memory returned
/// by any other allocation.
pub unsafe trait Arena {
	/// Allocates memory for `layout`.
	fn try_alloc_layout(&self, layout: Layout) -> Result<NonNull<u8>>;

	/// Returns a snapshot of arena usage.
	fn stats(&self) -> PagerStats;

	/// Allocates memory for `layout`, panicking on failure.
	fn alloc_layout(&self, layout: Layout) -> NonNull<u8> {
		fatal!(self.try_alloc_layout(layout), "arena allocation of {} bytes failed", layout.size())
	}

	/// Allocates `size` zeroed bytes.
	#[allow(clippy::mut_from_ref)]
	fn try_alloc(&self, size: usize) -> Result<&mut [u8]> {
		let layout = Layout::from_size_align(size, 1).map_err(|_| Error::too_large())?;
		let ptr = self.try_alloc_layout(layout)?.as_ptr();
		// Safety: the memory is valid for `size` bytes and not aliased.
		unsafe {
			ptr::write_bytes(ptr, 0, size);
			Ok(slice::from_raw_parts_mut(ptr, size))
		}
	}

	/// Allocates `size` zeroed bytes, panicking on failure.
	#[allow(clippy::mut_from_ref)]
	fn alloc(&self, size: usize) -> &mut [u8] {
		fatal!(self.try_alloc(size), "arena allocation of {size} bytes failed")
	}

	/// Moves `value` into the arena. The value will not be dropped.
	#[allow(clippy::mut_from_ref)]
	fn alloc_value<T>(&self, value: T) -> &mut T {
		let ptr = self.alloc_layout(Layout::new::<T>()).cast::<T>().as_ptr();
		// Safety: the memory is valid and aligned for `T`, and not aliased.
		unsafe {
			ptr.write(value);
			&mut *ptr
		}
	}

	/// Copies a string into the arena.
	fn dup(&self, value: &str) -> &str {
		let bytes = self.alloc(value.len());
		bytes.copy_from_slice(value.as_bytes());
		// Safety: the bytes were copied from a valid string.
		unsafe { str::from_utf8_unchecked(bytes) }
	}

	/// Returns the percentage of page memory in use, from `[0,100]`.
	fn utilization(&self) -> u8 { self.stats().utilization() }
}

struct Page {
	base: NonNull<u8>,
	used: usize,
}

/// The page chain shared by both arena types.
pub(crate) struct Pages {
	size: usize,
	limit: usize,
	chain: Vec<Page>,
	allocations: usize,
}

// Safety: pages are plain memory owned by the chain.
unsafe impl Send for Pages { }

impl Pages {
	fn new(options: PagerOptions) -> Self {
		Self {
			size: options.effective_page_size(),
			limit: options.limit(),
			chain: Vec::new(),
			allocations: 0,
		}
	}

	fn layout(&self) -> Layout {
		fatal!(
			Layout::from_size_align(self.size, PAGE_ALIGN),
			"invalid page size {}",
			self.size
		)
	}

	fn alloc(&mut self, layout: Layout) -> Result<NonNull<u8>> {
		if layout.align() > PAGE_ALIGN {
			return Err(Error::alignment())
		}

		let size = align_up(layout.size().max(1), ALIGN);
		if size > self.size {
			return Err(Error::too_large())
		}

		let page_size = self.size;
		let found = self.chain
			.iter()
			.enumerate()
			.rev()
			.find_map(|(index, page)| {
				let start = align_up(page.used, layout.align());
				(start + size <= page_size).then_some((index, start))
			});
		let (index, start) = match found {
			Some(found) => found,
			None => (self.pager()?, 0)
		};

		let page = &mut self.chain[index];
		page.used = start + size;
		debug_assert_le!(page.used, page_size);
		self.allocations += 1;
		// Safety: `start` is within the page.
		Ok(unsafe { NonNull::new_unchecked(page.base.as_ptr().add(start)) })
	}

	/// Creates a new page at the end of the chain, returning its index.
	fn pager(&mut self) -> Result<usize> {
		if self.limit > 0 && self.chain.len() >= self.limit {
			return Err(Error::page_limit())
		}

		let layout = self.layout();
		// Safety: the layout has a non-zero size.
		let base = unsafe { alloc(layout) };
		let Some(base) = NonNull::new(base) else {
			handle_alloc_error(layout)
		};

		let index = self.chain.len();
		self.chain.push(Page { base, used: 0 });
		debug!(page_size = self.size, pages = index + 1, "created arena page");
		Ok(index)
	}

	fn purge(&mut self) {
		let layout = self.layout();
		let count = self.chain.len();
		for Page { base, .. } in self.chain.drain(..) {
			// Safety: every page was allocated with this layout.
			unsafe { dealloc(base.as_ptr(), layout) }
		}
		self.allocations = 0;
		if count > 0 {
			debug!(pages = count, "purged arena");
		}
	}

	fn stats(&self) -> PagerStats {
		PagerStats {
			pages: self.chain.len(),
			page_size: self.size,
			limit: self.limit,
			used: self.chain.iter().map(|page| page.used).sum(),
			allocations: self.allocations,
		}
	}
}

impl Drop for Pages {
	fn drop(&mut self) { self.purge() }
}

/// A single-threaded arena.
pub struct MemAlloc(RefCell<Pages>);

impl Default for MemAlloc {
	fn default() -> Self { Self::new(PagerOptions::default()) }
}

impl From<PagerOptions> for MemAlloc {
	fn from(options: PagerOptions) -> Self { Self::new(options) }
}

impl Debug for MemAlloc {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("MemAlloc")
			.field(&self.stats())
			.finish()
	}
}

impl MemAlloc {
	/// Creates a new, empty arena. Pages are created on demand.
	pub fn new(options: PagerOptions) -> Self {
		Self(RefCell::new(Pages::new(options)))
	}

	/// Creates a new arena with pages of `size` bytes.
	pub fn with_page_size(size: usize) -> Self {
		Self::new(PagerOptions::new().with_page_size(size))
	}

	/// Frees every page. Exclusive access guarantees no allocation is still in use.
	pub fn purge(&mut self) { self.0.get_mut().purge() }

	/// Returns the page size.
	pub fn page_size(&self) -> usize { self.0.borrow().size }

	/// Returns the page limit, `0` meaning unlimited.
	pub fn limit(&self) -> usize { self.0.borrow().limit }

	/// Returns the number of pages created.
	pub fn pages(&self) -> usize { self.0.borrow().chain.len() }
}

unsafe impl Arena for MemAlloc {
	fn try_alloc_layout(&self, layout: Layout) -> Result<NonNull<u8>> {
		self.0.borrow_mut().alloc(layout)
	}

	fn stats(&self) -> PagerStats { self.0.borrow().stats() }
}

/// A thread-safe arena. Every allocation is serialized by an internal lock, so one
/// pager can be shared by many containers.
pub struct MemPager(Mutex<Pages>);

impl Default for MemPager {
	fn default() -> Self { Self::new(PagerOptions::default()) }
}

impl From<PagerOptions> for MemPager {
	fn from(options: PagerOptions) -> Self { Self::new(options) }
}

impl Debug for MemPager {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("MemPager")
			.field(&self.stats())
			.finish()
	}
}

impl MemPager {
	/// Creates a new, empty arena. Pages are created on demand.
	pub fn new(options: PagerOptions) -> Self {
		Self(Mutex::new(Pages::new(options)))
	}

	/// Creates a new arena with pages of `size` bytes.
	pub fn with_page_size(size: usize) -> Self {
		Self::new(PagerOptions::new().with_page_size(size))
	}

	/// Frees every page. Exclusive access guarantees no allocation is still in use.
	pub fn purge(&mut self) { self.0.get_mut().purge() }

	/// Returns the page size.
	pub fn page_size(&self) -> usize { self.0.lock().size }

	/// Returns the page limit, `0` meaning unlimited.
	pub fn limit(&self) -> usize { self.0.lock().limit }

	/// Returns the number of pages created.
	pub fn pages(&self) -> usize { self.0.lock().chain.len() }
}

unsafe impl Arena for MemPager {
	fn try_alloc_layout(&self, layout: Layout) -> Result<NonNull<u8>> {
		self.0.lock().alloc(layout)
	}

	fn stats(&self) -> PagerStats { self.0.lock().stats() }
}
