// SPDX-License-Identifier: Apache-2.0

use cfg_if::cfg_if;
use once_cell::sync::Lazy;
use crate::util::{align_up, ALIGN};

static SYSTEM_PAGE_SIZE: Lazy<usize> = Lazy::new(system_page_size);

cfg_if! {
	if #[cfg(unix)] {
		fn system_page_size() -> usize {
			// Safety: sysconf has no preconditions.
			let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
			if size > 0 { size as usize } else { 4096 }
		}
	} else {
		fn system_page_size() -> usize { 4096 }
	}
}

/// Returns the size of a memory page on this system, queried once per process.
pub fn page_size() -> usize { *SYSTEM_PAGE_SIZE }

/// Options for sizing an arena.
///
/// # Page size
///
/// The size of each page in bytes. Defaults to `0`, selecting the system page size.
/// Other values are rounded up to a multiple of the pointer size. No single
/// allocation can exceed the page size.
///
/// # Limit
///
/// The maximum number of pages the arena may create. Defaults to `0`, meaning no
/// limit. Once the limit is reached, allocations that need a new page fail rather
/// than growing the arena; long-lived servers use this to bound memory use.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct PagerOptions {
	pub page_size: usize,
	pub limit: usize,
}

impl PagerOptions {
	/// Creates a new set of pager options.
	pub const fn new() -> Self {
		Self {
			page_size: 0,
			limit: 0,
		}
	}

	/// Returns the configured page size, `0` meaning the system page size.
	#[inline]
	pub const fn page_size(&self) -> usize { self.page_size }

	/// Returns the page limit, `0` meaning unlimited.
	#[inline]
	pub const fn limit(&self) -> usize { self.limit }

	/// Returns the page size pages are actually created with.
	pub fn effective_page_size(&self) -> usize {
		match self.page_size {
			0 => page_size(),
			size => align_up(size, ALIGN),
		}
	}

	/// Sets the page size.
	#[inline]
	pub fn set_page_size(&mut self, value: usize) {
		self.page_size = value;
	}

	/// Sets the page limit.
	#[inline]
	pub fn set_limit(&mut self, value: usize) {
		self.limit = value;
	}

	/// Sets the page size.
	#[inline]
	pub const fn with_page_size(mut self, value: usize) -> Self {
		self.page_size = value;
		self
	}

	/// Sets the page limit.
	#[inline]
	pub const fn with_limit(mut self, value: usize) -> Self {
		self.limit = value;
		self
	}
}
