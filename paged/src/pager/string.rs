// SPDX-License-Identifier: Apache-2.0

//! An ordered list of strings whose text and list nodes all live in one arena.

use std::fmt::{self, Debug, Formatter};
use std::ptr::NonNull;
use itertools::Itertools;
use super::{Arena, MemAlloc, PagerOptions, PagerStats};
use crate::linked::{Link, Linked, OrderedIndex};

struct Entry {
	link: Link<Entry>,
	text: NonNull<str>,
}

unsafe impl Linked for Entry {
	fn link(&self) -> &Link<Self> { &self.link }
	fn link_mut(&mut self) -> &mut Link<Self> { &mut self.link }
}

impl Entry {
	fn text(&self) -> &str {
		// Safety: the text lives in the same arena as the entry.
		unsafe { self.text.as_ref() }
	}
}

/// A list of strings stored in a private arena. Removing a string unlinks it but
/// keeps its text in place; memory is only reclaimed by [`clear`](Self::clear).
///
/// Strings must fit in a single page, or adding them panics.
pub struct StringPager {
	list: OrderedIndex<Entry, NonNull<Entry>>,
	arena: MemAlloc,
}

impl Default for StringPager {
	fn default() -> Self { Self::new(PagerOptions::default()) }
}

impl Debug for StringPager {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.iter()).finish()
	}
}

impl StringPager {
	/// Creates an empty list.
	pub fn new(options: PagerOptions) -> Self {
		Self {
			list: OrderedIndex::new(),
			arena: options.into(),
		}
	}

	/// Creates an empty list with pages of `size` bytes.
	pub fn with_page_size(size: usize) -> Self {
		Self::new(PagerOptions::new().with_page_size(size))
	}

	fn entry(&self, text: &str) -> NonNull<Entry> {
		let text = NonNull::from(self.arena.dup(text));
		NonNull::from(
			self.arena.alloc_value(Entry { link: Link::new(), text })
		)
	}

	/// Appends a copy of `text`.
	pub fn add(&mut self, text: &str) {
		let entry = self.entry(text);
		self.list.add(entry);
	}

	/// Prepends a copy of `text`.
	pub fn push(&mut self, text: &str) {
		let entry = self.entry(text);
		self.list.push_front(entry);
	}

	/// Removes the first string.
	pub fn pull(&mut self) -> Option<&str> {
		let entry = self.list.pop_front()?;
		Some(unsafe { &*entry.as_ref().text.as_ptr() })
	}

	/// Removes the last string.
	pub fn pop(&mut self) -> Option<&str> {
		let entry = self.list.pop_back()?;
		Some(unsafe { &*entry.as_ref().text.as_ptr() })
	}

	/// Returns the string at `index`.
	pub fn get(&self, index: usize) -> Option<&str> {
		self.list.get(index).map(Entry::text)
	}

	/// Replaces the string at `index` with a copy of `text`, returning `false` if
	/// the index is out of bounds. The old text stays in the arena.
	pub fn set(&mut self, index: usize, text: &str) -> bool {
		if index >= self.list.len() {
			return false
		}

		let text = NonNull::from(self.arena.dup(text));
		match self.list.get_mut(index) {
			Some(entry) => {
				entry.text = text;
				true
			}
			None => false
		}
	}

	/// Returns the number of strings.
	pub fn len(&self) -> usize { self.list.len() }

	/// Returns `true` if the list holds no strings.
	pub fn is_empty(&self) -> bool { self.list.is_empty() }

	/// Iterates over the strings in order.
	pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
		self.list.iter().map(Entry::text)
	}

	/// Sorts the strings lexically. Entries are relinked, no text is copied.
	pub fn sort(&mut self) {
		let mut entries = Vec::with_capacity(self.list.len());
		while let Some(entry) = self.list.pop_front() {
			entries.push(entry);
		}

		entries.sort_by(|a, b| unsafe { a.as_ref().text().cmp(b.as_ref().text()) });
		for entry in entries {
			self.list.add(entry);
		}
	}

	/// Appends each non-empty token of `text` separated by any of the characters in
	/// `delims`, returning the number of tokens added.
	pub fn split(&mut self, text: &str, delims: &str) -> usize {
		let mut count = 0;
		for token in text.split(|c: char| delims.contains(c)).filter(|token| !token.is_empty()) {
			self.add(token);
			count += 1;
		}
		count
	}

	/// Joins the strings with `sep`.
	pub fn join(&self, sep: &str) -> String {
		self.iter().join(sep)
	}

	/// Removes every string and frees the arena's pages.
	pub fn clear(&mut self) {
		self.list = OrderedIndex::new();
		self.arena.purge();
	}

	/// Returns a snapshot of arena usage.
	pub fn stats(&self) -> PagerStats { self.arena.stats() }
}

impl<'a> Extend<&'a str> for StringPager {
	fn extend<I: IntoIterator<Item = &'a str>>(&mut self, iter: I) {
		for text in iter {
			self.add(text);
		}
	}
}
