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

//! A keyed associative store whose entries are allocated from a shared pager.
//!
//! Entry storage is never returned to the pager. Removed entries are kept on a
//! freelist per key size class, eight bytes wide, and reused for later keys of
//! the same class, so a store with steady churn stops growing once it reaches
//! its high-water mark.

use std::fmt::{self, Debug, Formatter};
use std::result;
use std::str;
use parking_lot::Mutex;
use tracing::trace;
use crate::linked::{Link, Linked, LinkedIndex, Named, NamedIndex};
use crate::pager::{Arena, MemPager};

/// The width of a key size class in bytes.
const KEY_CLASS: usize = 8;

#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum KeyError {
	#[error("key already exists")]
	Exists,
	#[error("key of {len} bytes exceeds the {max} byte limit")]
	TooLong { len: usize, max: usize },
	#[error("key is empty")]
	Empty,
}

pub type Result<T = ()> = result::Result<T, KeyError>;

struct KeyData<'p, D> {
	link: Link<KeyData<'p, D>>,
	key: &'p mut [u8],
	len: usize,
	data: Option<D>,
}

type Entry<'p, D> = &'p mut KeyData<'p, D>;

unsafe impl<D> Linked for KeyData<'_, D> {
	fn link(&self) -> &Link<Self> { &self.link }
	fn link_mut(&mut self) -> &mut Link<Self> { &mut self.link }
}

impl<D> Named for KeyData<'_, D> {
	fn name(&self) -> &str {
		// Safety: key bytes are only ever copied from a string.
		unsafe { str::from_utf8_unchecked(&self.key[..self.len]) }
	}
}

struct State<'p, D> {
	index: NamedIndex<KeyData<'p, D>, Entry<'p, D>>,
	free: Vec<LinkedIndex<KeyData<'p, D>, Entry<'p, D>>>,
}

/// A hashed map from string keys to values, with entries allocated from a
/// [`MemPager`]. Keys are unique; the store never owns more than one value per
/// key.
pub struct KeyAssoc<'p, D> {
	state: Mutex<State<'p, D>>,
	pager: &'p MemPager,
	max_key: usize,
}

impl<'p, D> KeyAssoc<'p, D> {
	/// Creates a store hashing into `buckets` chains, accepting keys of at most
	/// `max_key` bytes. A `max_key` of `0` accepts keys of any length that fits in
	/// a pager page.
	///
	/// # Panics
	///
	/// Panics if `buckets` is zero.
	pub fn new(pager: &'p MemPager, buckets: usize, max_key: usize) -> Self {
		Self {
			state: Mutex::new(State {
				index: NamedIndex::new(buckets),
				free: Vec::new(),
			}),
			pager,
			max_key,
		}
	}

	/// Returns the key length limit, `0` meaning unlimited.
	pub fn max_key(&self) -> usize { self.max_key }

	/// Returns the number of keys stored.
	pub fn len(&self) -> usize { self.state.lock().index.len() }

	pub fn is_empty(&self) -> bool { self.state.lock().index.is_empty() }

	pub fn contains(&self, key: &str) -> bool { self.state.lock().index.contains(key) }

	/// Stores `data` under a new `key`. Returns `false` if the key already exists or
	/// is invalid, leaving any existing value in place.
	pub fn create(&self, key: &str, data: D) -> bool {
		self.try_create(key, data).is_ok()
	}

	/// Stores `data` under a new `key`.
	pub fn try_create(&self, key: &str, data: D) -> Result {
		self.check(key)?;
		let mut state = self.state.lock();
		if state.index.contains(key) {
			return Err(KeyError::Exists)
		}

		self.insert(&mut state, key, data);
		Ok(())
	}

	/// Stores `data` under `key`, replacing any existing value. Returns `false` if
	/// the key is invalid.
	pub fn assign(&self, key: &str, data: D) -> bool {
		if self.check(key).is_err() {
			return false
		}

		let mut state = self.state.lock();
		if let Some(entry) = state.index.map_mut(key) {
			entry.data = Some(data);
		} else {
			self.insert(&mut state, key, data);
		}
		true
	}

	/// Returns a copy of the value stored under `key`.
	pub fn locate(&self, key: &str) -> Option<D> where D: Clone {
		self.locate_with(key, D::clone)
	}

	/// Calls `f` with the value stored under `key`, under the store's lock.
	pub fn locate_with<R>(&self, key: &str, f: impl FnOnce(&D) -> R) -> Option<R> {
		let state = self.state.lock();
		state.index
			.map(key)
			.and_then(|entry| entry.data.as_ref())
			.map(f)
	}

	/// Removes `key`, returning its value. The entry's storage is kept for reuse by
	/// a later key of similar length.
	pub fn remove(&self, key: &str) -> Option<D> {
		let mut state = self.state.lock();
		let entry = state.index.remove(key)?;
		let data = entry.data.take();
		let class = entry.len / KEY_CLASS;
		if state.free.len() <= class {
			state.free.resize_with(class + 1, LinkedIndex::new);
		}
		state.free[class].enlist(entry);
		data
	}

	fn check(&self, key: &str) -> Result {
		if key.is_empty() {
			return Err(KeyError::Empty)
		}

		if self.max_key > 0 && key.len() > self.max_key {
			return Err(KeyError::TooLong {
				len: key.len(),
				max: self.max_key,
			})
		}
		Ok(())
	}

	fn insert(&self, state: &mut State<'p, D>, key: &str, data: D) {
		let class = key.len() / KEY_CLASS;
		let pager: &'p MemPager = self.pager;
		let entry = match state.free.get_mut(class).and_then(LinkedIndex::pop) {
			Some(entry) => {
				trace!(class, "reusing key entry");
				entry
			}
			None => {
				let key = pager.alloc((class + 1) * KEY_CLASS);
				pager.alloc_value(KeyData {
					link: Link::new(),
					key,
					len: 0,
					data: None,
				})
			}
		};

		entry.key[..key.len()].copy_from_slice(key.as_bytes());
		entry.len = key.len();
		entry.data = Some(data);
		state.index.insert(entry);
	}
}

impl<D> Debug for KeyAssoc<'_, D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("KeyAssoc")
			.field("len", &self.len())
			.field("max_key", &self.max_key)
			.finish_non_exhaustive()
	}
}

impl<D> Drop for KeyAssoc<'_, D> {
	fn drop(&mut self) {
		// Entries live in the pager and are never dropped, so values are released
		// here.
		for entry in self.state.get_mut().index.drain() {
			entry.data = None;
		}
	}
}
