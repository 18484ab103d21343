// SPDX-License-Identifier: Apache-2.0

use std::fmt::{self, Debug, Formatter};
use std::iter;
use std::ops::Deref;
use itertools::Itertools;
use super::{Linked, LinkedIndex, OrderedIndex, Owner};

/// A list node carrying a name.
pub trait Named: Linked {
	fn name(&self) -> &str;
}

/// Hashes `key` into a bucket index in `[0,modulus)`. Each byte's low five bits
/// are folded into a shifting 32-bit accumulator, so ASCII letters hash without
/// regard to case. The fold wraps, discarding high bits.
///
/// # Panics
///
/// Panics if `modulus` is zero.
pub fn keyindex(key: &str, modulus: usize) -> usize {
	let hash = key.bytes().fold(0u32, |val, byte| (val << 1) ^ (byte & 0x1f) as u32);
	hash as usize % modulus
}

impl<N: Named, P: Owner<N>> LinkedIndex<N, P> {
	/// Finds the first node named `key`.
	pub fn find_name(&self, key: &str) -> Option<&N> {
		self.iter().find(|node| node.name() == key)
	}
}

impl<N: Named, P: Owner<N>> OrderedIndex<N, P> {
	/// Finds the first node named `key`.
	pub fn find_name(&self, key: &str) -> Option<&N> {
		self.iter().find(|node| node.name() == key)
	}
}

/// A fixed-size hash table of named nodes, chained through their links. Names are
/// unique: inserting a name already present replaces the old node.
pub struct NamedIndex<N: Named, P: Owner<N> + Deref<Target = N> = Box<N>> {
	buckets: Box<[LinkedIndex<N, P>]>,
}

impl<N: Named + Debug, P: Owner<N> + Deref<Target = N>> Debug for NamedIndex<N, P> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.iter()).finish()
	}
}

impl<N: Named, P: Owner<N> + Deref<Target = N>> NamedIndex<N, P> {
	/// Creates an index with `buckets` chains.
	///
	/// # Panics
	///
	/// Panics if `buckets` is zero.
	pub fn new(buckets: usize) -> Self {
		assert!(buckets > 0, "a named index needs at least one bucket");
		Self {
			buckets: (0..buckets).map(|_| LinkedIndex::new()).collect()
		}
	}

	fn bucket(&self, key: &str) -> usize {
		keyindex(key, self.buckets.len())
	}

	/// Returns the number of buckets.
	pub fn buckets(&self) -> usize { self.buckets.len() }

	/// Looks up the node named `key`.
	pub fn map(&self, key: &str) -> Option<&N> {
		self.buckets[self.bucket(key)].find_name(key)
	}

	/// Looks up the node named `key`, mutably.
	pub fn map_mut(&mut self, key: &str) -> Option<&mut N> {
		let index = self.bucket(key);
		self.buckets[index].find_mut(|node| node.name() == key)
	}

	/// Inserts `node`, returning the node it replaced.
	pub fn insert(&mut self, node: P) -> Option<P> {
		let index = self.bucket(node.name());
		let bucket = &mut self.buckets[index];
		let replaced = bucket.remove_where(|other| other.name() == node.name());
		bucket.enlist(node);
		replaced
	}

	/// Removes the node named `key`.
	pub fn remove(&mut self, key: &str) -> Option<P> {
		let index = self.bucket(key);
		self.buckets[index].remove_where(|node| node.name() == key)
	}

	pub fn contains(&self, key: &str) -> bool { self.map(key).is_some() }

	/// Counts the nodes in every bucket.
	pub fn len(&self) -> usize {
		self.buckets.iter().map(LinkedIndex::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.buckets.iter().all(LinkedIndex::is_empty)
	}

	/// Iterates over all nodes in bucket order.
	pub fn iter(&self) -> impl Iterator<Item = &N> + '_ {
		self.buckets.iter().flat_map(LinkedIndex::iter)
	}

	/// Returns all nodes sorted by name.
	pub fn sorted(&self) -> Vec<&N> {
		self.iter()
			.sorted_by(|a, b| a.name().cmp(b.name()))
			.collect()
	}

	/// Removes every node, yielding their owners. Nodes not yet yielded when the
	/// iterator drops stay in the index.
	pub fn drain(&mut self) -> impl Iterator<Item = P> + '_ {
		self.buckets
			.iter_mut()
			.flat_map(|bucket| iter::from_fn(move || bucket.pop()))
	}

	/// Releases every node.
	pub fn purge(&mut self) {
		self.buckets.iter_mut().for_each(LinkedIndex::purge)
	}
}

#[cfg(test)]
mod test {
	use quickcheck_macros::quickcheck;
	use super::keyindex;

	#[test]
	fn folds_low_bits() {
		// 'a', 'b', 'c' fold to 1, 2, 3: ((1 << 1) ^ 2) << 1 ^ 3 == 3
		assert_eq!(keyindex("abc", 100), 3);
		assert_eq!(keyindex("ABC", 100), 3);
		assert_eq!(keyindex("", 7), 0);
	}

	#[test]
	fn wraps_long_keys() {
		let key = "z".repeat(64);
		// Bits shifted past 32 are dropped, leaving the last 32 folds.
		assert_eq!(keyindex(&key, usize::MAX), keyindex(&key[..32], usize::MAX));
	}

	#[quickcheck]
	fn within_modulus(key: String, modulus: usize) -> bool {
		let modulus = modulus.max(1);
		keyindex(&key, modulus) < modulus
	}
}
