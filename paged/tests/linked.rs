// SPDX-License-Identifier: Apache-2.0

use std::thread;
use pretty_assertions::assert_eq;
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;
use paged::{keyindex, Arena, LinkedIndex, LockedIndex, MemAlloc, NamedIndex, OrderedIndex};
use paged::linked::{Link, Linked, Named};

#[macro_use]
mod common;

#[derive(Debug, Default)]
struct Item {
	link: Link<Item>,
	name: String,
	value: u32,
}

unsafe impl Linked for Item {
	fn link(&self) -> &Link<Self> { &self.link }
	fn link_mut(&mut self) -> &mut Link<Self> { &mut self.link }
}

impl Named for Item {
	fn name(&self) -> &str { &self.name }
}

fn item(name: &str, value: u32) -> Box<Item> {
	Box::new(Item {
		name: name.into(),
		value,
		..Item::default()
	})
}

fn values<'a>(iter: impl Iterator<Item = &'a Item>) -> Vec<u32> {
	iter.map(|item| item.value).collect()
}

#[quickcheck]
fn ordered_preserves_insertion(input: Vec<u32>) -> TestResult {
	let mut index = OrderedIndex::new();
	for &value in &input {
		index.add(item("", value));
	}
	qc_assert_eq!(values(index.iter()), input)
}

#[quickcheck]
fn linked_reverses_insertion(input: Vec<u32>) -> TestResult {
	let mut index = LinkedIndex::new();
	for &value in &input {
		index.enlist(item("", value));
	}
	let mut expected = input;
	expected.reverse();
	qc_assert_eq!(values(index.iter()), expected)
}

#[test]
fn ordered_delist_keeps_ends() {
	let mut index = OrderedIndex::new();
	for value in 0..4 {
		index.add(item("", value));
	}

	let head = index.pop_front().unwrap();
	assert_eq!(head.value, 0);
	assert!(!index.is_member(&head));
	assert!(index.delist(&head).is_none());

	let tail = index.remove_where(|item| item.value == 3).unwrap();
	assert_eq!(tail.value, 3);
	assert_eq!(index.back().map(|item| item.value), Some(2));
	index.add(item("", 4));
	assert_eq!(values(index.iter()), [1, 2, 4]);

	index.push_front(head);
	assert_eq!(index.front().map(|item| item.value), Some(0));
	assert_eq!(index.get(3).map(|item| item.value), Some(4));
	assert_eq!(index.len(), 4);
}

#[test]
fn find_by_name() {
	let mut index = LinkedIndex::new();
	index.enlist(item("a", 1));
	index.enlist(item("b", 2));
	assert_eq!(index.find_name("a").map(|item| item.value), Some(1));
	assert!(index.find_name("c").is_none());
}

#[test]
fn named_insert_replaces() {
	let mut index = NamedIndex::new(4);
	assert!(index.insert(item("key", 1)).is_none());
	assert!(index.insert(item("other", 2)).is_none());
	let replaced = index.insert(item("key", 3)).unwrap();
	assert_eq!(replaced.value, 1);
	assert_eq!(index.len(), 2);
	assert_eq!(index.map("key").map(|item| item.value), Some(3));

	index.map_mut("other").unwrap().value = 5;
	assert_eq!(index.remove("other").map(|item| item.value), Some(5));
	assert!(!index.contains("other"));
	assert!(index.remove("other").is_none());
}

#[test]
fn named_sorted() {
	let mut index = NamedIndex::new(3);
	for (value, name) in ["delta", "alpha", "charlie", "bravo"].into_iter().enumerate() {
		index.insert(item(name, value as u32));
	}
	let names: Vec<_> = index.sorted().into_iter().map(|item| item.name.as_str()).collect();
	assert_eq!(names, ["alpha", "bravo", "charlie", "delta"]);
	assert_eq!(index.buckets(), 3);

	index.purge();
	assert!(index.is_empty());
}

#[test]
fn named_buckets_follow_keyindex() {
	let mut index = NamedIndex::new(1);
	index.insert(item("x", 0));
	assert_eq!(keyindex("x", 1), 0);
	assert_eq!(keyindex("abc", 7), 3);
	// 'z' folds to 26: ((26 << 1) ^ 26) == 46
	assert_eq!(keyindex("zz", 1000), 46);
	assert!(index.contains("x"));
}

#[test]
fn arena_nodes() {
	let arena = MemAlloc::with_page_size(1024);
	let mut index: OrderedIndex<Item, &mut Item> = OrderedIndex::new();
	for value in 0..8 {
		index.add(arena.alloc_value(Item { value, ..Item::default() }));
	}
	let removed = index.pop_back().unwrap();
	removed.value = 70;
	index.push_front(removed);
	assert_eq!(values(index.iter()), [70, 0, 1, 2, 3, 4, 5, 6]);
	// Arena items are never dropped, so release their strings here.
	while let Some(item) = index.pop_front() {
		drop(std::mem::take(&mut item.name));
	}
}

#[test]
fn locked_between_threads() {
	let index = LockedIndex::new();
	thread::scope(|scope| {
		for t in 0..4 {
			let index = &index;
			scope.spawn(move || {
				for i in 0..50 {
					index.add(item("", t * 50 + i));
				}
			});
		}
	});

	assert_eq!(index.len(), 200);
	let mut seen: Vec<u32> = values(index.lock().iter());
	seen.sort_unstable();
	assert_eq!(seen, (0..200).collect::<Vec<_>>());
	assert!(index.pop_front().is_some());
	index.purge();
	assert!(index.is_empty());
}
