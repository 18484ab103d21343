// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::thread;
use pretty_assertions::assert_eq;
use paged::{Arena, KeyAssoc, KeyError, MemPager};

mod common;

#[test]
fn keys_are_unique() {
	let pager = MemPager::with_page_size(512);
	let assoc = KeyAssoc::new(&pager, 31, 0);
	assert!(assoc.create("k", 1));
	assert!(!assoc.create("k", 2));
	assert_eq!(assoc.try_create("k", 3), Err(KeyError::Exists));
	assert_eq!(assoc.locate("k"), Some(1));
	assert_eq!(assoc.len(), 1);
}

#[test]
fn assign_upserts() {
	let pager = MemPager::with_page_size(512);
	let assoc = KeyAssoc::new(&pager, 31, 8);
	assert!(assoc.assign("k", "first".to_owned()));
	assert!(assoc.assign("k", "second".to_owned()));
	assert_eq!(assoc.locate("k").as_deref(), Some("second"));
	assert_eq!(assoc.locate_with("k", String::len), Some(6));
	assert!(!assoc.assign("nine byte", String::new()));
	assert_eq!(assoc.len(), 1);
	assert_eq!(assoc.max_key(), 8);
}

#[test]
fn remove_returns_value() {
	let pager = MemPager::with_page_size(512);
	let assoc = KeyAssoc::new(&pager, 1, 0);
	assoc.create("a", 'a');
	assoc.create("b", 'b');
	assert_eq!(assoc.remove("a"), Some('a'));
	assert_eq!(assoc.remove("a"), None);
	assert!(!assoc.contains("a"));
	assert!(assoc.contains("b"));
	assert_eq!(assoc.locate("a"), None);
	assert!(assoc.create("a", 'c'));
	assert_eq!(assoc.locate("a"), Some('c'));
}

#[test]
fn removed_entries_are_reused() {
	let pager = MemPager::with_page_size(512);
	let assoc = KeyAssoc::new(&pager, 7, 0);
	assert!(assoc.create("abcdefgh", 1));
	assoc.remove("abcdefgh");
	let stats = pager.stats();

	assert!(assoc.create("ijklmnop", 2));
	assert_eq!(pager.stats(), stats);
	assert_eq!(assoc.locate("ijklmnop"), Some(2));
	assert_eq!(assoc.locate("abcdefgh"), None);

	// A longer key of the same class reuses the entry too.
	assoc.remove("ijklmnop");
	assert!(assoc.create("qrstuvwxy", 3));
	assert_eq!(pager.stats(), stats);
	assert_eq!(assoc.locate("qrstuvwxy"), Some(3));
}

#[test]
fn values_drop_with_the_store() {
	let pager = MemPager::with_page_size(512);
	let value = Arc::new(());
	{
		let assoc = KeyAssoc::new(&pager, 7, 0);
		assoc.create("x", value.clone());
		assoc.create("y", value.clone());
		assoc.remove("y");
		assert_eq!(Arc::strong_count(&value), 2);
	}
	assert_eq!(Arc::strong_count(&value), 1);
}

#[test]
fn shared_between_threads() {
	let pager = MemPager::default();
	let assoc = KeyAssoc::new(&pager, 61, 0);
	thread::scope(|scope| {
		for t in 0..4 {
			let assoc = &assoc;
			scope.spawn(move || {
				for i in 0..100 {
					assert!(assoc.create(&format!("{t}:{i}"), t * 100 + i));
				}
			});
		}
	});

	assert_eq!(assoc.len(), 400);
	for t in 0..4 {
		for i in 0..100 {
			assert_eq!(assoc.locate(&format!("{t}:{i}")), Some(t * 100 + i));
		}
	}
}
