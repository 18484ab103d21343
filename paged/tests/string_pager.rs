// SPDX-License-Identifier: Apache-2.0

use pretty_assertions::assert_eq;
use paged::{PagerOptions, StringPager};

mod common;

#[test]
fn add_and_push() {
	let mut strings = StringPager::default();
	strings.add("middle");
	strings.add("last");
	strings.push("first");
	assert_eq!(strings.iter().collect::<Vec<_>>(), ["first", "middle", "last"]);
	assert_eq!(strings.len(), 3);
	assert_eq!(strings.get(1), Some("middle"));
	assert_eq!(strings.get(3), None);
}

#[test]
fn pull_and_pop() {
	let mut strings = StringPager::with_page_size(128);
	strings.extend(["a", "b", "c"]);
	assert_eq!(strings.pull(), Some("a"));
	assert_eq!(strings.pop(), Some("c"));
	assert_eq!(strings.pop(), Some("b"));
	assert_eq!(strings.pull(), None);
	assert!(strings.is_empty());
}

#[test]
fn split_and_join() {
	let mut strings = StringPager::with_page_size(256);
	assert_eq!(strings.split("PATH=/bin::/usr/bin:", ":="), 3);
	assert_eq!(strings.join(","), "PATH,/bin,/usr/bin");
	assert_eq!(strings.split("", " "), 0);
	assert_eq!(strings.len(), 3);
}

#[test]
fn sort_relinks() {
	let mut strings = StringPager::with_page_size(256);
	strings.split("pear apple fig banana", " ");
	let used = strings.stats().used;
	strings.sort();
	assert_eq!(strings.join(" "), "apple banana fig pear");
	assert_eq!(strings.stats().used, used);
}

#[test]
fn clear_and_reuse() {
	let mut strings = StringPager::new(PagerOptions::new().with_page_size(64));
	for _ in 0..8 {
		strings.add("some text that fills pages");
	}
	assert!(strings.stats().pages > 1);
	strings.clear();
	assert_eq!(strings.stats().used, 0);
	strings.add("again");
	assert_eq!(strings.get(0), Some("again"));
	assert_eq!(format!("{strings:?}"), r#"["again"]"#);
}
