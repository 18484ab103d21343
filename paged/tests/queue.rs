// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use pretty_assertions::assert_eq;
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;
use paged::{Arena, MemPager, PagerOptions, Queue, Timeout};

#[macro_use]
mod common;

use common::PATIENCE;

#[quickcheck]
fn fifo_order(input: Vec<u16>) -> TestResult {
	let queue = Queue::new(0);
	for value in &input {
		assert!(queue.post(&Arc::new(*value), Timeout::Immediate));
	}

	let output: Vec<u16> = std::iter::from_fn(|| queue.fifo(Timeout::Immediate))
		.map(|value| *value)
		.collect();
	qc_assert_eq!(output, input)
}

#[test]
fn lifo_takes_newest() {
	let queue = Queue::new(0);
	for value in 1..=4 {
		queue.post(&Arc::new(value), Timeout::Immediate);
	}
	assert_eq!(queue.lifo(Timeout::Immediate).as_deref(), Some(&4));
	assert_eq!(queue.fifo(Timeout::Immediate).as_deref(), Some(&1));
	assert_eq!(queue.lifo(Timeout::Immediate).as_deref(), Some(&3));
	assert_eq!(queue.fifo(Timeout::Immediate).as_deref(), Some(&2));
	assert!(queue.is_empty());
}

#[test]
fn backpressure() {
	let queue = Queue::new(1);
	let value = Arc::new(0);
	assert!(queue.post(&value, Timeout::Immediate));

	let start = Instant::now();
	assert!(!queue.post(&value, Timeout::Immediate));
	assert!(start.elapsed() < Duration::from_millis(100));
	assert_eq!(queue.count(), 1);
	assert_eq!(Arc::strong_count(&value), 2);
}

#[test]
fn timeout_leaves_state() {
	let queue = Queue::<u8>::new(4);
	let start = Instant::now();
	assert!(queue.fifo(Duration::from_millis(50)).is_none());
	let elapsed = start.elapsed();
	assert!(elapsed >= Duration::from_millis(50), "returned after {elapsed:?}");
	assert_eq!(queue.count(), 0);
	assert_eq!(queue.members(), 0);
}

#[test]
fn blocking_handoff() {
	let queue = Queue::new(0);
	thread::scope(|scope| {
		let consumer = scope.spawn(|| queue.fifo(Timeout::INF));
		thread::sleep(Duration::from_millis(20));
		assert!(queue.post(&Arc::new("payload"), Timeout::Immediate));
		assert_eq!(consumer.join().unwrap().as_deref(), Some(&"payload"));
	});
}

#[test]
fn blocked_post_resumes() {
	let queue = Queue::new(1);
	queue.post(&Arc::new(1), Timeout::Immediate);
	thread::scope(|scope| {
		let producer = scope.spawn(|| queue.post(&Arc::new(2), PATIENCE));
		thread::sleep(Duration::from_millis(20));
		assert_eq!(queue.fifo(Timeout::Immediate).as_deref(), Some(&1));
		assert!(producer.join().unwrap());
	});
	assert_eq!(queue.fifo(Timeout::Immediate).as_deref(), Some(&2));
}

#[test]
fn remove_cancels() {
	let queue = Queue::new(0);
	let (a, b, c) = (Arc::new('a'), Arc::new('b'), Arc::new('c'));
	queue.post(&a, Timeout::Immediate);
	queue.post(&b, Timeout::Immediate);
	queue.post(&c, Timeout::Immediate);

	assert!(queue.remove(&b));
	assert_eq!(Arc::strong_count(&b), 1);
	assert!(!queue.remove(&b));
	// Equal values are not the same payload.
	assert!(!queue.remove(&Arc::new('a')));
	assert_eq!(queue.count(), 2);
	assert!(queue.remove(&c));
	assert_eq!(queue.fifo(Timeout::Immediate).as_deref(), Some(&'a'));
}

#[test]
fn pager_members_are_recycled() {
	let pager = MemPager::with_page_size(1024);
	let queue = Queue::with_pager(&pager, 0);
	let value = Arc::new(());
	for _ in 0..3 {
		queue.post(&value, Timeout::Immediate);
	}
	let used = pager.stats().used;
	assert_eq!(pager.stats().allocations, 3);

	for _ in 0..3 {
		queue.fifo(Timeout::Immediate);
	}
	for _ in 0..3 {
		queue.post(&value, Timeout::Immediate);
	}
	assert_eq!(pager.stats().used, used);
	assert_eq!(queue.members(), 3);
	drop(queue);
	assert_eq!(Arc::strong_count(&value), 1);
}

#[test]
fn producers_and_consumers() {
	const PER_PRODUCER: usize = 500;
	let pager = MemPager::default();
	let queue = Queue::with_pager(&pager, 8);
	let received = thread::scope(|scope| {
		let queue = &queue;
		let consumers: Vec<_> = (0..2).map(|_| scope.spawn(move || {
			let mut received = Vec::new();
			// A `None` payload is the shutdown sentinel.
			while let Some(value) = queue.fifo(PATIENCE).and_then(|value| *value) {
				received.push(value);
			}
			received
		})).collect();

		let producers: Vec<_> = (0..4).map(|p| {
			scope.spawn(move || {
				for i in 0..PER_PRODUCER {
					assert!(queue.post(&Arc::new(Some((p, i))), PATIENCE));
				}
			})
		}).collect();

		for producer in producers {
			producer.join().unwrap();
		}
		for _ in 0..consumers.len() {
			assert!(queue.post(&Arc::new(None), PATIENCE));
		}

		consumers
			.into_iter()
			.map(|consumer| consumer.join().unwrap())
			.collect::<Vec<_>>()
	});

	let mut all: Vec<_> = received.iter().flatten().copied().collect();
	all.sort_unstable();
	all.dedup();
	assert_eq!(all.len(), 4 * PER_PRODUCER);

	// Each consumer sees every producer's items in order.
	for seen in &received {
		for p in 0..4 {
			let order: Vec<_> = seen.iter().filter(|(q, _)| *q == p).map(|(_, i)| *i).collect();
			assert!(order.windows(2).all(|pair| pair[0] < pair[1]));
		}
	}
	assert!(queue.members() <= 8);
	assert!(queue.is_empty());
}

#[test]
fn failed_member_allocation_returns_reservation() {
	let pager = MemPager::new(PagerOptions::new().with_page_size(32).with_limit(1));
	let queue = Queue::with_pager(&pager, 0);
	let value = Arc::new(0u8);

	// Posts until the pager runs out of pages, which is fatal for that post.
	let filled = thread::scope(|scope| {
		scope.spawn(|| loop {
			queue.post(&value, Timeout::Immediate);
		}).join()
	});
	assert!(filled.is_err());

	let members = queue.members();
	assert!(members > 0);
	assert_eq!(queue.count(), members);
	for _ in 0..members {
		assert!(queue.fifo(Timeout::Immediate).is_some());
	}
	assert_eq!(queue.count(), 0);
	assert!(queue.is_empty());

	// Recycled members still serve posts once the queue drains.
	assert!(queue.post(&value, Timeout::Immediate));
	assert_eq!(queue.count(), 1);
}

#[test]
fn bounded_queue_survives_failed_member_allocation() {
	let pager = MemPager::new(PagerOptions::new().with_page_size(32).with_limit(1));
	let queue = Queue::with_pager(&pager, 64);
	let value = Arc::new(0u8);
	let filled = thread::scope(|scope| {
		scope.spawn(|| loop {
			assert!(queue.post(&value, Timeout::Immediate));
		}).join()
	});
	assert!(filled.is_err());
	assert_eq!(queue.count(), queue.members());
	assert_eq!(Arc::strong_count(&value), 1 + queue.count());

	// The failed post left no phantom entry behind to block on.
	assert!(queue.fifo(Timeout::Immediate).is_some());
	assert!(queue.post(&value, Duration::from_millis(30)));
	assert_eq!(queue.count(), queue.members());
}
