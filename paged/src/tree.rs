// SPDX-License-Identifier: Apache-2.0

//! A tree of optionally named nodes, searched by name or by dotted path.
//!
//! Nodes live in a slab and are addressed by [`NodeId`] handles. Handles carry the
//! generation of their slot, so a handle to a deleted node never resolves to the
//! node that later reuses its slot.

use std::ops::{Index, IndexMut};

/// A handle to a tree node.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId {
	index: usize,
	generation: u32,
}

#[derive(Clone, Debug)]
struct Node<T> {
	name: Option<Box<str>>,
	value: T,
	parent: Option<usize>,
	first: Option<usize>,
	last: Option<usize>,
	next: Option<usize>,
}

#[derive(Clone, Debug)]
struct Slot<T> {
	generation: u32,
	node: Option<Node<T>>,
}

/// A forest of named nodes. Each node has an optional name, a value, and an
/// ordered list of children; a node without a parent is a root.
///
/// Names are set from strings, the empty string leaving a node unnamed. Unnamed
/// nodes never match a search.
#[derive(Clone, Debug)]
pub struct NamedTree<T> {
	slots: Vec<Slot<T>>,
	free: Vec<usize>,
	len: usize,
}

impl<T> Default for NamedTree<T> {
	fn default() -> Self { Self::new() }
}

fn to_name(name: &str) -> Option<Box<str>> {
	(!name.is_empty()).then(|| name.into())
}

impl<T> NamedTree<T> {
	/// Creates an empty tree.
	pub const fn new() -> Self {
		Self {
			slots: Vec::new(),
			free: Vec::new(),
			len: 0,
		}
	}

	/// Returns the number of live nodes.
	pub fn len(&self) -> usize { self.len }

	pub fn is_empty(&self) -> bool { self.len == 0 }

	/// Returns `true` if `id` refers to a live node.
	pub fn contains(&self, id: NodeId) -> bool { self.resolve(id).is_some() }

	/// Inserts a new root node.
	pub fn insert_root(&mut self, name: &str, value: T) -> NodeId {
		let index = self.alloc(Node {
			name: to_name(name),
			value,
			parent: None,
			first: None,
			last: None,
			next: None,
		});
		self.id(index)
	}

	/// Appends a new node to `parent`'s children. Returns `None` if `parent` is not
	/// a live node.
	pub fn add(&mut self, parent: NodeId, name: &str, value: T) -> Option<NodeId> {
		let parent = self.resolve(parent)?;
		let index = self.insert_root(name, value).index;
		self.append(parent, index);
		Some(self.id(index))
	}

	/// Returns the name of a node, `None` if unnamed.
	pub fn name(&self, id: NodeId) -> Option<&str> {
		self.get(id)?.name.as_deref()
	}

	/// Renames a node, returning `false` if it's not live.
	pub fn set_name(&mut self, id: NodeId, name: &str) -> bool {
		match self.get_mut(id) {
			Some(node) => {
				node.name = to_name(name);
				true
			}
			None => false
		}
	}

	pub fn value(&self, id: NodeId) -> Option<&T> {
		self.get(id).map(|node| &node.value)
	}

	pub fn value_mut(&mut self, id: NodeId) -> Option<&mut T> {
		self.get_mut(id).map(|node| &mut node.value)
	}

	/// Returns the parent of a node, `None` for roots.
	pub fn parent(&self, id: NodeId) -> Option<NodeId> {
		self.get(id)?.parent.map(|index| self.id(index))
	}

	/// Returns the first child of a node.
	pub fn first(&self, id: NodeId) -> Option<NodeId> {
		self.get(id)?.first.map(|index| self.id(index))
	}

	/// Returns `true` if the node has no children.
	pub fn is_leaf(&self, id: NodeId) -> bool {
		self.get(id).is_some_and(|node| node.first.is_none())
	}

	/// Iterates over the direct children of a node, in order.
	pub fn children(&self, id: NodeId) -> Children<'_, T> {
		Children {
			tree: self,
			next: self.get(id).and_then(|node| node.first),
		}
	}

	/// Iterates depth-first over every node below `id`, parents before children.
	pub fn descendants(&self, id: NodeId) -> Descendants<'_, T> {
		let mut iter = Descendants { tree: self, stack: Vec::new() };
		if let Some(index) = self.resolve(id) {
			iter.push_children(index);
		}
		iter
	}

	/// Finds the direct child of `id` named `name`.
	pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
		self.children(id).find(|&child| self.is_named(child.index, name))
	}

	/// Returns the `n`th direct child of `id`.
	pub fn indexed(&self, id: NodeId, n: usize) -> Option<NodeId> {
		self.children(id).nth(n)
	}

	/// Finds the direct child of `id` named `name` which has no children.
	pub fn leaf_child(&self, id: NodeId, name: &str) -> Option<NodeId> {
		self.children(id).find(|&child|
			self.is_named(child.index, name) && self.is_leaf(child)
		)
	}

	/// Searches the subtree below `id` depth-first for a node named `name`.
	pub fn find(&self, id: NodeId, name: &str) -> Option<NodeId> {
		self.descendants(id).find(|node| self.is_named(node.index, name))
	}

	/// Searches the subtree below `id` depth-first for a leaf named `name`.
	pub fn leaf(&self, id: NodeId, name: &str) -> Option<NodeId> {
		self.descendants(id).find(|&node|
			self.is_named(node.index, name) && self.is_leaf(node)
		)
	}

	/// Walks a dotted path of child names from `id`. Each leading `.` moves to the
	/// parent first, so `"..a"` names a sibling of the parent. One trailing `.`
	/// is ignored. An empty path returns `id` itself.
	pub fn path(&self, id: NodeId, path: &str) -> Option<NodeId> {
		let mut node = id;
		self.resolve(node)?;

		let rest = path.trim_start_matches('.');
		for _ in 0..path.len() - rest.len() {
			node = self.parent(node)?;
		}

		if rest.is_empty() {
			return Some(node)
		}

		rest.strip_suffix('.')
			.unwrap_or(rest)
			.split('.')
			.try_fold(node, |node, name| self.child(node, name))
	}

	/// Detaches a node and its subtree from its parent, making it a root. Returns
	/// `false` if the node isn't live.
	pub fn remove(&mut self, id: NodeId) -> bool {
		let Some(index) = self.resolve(id) else { return false };
		self.detach(index);
		true
	}

	/// Moves a node to the front of its siblings.
	pub fn relist_head(&mut self, id: NodeId) -> bool {
		let Some(index) = self.resolve(id) else { return false };
		let Some(parent) = self.at(index).parent else { return false };
		self.detach(index);
		self.prepend(parent, index);
		true
	}

	/// Moves a node to the back of its siblings.
	pub fn relist_tail(&mut self, id: NodeId) -> bool {
		let Some(index) = self.resolve(id) else { return false };
		let Some(parent) = self.at(index).parent else { return false };
		self.detach(index);
		self.append(parent, index);
		true
	}

	/// Deletes a single node, returning its value. Its children become roots.
	pub fn delete(&mut self, id: NodeId) -> Option<T> {
		let index = self.resolve(id)?;
		self.detach(index);

		let mut child = self.at(index).first;
		while let Some(index) = child {
			let node = self.at_mut(index);
			child = node.next.take();
			node.parent = None;
		}
		Some(self.release(index).value)
	}

	/// Deletes a node and its whole subtree, returning the number of nodes freed.
	pub fn purge(&mut self, id: NodeId) -> usize {
		let Some(index) = self.resolve(id) else { return 0 };
		self.detach(index);

		let mut stack = vec![index];
		let mut count = 0;
		while let Some(index) = stack.pop() {
			let node = self.release(index);
			let mut child = node.first;
			while let Some(index) = child {
				stack.push(index);
				child = self.at(index).next;
			}
			count += 1;
		}
		count
	}

	fn resolve(&self, id: NodeId) -> Option<usize> {
		let slot = self.slots.get(id.index)?;
		(slot.generation == id.generation && slot.node.is_some()).then_some(id.index)
	}

	fn get(&self, id: NodeId) -> Option<&Node<T>> {
		let index = self.resolve(id)?;
		self.slots[index].node.as_ref()
	}

	fn get_mut(&mut self, id: NodeId) -> Option<&mut Node<T>> {
		let index = self.resolve(id)?;
		self.slots[index].node.as_mut()
	}

	fn id(&self, index: usize) -> NodeId {
		NodeId {
			index,
			generation: self.slots[index].generation,
		}
	}

	fn at(&self, index: usize) -> &Node<T> {
		match &self.slots[index].node {
			Some(node) => node,
			None => unreachable!("tree link to vacant slot {index}")
		}
	}

	fn at_mut(&mut self, index: usize) -> &mut Node<T> {
		match &mut self.slots[index].node {
			Some(node) => node,
			None => unreachable!("tree link to vacant slot {index}")
		}
	}

	fn is_named(&self, index: usize, name: &str) -> bool {
		self.at(index).name.as_deref() == Some(name)
	}

	fn alloc(&mut self, node: Node<T>) -> usize {
		self.len += 1;
		match self.free.pop() {
			Some(index) => {
				self.slots[index].node = Some(node);
				index
			}
			None => {
				self.slots.push(Slot { generation: 0, node: Some(node) });
				self.slots.len() - 1
			}
		}
	}

	fn release(&mut self, index: usize) -> Node<T> {
		let slot = &mut self.slots[index];
		let Some(node) = slot.node.take() else {
			unreachable!("released vacant slot {index}")
		};
		slot.generation = slot.generation.wrapping_add(1);
		self.free.push(index);
		self.len -= 1;
		node
	}

	fn append(&mut self, parent: usize, index: usize) {
		let last = self.at(parent).last;
		let node = self.at_mut(index);
		node.parent = Some(parent);
		node.next = None;
		match last {
			Some(last) => self.at_mut(last).next = Some(index),
			None => self.at_mut(parent).first = Some(index)
		}
		self.at_mut(parent).last = Some(index);
	}

	fn prepend(&mut self, parent: usize, index: usize) {
		let first = self.at(parent).first;
		let node = self.at_mut(index);
		node.parent = Some(parent);
		node.next = first;
		let parent = self.at_mut(parent);
		parent.first = Some(index);
		if parent.last.is_none() {
			parent.last = Some(index);
		}
	}

	/// Unlinks a node from its parent's children, clearing its parent.
	fn detach(&mut self, index: usize) {
		let Some(parent) = self.at(index).parent else { return };

		let mut prev = None;
		let mut cur = self.at(parent).first;
		while let Some(sibling) = cur {
			if sibling == index { break }
			prev = cur;
			cur = self.at(sibling).next;
		}

		let next = self.at(index).next;
		match prev {
			Some(prev) => self.at_mut(prev).next = next,
			None => self.at_mut(parent).first = next
		}
		if self.at(parent).last == Some(index) {
			self.at_mut(parent).last = prev;
		}

		let node = self.at_mut(index);
		node.parent = None;
		node.next = None;
	}
}

impl<T> Index<NodeId> for NamedTree<T> {
	type Output = T;

	fn index(&self, id: NodeId) -> &T {
		match self.value(id) {
			Some(value) => value,
			None => panic!("no live tree node for {id:?}")
		}
	}
}

impl<T> IndexMut<NodeId> for NamedTree<T> {
	fn index_mut(&mut self, id: NodeId) -> &mut T {
		match self.value_mut(id) {
			Some(value) => value,
			None => panic!("no live tree node for {id:?}")
		}
	}
}

/// An iterator over the children of a node.
pub struct Children<'a, T> {
	tree: &'a NamedTree<T>,
	next: Option<usize>,
}

impl<T> Iterator for Children<'_, T> {
	type Item = NodeId;

	fn next(&mut self) -> Option<NodeId> {
		let index = self.next?;
		self.next = self.tree.at(index).next;
		Some(self.tree.id(index))
	}
}

/// A depth-first iterator over a subtree.
pub struct Descendants<'a, T> {
	tree: &'a NamedTree<T>,
	stack: Vec<usize>,
}

impl<T> Descendants<'_, T> {
	fn push_children(&mut self, index: usize) {
		let start = self.stack.len();
		let mut child = self.tree.at(index).first;
		while let Some(index) = child {
			self.stack.push(index);
			child = self.tree.at(index).next;
		}
		self.stack[start..].reverse();
	}
}

impl<T> Iterator for Descendants<'_, T> {
	type Item = NodeId;

	fn next(&mut self) -> Option<NodeId> {
		let index = self.stack.pop()?;
		self.push_children(index);
		Some(self.tree.id(index))
	}
}
