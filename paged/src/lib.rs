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

//! ## How it works
//!
//! Small, same-lifetime objects are carved out of fixed-size memory *pages* by an
//! *arena*, or *pager*. An arena never frees a single allocation: pages are only
//! released all at once, when the arena is purged or dropped. Allocation scans the
//! page chain newest first for room, creating a new page when none has any. Pages
//! may be capped with a limit, past which allocation fails. `MemAlloc` is the
//! single-threaded arena; `MemPager` locks internally and can be shared.
//!
//! ### Intrusive lists
//!
//! List nodes embed their own link. An index holds only the ends of the chain and
//! owns the nodes enlisted on it, so moving a node between lists allocates nothing.
//! The linked index pushes at its head, the ordered index keeps a tail for
//! appending, and the named index hashes nodes into buckets by name. Named trees
//! organize nodes by parent and child, searchable by dotted paths.
//!
//! ### Containers
//!
//! Containers hand objects between threads. Each is a *monitor*, a lock paired with
//! a condition variable, and every blocking call takes a timeout. Queues and stacks
//! wrap payloads in *member* nodes drawn from a freelist, falling back to a shared
//! pager or the heap when it's empty. Freed members go back on the freelist, so a
//! container's memory grows only to the most members it has held at once.
//!
//! The keyed store follows the same pattern, recycling entries between keys of
//! similar length.

pub mod containers;
mod error;
pub mod keyassoc;
pub mod linked;
pub mod monitor;
pub mod pager;
pub mod tree;
mod util;

pub use containers::{Buffer, LinkedAllocator, Pooled, Queue, Slot, Stack};
pub use error::*;
pub use keyassoc::{KeyAssoc, KeyError};
pub use linked::{keyindex, LinkedIndex, LockedIndex, NamedIndex, OrderedIndex};
pub use monitor::{Conditional, ConditionalGuard, Timeout};
pub use pager::{page_size, Arena, MemAlloc, MemPager, PagerOptions, PagerStats};
pub use pager::string::StringPager;
pub use tree::{NamedTree, NodeId};
