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

//! Bounded producer/consumer containers. Each container is a monitor: one lock
//! and one condition variable guarding exactly that container's state. Blocking
//! operations take a [`Timeout`](crate::Timeout), and report expiry by returning
//! `false` or `None` with the container unchanged.
//!
//! There is no closed state. Callers needing shutdown post a sentinel payload or
//! check an external flag after a timed wait.

mod allocator;
mod member;
mod queue;
pub mod ring;
mod stack;

pub use allocator::*;
pub use queue::*;
pub use ring::{Buffer, Slot};
pub use stack::*;
