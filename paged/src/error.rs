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

use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};

/// The operation an [`Error`] occurred in.
pub trait OperationKind: Copy + Debug + Display { }

/// The cause of an [`Error`].
pub trait ErrorKind: Copy + Debug + Display + Eq { }

/// A failed allocator or container operation, tagged with the operation that
/// failed and the kind of failure. These errors carry no underlying cause: every
/// one of them is raised by this crate's own bookkeeping.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Error<O: OperationKind, K: ErrorKind> {
	op: O,
	kind: K,
}

impl<O: OperationKind, K: ErrorKind> Display for Error<O, K> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let Self { op, kind } = self;
		write!(f, "{op} failed; {kind}")
	}
}

impl<O: OperationKind, K: ErrorKind> StdError for Error<O, K> { }

impl<O: OperationKind, K: ErrorKind> Error<O, K> {
	pub(crate) const fn new(op: O, kind: K) -> Self {
		Self { op, kind }
	}

	/// Returns the operation kind.
	pub fn operation(&self) -> O { self.op }

	/// Returns the error kind.
	pub fn kind(&self) -> K { self.kind }

	/// Returns `true` if the error is of `kind`.
	pub fn is(&self, kind: K) -> bool { self.kind == kind }
}
