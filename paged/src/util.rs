// SPDX-License-Identifier: Apache-2.0

use std::mem;

/// Allocation granularity: every arena allocation is rounded up to a multiple of
/// the pointer size.
pub(crate) const ALIGN: usize = mem::align_of::<usize>();

/// Rounds `value` up to the next multiple of `align`, a power of two.
#[inline]
pub(crate) const fn align_up(value: usize, align: usize) -> usize {
	(value + align - 1) & !(align - 1)
}

/// Unwraps a result, panicking on errors. Allocator failures are not recoverable,
/// so the error is logged before the panic unwinds.
macro_rules! fatal {
    ($expr:expr,$($msg:tt)+) => {
		match $expr {
			Ok(v) => v,
			Err(error) => {
				tracing::error!(%error, $($msg)+);
				panic!("{}: {error}", format_args!($($msg)+))
			}
		}
	};
}

pub(crate) use fatal;
