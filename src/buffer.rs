// SPDX-License-Identifier: MIT OR Apache-2.0

/*!
Text buffers for the slow path.

A [LogBuffer] starts with [INLINE_CAPACITY] bytes of inline storage.  Only when rendered text
outgrows that does it spill to the heap, and then only through the [BufferAllocator] it was
given.  A buffer never touches the global allocator on its own.
*/

use crate::error::AllocationFailure;
use std::fmt::{self, Debug, Write};

/// Inline bytes available before a buffer asks its allocator for more.
pub const INLINE_CAPACITY: usize = 1024;

/**
Capability used to grow a [LogBuffer] past its inline capacity.

`grow` hands out a fresh, empty vector with room for at least `min_capacity` bytes.  The buffer
copies its contents over itself, and treats a vector that is not empty, or is too small, as an
[AllocationFailure].
*/
pub trait BufferAllocator: Debug + Send + Sync {
    fn grow(&self, min_capacity: usize) -> Result<Vec<u8>, AllocationFailure>;
}

/// Grows through the system allocator with fallible reservation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SystemAllocator;

impl BufferAllocator for SystemAllocator {
    fn grow(&self, min_capacity: usize) -> Result<Vec<u8>, AllocationFailure> {
        let mut heap = Vec::new();
        heap.try_reserve_exact(min_capacity)
            .map_err(|_| AllocationFailure {
                requested: min_capacity,
            })?;
        Ok(heap)
    }
}

/**
Refuses all growth.

For call sites that must not allocate even when a record is accepted: messages that do not fit
inline fail with [AllocationFailure] instead.
*/
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NoGrowthAllocator;

impl BufferAllocator for NoGrowthAllocator {
    fn grow(&self, min_capacity: usize) -> Result<Vec<u8>, AllocationFailure> {
        Err(AllocationFailure {
            requested: min_capacity,
        })
    }
}

/**
A stack-scoped, growable UTF-8 buffer.

Writes go to the inline array until it is full; the first write that does not fit moves the
contents into a heap vector obtained from the allocator.  Once a growth request fails, every
later write fails too and [LogBuffer::finish] reports the failure.
*/
pub struct LogBuffer<'a> {
    inline: [u8; INLINE_CAPACITY],
    len: usize,
    heap: Option<Vec<u8>>,
    allocator: &'a dyn BufferAllocator,
    failure: Option<AllocationFailure>,
}

impl<'a> LogBuffer<'a> {
    pub fn new(allocator: &'a dyn BufferAllocator) -> Self {
        Self {
            inline: [0; INLINE_CAPACITY],
            len: 0,
            heap: None,
            allocator,
            failure: None,
        }
    }

    pub fn len(&self) -> usize {
        match &self.heap {
            Some(heap) => heap.len(),
            None => self.len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the contents moved to the heap.
    pub fn spilled(&self) -> bool {
        self.heap.is_some()
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.heap {
            Some(heap) => heap,
            None => &self.inline[..self.len],
        }
    }

    pub fn as_str(&self) -> &str {
        // SAFETY: bytes only ever enter the buffer as whole `&str` values, and a vector from the
        // allocator is only used after `fresh_heap` checked that it is empty.
        unsafe { std::str::from_utf8_unchecked(self.as_bytes()) }
    }

    pub fn clear(&mut self) {
        self.len = 0;
        if let Some(heap) = &mut self.heap {
            heap.clear();
        }
        self.failure = None;
    }

    /// Formats `args` into the buffer.
    pub fn write_args(&mut self, args: fmt::Arguments<'_>) -> Result<(), AllocationFailure> {
        if fmt::write(self, args).is_err() {
            if let Some(failure) = self.failure {
                return Err(failure);
            }
            // A Display impl reported an error of its own; keep what was written.
        }
        Ok(())
    }

    /// The contents, or the allocation failure that truncated them.
    pub fn finish(&self) -> Result<&str, AllocationFailure> {
        match self.failure {
            Some(failure) => Err(failure),
            None => Ok(self.as_str()),
        }
    }

    /// An empty vector holding at least `min_capacity` bytes, or the reason there is none.
    fn fresh_heap(&self, min_capacity: usize) -> Result<Vec<u8>, AllocationFailure> {
        let heap = self.allocator.grow(min_capacity)?;
        if !heap.is_empty() || heap.capacity() < min_capacity {
            return Err(AllocationFailure {
                requested: min_capacity,
            });
        }
        Ok(heap)
    }

    /// Moves the contents into a heap vector with room for `needed` bytes.
    fn grow_to(&mut self, needed: usize) -> Result<(), AllocationFailure> {
        let capacity = match &self.heap {
            Some(heap) => needed.max(heap.capacity() * 2),
            None => needed.max(INLINE_CAPACITY * 2),
        };
        let mut heap = self.fresh_heap(capacity)?;
        heap.extend_from_slice(self.as_bytes());
        self.heap = Some(heap);
        Ok(())
    }
}

impl Write for LogBuffer<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.failure.is_some() {
            return Err(fmt::Error);
        }
        let bytes = s.as_bytes();
        let needed = self.len() + bytes.len();
        if self.heap.is_none() && needed <= INLINE_CAPACITY {
            self.inline[self.len..needed].copy_from_slice(bytes);
            self.len = needed;
            return Ok(());
        }
        let capacity = self.heap.as_ref().map_or(0, Vec::capacity);
        if needed > capacity {
            if let Err(failure) = self.grow_to(needed) {
                self.failure = Some(failure);
                return Err(fmt::Error);
            }
        }
        let Some(heap) = self.heap.as_mut() else {
            return Err(fmt::Error);
        };
        // capacity was checked above, so this never reallocates
        heap.extend_from_slice(bytes);
        Ok(())
    }
}

impl Debug for LogBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogBuffer")
            .field("contents", &self.as_str())
            .field("spilled", &self.spilled())
            .field("failure", &self.failure)
            .finish()
    }
}

/*
Boilerplate notes for LogBuffer:

- Clone: not implemented; a buffer is scoped to one log call and borrows its allocator.
- Default: not implemented; there is no sensible default allocator to borrow.
- Display: not implemented; use as_str.
*/
