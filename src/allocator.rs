// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory allocator of NetIDs within a fixed range

use crate::Error;
use crate::NetIdRange;
use bit_vec::BitVec;
use std::sync::Arc;
use std::sync::Mutex;

#[derive(Debug)]
struct AllocatorInner {
    // One bit per NetID in the range, set when the NetID is allocated.
    used: BitVec,

    // Number of clear bits in `used`, maintained on every change.
    free: u64,
}

impl AllocatorInner {
    // Offset of the lowest clear bit, scanning a block at a time.
    fn first_free(&self) -> Option<usize> {
        let block_bits = u32::BITS as usize;
        self.used
            .storage()
            .iter()
            .enumerate()
            .find(|(_, block)| **block != u32::MAX)
            .map(|(i, block)| i * block_bits + block.trailing_ones() as usize)
            // Bits past the end of the last block are always clear.
            .filter(|offset| *offset < self.used.len())
    }

    fn is_set(&self, offset: usize) -> bool {
        self.used.get(offset).unwrap_or(false)
    }

    fn mark(&mut self, offset: usize) {
        debug_assert!(!self.is_set(offset));
        self.used.set(offset, true);
        self.free -= 1;
    }

    fn unmark(&mut self, offset: usize) {
        debug_assert!(self.is_set(offset));
        self.used.set(offset, false);
        self.free += 1;
    }
}

// Number of bits needed to track every NetID in `range`.
fn bitmap_len(range: NetIdRange) -> Result<usize, Error> {
    usize::try_from(range.size()).map_err(|_| Error::RangeTooLarge(range))
}

/// Hands out NetIDs from a [`NetIdRange`], lowest first
///
/// The allocator is a handle: clones share the same state, so a single
/// allocator can be constructed at controller startup and passed to every
/// worker that allocates or releases NetIDs. All operations take one lock
/// over the whole occupancy map, and are therefore linearizable with respect
/// to each other.
///
/// Uniqueness is only guaranteed within a single allocator's state. There
/// should be exactly one allocator per controller process.
#[derive(Debug, Clone)]
pub struct NetIdAllocator {
    range: NetIdRange,
    inner: Arc<Mutex<AllocatorInner>>,
}

impl NetIdAllocator {
    /// Create an allocator with every NetID in `range` free.
    ///
    /// Fails with [`Error::RangeTooLarge`] if the occupancy bitmap for `range`
    /// cannot be addressed on this target, which only happens for ranges of
    /// 2^32 NetIDs on 32-bit targets.
    pub fn new(range: NetIdRange) -> Result<Self, Error> {
        let nbits = bitmap_len(range)?;
        let inner = AllocatorInner {
            used: BitVec::from_elem(nbits, false),
            free: range.size(),
        };
        Ok(Self { range, inner: Arc::new(Mutex::new(inner)) })
    }

    pub fn range(&self) -> NetIdRange {
        self.range
    }

    /// Allocate the lowest-numbered free NetID.
    ///
    /// Fails with [`Error::Full`] when every NetID in the range is in use.
    /// Each successful call consumes one NetID, so callers must not retry a
    /// call that succeeded.
    pub fn allocate_next(&self) -> Result<u32, Error> {
        let mut inner = self.inner.lock().unwrap();
        let offset = inner.first_free().ok_or(Error::Full(self.range))?;
        inner.mark(offset);
        Ok(self.range.id_at(offset))
    }

    /// Allocate a specific NetID.
    ///
    /// This is used to replay assignments recorded before the allocator was
    /// created, so concurrent attempts to allocate the same NetID resolve to
    /// exactly one success and [`Error::AlreadyAllocated`] for the rest.
    pub fn allocate(&self, id: u32) -> Result<(), Error> {
        if !self.range.contains(id) {
            return Err(Error::NotInRange { id, range: self.range });
        }
        let offset = self.range.offset_of(id);
        let mut inner = self.inner.lock().unwrap();
        if inner.is_set(offset) {
            return Err(Error::AlreadyAllocated(id));
        }
        inner.mark(offset);
        Ok(())
    }

    /// Return a NetID to the pool.
    ///
    /// Releasing a NetID that is not allocated, including one outside the
    /// range, succeeds without changing anything. Deletion events may be
    /// delivered more than once, and each delivery releases the same NetID.
    pub fn release(&self, id: u32) -> Result<(), Error> {
        if !self.range.contains(id) {
            return Ok(());
        }
        let offset = self.range.offset_of(id);
        let mut inner = self.inner.lock().unwrap();
        if inner.is_set(offset) {
            inner.unmark(offset);
        }
        Ok(())
    }

    /// Returns true if `id` is currently allocated.
    pub fn has(&self, id: u32) -> bool {
        if !self.range.contains(id) {
            return false;
        }
        let offset = self.range.offset_of(id);
        self.inner.lock().unwrap().is_set(offset)
    }

    /// Number of free NetIDs.
    pub fn free(&self) -> u64 {
        self.inner.lock().unwrap().free
    }

    /// Number of allocated NetIDs.
    pub fn used(&self) -> u64 {
        self.range.size() - self.free()
    }

    /// Snapshot of all allocated NetIDs, in ascending order.
    pub fn allocated(&self) -> Vec<u32> {
        let inner = self.inner.lock().unwrap();
        inner
            .used
            .iter()
            .enumerate()
            .filter(|(_, set)| *set)
            .map(|(offset, _)| self.range.id_at(offset))
            .collect()
    }
}
