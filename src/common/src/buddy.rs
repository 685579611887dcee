//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! A buddy suballocator over the integer range `[0, capacity)`.
//!
//! This is the allocator that backs one page of a CPU descriptor heap:
//! allocations are contiguous index ranges, sizes are rounded up to the next
//! power of two, and a freed block coalesces with its buddy all the way back
//! up the tree.
use std::collections::BTreeSet;

/// A block handed out by [`BuddyAllocator`].
///
/// The block must be returned to the allocator it came from via
/// [`BuddyAllocator::free`], unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuddyBlock {
    /// The first index of the block.
    pub offset: u32,
    /// The rounded-up (power-of-two) size of the block.
    pub size: u32,
}

/// Buddy suballocator over `[0, capacity)`.
#[derive(Debug)]
pub struct BuddyAllocator {
    capacity: u32,
    used: u32,
    /// `free[k]` holds the offsets of free blocks of size `1 << k`.
    free: Vec<BTreeSet<u32>>,
}

impl BuddyAllocator {
    /// Construct an allocator managing `capacity` units.
    ///
    /// `capacity` must be a non-zero power of two.
    pub fn new(capacity: u32) -> Self {
        assert!(
            capacity.is_power_of_two(),
            "buddy capacity must be a power of two"
        );
        let max_order = capacity.trailing_zeros() as usize;
        let mut free = vec![BTreeSet::new(); max_order + 1];
        free[max_order].insert(0);
        Self {
            capacity,
            used: 0,
            free,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// The number of units currently allocated, after power-of-two rounding.
    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Allocate a contiguous range of at least `count` units.
    ///
    /// Returns `None` if `count` is zero, exceeds the capacity, or no free
    /// block is large enough.
    pub fn allocate(&mut self, count: u32) -> Option<BuddyBlock> {
        if count == 0 || count > self.capacity {
            return None;
        }
        let size = count.next_power_of_two();
        let order = size.trailing_zeros() as usize;

        let source_order = (order..self.free.len()).find(|&k| !self.free[k].is_empty())?;
        let offset = *self.free[source_order].iter().next().unwrap();
        self.free[source_order].remove(&offset);

        // Split the block down to the requested order, returning the upper
        // halves to their free lists.
        for k in (order..source_order).rev() {
            self.free[k].insert(offset + (1u32 << k));
        }

        self.used += size;
        Some(BuddyBlock { offset, size })
    }

    /// Return a block to the allocator, merging it with its buddy whenever
    /// the buddy is also free.
    ///
    /// # Valid Usage
    ///
    /// `block` must have been returned by `allocate` on this allocator and
    /// must not have been freed already.
    pub fn free(&mut self, block: BuddyBlock) {
        debug_assert!(block.size.is_power_of_two());
        debug_assert!(block.offset % block.size == 0);

        let max_order = self.capacity.trailing_zeros() as usize;
        let mut offset = block.offset;
        let mut order = block.size.trailing_zeros() as usize;

        while order < max_order {
            let buddy = offset ^ (1u32 << order);
            if !self.free[order].remove(&buddy) {
                break;
            }
            offset = offset.min(buddy);
            order += 1;
        }
        let inserted = self.free[order].insert(offset);
        assert!(inserted, "double free of buddy block at {}", block.offset);

        self.used -= block.size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausts_and_recovers() {
        let mut alloc = BuddyAllocator::new(8);
        let blocks: Vec<_> = (0..8).map(|_| alloc.allocate(1).unwrap()).collect();
        assert_eq!(alloc.used(), 8);

        // A fully allocated page refuses allocations of any size.
        assert!(alloc.allocate(1).is_none());
        assert!(alloc.allocate(8).is_none());

        for block in blocks {
            alloc.free(block);
        }
        assert!(alloc.is_empty());

        // Coalescing must have restored the full block.
        assert_eq!(alloc.allocate(8).unwrap().offset, 0);
    }

    #[test]
    fn rounds_to_power_of_two() {
        let mut alloc = BuddyAllocator::new(16);
        let block = alloc.allocate(3).unwrap();
        assert_eq!(block.size, 4);
        assert_eq!(alloc.used(), 4);
        alloc.free(block);
        assert_eq!(alloc.used(), 0);
    }

    #[test]
    fn lifo_free_reuses_identical_offset() {
        let mut alloc = BuddyAllocator::new(64);
        let _keep = alloc.allocate(4).unwrap();
        let block = alloc.allocate(4).unwrap();
        let offset = block.offset;
        alloc.free(block);
        assert_eq!(alloc.allocate(4).unwrap().offset, offset);
    }

    #[test]
    fn allocations_never_overlap() {
        let mut alloc = BuddyAllocator::new(32);
        let mut blocks = Vec::new();
        for count in [1u32, 2, 5, 1, 8, 3] {
            blocks.push(alloc.allocate(count).unwrap());
        }
        for (i, a) in blocks.iter().enumerate() {
            for b in blocks.iter().skip(i + 1) {
                assert!(a.offset + a.size <= b.offset || b.offset + b.size <= a.offset);
            }
        }
    }

    #[test]
    fn oversized_request_fails() {
        let mut alloc = BuddyAllocator::new(16);
        assert!(alloc.allocate(17).is_none());
        assert!(alloc.allocate(0).is_none());
    }
}
