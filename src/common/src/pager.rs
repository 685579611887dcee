//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Paging policy for CPU descriptor allocation.
//!
//! [`PagedBuddy`] is the platform-free half of a paged descriptor allocator:
//! each page pairs a caller-supplied resource (a native descriptor heap)
//! with a [`BuddyAllocator`] over its capacity. Allocation probes a hint
//! page first, then walks the remaining pages; the caller appends a fresh
//! page on exhaustion. Once the number of completely free pages exceeds
//! `keep_free_pages`, empty pages are dropped.
use crate::buddy::{BuddyAllocator, BuddyBlock};

#[derive(Debug)]
struct Page<R> {
    resource: R,
    buddy: BuddyAllocator,
}

/// A block handed out by [`PagedBuddy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagedBlock {
    /// Index of the owning page. Stable for the lifetime of the block.
    pub page: usize,
    /// The block within the page.
    pub block: BuddyBlock,
}

/// Multi-page buddy allocator. See the module documentation.
#[derive(Debug)]
pub struct PagedBuddy<R> {
    /// Slots are kept stable; reclaimed pages leave a `None` behind that a
    /// later `add_page` may reuse.
    pages: Vec<Option<Page<R>>>,
    hint: usize,
    page_capacity: u32,
    keep_free_pages: usize,
}

impl<R> PagedBuddy<R> {
    /// `page_capacity` must be a non-zero power of two.
    pub fn new(page_capacity: u32, keep_free_pages: usize) -> Self {
        assert!(page_capacity.is_power_of_two());
        Self {
            pages: Vec::new(),
            hint: 0,
            page_capacity,
            keep_free_pages,
        }
    }

    pub fn page_capacity(&self) -> u32 {
        self.page_capacity
    }

    /// The number of live (non-reclaimed) pages.
    pub fn page_count(&self) -> usize {
        self.pages.iter().filter(|p| p.is_some()).count()
    }

    /// Access the resource backing a page.
    pub fn page_resource(&self, index: usize) -> Option<&R> {
        self.pages.get(index).and_then(|p| p.as_ref()).map(|p| &p.resource)
    }

    /// Try to place `count` units on an existing page. Returns `None` when
    /// every live page misses; the caller then appends a page via
    /// [`add_page`](Self::add_page) and retries.
    pub fn try_allocate(&mut self, count: u32) -> Option<PagedBlock> {
        if count == 0 || count > self.page_capacity {
            return None;
        }
        let page_count = self.pages.len();
        for probe in 0..page_count {
            let index = (self.hint + probe) % page_count;
            if let Some(page) = self.pages[index].as_mut() {
                if let Some(block) = page.buddy.allocate(count) {
                    self.hint = index;
                    return Some(PagedBlock { page: index, block });
                }
            }
        }
        None
    }

    /// Register a fresh page and return its stable index.
    pub fn add_page(&mut self, resource: R) -> usize {
        let page = Page {
            resource,
            buddy: BuddyAllocator::new(self.page_capacity),
        };
        if let Some(index) = self.pages.iter().position(|p| p.is_none()) {
            self.pages[index] = Some(page);
            self.hint = index;
            index
        } else {
            self.pages.push(Some(page));
            self.hint = self.pages.len() - 1;
            self.hint
        }
    }

    /// Return a block to its page. Empty pages beyond `keep_free_pages` are
    /// reclaimed (their resources dropped).
    ///
    /// # Valid Usage
    ///
    /// `block` must have been returned by `try_allocate` on this allocator
    /// and must not have been freed already.
    pub fn free(&mut self, block: PagedBlock) {
        {
            let page = self.pages[block.page]
                .as_mut()
                .expect("free on a reclaimed page");
            page.buddy.free(block.block);
            if !page.buddy.is_empty() {
                return;
            }
        }

        let free_pages = self
            .pages
            .iter()
            .filter(|p| p.as_ref().map_or(false, |p| p.buddy.is_empty()))
            .count();
        if free_pages > self.keep_free_pages {
            self.pages[block.page] = None;
            if self.hint == block.page {
                self.hint = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(pager: &mut PagedBuddy<u32>, count: u32) -> Vec<PagedBlock> {
        let mut blocks = Vec::new();
        for _ in 0..count {
            let block = match pager.try_allocate(1) {
                Some(block) => block,
                None => {
                    let id = pager.page_count() as u32;
                    pager.add_page(id);
                    pager.try_allocate(1).unwrap()
                }
            };
            blocks.push(block);
        }
        blocks
    }

    #[test]
    fn eviction_keeps_configured_free_pages() {
        // Page capacity 256, keep one free page: allocating and freeing 1024
        // single descriptors in LIFO order must end with exactly one page.
        let mut pager = PagedBuddy::new(256, 1);
        let mut blocks = fill(&mut pager, 1024);
        assert_eq!(pager.page_count(), 4);

        while let Some(block) = blocks.pop() {
            pager.free(block);
        }
        assert_eq!(pager.page_count(), 1);
    }

    #[test]
    fn allocation_never_straddles_pages() {
        let mut pager = PagedBuddy::new(16, 0);
        pager.add_page(0);
        let a = pager.try_allocate(16).unwrap();
        // Page 0 is full; a second request must miss rather than spill.
        assert!(pager.try_allocate(1).is_none());
        pager.add_page(1);
        let b = pager.try_allocate(16).unwrap();
        assert_ne!(a.page, b.page);
    }

    #[test]
    fn hint_page_is_probed_first() {
        let mut pager = PagedBuddy::new(16, 2);
        pager.add_page(0);
        pager.add_page(1);
        // `add_page` moved the hint to page 1.
        let block = pager.try_allocate(4).unwrap();
        assert_eq!(block.page, 1);
    }

    #[test]
    fn reclaimed_slot_is_reused() {
        let mut pager = PagedBuddy::new(16, 0);
        pager.add_page(7);
        let block = pager.try_allocate(8).unwrap();
        pager.free(block);
        assert_eq!(pager.page_count(), 0);

        let index = pager.add_page(8);
        assert_eq!(index, 0);
        assert_eq!(pager.page_count(), 1);
    }
}
