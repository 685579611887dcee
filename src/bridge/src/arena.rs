//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! The per-frame constant-buffer upload arena.
//!
//! A linked list of persistently mapped upload buffers with a bump pointer
//! in the active one. Allocations persist until [`CBufferArena::reset`];
//! the canonical pattern is one arena per frame in flight, reset once the
//! frame's fence has signaled.
use mica_base::{
    BufferDesc, BufferRef, BufferUsage, DeviceRef, DeviceSize, MemoryKind, Result,
};
use mica_base::{Buffer as _, Device as _};
use mica_common::align_up;

/// The default size of one arena block.
pub const DEFAULT_BLOCK_SIZE: DeviceSize = 64 * 1024;

struct ArenaBlock {
    buffer: BufferRef,
    mapped: *mut u8,
    size: DeviceSize,
}

/// One suballocation: a range of an upload buffer plus its mapped pointer.
pub struct CBufferAllocation {
    pub buffer: BufferRef,
    pub offset: DeviceSize,
    pub size: DeviceSize,
    mapped: *mut u8,
}

impl CBufferAllocation {
    /// Copy `data` to the start of the allocation.
    ///
    /// # Valid Usage
    ///
    /// `data.len()` must not exceed the allocation size, and the GPU must
    /// not be reading the range concurrently.
    pub fn write(&self, data: &[u8]) {
        assert!(data.len() as DeviceSize <= self.size);
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), self.mapped, data.len());
        }
    }
}

/// See the module documentation.
pub struct CBufferArena {
    device: DeviceRef,
    block_size: DeviceSize,
    blocks: Vec<ArenaBlock>,
    /// Index of the block the bump pointer lives in.
    current: usize,
    offset: DeviceSize,
}

impl CBufferArena {
    pub fn new(device: DeviceRef, block_size: DeviceSize) -> Self {
        Self {
            device,
            block_size: block_size.max(1),
            blocks: Vec::new(),
            current: 0,
            offset: 0,
        }
    }

    /// Allocate `size` bytes aligned to `align` (which must be non-zero).
    pub fn allocate(&mut self, size: DeviceSize, align: DeviceSize) -> Result<CBufferAllocation> {
        debug_assert!(align != 0);

        // Walk to a block with room, appending one if none is left. Blocks
        // already skipped this frame stay skipped until `reset`.
        loop {
            if self.current < self.blocks.len() {
                let block = &self.blocks[self.current];
                let offset = align_up(self.offset, align);
                if offset + size <= block.size {
                    self.offset = offset + size;
                    return Ok(CBufferAllocation {
                        buffer: block.buffer.clone(),
                        offset,
                        size,
                        mapped: unsafe { block.mapped.add(offset as usize) },
                    });
                }
                self.current += 1;
                self.offset = 0;
                continue;
            }
            self.grow(size)?;
        }
    }

    /// Allocate and copy in one step.
    pub fn upload(&mut self, data: &[u8], align: DeviceSize) -> Result<CBufferAllocation> {
        let alloc = self.allocate(data.len() as DeviceSize, align)?;
        alloc.write(data);
        Ok(alloc)
    }

    /// Rewind the bump pointer, making every prior allocation's range
    /// available again. Blocks are kept mapped and reused.
    ///
    /// # Valid Usage
    ///
    /// The GPU must have observed (finished reading) all prior allocations;
    /// in practice, wait the frame fence first.
    pub fn reset(&mut self) {
        self.current = 0;
        self.offset = 0;
    }

    /// Total bytes of upload memory owned by the arena.
    pub fn capacity(&self) -> DeviceSize {
        self.blocks.iter().map(|b| b.size).sum()
    }

    fn grow(&mut self, min_size: DeviceSize) -> Result<()> {
        let size = self.block_size.max(min_size);
        let buffer = self.device.create_buffer(&BufferDesc {
            size,
            memory: MemoryKind::Upload,
            usage: BufferUsage::CBUFFER | BufferUsage::MAP_WRITE,
            name: "cbuffer-arena".to_owned(),
            ..Default::default()
        })?;
        let mapped = buffer.map(0, size)?;
        self.blocks.push(ArenaBlock {
            buffer,
            mapped,
            size,
        });
        self.current = self.blocks.len() - 1;
        self.offset = 0;
        Ok(())
    }
}

impl Drop for CBufferArena {
    fn drop(&mut self) {
        for block in &self.blocks {
            block.buffer.unmap(0, block.size);
        }
    }
}

impl std::fmt::Debug for CBufferArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CBufferArena")
            .field("block_size", &self.block_size)
            .field("blocks", &self.blocks.len())
            .field("current", &self.current)
            .field("offset", &self.offset)
            .finish()
    }
}
