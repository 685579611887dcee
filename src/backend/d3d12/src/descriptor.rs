//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Descriptor heaps and their allocators.
//!
//! Two independent allocation schemes serve two needs:
//!
//!  - [`CpuDescriptorAllocator`] — staging descriptors (CBV/SRV/UAV, RTV,
//!    DSV, sampler) on CPU-only heaps, paged with a buddy allocator per
//!    page and a keep-free-pages reclamation policy.
//!  - [`GpuDescriptorAllocator`] — one fixed-size shader-visible heap per
//!    kind (resource, sampler) with a coalescing free-list; descriptor
//!    sets are slices of it.
use parking_lot::Mutex;
use windows::Win32::Graphics::Direct3D12::*;

use mica_base::{Error, ErrorKind, Result};
use mica_common::{FreeListAllocator, FreeListBlock, PagedBlock, PagedBuddy};

use crate::utils::translate_hresult;

/// A `ID3D12DescriptorHeap` plus its base handles and increment size.
#[derive(Debug, Clone)]
pub struct DescriptorHeap {
    heap: ID3D12DescriptorHeap,
    ty: D3D12_DESCRIPTOR_HEAP_TYPE,
    increment: u32,
    cpu_base: D3D12_CPU_DESCRIPTOR_HANDLE,
    gpu_base: D3D12_GPU_DESCRIPTOR_HANDLE,
}

impl DescriptorHeap {
    pub(crate) fn new(
        device: &ID3D12Device,
        ty: D3D12_DESCRIPTOR_HEAP_TYPE,
        capacity: u32,
        shader_visible: bool,
    ) -> Result<Self> {
        let desc = D3D12_DESCRIPTOR_HEAP_DESC {
            Type: ty,
            NumDescriptors: capacity,
            Flags: if shader_visible {
                D3D12_DESCRIPTOR_HEAP_FLAG_SHADER_VISIBLE
            } else {
                D3D12_DESCRIPTOR_HEAP_FLAG_NONE
            },
            NodeMask: 0,
        };
        let heap: ID3D12DescriptorHeap =
            unsafe { device.CreateDescriptorHeap(&desc) }.map_err(translate_hresult)?;
        let increment = unsafe { device.GetDescriptorHandleIncrementSize(ty) };
        let cpu_base = unsafe { heap.GetCPUDescriptorHandleForHeapStart() };
        let gpu_base = if shader_visible {
            unsafe { heap.GetGPUDescriptorHandleForHeapStart() }
        } else {
            D3D12_GPU_DESCRIPTOR_HANDLE::default()
        };
        Ok(Self {
            heap,
            ty,
            increment,
            cpu_base,
            gpu_base,
        })
    }

    pub fn raw(&self) -> &ID3D12DescriptorHeap {
        &self.heap
    }

    pub fn heap_type(&self) -> D3D12_DESCRIPTOR_HEAP_TYPE {
        self.ty
    }

    pub fn cpu_handle(&self, index: u32) -> D3D12_CPU_DESCRIPTOR_HANDLE {
        D3D12_CPU_DESCRIPTOR_HANDLE {
            ptr: self.cpu_base.ptr + (index as usize) * (self.increment as usize),
        }
    }

    pub fn gpu_handle(&self, index: u32) -> D3D12_GPU_DESCRIPTOR_HANDLE {
        D3D12_GPU_DESCRIPTOR_HANDLE {
            ptr: self.gpu_base.ptr + (index as u64) * (self.increment as u64),
        }
    }
}

/// A CPU-heap allocation: the owning page's heap plus the buddy block.
#[derive(Debug, Clone)]
pub struct CpuDescriptor {
    pub heap: DescriptorHeap,
    pub index: u32,
    pub count: u32,
    block: PagedBlock,
}

impl CpuDescriptor {
    pub fn cpu_handle(&self, offset: u32) -> D3D12_CPU_DESCRIPTOR_HANDLE {
        debug_assert!(offset < self.count);
        self.heap.cpu_handle(self.index + offset)
    }
}

/// Paging + buddy CPU descriptor allocator. Internally locked; one exists
/// per CPU-visible heap type.
#[derive(Debug)]
pub struct CpuDescriptorAllocator {
    device: ID3D12Device,
    ty: D3D12_DESCRIPTOR_HEAP_TYPE,
    pager: Mutex<PagedBuddy<DescriptorHeap>>,
}

impl CpuDescriptorAllocator {
    pub(crate) fn new(
        device: ID3D12Device,
        ty: D3D12_DESCRIPTOR_HEAP_TYPE,
        page_capacity: u32,
        keep_free_pages: usize,
    ) -> Self {
        Self {
            device,
            ty,
            pager: Mutex::new(PagedBuddy::new(page_capacity, keep_free_pages)),
        }
    }

    /// Allocate a contiguous descriptor range. Probes existing pages and
    /// appends a fresh heap page on exhaustion.
    pub fn allocate(&self, count: u32) -> Result<CpuDescriptor> {
        let mut pager = self.pager.lock();
        if count == 0 || count > pager.page_capacity() {
            return Err(Error::new(ErrorKind::Validation));
        }
        let block = match pager.try_allocate(count) {
            Some(block) => block,
            None => {
                let heap = DescriptorHeap::new(&self.device, self.ty, pager.page_capacity(), false)?;
                pager.add_page(heap);
                pager
                    .try_allocate(count)
                    .expect("fresh descriptor page refused an in-range allocation")
            }
        };
        let heap = pager
            .page_resource(block.page)
            .expect("allocation on a reclaimed page")
            .clone();
        Ok(CpuDescriptor {
            heap,
            index: block.block.offset,
            count,
            block,
        })
    }

    /// Return a range; empty pages beyond the keep count are released.
    pub fn free(&self, descriptor: CpuDescriptor) {
        self.pager.lock().free(descriptor.block);
    }

    /// Live page count, exposed for tests and diagnostics.
    pub fn page_count(&self) -> usize {
        self.pager.lock().page_count()
    }
}

/// A shader-visible heap slice.
#[derive(Debug, Clone)]
pub struct GpuDescriptor {
    pub heap: DescriptorHeap,
    pub index: u32,
    pub count: u32,
    block: FreeListBlock,
}

impl GpuDescriptor {
    pub fn cpu_handle(&self, offset: u32) -> D3D12_CPU_DESCRIPTOR_HANDLE {
        debug_assert!(offset < self.count);
        self.heap.cpu_handle(self.index + offset)
    }

    pub fn gpu_handle(&self, offset: u32) -> D3D12_GPU_DESCRIPTOR_HANDLE {
        debug_assert!(offset <= self.count);
        self.heap.gpu_handle(self.index + offset)
    }
}

/// Free-list allocator over one shader-visible heap whose size is fixed at
/// creation. Internally locked.
#[derive(Debug)]
pub struct GpuDescriptorAllocator {
    heap: DescriptorHeap,
    allocator: Mutex<FreeListAllocator>,
}

impl GpuDescriptorAllocator {
    pub(crate) fn new(
        device: &ID3D12Device,
        ty: D3D12_DESCRIPTOR_HEAP_TYPE,
        capacity: u32,
    ) -> Result<Self> {
        Ok(Self {
            heap: DescriptorHeap::new(device, ty, capacity, true)?,
            allocator: Mutex::new(FreeListAllocator::new(capacity as u64)),
        })
    }

    pub fn heap(&self) -> &DescriptorHeap {
        &self.heap
    }

    pub fn allocate(&self, count: u32) -> Result<GpuDescriptor> {
        let block = self.allocator.lock().allocate(count as u64).ok_or_else(|| {
            log::error!("shader-visible descriptor heap exhausted ({} requested)", count);
            Error::new(ErrorKind::OutOfMemory)
        })?;
        Ok(GpuDescriptor {
            heap: self.heap.clone(),
            index: block.offset as u32,
            count,
            block,
        })
    }

    pub fn free(&self, descriptor: GpuDescriptor) {
        self.allocator.lock().free(descriptor.block);
    }
}
