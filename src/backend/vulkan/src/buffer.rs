//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Implementation of `Buffer` for Vulkan.
use std::any::Any;

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use log::error;
use parking_lot::Mutex;

use mica_base as base;
use mica_base::Buffer as _;
use mica_base::{Error, ErrorKind, Result};

use crate::device::DeviceRef;
use crate::utils::translate_generic_error;

fn translate_buffer_usage(usage: base::BufferUsage) -> vk::BufferUsageFlags {
    use base::BufferUsage as U;
    let mut ret = vk::BufferUsageFlags::empty();
    if usage.contains(U::COPY_SRC) {
        ret |= vk::BufferUsageFlags::TRANSFER_SRC;
    }
    if usage.contains(U::COPY_DST) {
        ret |= vk::BufferUsageFlags::TRANSFER_DST;
    }
    if usage.contains(U::INDEX) {
        ret |= vk::BufferUsageFlags::INDEX_BUFFER;
    }
    if usage.contains(U::VERTEX) {
        ret |= vk::BufferUsageFlags::VERTEX_BUFFER;
    }
    if usage.contains(U::CBUFFER) {
        ret |= vk::BufferUsageFlags::UNIFORM_BUFFER;
    }
    if usage.contains(U::RESOURCE) || usage.contains(U::UNORDERED_ACCESS) {
        ret |= vk::BufferUsageFlags::STORAGE_BUFFER;
    }
    if usage.contains(U::INDIRECT) {
        ret |= vk::BufferUsageFlags::INDIRECT_BUFFER;
    }
    ret
}

fn memory_location(kind: base::MemoryKind) -> MemoryLocation {
    match kind {
        base::MemoryKind::Device => MemoryLocation::GpuOnly,
        base::MemoryKind::Upload => MemoryLocation::CpuToGpu,
        base::MemoryKind::Readback => MemoryLocation::GpuToCpu,
    }
}

/// Implementation of `Buffer` for Vulkan: the native handle plus its
/// allocator block. Upload/readback memory is persistently mapped.
#[derive(Debug)]
pub struct VulkanBuffer {
    device: DeviceRef,
    desc: base::BufferDesc,
    vk_buffer: vk::Buffer,
    allocation: Mutex<Option<Allocation>>,
    /// Persistent map base, null for device-local memory.
    mapped: *mut u8,
}

unsafe impl Send for VulkanBuffer {}
unsafe impl Sync for VulkanBuffer {}

impl VulkanBuffer {
    pub(crate) fn new(device: DeviceRef, desc: &base::BufferDesc) -> Result<Self> {
        if desc.size == 0 {
            error!("buffer '{}' has zero size", desc.name);
            return Err(Error::new(ErrorKind::Validation));
        }

        let info = vk::BufferCreateInfo::default()
            .size(desc.size)
            .usage(translate_buffer_usage(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let vk_buffer = unsafe { device.raw().create_buffer(&info, None) }
            .map_err(translate_generic_error)?;
        let requirements = unsafe { device.raw().get_buffer_memory_requirements(vk_buffer) };

        let allocation = device
            .allocator()
            .lock()
            .as_mut()
            .expect("allocator already torn down")
            .allocate(&AllocationCreateDesc {
                name: &desc.name,
                requirements,
                location: memory_location(desc.memory),
                linear: true,
                allocation_scheme: if desc.hints.contains(base::ResourceHints::DEDICATED) {
                    AllocationScheme::DedicatedBuffer(vk_buffer)
                } else {
                    AllocationScheme::GpuAllocatorManaged
                },
            })
            .map_err(|err| {
                error!("buffer allocation failed: {}", err);
                unsafe { device.raw().destroy_buffer(vk_buffer, None) };
                Error::with_detail(ErrorKind::OutOfMemory, err.to_string())
            })?;

        if let Err(result) = unsafe {
            device
                .raw()
                .bind_buffer_memory(vk_buffer, allocation.memory(), allocation.offset())
        } {
            unsafe { device.raw().destroy_buffer(vk_buffer, None) };
            let _ = device
                .allocator()
                .lock()
                .as_mut()
                .map(|a| a.free(allocation));
            return Err(translate_generic_error(result));
        }

        let mapped = allocation
            .mapped_ptr()
            .map(|p| p.as_ptr() as *mut u8)
            .unwrap_or(std::ptr::null_mut());

        Ok(Self {
            device,
            desc: desc.clone(),
            vk_buffer,
            allocation: Mutex::new(Some(allocation)),
            mapped,
        })
    }

    pub fn vk_buffer(&self) -> vk::Buffer {
        self.vk_buffer
    }
}

impl Drop for VulkanBuffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.lock().take() {
            if let Some(allocator) = self.device.allocator().lock().as_mut() {
                let _ = allocator.free(allocation);
            }
        }
        unsafe {
            self.device.raw().destroy_buffer(self.vk_buffer, None);
        }
    }
}

impl base::Buffer for VulkanBuffer {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn desc(&self) -> &base::BufferDesc {
        &self.desc
    }

    fn map(&self, offset: u64, size: u64) -> Result<*mut u8> {
        if self.mapped.is_null() {
            error!("buffer '{}' is not host-visible", self.desc.name);
            return Err(Error::new(ErrorKind::Validation));
        }
        if offset + size > self.desc.size {
            error!(
                "map range {}..{} exceeds buffer size {}",
                offset,
                offset + size,
                self.desc.size
            );
            return Err(Error::new(ErrorKind::Validation));
        }
        Ok(unsafe { self.mapped.add(offset as usize) })
    }

    fn unmap(&self, _offset: u64, _size: u64) {
        // Persistently mapped; host-coherent memory needs no flush here.
    }
}

/// Implementation of `BufferView` for Vulkan. The interface's buffer views
/// are plain (buffer, range) pairs; typed texel views are not part of this
/// design, so no `VkBufferView` is created.
#[derive(Debug)]
pub struct VulkanBufferView {
    desc: base::BufferViewDesc,
}

impl VulkanBufferView {
    pub(crate) fn new(desc: &base::BufferViewDesc) -> Result<Self> {
        let buffer_size = base::Buffer::desc(&*desc.buffer).size;
        if desc.range.offset + desc.range.size > buffer_size {
            error!(
                "buffer view range {}..{} exceeds buffer size {}",
                desc.range.offset,
                desc.range.offset + desc.range.size,
                buffer_size
            );
            return Err(Error::new(ErrorKind::Validation));
        }
        Ok(Self { desc: desc.clone() })
    }

    pub(crate) fn vk_buffer(&self) -> vk::Buffer {
        let buffer: &VulkanBuffer = self
            .desc
            .buffer
            .as_any()
            .downcast_ref()
            .expect("foreign buffer in view");
        buffer.vk_buffer()
    }
}

impl base::BufferView for VulkanBufferView {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn desc(&self) -> &base::BufferViewDesc {
        &self.desc
    }
}
