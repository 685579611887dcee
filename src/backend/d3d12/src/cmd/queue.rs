//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Implementation of `CommandQueue` for D3D12.
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;
use windows::core::Interface;
use windows::Win32::Graphics::Direct3D12::*;

use mica_base as base;
use mica_base::{CommandBuffer as _, Fence as _, Semaphore as _};
use mica_base::Result;

use crate::cmd::buffer::D3D12CommandBuffer;
use crate::cmd::sync::{D3D12Fence, D3D12Semaphore};
use crate::device::DeviceRef;
use crate::utils::translate_hresult;

#[derive(Debug)]
pub struct D3D12Queue {
    device: DeviceRef,
    raw: ID3D12CommandQueue,
    ty: base::QueueType,
    /// Internal fence backing `wait_idle`.
    idle_fence: D3D12Fence,
    idle_value: AtomicU64,
}

unsafe impl Send for D3D12Queue {}
unsafe impl Sync for D3D12Queue {}

impl D3D12Queue {
    pub(crate) fn new(device: DeviceRef, ty: base::QueueType) -> Result<Self> {
        let desc = D3D12_COMMAND_QUEUE_DESC {
            Type: list_type(ty),
            Priority: D3D12_COMMAND_QUEUE_PRIORITY_NORMAL.0,
            Flags: D3D12_COMMAND_QUEUE_FLAG_NONE,
            NodeMask: 0,
        };
        let raw: ID3D12CommandQueue =
            unsafe { device.raw().CreateCommandQueue(&desc) }.map_err(translate_hresult)?;
        let idle_fence = D3D12Fence::new(device.clone(), 0)?;
        Ok(Self {
            device,
            raw,
            ty,
            idle_fence,
            idle_value: AtomicU64::new(0),
        })
    }

    pub fn raw(&self) -> &ID3D12CommandQueue {
        &self.raw
    }

    pub(crate) fn list_type(&self) -> D3D12_COMMAND_LIST_TYPE {
        list_type(self.ty)
    }
}

pub(crate) fn list_type(ty: base::QueueType) -> D3D12_COMMAND_LIST_TYPE {
    match ty {
        base::QueueType::Direct => D3D12_COMMAND_LIST_TYPE_DIRECT,
        base::QueueType::Compute => D3D12_COMMAND_LIST_TYPE_COMPUTE,
        base::QueueType::Copy => D3D12_COMMAND_LIST_TYPE_COPY,
    }
}

impl base::CommandQueue for D3D12Queue {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn queue_type(&self) -> base::QueueType {
        self.ty
    }

    fn submit(&self, desc: base::SubmitDesc<'_>) -> Result<()> {
        // GPU-side waits precede execution.
        for (fence, value) in desc.wait_fences {
            let fence: &D3D12Fence = fence
                .as_any()
                .downcast_ref()
                .expect("foreign fence submitted to d3d12 queue");
            unsafe { self.raw.Wait(fence.raw(), *value) }.map_err(translate_hresult)?;
        }
        for semaphore in desc.wait_semaphores {
            let semaphore: &D3D12Semaphore = semaphore
                .as_any()
                .downcast_ref()
                .expect("foreign semaphore submitted to d3d12 queue");
            unsafe { self.raw.Wait(semaphore.raw(), semaphore.current()) }
                .map_err(translate_hresult)?;
        }

        let mut lists: SmallVec<[Option<ID3D12CommandList>; 8]> = SmallVec::new();
        for cb in desc.command_buffers {
            let cb: &D3D12CommandBuffer = cb
                .as_any()
                .downcast_ref()
                .expect("foreign command buffer submitted to d3d12 queue");
            lists.push(Some(cb.raw_list().cast().map_err(translate_hresult)?));
        }
        if !lists.is_empty() {
            unsafe { self.raw.ExecuteCommandLists(&lists) };
        }

        for (fence, value) in desc.signal_fences {
            let fence: &D3D12Fence = fence
                .as_any()
                .downcast_ref()
                .expect("foreign fence submitted to d3d12 queue");
            unsafe { self.raw.Signal(fence.raw(), *value) }.map_err(translate_hresult)?;
        }
        for semaphore in desc.signal_semaphores {
            let semaphore: &D3D12Semaphore = semaphore
                .as_any()
                .downcast_ref()
                .expect("foreign semaphore submitted to d3d12 queue");
            let value = semaphore.advance();
            unsafe { self.raw.Signal(semaphore.raw(), value) }.map_err(translate_hresult)?;
        }
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        let value = self.idle_value.fetch_add(1, Ordering::AcqRel) + 1;
        unsafe { self.raw.Signal(self.idle_fence.raw(), value) }.map_err(translate_hresult)?;
        self.idle_fence.wait(value)
    }
}
