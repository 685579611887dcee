//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Implementation of `Fence` and `Semaphore` for D3D12.
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};

use windows::Win32::Foundation::{CloseHandle, HANDLE, WAIT_OBJECT_0};
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::System::Threading::{CreateEventW, WaitForSingleObject, INFINITE};

use mica_base as base;
use mica_base::Fence as _;
use mica_base::{Error, ErrorKind, Result};

use crate::device::DeviceRef;
use crate::utils::translate_hresult;

/// Implementation of `Fence`: an `ID3D12Fence` plus a Win32 event used
/// for host waits.
#[derive(Debug)]
pub struct D3D12Fence {
    _device: DeviceRef,
    raw: ID3D12Fence,
    event: HANDLE,
}

unsafe impl Send for D3D12Fence {}
unsafe impl Sync for D3D12Fence {}

impl D3D12Fence {
    pub(crate) fn new(device: DeviceRef, initial_value: u64) -> Result<Self> {
        let raw: ID3D12Fence =
            unsafe { device.raw().CreateFence(initial_value, D3D12_FENCE_FLAG_NONE) }
                .map_err(translate_hresult)?;
        let event = unsafe { CreateEventW(None, false, false, None) }.map_err(translate_hresult)?;
        Ok(Self {
            _device: device,
            raw,
            event,
        })
    }

    pub fn raw(&self) -> &ID3D12Fence {
        &self.raw
    }
}

impl Drop for D3D12Fence {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.event);
        }
    }
}

impl base::Fence for D3D12Fence {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn completed_value(&self) -> u64 {
        unsafe { self.raw.GetCompletedValue() }
    }

    fn wait(&self, value: u64) -> Result<()> {
        if self.completed_value() >= value {
            return Ok(());
        }
        unsafe {
            self.raw
                .SetEventOnCompletion(value, self.event)
                .map_err(translate_hresult)?;
            if WaitForSingleObject(self.event, INFINITE) != WAIT_OBJECT_0 {
                return Err(Error::new(ErrorKind::DeviceLost));
            }
        }
        Ok(())
    }
}

/// Implementation of `Semaphore`: D3D12 has no binary semaphore, so
/// queue-to-queue edges ride an internal fence with a private counter.
#[derive(Debug)]
pub struct D3D12Semaphore {
    _device: DeviceRef,
    raw: ID3D12Fence,
    next_value: AtomicU64,
}

unsafe impl Send for D3D12Semaphore {}
unsafe impl Sync for D3D12Semaphore {}

impl D3D12Semaphore {
    pub(crate) fn new(device: DeviceRef) -> Result<Self> {
        let raw: ID3D12Fence = unsafe { device.raw().CreateFence(0, D3D12_FENCE_FLAG_NONE) }
            .map_err(translate_hresult)?;
        Ok(Self {
            _device: device,
            raw,
            next_value: AtomicU64::new(0),
        })
    }

    pub(crate) fn raw(&self) -> &ID3D12Fence {
        &self.raw
    }

    /// The value the next signal will write.
    pub(crate) fn advance(&self) -> u64 {
        self.next_value.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// The value the most recent signal wrote.
    pub(crate) fn current(&self) -> u64 {
        self.next_value.load(Ordering::Acquire)
    }
}

impl base::Semaphore for D3D12Semaphore {
    fn as_any(&self) -> &dyn Any {
        self
    }
}
