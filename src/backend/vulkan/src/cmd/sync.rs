//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Implementation of `Fence` and `Semaphore` for Vulkan.
//!
//! The interface's fence — a monotonic 64-bit value signaled by queues and
//! waited by the host — is a timeline semaphore. The interface's semaphore
//! is a plain binary semaphore for queue-to-queue edges.
use std::any::Any;

use ash::vk;

use mica_base as base;
use mica_base::Result;

use crate::device::DeviceRef;
use crate::utils::translate_generic_error;

#[derive(Debug)]
pub struct VulkanFence {
    device: DeviceRef,
    vk_semaphore: vk::Semaphore,
}

impl VulkanFence {
    pub(crate) fn new(device: DeviceRef, initial_value: u64) -> Result<Self> {
        let mut type_info = vk::SemaphoreTypeCreateInfo::default()
            .semaphore_type(vk::SemaphoreType::TIMELINE)
            .initial_value(initial_value);
        let info = vk::SemaphoreCreateInfo::default().push_next(&mut type_info);
        let vk_semaphore = unsafe { device.raw().create_semaphore(&info, None) }
            .map_err(translate_generic_error)?;
        Ok(Self {
            device,
            vk_semaphore,
        })
    }

    pub fn vk_semaphore(&self) -> vk::Semaphore {
        self.vk_semaphore
    }
}

impl Drop for VulkanFence {
    fn drop(&mut self) {
        unsafe {
            self.device.raw().destroy_semaphore(self.vk_semaphore, None);
        }
    }
}

impl base::Fence for VulkanFence {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn completed_value(&self) -> u64 {
        unsafe {
            self.device
                .raw()
                .get_semaphore_counter_value(self.vk_semaphore)
        }
        .unwrap_or(0)
    }

    fn wait(&self, value: u64) -> Result<()> {
        let semaphores = [self.vk_semaphore];
        let values = [value];
        let info = vk::SemaphoreWaitInfo::default()
            .semaphores(&semaphores)
            .values(&values);
        unsafe { self.device.raw().wait_semaphores(&info, u64::MAX) }
            .map_err(translate_generic_error)
    }
}

#[derive(Debug)]
pub struct VulkanSemaphore {
    device: DeviceRef,
    vk_semaphore: vk::Semaphore,
}

impl VulkanSemaphore {
    pub(crate) fn new(device: DeviceRef) -> Result<Self> {
        let info = vk::SemaphoreCreateInfo::default();
        let vk_semaphore = unsafe { device.raw().create_semaphore(&info, None) }
            .map_err(translate_generic_error)?;
        Ok(Self {
            device,
            vk_semaphore,
        })
    }

    pub fn vk_semaphore(&self) -> vk::Semaphore {
        self.vk_semaphore
    }
}

impl Drop for VulkanSemaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.raw().destroy_semaphore(self.vk_semaphore, None);
        }
    }
}

impl base::Semaphore for VulkanSemaphore {
    fn as_any(&self) -> &dyn Any {
        self
    }
}
