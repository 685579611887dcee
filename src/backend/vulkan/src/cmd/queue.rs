//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Implementation of `CommandQueue` for Vulkan.
use std::any::Any;

use ash::vk;
use parking_lot::Mutex;
use smallvec::SmallVec;

use mica_base as base;
use mica_base::{CommandBuffer as _, CommandQueue as _, Fence as _, Semaphore as _};
use mica_base::Result;

use crate::cmd::buffer::VulkanCommandBuffer;
use crate::cmd::sync::{VulkanFence, VulkanSemaphore};
use crate::device::DeviceRef;
use crate::utils::translate_generic_error;

/// Swapchain synchronization registered by `acquire_next` and consumed by
/// the next submission on the queue: the submission waits the
/// image-available semaphore and signals the render-finished semaphore plus
/// the frame's in-flight fence.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct SwapchainSync {
    pub wait_semaphore: Option<vk::Semaphore>,
    pub signal_semaphore: Option<vk::Semaphore>,
    pub signal_fence: Option<vk::Fence>,
}

impl SwapchainSync {
    fn is_empty(&self) -> bool {
        self.wait_semaphore.is_none()
            && self.signal_semaphore.is_none()
            && self.signal_fence.is_none()
    }
}

#[derive(Debug)]
pub struct VulkanQueue {
    device: DeviceRef,
    raw: vk::Queue,
    family: u32,
    ty: base::QueueType,
    /// Serializes native submissions; Vulkan queues are externally
    /// synchronized.
    submit_lock: Mutex<()>,
    swapchain_sync: Mutex<SwapchainSync>,
}

unsafe impl Send for VulkanQueue {}
unsafe impl Sync for VulkanQueue {}

impl VulkanQueue {
    pub(crate) fn new(device: DeviceRef, raw: vk::Queue, family: u32, ty: base::QueueType) -> Self {
        Self {
            device,
            raw,
            family,
            ty,
            submit_lock: Mutex::new(()),
            swapchain_sync: Mutex::new(SwapchainSync::default()),
        }
    }

    pub fn vk_queue(&self) -> vk::Queue {
        self.raw
    }

    pub fn family_index(&self) -> u32 {
        self.family
    }

    pub(crate) fn register_swapchain_sync(&self, sync: SwapchainSync) {
        *self.swapchain_sync.lock() = sync;
    }

    /// Submit an empty batch consuming any still-registered swapchain sync,
    /// so a present without intervening work does not deadlock.
    pub(crate) fn flush_swapchain_sync(&self) -> Result<()> {
        if self.swapchain_sync.lock().is_empty() {
            return Ok(());
        }
        self.submit(base::SubmitDesc::default())
    }

    pub(crate) fn submit_raw(
        &self,
        command_buffers: &[vk::CommandBuffer],
        waits: &[(vk::Semaphore, u64, vk::PipelineStageFlags)],
        signals: &[(vk::Semaphore, u64)],
        fence: vk::Fence,
    ) -> Result<()> {
        let wait_semaphores: SmallVec<[_; 8]> = waits.iter().map(|w| w.0).collect();
        let wait_values: SmallVec<[_; 8]> = waits.iter().map(|w| w.1).collect();
        let wait_stages: SmallVec<[_; 8]> = waits.iter().map(|w| w.2).collect();
        let signal_semaphores: SmallVec<[_; 8]> = signals.iter().map(|s| s.0).collect();
        let signal_values: SmallVec<[_; 8]> = signals.iter().map(|s| s.1).collect();

        // Binary semaphores ignore their slots in the value arrays.
        let mut timeline_info = vk::TimelineSemaphoreSubmitInfo::default()
            .wait_semaphore_values(&wait_values)
            .signal_semaphore_values(&signal_values);
        let submit = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(command_buffers)
            .signal_semaphores(&signal_semaphores)
            .push_next(&mut timeline_info);

        let _guard = self.submit_lock.lock();
        unsafe { self.device.raw().queue_submit(self.raw, &[submit], fence) }
            .map_err(translate_generic_error)
    }
}

impl base::CommandQueue for VulkanQueue {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn queue_type(&self) -> base::QueueType {
        self.ty
    }

    fn submit(&self, desc: base::SubmitDesc<'_>) -> Result<()> {
        let mut command_buffers: SmallVec<[vk::CommandBuffer; 8]> = SmallVec::new();
        for cb in desc.command_buffers {
            let cb: &VulkanCommandBuffer = cb
                .as_any()
                .downcast_ref()
                .expect("foreign command buffer submitted to vulkan queue");
            command_buffers.push(cb.vk_command_buffer());
        }

        let mut waits: SmallVec<[(vk::Semaphore, u64, vk::PipelineStageFlags); 8]> =
            SmallVec::new();
        let mut signals: SmallVec<[(vk::Semaphore, u64); 8]> = SmallVec::new();

        for (fence, value) in desc.wait_fences {
            let fence: &VulkanFence = fence
                .as_any()
                .downcast_ref()
                .expect("foreign fence submitted to vulkan queue");
            waits.push((
                fence.vk_semaphore(),
                *value,
                vk::PipelineStageFlags::ALL_COMMANDS,
            ));
        }
        for semaphore in desc.wait_semaphores {
            let semaphore: &VulkanSemaphore = semaphore
                .as_any()
                .downcast_ref()
                .expect("foreign semaphore submitted to vulkan queue");
            waits.push((
                semaphore.vk_semaphore(),
                0,
                vk::PipelineStageFlags::ALL_COMMANDS,
            ));
        }
        for (fence, value) in desc.signal_fences {
            let fence: &VulkanFence = fence
                .as_any()
                .downcast_ref()
                .expect("foreign fence submitted to vulkan queue");
            signals.push((fence.vk_semaphore(), *value));
        }
        for semaphore in desc.signal_semaphores {
            let semaphore: &VulkanSemaphore = semaphore
                .as_any()
                .downcast_ref()
                .expect("foreign semaphore submitted to vulkan queue");
            signals.push((semaphore.vk_semaphore(), 0));
        }

        // Fold in pending swapchain edges.
        let sync = std::mem::take(&mut *self.swapchain_sync.lock());
        if let Some(semaphore) = sync.wait_semaphore {
            waits.push((
                semaphore,
                0,
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            ));
        }
        if let Some(semaphore) = sync.signal_semaphore {
            signals.push((semaphore, 0));
        }

        self.submit_raw(
            &command_buffers,
            &waits,
            &signals,
            sync.signal_fence.unwrap_or(vk::Fence::null()),
        )
    }

    fn wait_idle(&self) -> Result<()> {
        let _guard = self.submit_lock.lock();
        unsafe { self.device.raw().queue_wait_idle(self.raw) }.map_err(translate_generic_error)
    }
}
