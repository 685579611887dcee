//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Device objects.
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::arg::{DescriptorSetRef, RootSignatureDesc, RootSignatureRef};
use crate::command::{CommandBufferRef, CommandQueueRef, QueueType};
use crate::error::Result;
use crate::limits::{Backend, DeviceDetail};
use crate::pipeline::{GraphicsPipelineDesc, GraphicsPipelineRef};
use crate::resources::{
    BufferDesc, BufferRef, BufferViewDesc, BufferViewRef, TextureDesc, TextureRef,
    TextureViewDesc, TextureViewRef,
};
use crate::sampler::{SamplerDesc, SamplerRef};
use crate::shader::{ShaderDesc, ShaderRef};
use crate::swapchain::{SwapChainDesc, SwapChainRef};
use crate::sync::{FenceRef, SemaphoreRef};

/// Trait for device objects.
///
/// A device exists exactly once per adapter selection; every child object
/// holds a reference back to it, so the device outlives all of them.
/// Resource-creation methods are thread-safe — the allocators behind them
/// are internally synchronized.
///
/// # Valid Usage
///
///  - Drop the last `DeviceRef` only after every queue has been waited
///    idle and all child objects are gone.
pub trait Device: fmt::Debug + Send + Sync + Any {
    fn as_any(&self) -> &dyn Any;

    fn backend(&self) -> Backend;

    /// The device's alignment capability record.
    fn detail(&self) -> DeviceDetail;

    /// Retrieve the queue of the given type at `slot`, or `None` when the
    /// device was created without one.
    fn command_queue(&self, ty: QueueType, slot: u32) -> Option<CommandQueueRef>;

    /// Create a command buffer recording commands for `queue`.
    fn create_command_buffer(&self, queue: &CommandQueueRef) -> Result<CommandBufferRef>;

    fn create_fence(&self, initial_value: u64) -> Result<FenceRef>;

    fn create_semaphore(&self) -> Result<SemaphoreRef>;

    fn create_swap_chain(&self, desc: &SwapChainDesc) -> Result<SwapChainRef>;

    fn create_buffer(&self, desc: &BufferDesc) -> Result<BufferRef>;

    fn create_buffer_view(&self, desc: &BufferViewDesc) -> Result<BufferViewRef>;

    fn create_texture(&self, desc: &TextureDesc) -> Result<TextureRef>;

    fn create_texture_view(&self, desc: &TextureViewDesc) -> Result<TextureViewRef>;

    fn create_shader(&self, desc: &ShaderDesc) -> Result<ShaderRef>;

    fn create_root_signature(&self, desc: &RootSignatureDesc) -> Result<RootSignatureRef>;

    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc)
        -> Result<GraphicsPipelineRef>;

    /// Allocate a descriptor set for set `set_index` of `root_signature`.
    ///
    /// Returns `Ok(None)` when the backend needs no set object there (for
    /// example a static-sampler-only set on the table-model backend).
    fn create_descriptor_set(
        &self,
        root_signature: &RootSignatureRef,
        set_index: u32,
    ) -> Result<Option<DescriptorSetRef>>;

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<SamplerRef>;
}

/// A boxed handle representing a device.
pub type DeviceRef = Arc<dyn Device>;
