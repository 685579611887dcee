//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! The null device.
use std::any::Any;
use std::sync::Arc;

use log::error;

use mica_base as base;
use mica_base::{CommandQueue as _, RootSignature as _};
use mica_base::{Error, ErrorKind, Result};

use crate::cmd::{NullCommandBuffer, NullFence, NullQueue};
use crate::resources::{
    NullBuffer, NullBufferView, NullDescriptorSet, NullGraphicsPipeline, NullRootSignature,
    NullSampler, NullSemaphore, NullShader, NullTexture, NullTextureView,
};
use crate::swapchain::NullSwapChain;

/// A complete no-op implementation of [`base::Device`].
#[derive(Debug)]
pub struct NullDevice {
    queues: [base::CommandQueueRef; 3],
}

impl NullDevice {
    /// Create a null device with one queue of each type.
    pub fn new_device() -> base::DeviceRef {
        Arc::new(Self {
            queues: [
                Arc::new(NullQueue::new(base::QueueType::Direct)),
                Arc::new(NullQueue::new(base::QueueType::Compute)),
                Arc::new(NullQueue::new(base::QueueType::Copy)),
            ],
        })
    }
}

impl base::Device for NullDevice {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn backend(&self) -> base::Backend {
        base::Backend::Null
    }

    fn detail(&self) -> base::DeviceDetail {
        // Mirrors the table-model backend so alignment handling gets
        // exercised under test.
        base::DeviceDetail {
            cbuffer_alignment: 256,
            upload_texture_alignment: 512,
            upload_texture_row_alignment: 256,
            map_alignment: 1,
        }
    }

    fn command_queue(&self, ty: base::QueueType, slot: u32) -> Option<base::CommandQueueRef> {
        if slot != 0 {
            return None;
        }
        let index = match ty {
            base::QueueType::Direct => 0,
            base::QueueType::Compute => 1,
            base::QueueType::Copy => 2,
        };
        Some(self.queues[index].clone())
    }

    fn create_command_buffer(
        &self,
        queue: &base::CommandQueueRef,
    ) -> Result<base::CommandBufferRef> {
        let queue: &NullQueue = queue
            .as_any()
            .downcast_ref()
            .expect("foreign queue passed to null device");
        Ok(Box::new(NullCommandBuffer::new(queue.queue_type())))
    }

    fn create_fence(&self, initial_value: u64) -> Result<base::FenceRef> {
        Ok(Arc::new(NullFence::new(initial_value)))
    }

    fn create_semaphore(&self) -> Result<base::SemaphoreRef> {
        Ok(Arc::new(NullSemaphore))
    }

    fn create_swap_chain(&self, desc: &base::SwapChainDesc) -> Result<base::SwapChainRef> {
        Ok(Box::new(NullSwapChain::new(desc)?))
    }

    fn create_buffer(&self, desc: &base::BufferDesc) -> Result<base::BufferRef> {
        Ok(Arc::new(NullBuffer::new(desc)?))
    }

    fn create_buffer_view(&self, desc: &base::BufferViewDesc) -> Result<base::BufferViewRef> {
        Ok(Arc::new(NullBufferView::new(desc)?))
    }

    fn create_texture(&self, desc: &base::TextureDesc) -> Result<base::TextureRef> {
        Ok(Arc::new(NullTexture::new(desc)?))
    }

    fn create_texture_view(&self, desc: &base::TextureViewDesc) -> Result<base::TextureViewRef> {
        Ok(Arc::new(NullTextureView::new(desc)?))
    }

    fn create_shader(&self, desc: &base::ShaderDesc) -> Result<base::ShaderRef> {
        Ok(Arc::new(NullShader::new(desc)?))
    }

    fn create_root_signature(
        &self,
        desc: &base::RootSignatureDesc,
    ) -> Result<base::RootSignatureRef> {
        Ok(Arc::new(NullRootSignature::new(desc)?))
    }

    fn create_graphics_pipeline(
        &self,
        desc: &base::GraphicsPipelineDesc,
    ) -> Result<base::GraphicsPipelineRef> {
        if desc.vs.is_none() {
            error!("graphics pipeline '{}' has no vertex shader", desc.name);
            return Err(Error::new(ErrorKind::Validation));
        }
        Ok(Arc::new(NullGraphicsPipeline))
    }

    fn create_descriptor_set(
        &self,
        root_signature: &base::RootSignatureRef,
        set_index: u32,
    ) -> Result<Option<base::DescriptorSetRef>> {
        let root_signature: &NullRootSignature = root_signature
            .as_any()
            .downcast_ref()
            .expect("foreign root signature passed to null device");
        let Some(layout) = root_signature
            .desc()
            .descriptor_sets
            .get(set_index as usize)
        else {
            error!(
                "descriptor set index out of range: expected < {}, got {}",
                root_signature.desc().descriptor_sets.len(),
                set_index
            );
            return Err(Error::new(ErrorKind::Validation));
        };
        // A set made purely of static samplers needs no set object: the
        // samplers are folded into the root signature.
        if !layout.elements.is_empty()
            && layout
                .elements
                .iter()
                .all(|e| !e.static_samplers.is_empty())
        {
            return Ok(None);
        }
        Ok(Some(Arc::new(NullDescriptorSet::new(layout))))
    }

    fn create_sampler(&self, desc: &base::SamplerDesc) -> Result<base::SamplerRef> {
        Ok(Arc::new(NullSampler::new(desc)))
    }
}
