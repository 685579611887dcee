//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Implementation of `CommandEncoder` for Vulkan.
//!
//! The encoder simulates the unified binding model on top of native set
//! binds: declared set indices shift past the synthetic root-descriptor
//! set, root-descriptor binds collect into dynamic offsets that flush right
//! before the next draw, and viewports flip to keep the top-left-origin
//! contract.
use std::any::Any;
use std::sync::Arc;

use ash::vk;
use log::error;
use smallvec::SmallVec;

use mica_base as base;
use mica_base::{
    Buffer as _, BufferView as _, DescriptorSet as _, GraphicsPipeline as _, RootSignature as _,
};

use crate::arg::{VulkanDescriptorSet, VulkanRootSignature};
use crate::buffer::{VulkanBuffer, VulkanBufferView};
use crate::device::DeviceRef;
use crate::pipeline::VulkanGraphicsPipeline;
use crate::renderpass::TransientPass;

#[derive(Debug)]
pub struct VulkanCommandEncoder {
    device: DeviceRef,
    vk_cmd: vk::CommandBuffer,
    pass: Option<TransientPass>,
    /// The bound root signature, kept alive by the Arc.
    root_signature: Option<Arc<dyn base::RootSignature>>,
    pipeline_bound: bool,
    /// Dynamic offsets for the synthetic root-descriptor set, slot-indexed.
    root_dynamic_offsets: SmallVec<[u32; 8]>,
    root_set_dirty: bool,
}

impl VulkanCommandEncoder {
    pub(crate) fn new(device: DeviceRef, vk_cmd: vk::CommandBuffer, pass: TransientPass) -> Self {
        Self {
            device,
            vk_cmd,
            pass: Some(pass),
            root_signature: None,
            pipeline_bound: false,
            root_dynamic_offsets: SmallVec::new(),
            root_set_dirty: false,
        }
    }

    pub(crate) fn into_pass(mut self) -> TransientPass {
        self.pass.take().expect("transient pass already taken")
    }

    fn root_signature(&self) -> &VulkanRootSignature {
        let root_signature = self
            .root_signature
            .as_ref()
            .expect("a root signature must be bound first");
        root_signature
            .as_any()
            .downcast_ref()
            .expect("foreign root signature bound")
    }

    fn assert_ready(&self) {
        assert!(
            self.root_signature.is_some(),
            "a root signature must be bound first"
        );
        assert!(self.pipeline_bound, "a pipeline must be bound first");
    }

    /// Bind the synthetic root-descriptor set with the collected dynamic
    /// offsets. Runs lazily before each draw that follows a root-descriptor
    /// update.
    fn flush_root_descriptors(&mut self) {
        if !self.root_set_dirty {
            return;
        }
        self.root_set_dirty = false;
        let root_signature = self.root_signature();
        let Some(root_set) = root_signature.root_set() else {
            return;
        };
        unsafe {
            self.device.raw().cmd_bind_descriptor_sets(
                self.vk_cmd,
                vk::PipelineBindPoint::GRAPHICS,
                root_signature.vk_pipeline_layout(),
                0,
                &[root_set],
                &self.root_dynamic_offsets,
            );
        }
    }
}

impl base::CommandEncoder for VulkanCommandEncoder {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn set_viewport(&mut self, viewport: base::Viewport) {
        // Negative height flips clip-space Y so top-left-origin input
        // renders identically on both backends.
        let vk_viewport = vk::Viewport {
            x: viewport.x,
            y: viewport.y + viewport.height,
            width: viewport.width,
            height: -viewport.height,
            min_depth: viewport.min_depth,
            max_depth: viewport.max_depth,
        };
        unsafe {
            self.device
                .raw()
                .cmd_set_viewport(self.vk_cmd, 0, &[vk_viewport]);
        }
    }

    fn set_scissor(&mut self, rect: base::Rect2D) {
        let vk_rect = vk::Rect2D {
            offset: vk::Offset2D {
                x: rect.x,
                y: rect.y,
            },
            extent: vk::Extent2D {
                width: rect.width,
                height: rect.height,
            },
        };
        unsafe {
            self.device.raw().cmd_set_scissor(self.vk_cmd, 0, &[vk_rect]);
        }
    }

    fn bind_vertex_buffers(&mut self, views: &[base::VertexBufferView]) {
        if views.is_empty() {
            return;
        }
        let buffers: SmallVec<[vk::Buffer; 8]> = views
            .iter()
            .map(|view| {
                let buffer: &VulkanBuffer = view
                    .buffer
                    .as_any()
                    .downcast_ref()
                    .expect("foreign vertex buffer");
                buffer.vk_buffer()
            })
            .collect();
        let offsets: SmallVec<[u64; 8]> = views.iter().map(|view| view.offset).collect();
        unsafe {
            self.device
                .raw()
                .cmd_bind_vertex_buffers(self.vk_cmd, 0, &buffers, &offsets);
        }
    }

    fn bind_index_buffer(&mut self, view: base::IndexBufferView) {
        let buffer: &VulkanBuffer = view
            .buffer
            .as_any()
            .downcast_ref()
            .expect("foreign index buffer");
        unsafe {
            self.device.raw().cmd_bind_index_buffer(
                self.vk_cmd,
                buffer.vk_buffer(),
                view.offset,
                crate::formats::translate_index_format(view.format),
            );
        }
    }

    fn bind_root_signature(&mut self, root_signature: &base::RootSignatureRef) {
        let concrete: &VulkanRootSignature = root_signature
            .as_any()
            .downcast_ref()
            .expect("foreign root signature");
        self.root_dynamic_offsets.clear();
        self.root_dynamic_offsets
            .resize(concrete.root_descriptor_types().len(), 0);
        self.root_set_dirty = false;
        self.root_signature = Some(root_signature.clone());
    }

    fn bind_graphics_pipeline(&mut self, pipeline: &base::GraphicsPipelineRef) {
        let pipeline: &VulkanGraphicsPipeline = pipeline
            .as_any()
            .downcast_ref()
            .expect("foreign pipeline");
        unsafe {
            self.device.raw().cmd_bind_pipeline(
                self.vk_cmd,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.vk_pipeline(),
            );
        }
        self.pipeline_bound = true;
    }

    fn push_constants(&mut self, data: &[u8]) {
        self.assert_ready();
        if data.len() > base::limits::MAX_PUSH_CONSTANT_BYTES {
            error!(
                "push constant data is {} bytes, exceeding the {}-byte slot",
                data.len(),
                base::limits::MAX_PUSH_CONSTANT_BYTES
            );
            return;
        }
        let root_signature = self.root_signature();
        unsafe {
            self.device.raw().cmd_push_constants(
                self.vk_cmd,
                root_signature.vk_pipeline_layout(),
                root_signature.push_constant_stages(),
                0,
                data,
            );
        }
    }

    fn bind_root_descriptor(&mut self, slot: u32, view: &base::BufferViewRef) {
        self.assert_ready();
        let root_signature = self.root_signature();
        let types = root_signature.root_descriptor_types();
        let Some(&descriptor_type) = types.get(slot as usize) else {
            error!(
                "root descriptor slot out of range: expected < {}, got {}",
                types.len(),
                slot
            );
            return;
        };
        let Some(root_set) = root_signature.root_set() else {
            return;
        };

        let concrete: &VulkanBufferView = view
            .as_any()
            .downcast_ref()
            .expect("foreign buffer view");
        let range = view.desc().range;

        // The descriptor points at the buffer's base; the view's offset
        // travels as the dynamic offset at bind time.
        let buffer_info = [vk::DescriptorBufferInfo {
            buffer: concrete.vk_buffer(),
            offset: 0,
            range: range.size,
        }];
        let write = vk::WriteDescriptorSet::default()
            .dst_set(root_set)
            .dst_binding(slot)
            .descriptor_type(descriptor_type)
            .buffer_info(&buffer_info);
        unsafe {
            self.device.raw().update_descriptor_sets(&[write], &[]);
        }
        self.root_dynamic_offsets[slot as usize] = range.offset as u32;
        self.root_set_dirty = true;
    }

    fn bind_descriptor_set(&mut self, slot: u32, set: &base::DescriptorSetRef) {
        self.assert_ready();
        let root_signature = self.root_signature();
        let native_index = slot + root_signature.set_offset();
        let layout = root_signature.vk_pipeline_layout();
        let set: &VulkanDescriptorSet = set
            .as_any()
            .downcast_ref()
            .expect("foreign descriptor set");
        unsafe {
            self.device.raw().cmd_bind_descriptor_sets(
                self.vk_cmd,
                vk::PipelineBindPoint::GRAPHICS,
                layout,
                native_index,
                &[set.vk_descriptor_set()],
                &[],
            );
        }
    }

    fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        self.assert_ready();
        self.flush_root_descriptors();
        unsafe {
            self.device.raw().cmd_draw(
                self.vk_cmd,
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            );
        }
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        self.assert_ready();
        self.flush_root_descriptors();
        unsafe {
            self.device.raw().cmd_draw_indexed(
                self.vk_cmd,
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
        }
    }
}
