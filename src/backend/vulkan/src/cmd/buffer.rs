//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Implementation of `CommandBuffer` for Vulkan.
use std::any::Any;

use ash::vk;
use log::error;
use smallvec::SmallVec;

use mica_base as base;
use mica_base::{Buffer as _, CommandEncoder as _, CommandQueue as _, Texture as _};
use mica_base::{Error, ErrorKind, Result};

use crate::buffer::VulkanBuffer;
use crate::cmd::encoder::VulkanCommandEncoder;
use crate::cmd::queue::VulkanQueue;
use crate::device::DeviceRef;
use crate::formats::format_aspect_mask;
use crate::image::VulkanImage;
use crate::renderpass::{create_transient_pass, TransientPass};
use crate::utils::{
    buffer_usage_to_stage_access, texture_usage_to_stage_access_layout,
    translate_generic_error, translate_subresource_range,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmdState {
    Initial,
    Recording,
    Executable,
}

/// Implementation of `CommandBuffer` for Vulkan: a dedicated command pool
/// plus one primary command buffer, re-recorded through pool resets.
#[derive(Debug)]
pub struct VulkanCommandBuffer {
    device: DeviceRef,
    queue_family: u32,
    queue_type: base::QueueType,
    vk_pool: vk::CommandPool,
    vk_cmd: vk::CommandBuffer,
    state: CmdState,
    in_render_pass: bool,
    /// Transient render passes kept alive until the next recording; the
    /// caller guarantees prior submissions completed before `begin`.
    retired_passes: Vec<TransientPass>,
}

unsafe impl Send for VulkanCommandBuffer {}

impl VulkanCommandBuffer {
    pub(crate) fn new(device: DeviceRef, queue: &VulkanQueue) -> Result<Self> {
        let pool_info = vk::CommandPoolCreateInfo::default()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(queue.family_index());
        let vk_pool = unsafe { device.raw().create_command_pool(&pool_info, None) }
            .map_err(translate_generic_error)?;

        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(vk_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let vk_cmd = match unsafe { device.raw().allocate_command_buffers(&alloc_info) } {
            Ok(buffers) => buffers[0],
            Err(result) => {
                unsafe { device.raw().destroy_command_pool(vk_pool, None) };
                return Err(translate_generic_error(result));
            }
        };

        Ok(Self {
            device,
            queue_family: queue.family_index(),
            queue_type: base::CommandQueue::queue_type(queue),
            vk_pool,
            vk_cmd,
            state: CmdState::Initial,
            in_render_pass: false,
            retired_passes: Vec::new(),
        })
    }

    pub fn vk_command_buffer(&self) -> vk::CommandBuffer {
        self.vk_cmd
    }

    fn assert_recording(&self) {
        assert_eq!(
            self.state,
            CmdState::Recording,
            "command recorded outside begin/end"
        );
        assert!(!self.in_render_pass, "command recorded inside a render pass");
    }

    fn drain_retired_passes(&mut self) {
        for pass in self.retired_passes.drain(..) {
            unsafe { pass.destroy(self.device.raw()) };
        }
    }
}

impl Drop for VulkanCommandBuffer {
    fn drop(&mut self) {
        self.drain_retired_passes();
        unsafe {
            self.device.raw().destroy_command_pool(self.vk_pool, None);
        }
    }
}

impl base::CommandBuffer for VulkanCommandBuffer {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn begin(&mut self) -> Result<()> {
        assert_ne!(
            self.state,
            CmdState::Recording,
            "begin on a command buffer that is already recording"
        );
        self.drain_retired_passes();
        let info = vk::CommandBufferBeginInfo::default();
        unsafe {
            self.device
                .raw()
                .reset_command_buffer(self.vk_cmd, vk::CommandBufferResetFlags::empty())
                .map_err(translate_generic_error)?;
            self.device
                .raw()
                .begin_command_buffer(self.vk_cmd, &info)
                .map_err(translate_generic_error)?;
        }
        self.state = CmdState::Recording;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        assert_eq!(self.state, CmdState::Recording, "end without a begin");
        assert!(!self.in_render_pass, "end with an open render pass");
        unsafe {
            self.device
                .raw()
                .end_command_buffer(self.vk_cmd)
                .map_err(translate_generic_error)?;
        }
        self.state = CmdState::Executable;
        Ok(())
    }

    fn resource_barrier(
        &mut self,
        buffers: &[base::BufferBarrier<'_>],
        textures: &[base::TextureBarrier<'_>],
    ) {
        self.assert_recording();
        if buffers.is_empty() && textures.is_empty() {
            return;
        }

        let mut src_stages = vk::PipelineStageFlags::empty();
        let mut dst_stages = vk::PipelineStageFlags::empty();
        let mut buffer_barriers: SmallVec<[vk::BufferMemoryBarrier<'_>; 8]> = SmallVec::new();
        let mut image_barriers: SmallVec<[vk::ImageMemoryBarrier<'_>; 8]> = SmallVec::new();

        for barrier in buffers {
            let buffer: &VulkanBuffer = barrier
                .buffer
                .as_any()
                .downcast_ref()
                .expect("foreign buffer in barrier");
            let (src_stage, src_access) = buffer_usage_to_stage_access(barrier.before);
            let (dst_stage, dst_access) = buffer_usage_to_stage_access(barrier.after);
            src_stages |= src_stage;
            dst_stages |= dst_stage;

            let (src_family, dst_family) = queue_transfer_families(
                self.queue_family,
                barrier.queue_transfer.as_ref(),
            );
            buffer_barriers.push(
                vk::BufferMemoryBarrier::default()
                    .src_access_mask(src_access)
                    .dst_access_mask(dst_access)
                    .src_queue_family_index(src_family)
                    .dst_queue_family_index(dst_family)
                    .buffer(buffer.vk_buffer())
                    .offset(0)
                    .size(vk::WHOLE_SIZE),
            );
        }

        for barrier in textures {
            let image: &VulkanImage = barrier
                .texture
                .as_any()
                .downcast_ref()
                .expect("foreign texture in barrier");
            let (src_stage, src_access, old_layout) =
                texture_usage_to_stage_access_layout(barrier.before);
            let (dst_stage, dst_access, new_layout) =
                texture_usage_to_stage_access_layout(barrier.after);
            src_stages |= src_stage;
            dst_stages |= dst_stage;

            let aspect = format_aspect_mask(image.desc().format);
            let range = barrier.range.unwrap_or_default();
            let (src_family, dst_family) = queue_transfer_families(
                self.queue_family,
                barrier.queue_transfer.as_ref(),
            );
            image_barriers.push(
                vk::ImageMemoryBarrier::default()
                    .src_access_mask(src_access)
                    .dst_access_mask(dst_access)
                    .old_layout(old_layout)
                    .new_layout(new_layout)
                    .src_queue_family_index(src_family)
                    .dst_queue_family_index(dst_family)
                    .image(image.vk_image())
                    .subresource_range(translate_subresource_range(&range, aspect)),
            );
        }

        unsafe {
            self.device.raw().cmd_pipeline_barrier(
                self.vk_cmd,
                src_stages,
                dst_stages,
                vk::DependencyFlags::empty(),
                &[],
                &buffer_barriers,
                &image_barriers,
            );
        }
    }

    fn begin_render_pass(
        &mut self,
        desc: &base::RenderPassDesc,
    ) -> Result<Box<dyn base::CommandEncoder>> {
        self.assert_recording();
        if self.queue_type != base::QueueType::Direct {
            error!("render passes require a direct queue");
            return Err(Error::new(ErrorKind::Validation));
        }
        let pass = create_transient_pass(&self.device, desc)?;

        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(pass.render_pass)
            .framebuffer(pass.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: pass.extent,
            })
            .clear_values(&pass.clear_values);
        unsafe {
            self.device.raw().cmd_begin_render_pass(
                self.vk_cmd,
                &begin_info,
                vk::SubpassContents::INLINE,
            );
        }
        self.in_render_pass = true;
        Ok(Box::new(VulkanCommandEncoder::new(
            self.device.clone(),
            self.vk_cmd,
            pass,
        )))
    }

    fn end_render_pass(&mut self, encoder: Box<dyn base::CommandEncoder>) {
        assert!(self.in_render_pass, "end_render_pass without a begin");
        unsafe {
            self.device.raw().cmd_end_render_pass(self.vk_cmd);
        }
        // The pass objects stay alive until the next recording.
        let encoder = encoder
            .into_any()
            .downcast::<VulkanCommandEncoder>()
            .unwrap_or_else(|_| panic!("foreign encoder returned to vulkan command buffer"));
        self.retired_passes.push(encoder.into_pass());
        self.in_render_pass = false;
    }

    fn copy_buffer_to_buffer(
        &mut self,
        dst: &base::BufferRef,
        dst_offset: u64,
        src: &base::BufferRef,
        src_offset: u64,
        size: u64,
    ) {
        self.assert_recording();
        let src: &VulkanBuffer = src.as_any().downcast_ref().expect("foreign source buffer");
        let dst: &VulkanBuffer = dst.as_any().downcast_ref().expect("foreign target buffer");
        let region = vk::BufferCopy {
            src_offset,
            dst_offset,
            size,
        };
        unsafe {
            self.device
                .raw()
                .cmd_copy_buffer(self.vk_cmd, src.vk_buffer(), dst.vk_buffer(), &[region]);
        }
    }

    fn copy_buffer_to_texture(
        &mut self,
        dst: &base::TextureRef,
        dst_range: base::SubresourceRange,
        src: &base::BufferRef,
        src_offset: u64,
    ) {
        self.assert_recording();
        let src: &VulkanBuffer = src.as_any().downcast_ref().expect("foreign source buffer");
        let dst_image: &VulkanImage = dst.as_any().downcast_ref().expect("foreign target texture");
        let desc = dst_image.desc();
        let aspect = format_aspect_mask(desc.format);

        let mip = dst_range.base_mip_level;
        let layer_count = if dst_range.array_layer_count == base::SubresourceRange::ALL {
            desc.depth_or_array_size.max(1) - dst_range.base_array_layer
        } else {
            dst_range.array_layer_count
        };
        let region = vk::BufferImageCopy {
            buffer_offset: src_offset,
            buffer_row_length: 0,
            buffer_image_height: 0,
            image_subresource: vk::ImageSubresourceLayers {
                aspect_mask: aspect,
                mip_level: mip,
                base_array_layer: dst_range.base_array_layer,
                layer_count,
            },
            image_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
            image_extent: vk::Extent3D {
                width: (desc.width >> mip).max(1),
                height: (desc.height >> mip).max(1),
                depth: if desc.dim == base::TextureDimension::Dim3D {
                    (desc.depth_or_array_size >> mip).max(1)
                } else {
                    1
                },
            },
        };
        unsafe {
            self.device.raw().cmd_copy_buffer_to_image(
                self.vk_cmd,
                src.vk_buffer(),
                dst_image.vk_image(),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
        }
    }
}

fn queue_transfer_families(
    own_family: u32,
    transfer: Option<&base::QueueTransfer<'_>>,
) -> (u32, u32) {
    let Some(transfer) = transfer else {
        return (vk::QUEUE_FAMILY_IGNORED, vk::QUEUE_FAMILY_IGNORED);
    };
    let other: &VulkanQueue = transfer
        .other_queue
        .as_any()
        .downcast_ref()
        .expect("foreign queue in barrier transfer");
    match transfer.direction {
        base::QueueTransferDirection::Release => (own_family, other.family_index()),
        base::QueueTransferDirection::Acquire => (other.family_index(), own_family),
    }
}
