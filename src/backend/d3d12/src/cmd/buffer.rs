//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Implementation of `CommandBuffer` for D3D12.
use std::any::Any;
use std::mem::ManuallyDrop;

use log::error;
use smallvec::SmallVec;
use windows::Win32::Graphics::Direct3D12::*;

use mica_base as base;
use mica_base::{Buffer as _, CommandEncoder as _, Texture as _, TextureView as _};
use mica_base::{Error, ErrorKind, Result};

use crate::cmd::encoder::D3D12CommandEncoder;
use crate::cmd::queue::D3D12Queue;
use crate::device::DeviceRef;
use crate::formats::translate_texture_format;
use crate::resources::{D3D12Buffer, D3D12Texture, D3D12TextureView};
use crate::utils::{buffer_usage_to_states, texture_usage_to_states, translate_hresult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmdState {
    Initial,
    Recording,
    Executable,
}

/// Implementation of `CommandBuffer` for D3D12: one command allocator plus
/// one graphics command list. `begin` resets both; `end` closes the list.
#[derive(Debug)]
pub struct D3D12CommandBuffer {
    device: DeviceRef,
    queue_type: base::QueueType,
    allocator: ID3D12CommandAllocator,
    list: ID3D12GraphicsCommandList,
    state: CmdState,
    in_render_pass: bool,
}

unsafe impl Send for D3D12CommandBuffer {}

impl D3D12CommandBuffer {
    pub(crate) fn new(device: DeviceRef, queue: &D3D12Queue) -> Result<Self> {
        let list_type = queue.list_type();
        let allocator: ID3D12CommandAllocator =
            unsafe { device.raw().CreateCommandAllocator(list_type) }
                .map_err(translate_hresult)?;
        let list: ID3D12GraphicsCommandList = unsafe {
            device
                .raw()
                .CreateCommandList(0, list_type, &allocator, None)
        }
        .map_err(translate_hresult)?;
        // Lists are born open; the state machine starts closed.
        unsafe { list.Close() }.map_err(translate_hresult)?;
        Ok(Self {
            device,
            queue_type: base::CommandQueue::queue_type(queue),
            allocator,
            list,
            state: CmdState::Initial,
            in_render_pass: false,
        })
    }

    pub fn raw_list(&self) -> &ID3D12GraphicsCommandList {
        &self.list
    }

    fn assert_recording(&self) {
        assert_eq!(
            self.state,
            CmdState::Recording,
            "command recorded outside begin/end"
        );
        assert!(!self.in_render_pass, "command recorded inside a render pass");
    }
}

impl base::CommandBuffer for D3D12CommandBuffer {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn begin(&mut self) -> Result<()> {
        assert_ne!(
            self.state,
            CmdState::Recording,
            "begin on a command buffer that is already recording"
        );
        unsafe {
            self.allocator.Reset().map_err(translate_hresult)?;
            self.list
                .Reset(&self.allocator, None)
                .map_err(translate_hresult)?;
        }
        self.state = CmdState::Recording;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        assert_eq!(self.state, CmdState::Recording, "end without a begin");
        assert!(!self.in_render_pass, "end with an open render pass");
        unsafe { self.list.Close() }.map_err(translate_hresult)?;
        self.state = CmdState::Executable;
        Ok(())
    }

    fn resource_barrier(
        &mut self,
        buffers: &[base::BufferBarrier<'_>],
        textures: &[base::TextureBarrier<'_>],
    ) {
        self.assert_recording();
        let mut barriers: SmallVec<[D3D12_RESOURCE_BARRIER; 8]> = SmallVec::new();

        for barrier in buffers {
            let buffer: &D3D12Buffer = barrier
                .buffer
                .as_any()
                .downcast_ref()
                .expect("foreign buffer in barrier");
            // Upload and readback heaps have fixed states; transitions on
            // them are illegal and simply skipped.
            if buffer.desc().memory != base::MemoryKind::Device {
                continue;
            }
            let before = buffer_usage_to_states(barrier.before);
            let after = buffer_usage_to_states(barrier.after);
            if before == after {
                if after == D3D12_RESOURCE_STATE_UNORDERED_ACCESS {
                    barriers.push(uav_barrier(buffer.raw()));
                }
                continue;
            }
            barriers.push(transition_barrier(
                buffer.raw(),
                D3D12_RESOURCE_BARRIER_ALL_SUBRESOURCES,
                before,
                after,
            ));
        }

        for barrier in textures {
            let texture: &D3D12Texture = barrier
                .texture
                .as_any()
                .downcast_ref()
                .expect("foreign texture in barrier");
            let before = texture_usage_to_states(barrier.before);
            let after = texture_usage_to_states(barrier.after);
            if before == after {
                if after == D3D12_RESOURCE_STATE_UNORDERED_ACCESS {
                    barriers.push(uav_barrier(texture.raw()));
                }
                continue;
            }
            match barrier.range {
                // A single sub-resource transitions alone; anything wider
                // transitions the whole resource.
                Some(range)
                    if range.mip_level_count == 1 && range.array_layer_count == 1 =>
                {
                    let index = texture
                        .subresource_index(range.base_mip_level, range.base_array_layer);
                    barriers.push(transition_barrier(texture.raw(), index, before, after));
                }
                _ => {
                    barriers.push(transition_barrier(
                        texture.raw(),
                        D3D12_RESOURCE_BARRIER_ALL_SUBRESOURCES,
                        before,
                        after,
                    ));
                }
            }
        }

        if !barriers.is_empty() {
            unsafe { self.list.ResourceBarrier(&barriers) };
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
        if desc.color_attachments.is_empty() && desc.depth_stencil_attachment.is_none() {
            error!("render pass '{}' has no attachments", desc.name);
            return Err(Error::new(ErrorKind::Validation));
        }

        let mut rtv_handles: SmallVec<[D3D12_CPU_DESCRIPTOR_HANDLE; 8]> = SmallVec::new();
        for attachment in &desc.color_attachments {
            let view: &D3D12TextureView = attachment
                .target
                .as_any()
                .downcast_ref()
                .expect("foreign texture view in render pass");
            let handle = view.staging_descriptor().cpu_handle(0);
            rtv_handles.push(handle);
            if attachment.load == base::LoadOp::Clear {
                let color = [
                    attachment.clear_value.r,
                    attachment.clear_value.g,
                    attachment.clear_value.b,
                    attachment.clear_value.a,
                ];
                unsafe {
                    self.list.ClearRenderTargetView(handle, color.as_ptr(), None);
                }
            }
        }

        let mut dsv_handle = None;
        if let Some(attachment) = &desc.depth_stencil_attachment {
            let view: &D3D12TextureView = attachment
                .target
                .as_any()
                .downcast_ref()
                .expect("foreign texture view in render pass");
            let handle = view.staging_descriptor().cpu_handle(0);
            dsv_handle = Some(handle);

            let mut clear_flags = D3D12_CLEAR_FLAGS(0);
            if attachment.depth_load == base::LoadOp::Clear {
                clear_flags |= D3D12_CLEAR_FLAG_DEPTH;
            }
            let format = base::TextureView::desc(view).format;
            if attachment.stencil_load == base::LoadOp::Clear && format.has_stencil() {
                clear_flags |= D3D12_CLEAR_FLAG_STENCIL;
            }
            if clear_flags.0 != 0 {
                unsafe {
                    self.list.ClearDepthStencilView(
                        handle,
                        clear_flags,
                        attachment.clear_value.depth,
                        attachment.clear_value.stencil,
                        None,
                    );
                }
            }
        }

        unsafe {
            self.list.OMSetRenderTargets(
                rtv_handles.len() as u32,
                Some(rtv_handles.as_ptr()),
                false,
                dsv_handle.as_ref().map(|h| h as *const _),
            );
        }

        self.in_render_pass = true;
        Ok(Box::new(D3D12CommandEncoder::new(
            self.device.clone(),
            self.list.clone(),
        )))
    }

    fn end_render_pass(&mut self, encoder: Box<dyn base::CommandEncoder>) {
        assert!(self.in_render_pass, "end_render_pass without a begin");
        let _ = encoder
            .into_any()
            .downcast::<D3D12CommandEncoder>()
            .unwrap_or_else(|_| panic!("foreign encoder returned to d3d12 command buffer"));
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
        let src: &D3D12Buffer = src.as_any().downcast_ref().expect("foreign source buffer");
        let dst: &D3D12Buffer = dst.as_any().downcast_ref().expect("foreign target buffer");
        unsafe {
            self.list
                .CopyBufferRegion(dst.raw(), dst_offset, src.raw(), src_offset, size);
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
        let src: &D3D12Buffer = src.as_any().downcast_ref().expect("foreign source buffer");
        let texture: &D3D12Texture = dst.as_any().downcast_ref().expect("foreign target texture");
        let desc = texture.desc();
        let Some(format) = translate_texture_format(desc.format) else {
            error!("cannot copy into a texture of unknown format");
            return;
        };
        let mip = dst_range.base_mip_level;
        let width = (desc.width >> mip).max(1);
        let height = (desc.height >> mip).max(1);
        let bytes_per_texel = desc.format.size_in_bytes().unwrap_or(4);
        let row_pitch = mica_common::align_up(
            (width * bytes_per_texel) as u64,
            D3D12_TEXTURE_DATA_PITCH_ALIGNMENT as u64,
        ) as u32;

        let src_location = D3D12_TEXTURE_COPY_LOCATION {
            pResource: ManuallyDrop::new(Some(src.raw().clone())),
            Type: D3D12_TEXTURE_COPY_TYPE_PLACED_FOOTPRINT,
            Anonymous: D3D12_TEXTURE_COPY_LOCATION_0 {
                PlacedFootprint: D3D12_PLACED_SUBRESOURCE_FOOTPRINT {
                    Offset: src_offset,
                    Footprint: D3D12_SUBRESOURCE_FOOTPRINT {
                        Format: format,
                        Width: width,
                        Height: height,
                        Depth: 1,
                        RowPitch: row_pitch,
                    },
                },
            },
        };
        let dst_location = D3D12_TEXTURE_COPY_LOCATION {
            pResource: ManuallyDrop::new(Some(texture.raw().clone())),
            Type: D3D12_TEXTURE_COPY_TYPE_SUBRESOURCE_INDEX,
            Anonymous: D3D12_TEXTURE_COPY_LOCATION_0 {
                SubresourceIndex: texture.subresource_index(mip, dst_range.base_array_layer),
            },
        };
        unsafe {
            self.list
                .CopyTextureRegion(&dst_location, 0, 0, 0, &src_location, None);
        }
        // The locations hold cloned COM pointers; release them.
        let _ = ManuallyDrop::into_inner(src_location.pResource);
        let _ = ManuallyDrop::into_inner(dst_location.pResource);
    }
}

fn transition_barrier(
    resource: &ID3D12Resource,
    subresource: u32,
    before: D3D12_RESOURCE_STATES,
    after: D3D12_RESOURCE_STATES,
) -> D3D12_RESOURCE_BARRIER {
    D3D12_RESOURCE_BARRIER {
        Type: D3D12_RESOURCE_BARRIER_TYPE_TRANSITION,
        Flags: D3D12_RESOURCE_BARRIER_FLAG_NONE,
        Anonymous: D3D12_RESOURCE_BARRIER_0 {
            Transition: ManuallyDrop::new(D3D12_RESOURCE_TRANSITION_BARRIER {
                pResource: ManuallyDrop::new(Some(resource.clone())),
                Subresource: subresource,
                StateBefore: before,
                StateAfter: after,
            }),
        },
    }
}

fn uav_barrier(resource: &ID3D12Resource) -> D3D12_RESOURCE_BARRIER {
    D3D12_RESOURCE_BARRIER {
        Type: D3D12_RESOURCE_BARRIER_TYPE_UAV,
        Flags: D3D12_RESOURCE_BARRIER_FLAG_NONE,
        Anonymous: D3D12_RESOURCE_BARRIER_0 {
            UAV: ManuallyDrop::new(D3D12_RESOURCE_UAV_BARRIER {
                pResource: ManuallyDrop::new(Some(resource.clone())),
            }),
        },
    }
}
