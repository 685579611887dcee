//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Implementation of `CommandEncoder` for D3D12.
use std::any::Any;
use std::sync::Arc;

use log::error;
use smallvec::SmallVec;
use windows::Win32::Foundation::RECT;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D12::*;

use mica_base as base;
use mica_base::{
    Buffer as _, BufferView as _, DescriptorSet as _, GraphicsPipeline as _, RootSignature as _,
};

use crate::device::DeviceRef;
use crate::pipeline::D3D12GraphicsPipeline;
use crate::resources::D3D12Buffer;
use crate::rootsig::{D3D12DescriptorSet, D3D12RootSignature};

#[derive(Debug)]
pub struct D3D12CommandEncoder {
    device: DeviceRef,
    list: ID3D12GraphicsCommandList,
    root_signature: Option<Arc<dyn base::RootSignature>>,
    pipeline_bound: bool,
    /// Whether `SetDescriptorHeaps` ran on this encoder already; the heap
    /// pair is set at most once per encoder to avoid redundant flushes.
    heaps_bound: bool,
    topology: D3D_PRIMITIVE_TOPOLOGY,
    topology_dirty: bool,
    /// Per-slot vertex strides from the bound pipeline's input layout;
    /// D3D12 wants them in the vertex-buffer view.
    vertex_strides: SmallVec<[u32; 8]>,
}

impl D3D12CommandEncoder {
    pub(crate) fn new(device: DeviceRef, list: ID3D12GraphicsCommandList) -> Self {
        Self {
            device,
            list,
            root_signature: None,
            pipeline_bound: false,
            heaps_bound: false,
            topology: D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST,
            topology_dirty: true,
            vertex_strides: SmallVec::new(),
        }
    }

    fn root_signature(&self) -> &D3D12RootSignature {
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

    fn bind_heaps_once(&mut self) {
        if self.heaps_bound {
            return;
        }
        self.heaps_bound = true;
        let heaps = [
            Some(self.device.gpu_resource_heap().heap().raw().clone()),
            Some(self.device.gpu_sampler_heap().heap().raw().clone()),
        ];
        unsafe { self.list.SetDescriptorHeaps(&heaps) };
    }

    fn flush_topology(&mut self) {
        if self.topology_dirty {
            unsafe { self.list.IASetPrimitiveTopology(self.topology) };
            self.topology_dirty = false;
        }
    }
}

impl base::CommandEncoder for D3D12CommandEncoder {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn set_viewport(&mut self, viewport: base::Viewport) {
        let vp = D3D12_VIEWPORT {
            TopLeftX: viewport.x,
            TopLeftY: viewport.y,
            Width: viewport.width,
            Height: viewport.height,
            MinDepth: viewport.min_depth,
            MaxDepth: viewport.max_depth,
        };
        unsafe { self.list.RSSetViewports(&[vp]) };
    }

    fn set_scissor(&mut self, rect: base::Rect2D) {
        let native = RECT {
            left: rect.x,
            top: rect.y,
            right: rect.x + rect.width as i32,
            bottom: rect.y + rect.height as i32,
        };
        unsafe { self.list.RSSetScissorRects(&[native]) };
    }

    fn bind_vertex_buffers(&mut self, views: &[base::VertexBufferView]) {
        self.assert_ready();
        let native: SmallVec<[D3D12_VERTEX_BUFFER_VIEW; 8]> = views
            .iter()
            .enumerate()
            .map(|(slot, view)| {
                let buffer: &D3D12Buffer = view
                    .buffer
                    .as_any()
                    .downcast_ref()
                    .expect("foreign vertex buffer");
                D3D12_VERTEX_BUFFER_VIEW {
                    BufferLocation: buffer.gpu_virtual_address() + view.offset,
                    SizeInBytes: view.size as u32,
                    StrideInBytes: self.vertex_strides.get(slot).copied().unwrap_or(0),
                }
            })
            .collect();
        unsafe { self.list.IASetVertexBuffers(0, Some(&native)) };
    }

    fn bind_index_buffer(&mut self, view: base::IndexBufferView) {
        self.assert_ready();
        let buffer: &D3D12Buffer = view
            .buffer
            .as_any()
            .downcast_ref()
            .expect("foreign index buffer");
        let native = D3D12_INDEX_BUFFER_VIEW {
            BufferLocation: buffer.gpu_virtual_address() + view.offset,
            SizeInBytes: (buffer.desc().size - view.offset) as u32,
            Format: crate::formats::translate_index_format(view.format),
        };
        unsafe { self.list.IASetIndexBuffer(Some(&native)) };
    }

    fn bind_root_signature(&mut self, root_signature: &base::RootSignatureRef) {
        let concrete: &D3D12RootSignature = root_signature
            .as_any()
            .downcast_ref()
            .expect("foreign root signature");
        self.bind_heaps_once();
        unsafe { self.list.SetGraphicsRootSignature(concrete.raw()) };
        self.root_signature = Some(root_signature.clone());
    }

    fn bind_graphics_pipeline(&mut self, pipeline: &base::GraphicsPipelineRef) {
        let concrete: &D3D12GraphicsPipeline = pipeline
            .as_any()
            .downcast_ref()
            .expect("foreign pipeline");
        unsafe { self.list.SetPipelineState(concrete.raw()) };
        self.topology = concrete.topology();
        self.topology_dirty = true;
        self.pipeline_bound = true;
        self.vertex_strides.clear();
        self.vertex_strides
            .extend_from_slice(concrete.vertex_strides());
    }

    fn push_constants(&mut self, data: &[u8]) {
        self.assert_ready();
        let Some((param, dwords)) = self.root_signature().constant_param() else {
            error!("the bound root signature has no root-constant slot");
            return;
        };
        if data.len() > base::limits::MAX_PUSH_CONSTANT_BYTES {
            error!(
                "push constant data is {} bytes, exceeding the {}-byte slot",
                data.len(),
                base::limits::MAX_PUSH_CONSTANT_BYTES
            );
            return;
        }
        let count = ((data.len() + 3) / 4).min(dwords as usize) as u32;
        unsafe {
            self.list.SetGraphicsRoot32BitConstants(
                param,
                count,
                data.as_ptr() as *const _,
                0,
            );
        }
    }

    fn bind_root_descriptor(&mut self, slot: u32, view: &base::BufferViewRef) {
        self.assert_ready();
        let Some((param, ty)) = self.root_signature().root_descriptor_param(slot) else {
            error!("root descriptor slot {} does not exist", slot);
            return;
        };
        let concrete: &crate::resources::D3D12BufferView = view
            .as_any()
            .downcast_ref()
            .expect("foreign buffer view");
        let address = concrete.buffer().gpu_virtual_address() + view.desc().range.offset;
        unsafe {
            match ty {
                base::ResourceBindType::CBuffer => {
                    self.list.SetGraphicsRootConstantBufferView(param, address)
                }
                base::ResourceBindType::Buffer => {
                    self.list.SetGraphicsRootShaderResourceView(param, address)
                }
                base::ResourceBindType::RwBuffer => {
                    self.list.SetGraphicsRootUnorderedAccessView(param, address)
                }
                _ => unreachable!("validated at root signature creation"),
            }
        }
    }

    fn bind_descriptor_set(&mut self, slot: u32, set: &base::DescriptorSetRef) {
        self.assert_ready();
        let root_signature = self.root_signature();
        let Some(table) = root_signature.table(slot) else {
            // Static-sampler-only set: nothing to bind.
            return;
        };
        let param = table.param;
        let concrete: &D3D12DescriptorSet = set
            .as_any()
            .downcast_ref()
            .expect("foreign descriptor set");
        debug_assert_eq!(concrete.kind(), table.kind, "set bound at the wrong slot");
        let handle = concrete.gpu_handle();
        unsafe {
            self.list.SetGraphicsRootDescriptorTable(param, handle);
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
        self.flush_topology();
        unsafe {
            self.list
                .DrawInstanced(vertex_count, instance_count, first_vertex, first_instance);
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
        self.flush_topology();
        unsafe {
            self.list.DrawIndexedInstanced(
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
        }
    }
}
