//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Queues, fences, command buffers, and encoders for the null backend.
//!
//! The "GPU" executes at submit time, instantly and in order: buffer
//! copies were already applied at record time, so submission only flips
//! command-buffer states and signals fences.
use std::any::Any;
use std::cell::Cell;

use log::warn;
use parking_lot::{Condvar, Mutex};

use mica_base as base;
use mica_base::{Buffer as _, CommandBuffer as _, Fence as _};
use mica_base::{Error, ErrorKind, Result};

use crate::resources::NullBuffer;

/// A fence backed by a mutex + condvar pair instead of an OS event.
#[derive(Debug)]
pub struct NullFence {
    value: Mutex<u64>,
    condvar: Condvar,
}

impl NullFence {
    pub(crate) fn new(initial_value: u64) -> Self {
        Self {
            value: Mutex::new(initial_value),
            condvar: Condvar::new(),
        }
    }

    pub(crate) fn signal(&self, value: u64) {
        let mut current = self.value.lock();
        if value > *current {
            *current = value;
            self.condvar.notify_all();
        }
    }
}

impl base::Fence for NullFence {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn completed_value(&self) -> u64 {
        *self.value.lock()
    }

    fn wait(&self, value: u64) -> Result<()> {
        let mut current = self.value.lock();
        while *current < value {
            self.condvar.wait(&mut current);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmdState {
    Initial,
    Recording,
    Executable,
}

#[derive(Debug)]
pub struct NullQueue {
    ty: base::QueueType,
}

impl NullQueue {
    pub(crate) fn new(ty: base::QueueType) -> Self {
        Self { ty }
    }
}

impl base::CommandQueue for NullQueue {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn queue_type(&self) -> base::QueueType {
        self.ty
    }

    fn submit(&self, desc: base::SubmitDesc<'_>) -> Result<()> {
        for cb in desc.command_buffers {
            let cb: &NullCommandBuffer = cb
                .as_any()
                .downcast_ref()
                .expect("foreign command buffer submitted to null queue");
            assert_eq!(
                cb.state.get(),
                CmdState::Executable,
                "submitted command buffer is not in the Executable state"
            );
            // Instant retirement: Pending collapses straight back to
            // Initial because nothing executes asynchronously here.
            cb.state.set(CmdState::Initial);
        }
        for (fence, _) in desc.wait_fences {
            let fence: &NullFence = fence
                .as_any()
                .downcast_ref()
                .expect("foreign fence submitted to null queue");
            let _ = fence;
        }
        for (fence, value) in desc.signal_fences {
            let fence: &NullFence = fence
                .as_any()
                .downcast_ref()
                .expect("foreign fence submitted to null queue");
            fence.signal(*value);
        }
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        Ok(())
    }
}

/// A command buffer that applies copies at record time and otherwise only
/// enforces the recording state machine.
#[derive(Debug)]
pub struct NullCommandBuffer {
    state: Cell<CmdState>,
    in_render_pass: bool,
    queue_type: base::QueueType,
}

impl NullCommandBuffer {
    pub(crate) fn new(queue_type: base::QueueType) -> Self {
        Self {
            state: Cell::new(CmdState::Initial),
            in_render_pass: false,
            queue_type,
        }
    }

    fn assert_recording(&self) {
        assert_eq!(
            self.state.get(),
            CmdState::Recording,
            "command recorded outside begin/end"
        );
        assert!(
            !self.in_render_pass,
            "command recorded inside a render pass"
        );
    }
}

impl base::CommandBuffer for NullCommandBuffer {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn begin(&mut self) -> Result<()> {
        assert_ne!(
            self.state.get(),
            CmdState::Recording,
            "begin on a command buffer that is already recording"
        );
        self.state.set(CmdState::Recording);
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        assert_eq!(
            self.state.get(),
            CmdState::Recording,
            "end without a matching begin"
        );
        assert!(!self.in_render_pass, "end with an open render pass");
        self.state.set(CmdState::Executable);
        Ok(())
    }

    fn resource_barrier(
        &mut self,
        _buffers: &[base::BufferBarrier<'_>],
        _textures: &[base::TextureBarrier<'_>],
    ) {
        self.assert_recording();
    }

    fn begin_render_pass(
        &mut self,
        desc: &base::RenderPassDesc,
    ) -> Result<Box<dyn base::CommandEncoder>> {
        self.assert_recording();
        if desc.color_attachments.is_empty() && desc.depth_stencil_attachment.is_none() {
            log::error!("render pass '{}' has no attachments", desc.name);
            return Err(Error::new(ErrorKind::Validation));
        }
        if self.queue_type != base::QueueType::Direct {
            log::error!("render passes require a direct queue");
            return Err(Error::new(ErrorKind::Validation));
        }
        self.in_render_pass = true;
        Ok(Box::new(NullCommandEncoder::default()))
    }

    fn end_render_pass(&mut self, encoder: Box<dyn base::CommandEncoder>) {
        assert!(self.in_render_pass, "end_render_pass without a begin");
        drop(encoder);
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
        let src: &NullBuffer = src.as_any().downcast_ref().expect("foreign source buffer");
        let dst: &NullBuffer = dst.as_any().downcast_ref().expect("foreign target buffer");
        dst.copy_from(dst_offset, src, src_offset, size);
    }

    fn copy_buffer_to_texture(
        &mut self,
        _dst: &base::TextureRef,
        _dst_range: base::SubresourceRange,
        _src: &base::BufferRef,
        _src_offset: u64,
    ) {
        self.assert_recording();
    }
}

/// An encoder that enforces bind ordering and discards the work.
#[derive(Debug, Default)]
pub struct NullCommandEncoder {
    root_signature_bound: bool,
    pipeline_bound: bool,
}

impl NullCommandEncoder {
    fn assert_ready(&self) {
        assert!(
            self.root_signature_bound,
            "a root signature must be bound first"
        );
        assert!(self.pipeline_bound, "a pipeline must be bound first");
    }
}

impl base::CommandEncoder for NullCommandEncoder {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn set_viewport(&mut self, viewport: base::Viewport) {
        if viewport.width < 0.0 || viewport.height < 0.0 {
            warn!("viewport extent is negative; callers pass top-left-origin coordinates");
        }
    }

    fn set_scissor(&mut self, _rect: base::Rect2D) {}

    fn bind_vertex_buffers(&mut self, _views: &[base::VertexBufferView]) {
        self.assert_ready();
    }

    fn bind_index_buffer(&mut self, _view: base::IndexBufferView) {
        self.assert_ready();
    }

    fn bind_root_signature(&mut self, _root_signature: &base::RootSignatureRef) {
        self.root_signature_bound = true;
    }

    fn bind_graphics_pipeline(&mut self, _pipeline: &base::GraphicsPipelineRef) {
        self.pipeline_bound = true;
    }

    fn push_constants(&mut self, data: &[u8]) {
        self.assert_ready();
        assert!(
            data.len() <= base::limits::MAX_PUSH_CONSTANT_BYTES,
            "push constant data exceeds {} bytes",
            base::limits::MAX_PUSH_CONSTANT_BYTES
        );
    }

    fn bind_root_descriptor(&mut self, _slot: u32, _view: &base::BufferViewRef) {
        self.assert_ready();
    }

    fn bind_descriptor_set(&mut self, _slot: u32, _set: &base::DescriptorSetRef) {
        self.assert_ready();
    }

    fn draw(
        &mut self,
        _vertex_count: u32,
        _instance_count: u32,
        _first_vertex: u32,
        _first_instance: u32,
    ) {
        self.assert_ready();
    }

    fn draw_indexed(
        &mut self,
        _index_count: u32,
        _instance_count: u32,
        _first_index: u32,
        _vertex_offset: i32,
        _first_instance: u32,
    ) {
        self.assert_ready();
    }
}
