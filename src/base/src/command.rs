//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Command queues, command buffers, and command encoders.
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use mica_common::Rect2D;

use crate::arg::{DescriptorSetRef, RootSignatureRef};
use crate::error::Result;
use crate::formats::IndexFormat;
use crate::pass::RenderPassDesc;
use crate::pipeline::GraphicsPipelineRef;
use crate::resources::{BufferRef, BufferViewRef, SubresourceRange, TextureRef};
use crate::sync::{FenceRef, SemaphoreRef};
use crate::{BufferUsage, DeviceSize, TextureUsage, Viewport};

/// The kind of work a queue accepts. One queue serves one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueType {
    /// Graphics + compute + copy.
    Direct,
    Compute,
    Copy,
}

/// The direction of a queue-family ownership transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueTransferDirection {
    /// This barrier releases the resource to `other_queue`.
    Release,
    /// This barrier acquires the resource from `other_queue`.
    Acquire,
}

/// An optional cross-queue ownership transfer attached to a barrier.
#[derive(Clone)]
pub struct QueueTransfer<'a> {
    pub other_queue: &'a CommandQueueRef,
    pub direction: QueueTransferDirection,
}

impl fmt::Debug for QueueTransfer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueTransfer")
            .field("direction", &self.direction)
            .finish()
    }
}

/// A buffer barrier: before-use and after-use are use-flag masks, and the
/// backend computes the native transition from them.
#[derive(Debug, Clone)]
pub struct BufferBarrier<'a> {
    pub buffer: &'a BufferRef,
    pub before: BufferUsage,
    pub after: BufferUsage,
    pub queue_transfer: Option<QueueTransfer<'a>>,
}

/// A texture barrier. An [`UNINITIALIZED`](TextureUsage::UNINITIALIZED)
/// before-use legalizes the first transition on a fresh resource.
#[derive(Debug, Clone)]
pub struct TextureBarrier<'a> {
    pub texture: &'a TextureRef,
    pub before: TextureUsage,
    pub after: TextureUsage,
    /// `None` transitions every sub-resource.
    pub range: Option<SubresourceRange>,
    pub queue_transfer: Option<QueueTransfer<'a>>,
}

/// A queue submission: command buffers plus the fence/semaphore edges that
/// order it against other submissions.
#[derive(Default)]
pub struct SubmitDesc<'a> {
    /// Command buffers in Executable state, consumed in order.
    pub command_buffers: &'a [&'a dyn CommandBuffer],
    /// (fence, value) pairs the device waits to reach before executing.
    pub wait_fences: &'a [(&'a FenceRef, u64)],
    /// (fence, value) pairs signaled after execution completes.
    pub signal_fences: &'a [(&'a FenceRef, u64)],
    /// Semaphores waited before execution (device-to-device edges).
    pub wait_semaphores: &'a [&'a SemaphoreRef],
    /// Semaphores signaled after execution.
    pub signal_semaphores: &'a [&'a SemaphoreRef],
}

impl fmt::Debug for SubmitDesc<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmitDesc")
            .field("command_buffers", &self.command_buffers.len())
            .field("wait_fences", &self.wait_fences.len())
            .field("signal_fences", &self.signal_fences.len())
            .field("wait_semaphores", &self.wait_semaphores.len())
            .field("signal_semaphores", &self.signal_semaphores.len())
            .finish()
    }
}

/// Trait for command queues.
///
/// Submissions to one queue are totally ordered in call order. `submit`
/// is thread-safe per queue; concurrent calls serialize.
pub trait CommandQueue: fmt::Debug + Send + Sync + Any {
    fn as_any(&self) -> &dyn Any;

    fn queue_type(&self) -> QueueType;

    /// Submit command buffers for execution.
    ///
    /// On failure the command buffers remain in Executable state and may be
    /// re-submitted after the cause is corrected.
    fn submit(&self, desc: SubmitDesc<'_>) -> Result<()>;

    /// Signal a fresh fence value and block the calling thread on it.
    fn wait_idle(&self) -> Result<()>;
}

/// A boxed handle representing a command queue.
pub type CommandQueueRef = Arc<dyn CommandQueue>;

/// A vertex buffer binding.
#[derive(Debug, Clone)]
pub struct VertexBufferView {
    pub buffer: BufferRef,
    pub offset: DeviceSize,
    pub size: DeviceSize,
}

/// An index buffer binding.
#[derive(Debug, Clone)]
pub struct IndexBufferView {
    pub buffer: BufferRef,
    pub offset: DeviceSize,
    pub format: IndexFormat,
}

/// Trait for command buffers.
///
/// States: Initial → Recording (after `begin`) → Executable (after `end`) →
/// Pending (after submit) → Initial (after the submission's fence
/// completes). One command buffer is recorded by one thread at a time and
/// submitted exactly once per recording.
///
/// # Valid Usage
///
///  - `begin`/`end` must be balanced, as must
///    `begin_render_pass`/`end_render_pass`.
///  - All commands must be recorded between `begin` and `end`.
///  - Barriers are the caller's responsibility; the library does not track
///    resource states.
pub trait CommandBuffer: fmt::Debug + Any {
    fn as_any(&self) -> &dyn Any;

    /// Enter the Recording state, resetting previously recorded commands.
    fn begin(&mut self) -> Result<()>;

    /// Leave the Recording state; the buffer becomes Executable.
    fn end(&mut self) -> Result<()>;

    /// Insert buffer and texture barriers.
    fn resource_barrier(
        &mut self,
        buffers: &[BufferBarrier<'_>],
        textures: &[TextureBarrier<'_>],
    );

    /// Begin a render pass scoped to the returned encoder.
    ///
    /// Nested render passes are forbidden: the returned encoder must be
    /// given back via `end_render_pass` before any other command is
    /// recorded on this buffer.
    fn begin_render_pass(&mut self, desc: &RenderPassDesc) -> Result<Box<dyn CommandEncoder>>;

    /// End the render pass, consuming the encoder.
    fn end_render_pass(&mut self, encoder: Box<dyn CommandEncoder>);

    /// Copy `size` bytes between buffer ranges. Outside a render pass only.
    fn copy_buffer_to_buffer(
        &mut self,
        dst: &BufferRef,
        dst_offset: DeviceSize,
        src: &BufferRef,
        src_offset: DeviceSize,
        size: DeviceSize,
    );

    /// Copy tightly-packed texel rows from `src` (starting at `src_offset`,
    /// rows padded to the device's upload row alignment) into the
    /// sub-resources selected by `dst_range`.
    fn copy_buffer_to_texture(
        &mut self,
        dst: &TextureRef,
        dst_range: SubresourceRange,
        src: &BufferRef,
        src_offset: DeviceSize,
    );
}

/// A command buffer in a single-owner box.
pub type CommandBufferRef = Box<dyn CommandBuffer>;

/// Trait for render command encoders.
///
/// An encoder exists only between matching
/// [`begin_render_pass`](CommandBuffer::begin_render_pass) /
/// [`end_render_pass`](CommandBuffer::end_render_pass) calls on its parent
/// command buffer.
///
/// # Valid Usage
///
///  - `bind_root_signature` and `bind_graphics_pipeline` must precede any
///    `bind_descriptor_set`, `bind_root_descriptor`, `push_constants`,
///    vertex/index binds, and draws.
pub trait CommandEncoder: fmt::Debug + Any {
    fn as_any(&self) -> &dyn Any;

    /// Recover the concrete encoder; used by the owning command buffer
    /// when the encoder is returned via
    /// [`end_render_pass`](CommandBuffer::end_render_pass).
    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Set the viewport, in canonical top-left-origin coordinates.
    fn set_viewport(&mut self, viewport: Viewport);

    fn set_scissor(&mut self, rect: Rect2D);

    /// Bind vertex buffers to slots `0..views.len()`.
    fn bind_vertex_buffers(&mut self, views: &[VertexBufferView]);

    fn bind_index_buffer(&mut self, view: IndexBufferView);

    fn bind_root_signature(&mut self, root_signature: &RootSignatureRef);

    fn bind_graphics_pipeline(&mut self, pipeline: &GraphicsPipelineRef);

    /// Write `data` into the root-constant slot at offset zero.
    ///
    /// `data.len()` must not exceed
    /// [`MAX_PUSH_CONSTANT_BYTES`](crate::limits::MAX_PUSH_CONSTANT_BYTES)
    /// nor the size declared by the bound root signature.
    fn push_constants(&mut self, data: &[u8]);

    /// Bind a buffer view directly at root-descriptor slot `slot`.
    fn bind_root_descriptor(&mut self, slot: u32, view: &BufferViewRef);

    /// Bind a descriptor set at set index `slot`.
    fn bind_descriptor_set(&mut self, slot: u32, set: &DescriptorSetRef);

    fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    );

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    );
}
