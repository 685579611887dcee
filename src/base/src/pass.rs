//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Render pass descriptors.
use crate::resources::TextureViewRef;

/// What happens to an attachment's contents at the start of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadOp {
    /// The previous contents are irrelevant.
    #[default]
    DontCare,
    /// The previous contents are preserved.
    Load,
    /// The attachment is cleared to the descriptor's clear value.
    Clear,
}

/// What happens to an attachment's contents at the end of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StoreOp {
    #[default]
    Store,
    Discard,
}

/// A color clear value, in the attachment's format interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ColorClearValue {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// A depth/stencil clear value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DepthStencilClearValue {
    pub depth: f32,
    pub stencil: u8,
}

/// One color attachment of a render pass.
#[derive(Debug, Clone)]
pub struct ColorAttachment {
    /// The view to render into. Must have been created with
    /// [`TextureUsage::RENDER_TARGET`](crate::TextureUsage::RENDER_TARGET).
    pub target: TextureViewRef,
    pub load: LoadOp,
    pub store: StoreOp,
    pub clear_value: ColorClearValue,
}

/// The depth-stencil attachment of a render pass.
#[derive(Debug, Clone)]
pub struct DepthStencilAttachment {
    pub target: TextureViewRef,
    pub depth_load: LoadOp,
    pub depth_store: StoreOp,
    pub stencil_load: LoadOp,
    pub stencil_store: StoreOp,
    pub clear_value: DepthStencilClearValue,
}

/// Describes one render pass.
///
/// The pass is scoped to the encoder returned by
/// [`CommandBuffer::begin_render_pass`](crate::CommandBuffer::begin_render_pass);
/// on the set-model backend a transient native render pass and framebuffer
/// are synthesized from this descriptor.
#[derive(Debug, Clone, Default)]
pub struct RenderPassDesc {
    pub color_attachments: Vec<ColorAttachment>,
    pub depth_stencil_attachment: Option<DepthStencilAttachment>,
    pub name: String,
}
