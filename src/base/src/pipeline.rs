//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Graphics pipeline state.
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::arg::RootSignatureRef;
use crate::formats::{IndexFormat, TextureFormat, VertexFormat};
use crate::sampler::CompareFunction;
use crate::shader::ShaderRef;
use crate::ColorWriteFlags;

/// How a vertex buffer advances between fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VertexStepMode {
    #[default]
    Vertex,
    Instance,
}

/// One attribute within a vertex buffer layout.
#[derive(Debug, Clone)]
pub struct VertexElement {
    pub offset: u64,
    /// HLSL semantic name; ignored by the set-model backend, which uses
    /// `location`.
    pub semantic: String,
    pub semantic_index: u32,
    pub format: VertexFormat,
    /// Shader input location for the set-model backend.
    pub location: u32,
}

/// The layout of one bound vertex buffer.
#[derive(Debug, Clone, Default)]
pub struct VertexBufferLayout {
    pub array_stride: u64,
    pub step_mode: VertexStepMode,
    pub elements: Vec<VertexElement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrontFace {
    Ccw,
    #[default]
    Cw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    Front,
    #[default]
    Back,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PolygonMode {
    #[default]
    Fill,
    Line,
    Point,
}

/// Input assembly and rasterizer state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveState {
    pub topology: PrimitiveTopology,
    pub front_face: FrontFace,
    pub cull: CullMode,
    pub poly: PolygonMode,
    /// Index format that carries the primitive-restart value for strip
    /// topologies.
    pub strip_index_format: Option<IndexFormat>,
    pub unclipped_depth: bool,
    pub conservative: bool,
}

impl Default for PrimitiveState {
    fn default() -> Self {
        Self {
            topology: PrimitiveTopology::TriangleList,
            front_face: FrontFace::Cw,
            cull: CullMode::Back,
            poly: PolygonMode::Fill,
            strip_index_format: None,
            unclipped_depth: true,
            conservative: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilOperation {
    Keep,
    Zero,
    Replace,
    Invert,
    IncrementClamp,
    DecrementClamp,
    IncrementWrap,
    DecrementWrap,
}

/// Per-face stencil behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilFaceState {
    pub compare: CompareFunction,
    pub fail_op: StencilOperation,
    pub depth_fail_op: StencilOperation,
    pub pass_op: StencilOperation,
}

impl Default for StencilFaceState {
    fn default() -> Self {
        Self {
            compare: CompareFunction::Always,
            fail_op: StencilOperation::Keep,
            depth_fail_op: StencilOperation::Keep,
            pass_op: StencilOperation::Keep,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilState {
    pub front: StencilFaceState,
    pub back: StencilFaceState,
    pub read_mask: u32,
    pub write_mask: u32,
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            front: StencilFaceState::default(),
            back: StencilFaceState::default(),
            read_mask: 0xff,
            write_mask: 0xff,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DepthBiasState {
    pub constant: i32,
    pub slope_scale: f32,
    pub clamp: f32,
}

/// Depth-stencil target state.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthStencilState {
    pub format: TextureFormat,
    pub depth_compare: CompareFunction,
    pub depth_bias: DepthBiasState,
    pub stencil: Option<StencilState>,
    pub depth_write_enable: bool,
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self {
            format: TextureFormat::D32Float,
            depth_compare: CompareFunction::Less,
            depth_bias: DepthBiasState::default(),
            stencil: None,
            depth_write_enable: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiSampleState {
    pub count: u32,
    pub mask: u64,
    pub alpha_to_coverage_enable: bool,
}

impl Default for MultiSampleState {
    fn default() -> Self {
        Self {
            count: 1,
            mask: 0xffff_ffff,
            alpha_to_coverage_enable: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    Src,
    OneMinusSrc,
    SrcAlpha,
    OneMinusSrcAlpha,
    Dst,
    OneMinusDst,
    DstAlpha,
    OneMinusDstAlpha,
    SrcAlphaSaturated,
    Constant,
    OneMinusConstant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOperation {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendComponent {
    pub src: BlendFactor,
    pub dst: BlendFactor,
    pub op: BlendOperation,
}

impl Default for BlendComponent {
    fn default() -> Self {
        Self {
            src: BlendFactor::One,
            dst: BlendFactor::Zero,
            op: BlendOperation::Add,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlendState {
    pub color: BlendComponent,
    pub alpha: BlendComponent,
}

/// State of one color target. The format must match the render pass the
/// pipeline is used with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTargetState {
    pub format: TextureFormat,
    /// `None` disables blending for this target.
    pub blend: Option<BlendState>,
    pub write_mask: ColorWriteFlags,
}

impl ColorTargetState {
    pub fn new(format: TextureFormat) -> Self {
        Self {
            format,
            blend: None,
            write_mask: ColorWriteFlags::all(),
        }
    }
}

/// A shader stage reference: the shader object plus the entry point to use.
#[derive(Debug, Clone)]
pub struct ShaderEntry {
    pub shader: ShaderRef,
    pub entry_point: String,
}

/// Describes a graphics pipeline.
///
/// # Valid Usage
///
///  - All shader stages must have been reflected/authored against
///    `root_signature`.
///  - `color_targets` formats must match the render pass the pipeline is
///    bound in.
#[derive(Debug, Clone)]
pub struct GraphicsPipelineDesc {
    pub root_signature: RootSignatureRef,
    pub vs: Option<ShaderEntry>,
    pub ps: Option<ShaderEntry>,
    pub vertex_layouts: Vec<VertexBufferLayout>,
    pub primitive: PrimitiveState,
    pub depth_stencil: Option<DepthStencilState>,
    pub multi_sample: MultiSampleState,
    pub color_targets: Vec<ColorTargetState>,
    pub name: String,
}

/// Trait for graphics pipeline objects.
pub trait GraphicsPipeline: fmt::Debug + Send + Sync + Any {
    fn as_any(&self) -> &dyn Any;
}

/// A boxed handle representing a graphics pipeline.
pub type GraphicsPipelineRef = Arc<dyn GraphicsPipeline>;
