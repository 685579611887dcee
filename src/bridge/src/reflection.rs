//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Normalized shader-reflection records.
//!
//! Reflection is produced by an external pass (D3D shader reflection for
//! DXIL blobs, SPIR-V reflection for SPIR-V blobs) and lowered into the
//! types here before the bridge sees it. Both front-ends share one type
//! vocabulary ([`ShaderTypeDesc`]) for constant-buffer member trees; the
//! bound-resource records stay per-front-end because the two binding models
//! genuinely differ.
use mica_base::{ResourceBindType, ShaderStageFlags};

/// One node of a constant-buffer type tree.
///
/// `size` is the byte size of a *single* element; an array of `elements`
/// copies occupies `size * elements` bytes at the member's stride. Leaf
/// types (scalars, vectors, matrices) have no members.
#[derive(Debug, Clone, Default)]
pub struct ShaderTypeDesc {
    pub name: String,
    pub size: u32,
    pub members: Vec<ShaderMemberDesc>,
}

/// A named member of a struct type.
#[derive(Debug, Clone)]
pub struct ShaderMemberDesc {
    pub name: String,
    /// Index into the owning descriptor's `types` list.
    pub type_index: usize,
    /// Byte offset from the start of the containing struct.
    pub offset: u32,
    /// Array element count; `0` means the member is not an array.
    pub elements: u32,
}

/// Resource classes reported by HLSL reflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HlslInputType {
    CBuffer,
    TBuffer,
    Texture,
    Sampler,
    Structured,
    RwStructured,
    ByteAddress,
    RwByteAddress,
    RwTexture,
}

impl HlslInputType {
    pub fn bind_type(&self) -> ResourceBindType {
        match *self {
            HlslInputType::CBuffer => ResourceBindType::CBuffer,
            HlslInputType::Texture => ResourceBindType::Texture,
            HlslInputType::Sampler => ResourceBindType::Sampler,
            HlslInputType::TBuffer
            | HlslInputType::Structured
            | HlslInputType::ByteAddress => ResourceBindType::Buffer,
            HlslInputType::RwStructured | HlslInputType::RwByteAddress => {
                ResourceBindType::RwBuffer
            }
            HlslInputType::RwTexture => ResourceBindType::RwTexture,
        }
    }
}

/// A resource binding reported by HLSL reflection.
#[derive(Debug, Clone)]
pub struct HlslBoundResource {
    pub name: String,
    pub ty: HlslInputType,
    /// Register index (`b#`/`t#`/`u#`/`s#`).
    pub bind_point: u32,
    /// Number of registers; `0` marks an unbounded array.
    pub bind_count: u32,
    /// Register space.
    pub space: u32,
    pub stages: ShaderStageFlags,
}

/// A variable inside a legacy `cbuffer` block.
#[derive(Debug, Clone)]
pub struct HlslVariable {
    pub name: String,
    pub start_offset: u32,
    /// Index into [`HlslShaderDesc::types`].
    pub type_index: usize,
    /// Array element count; `0` means not an array.
    pub elements: u32,
}

/// A constant buffer reported by HLSL reflection.
#[derive(Debug, Clone)]
pub struct HlslCBuffer {
    pub name: String,
    /// Total padded size in bytes.
    pub size: u32,
    pub variables: Vec<HlslVariable>,
    /// `true` for `ConstantBuffer<T>` views (one variable of struct type),
    /// `false` for legacy `cbuffer` blocks with loose variables.
    pub is_view: bool,
}

/// The reflection record of one HLSL shader combo (all stages merged).
#[derive(Debug, Clone, Default)]
pub struct HlslShaderDesc {
    pub bound_resources: Vec<HlslBoundResource>,
    pub cbuffers: Vec<HlslCBuffer>,
    pub types: Vec<ShaderTypeDesc>,
}

impl HlslShaderDesc {
    pub fn cbuffer_by_name(&self, name: &str) -> Option<&HlslCBuffer> {
        self.cbuffers.iter().find(|cb| cb.name == name)
    }
}

/// Resource classes reported by SPIR-V reflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpirvResourceKind {
    UniformBuffer,
    StorageBuffer,
    SampledImage,
    StorageImage,
    Sampler,
}

impl SpirvResourceKind {
    pub fn bind_type(&self) -> ResourceBindType {
        match *self {
            SpirvResourceKind::UniformBuffer => ResourceBindType::CBuffer,
            SpirvResourceKind::StorageBuffer => ResourceBindType::RwBuffer,
            SpirvResourceKind::SampledImage => ResourceBindType::Texture,
            SpirvResourceKind::StorageImage => ResourceBindType::RwTexture,
            SpirvResourceKind::Sampler => ResourceBindType::Sampler,
        }
    }
}

/// A descriptor binding reported by SPIR-V reflection.
#[derive(Debug, Clone)]
pub struct SpirvResourceBinding {
    pub name: String,
    pub kind: SpirvResourceKind,
    pub set: u32,
    pub binding: u32,
    /// Array element count; `0` means not an array.
    pub array_size: u32,
    /// A runtime-sized (bindless) array.
    pub unbounded: bool,
    pub stages: ShaderStageFlags,
    /// For uniform buffers: index into `types` of the block type.
    pub type_index: Option<usize>,
    /// For uniform buffers: the padded block size in bytes.
    pub block_size: u32,
    /// See [`HlslCBuffer::is_view`]; SPIR-V cross-compiled from HLSL keeps
    /// the distinction.
    pub is_view: bool,
}

/// A push-constant block reported by SPIR-V reflection.
#[derive(Debug, Clone)]
pub struct SpirvPushConstant {
    pub name: String,
    pub size: u32,
    pub stages: ShaderStageFlags,
    pub type_index: usize,
}

/// The reflection record of one SPIR-V shader combo (all stages merged).
#[derive(Debug, Clone, Default)]
pub struct SpirvShaderDesc {
    pub resource_bindings: Vec<SpirvResourceBinding>,
    pub push_constants: Vec<SpirvPushConstant>,
    pub types: Vec<ShaderTypeDesc>,
}
