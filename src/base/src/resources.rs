//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Buffers, textures, and the views that alias them.
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::flags::{BufferUsage, MemoryKind, ResourceHints, TextureUsage};
use crate::formats::TextureFormat;
use crate::DeviceSize;

/// Dimensionality of a texture resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureDimension {
    #[default]
    Unknown,
    Dim1D,
    Dim2D,
    Dim3D,
}

/// Dimensionality of a texture view, including array and cube flavors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureViewDimension {
    #[default]
    Unknown,
    Dim1D,
    Dim2D,
    Dim3D,
    Dim1DArray,
    Dim2DArray,
    Cube,
    CubeArray,
}

/// A range of sub-resources: (mip levels) × (array layers).
///
/// A sub-resource is identified by (mip, array-slice); a count of
/// [`SubresourceRange::ALL`] selects everything from the base upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubresourceRange {
    pub base_array_layer: u32,
    pub array_layer_count: u32,
    pub base_mip_level: u32,
    pub mip_level_count: u32,
}

impl SubresourceRange {
    pub const ALL: u32 = u32::MAX;

    /// All mips of all layers.
    pub const fn all() -> Self {
        Self {
            base_array_layer: 0,
            array_layer_count: Self::ALL,
            base_mip_level: 0,
            mip_level_count: Self::ALL,
        }
    }

    /// The first sub-resource only.
    pub const fn first() -> Self {
        Self {
            base_array_layer: 0,
            array_layer_count: 1,
            base_mip_level: 0,
            mip_level_count: 1,
        }
    }
}

impl Default for SubresourceRange {
    fn default() -> Self {
        Self::all()
    }
}

/// Describes a buffer resource.
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Size in bytes. Must be non-zero.
    pub size: DeviceSize,
    /// The memory the buffer lives in. Mapping is legal only for
    /// [`MemoryKind::Upload`] and [`MemoryKind::Readback`].
    pub memory: MemoryKind,
    /// The set of legal uses.
    pub usage: BufferUsage,
    pub hints: ResourceHints,
    /// Debug name, forwarded to the native API's labeling facility.
    pub name: String,
}

impl Default for BufferDesc {
    fn default() -> Self {
        Self {
            size: 0,
            memory: MemoryKind::Device,
            usage: BufferUsage::empty(),
            hints: ResourceHints::default(),
            name: String::new(),
        }
    }
}

/// Describes a texture resource.
#[derive(Debug, Clone)]
pub struct TextureDesc {
    pub dim: TextureDimension,
    pub width: u32,
    pub height: u32,
    /// Depth for 3D textures, array size otherwise.
    pub depth_or_array_size: u32,
    pub mip_levels: u32,
    pub sample_count: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
    pub hints: ResourceHints,
    pub name: String,
}

impl Default for TextureDesc {
    fn default() -> Self {
        Self {
            dim: TextureDimension::Dim2D,
            width: 0,
            height: 0,
            depth_or_array_size: 1,
            mip_levels: 1,
            sample_count: 1,
            format: TextureFormat::Unknown,
            usage: TextureUsage::empty(),
            hints: ResourceHints::default(),
            name: String::new(),
        }
    }
}

/// A byte range within a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferRange {
    pub offset: DeviceSize,
    pub size: DeviceSize,
}

/// Describes a view over a sub-range of a buffer.
#[derive(Debug, Clone)]
pub struct BufferViewDesc {
    pub buffer: BufferRef,
    pub range: BufferRange,
    /// Element stride for structured views; zero for raw/constant views.
    pub stride: u32,
    /// Element format for typed views; `Unknown` otherwise.
    pub format: TextureFormat,
    /// The single use this view is created for.
    pub usage: BufferUsage,
}

/// Describes a view over a sub-range of a texture.
#[derive(Debug, Clone)]
pub struct TextureViewDesc {
    pub texture: TextureRef,
    pub dim: TextureViewDimension,
    /// View format; `Unknown` inherits the resource format.
    pub format: TextureFormat,
    pub range: SubresourceRange,
    /// The single use this view is created for.
    pub usage: TextureUsage,
}

/// Trait for buffer objects.
///
/// # Valid Usage
///
///  - `map`/`unmap` are legal only on upload/readback memory, from one
///    thread at a time per resource.
///  - Writes through a mapped pointer must be complete before any submitted
///    command reads the range.
pub trait Buffer: fmt::Debug + Send + Sync + Any {
    fn as_any(&self) -> &dyn Any;

    fn desc(&self) -> &BufferDesc;

    /// Map `size` bytes at `offset` and return a host pointer aliasing
    /// GPU-visible memory. Mapping an already-mapped range returns the same
    /// pointer.
    fn map(&self, offset: DeviceSize, size: DeviceSize) -> Result<*mut u8>;

    fn unmap(&self, offset: DeviceSize, size: DeviceSize);
}

/// A boxed handle representing a buffer.
pub type BufferRef = Arc<dyn Buffer>;

/// Trait for texture objects.
pub trait Texture: fmt::Debug + Send + Sync + Any {
    fn as_any(&self) -> &dyn Any;

    fn desc(&self) -> &TextureDesc;
}

/// A boxed handle representing a texture.
pub type TextureRef = Arc<dyn Texture>;

/// Trait for buffer view objects. The parent buffer outlives the view
/// because the view holds a handle to it.
pub trait BufferView: fmt::Debug + Send + Sync + Any {
    fn as_any(&self) -> &dyn Any;

    fn desc(&self) -> &BufferViewDesc;
}

/// A boxed handle representing a buffer view.
pub type BufferViewRef = Arc<dyn BufferView>;

/// Trait for texture view objects.
pub trait TextureView: fmt::Debug + Send + Sync + Any {
    fn as_any(&self) -> &dyn Any;

    fn desc(&self) -> &TextureViewDesc;
}

/// A boxed handle representing a texture view.
pub type TextureViewRef = Arc<dyn TextureView>;

/// A resource view of either flavor, as accepted by descriptor-set writes.
#[derive(Debug, Clone)]
pub enum ResourceViewRef {
    Buffer(BufferViewRef),
    Texture(TextureViewRef),
}

impl ResourceViewRef {
    pub fn as_buffer(&self) -> Option<&BufferViewRef> {
        match self {
            ResourceViewRef::Buffer(view) => Some(view),
            ResourceViewRef::Texture(_) => None,
        }
    }

    pub fn as_texture(&self) -> Option<&TextureViewRef> {
        match self {
            ResourceViewRef::Buffer(_) => None,
            ResourceViewRef::Texture(view) => Some(view),
        }
    }
}

impl From<BufferViewRef> for ResourceViewRef {
    fn from(view: BufferViewRef) -> Self {
        ResourceViewRef::Buffer(view)
    }
}

impl From<TextureViewRef> for ResourceViewRef {
    fn from(view: TextureViewRef) -> Self {
        ResourceViewRef::Texture(view)
    }
}
