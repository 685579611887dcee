//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
use bitflags::bitflags;

bitflags! {
    /// How a buffer is, or is about to be, used.
    ///
    /// The same vocabulary serves double duty: it declares the set of legal
    /// uses at creation time, and a single flag names the use a barrier
    /// transitions from or to. The backend maps a flag onto its native
    /// vocabulary (resource states on the table-model backend, stage +
    /// access masks on the set-model backend).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// No particular use. Legal as a barrier `before` state on a fresh
        /// resource.
        const COMMON = 1 << 0;
        const MAP_READ = 1 << 1;
        const MAP_WRITE = 1 << 2;
        const COPY_SRC = 1 << 3;
        const COPY_DST = 1 << 4;
        const INDEX = 1 << 5;
        const VERTEX = 1 << 6;
        /// Constant buffer (uniform buffer) reads.
        const CBUFFER = 1 << 7;
        /// Read-only shader resource (SRV / sampled buffer).
        const RESOURCE = 1 << 8;
        /// Read-write shader resource (UAV / storage buffer).
        const UNORDERED_ACCESS = 1 << 9;
        /// Indirect argument reads.
        const INDIRECT = 1 << 10;
    }
}

bitflags! {
    /// How a texture is, or is about to be, used. See [`BufferUsage`] for
    /// the dual role of this vocabulary.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// The contents are undefined. Only meaningful as a barrier `before`
        /// state: it legalizes the first transition on a fresh resource.
        const UNINITIALIZED = 1 << 0;
        /// Presentable by a swapchain.
        const PRESENT = 1 << 1;
        const COPY_SRC = 1 << 2;
        const COPY_DST = 1 << 3;
        /// Read-only shader resource (sampled image).
        const RESOURCE = 1 << 4;
        const RENDER_TARGET = 1 << 5;
        const DEPTH_STENCIL_READ = 1 << 6;
        const DEPTH_STENCIL_WRITE = 1 << 7;
        /// Read-write shader resource (storage image).
        const UNORDERED_ACCESS = 1 << 8;
    }
}

bitflags! {
    /// The set of shader stages an object is visible to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX = 1 << 0;
        const PIXEL = 1 << 1;
        const COMPUTE = 1 << 2;
    }
}

impl ShaderStageFlags {
    pub fn graphics() -> Self {
        Self::VERTEX | Self::PIXEL
    }
}

bitflags! {
    /// Color channels enabled for writing by a color target.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorWriteFlags: u32 {
        const RED = 1 << 0;
        const GREEN = 1 << 1;
        const BLUE = 1 << 2;
        const ALPHA = 1 << 3;
    }
}

impl ColorWriteFlags {
    pub fn color() -> Self {
        Self::RED | Self::GREEN | Self::BLUE
    }
}

/// Where a resource's memory lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryKind {
    /// Device-local. Not mappable; populated via copies from upload memory.
    Device,
    /// Host-visible, device-readable. Mappable for writing.
    Upload,
    /// Host-visible, device-writable. Mappable for reading.
    Readback,
}

bitflags! {
    /// Creation hints that do not change semantics.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResourceHints: u32 {
        /// Prefer a dedicated allocation for this resource.
        const DEDICATED = 1 << 0;
    }
}
