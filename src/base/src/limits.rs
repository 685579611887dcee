//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Device identification and capability records.

/// Identifies a backend implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// The table-model backend (Direct3D 12).
    D3D12,
    /// The set-model backend (Vulkan).
    Vulkan,
    /// The no-op software backend used for testing.
    Null,
}

/// Alignment requirements reported by a device.
///
/// Callers use these when suballocating constant data and when laying out
/// texture data in upload buffers; the values are queried once and cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDetail {
    /// Required offset alignment of constant-buffer views, in bytes.
    pub cbuffer_alignment: u32,
    /// Required placement alignment of texture data in upload buffers.
    pub upload_texture_alignment: u32,
    /// Required row-pitch alignment of texture data in upload buffers.
    pub upload_texture_row_alignment: u32,
    /// Required alignment of mapped-memory access offsets.
    pub map_alignment: u32,
}

/// The root-signature budget shared by all backends, in DWORDs.
pub const MAX_ROOT_SIGNATURE_DWORDS: u32 = 64;

/// The largest push-constant range an encoder accepts, in bytes.
pub const MAX_PUSH_CONSTANT_BYTES: usize = 256;

/// The largest number of simultaneous color targets.
pub const MAX_COLOR_TARGETS: usize = 8;
