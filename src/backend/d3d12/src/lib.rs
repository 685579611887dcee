//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Mica D3D12 Backend — implements the Mica interface using Direct3D 12.
//!
//! This is the table-model backend: descriptors live in CPU-side staging
//! heaps (paged, buddy-allocated) and shader-visible heaps (free-listed),
//! a descriptor set is a slice of the shader-visible heap, and the unified
//! root signature serializes directly onto the native one.
//!
//! Resources are created as committed resources; placed-resource heaps are
//! an optimization this backend does not pursue.
//!
//! The crate compiles to nothing on non-Windows targets.
#![cfg(windows)]

pub mod cmd;
pub mod descriptor;
pub mod device;
pub mod formats;
pub mod pipeline;
pub mod rootsig;
pub mod resources;
pub mod swapchain;
mod utils;

pub use crate::device::{D3D12Device, D3D12DeviceDesc};
pub use crate::utils::translate_hresult;

/// Capacity of one CPU descriptor-heap page.
pub const CPU_DESCRIPTOR_PAGE_SIZE: u32 = 256;

/// Empty pages kept around per CPU allocator before reclamation.
pub const CPU_DESCRIPTOR_KEEP_FREE_PAGES: usize = 1;

/// Size of the shader-visible CBV/SRV/UAV heap.
pub const GPU_RESOURCE_HEAP_SIZE: u32 = 64 * 1024;

/// Size of the shader-visible sampler heap. Limited by the API to 2048.
pub const GPU_SAMPLER_HEAP_SIZE: u32 = 2048;
