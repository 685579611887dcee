//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Mica Vulkan Backend — implements the Mica interface using the Vulkan API.
//!
//! This is the set-model backend: the interface's root signature lowers
//! onto a `VkPipelineLayout`, descriptor sets come from a paged descriptor
//! pool, render passes are synthesized transiently per `begin_render_pass`,
//! and the interface's fences are timeline semaphores.
//!
//! # Backend-specific behaviors
//!
//! - Device memory is placed through a VMA-style allocator
//!   ([`gpu_allocator`]); upload/readback resources are persistently
//!   mapped.
//! - Root descriptors are realized as dynamic-offset uniform/storage
//!   descriptors in a synthetic first set owned by the root signature; the
//!   interface's declared set indices shift up by one native set when any
//!   root descriptor exists.
//! - The viewport is flipped (negative height) so the interface's
//!   top-left-origin contract holds. This requires Vulkan 1.1 semantics,
//!   which the instance always requests.
//!
//! # Unsafety
//!
//! The backend trusts the caller to follow the interface's valid-usage
//! rules; violating them (foreign handles, missing barriers, destroying
//! objects the GPU still reads) is undefined behavior, as it is on every
//! unsafe-by-design Vulkan layer.

pub mod arg;
pub mod buffer;
pub mod cmd;
pub mod device;
pub mod formats;
pub mod image;
pub mod pipeline;
pub mod renderpass;
pub mod sampler;
pub mod shader;
pub mod swapchain;
mod utils;

pub use crate::device::{InstanceDesc, VulkanDevice, VulkanDeviceDesc};
pub use crate::utils::translate_generic_error;

/// The maximum number of descriptor sets bindable at once, including the
/// synthetic root-descriptor set.
pub const MAX_NUM_DESCRIPTOR_SETS: usize = 8;
