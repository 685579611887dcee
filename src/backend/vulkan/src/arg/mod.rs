//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Root signatures, descriptor-set layouts, and the descriptor pool
//! allocator.
pub mod layout;
pub mod pool;

pub use self::layout::{VulkanDescriptorSet, VulkanRootSignature};
pub use self::pool::DescriptorPoolAllocator;
