//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Queues, command buffers, encoders, and synchronization objects.
pub mod buffer;
pub mod encoder;
pub mod queue;
pub mod sync;

pub use self::buffer::VulkanCommandBuffer;
pub use self::encoder::VulkanCommandEncoder;
pub use self::queue::VulkanQueue;
pub use self::sync::{VulkanFence, VulkanSemaphore};
