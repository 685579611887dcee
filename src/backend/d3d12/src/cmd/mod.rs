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

pub use self::buffer::D3D12CommandBuffer;
pub use self::encoder::D3D12CommandEncoder;
pub use self::queue::D3D12Queue;
pub use self::sync::{D3D12Fence, D3D12Semaphore};
