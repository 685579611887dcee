//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! # Mica — a uniform interface over explicit graphics APIs
//!
//! Mica is a thin, hand-rollable layer over Direct3D 12 and Vulkan: one
//! capability surface (device, queues, command buffers and encoders,
//! resources and views, root signatures, descriptor sets, swapchains,
//! fences and semaphores) with identical semantics on both backends, plus
//! the machinery that makes such a surface usable in practice — descriptor
//! allocators, an upload arena, and a reflection-driven bind bridge.
//!
//! # Terminology
//!
//! ## Mappings with the native APIs
//!
//! |          Mica           |          D3D12          |        Vulkan         |
//! | ----------------------- | ----------------------- | --------------------- |
//! | root signature          | root signature          | pipeline layout       |
//! | descriptor set          | descriptor table slice  | descriptor set        |
//! | root descriptor         | root CBV/SRV/UAV        | dynamic-offset binding|
//! | push constants          | root constants          | push constants        |
//! | descriptor-set layout   | table ranges            | descriptor set layout |
//! | command buffer          | allocator + list        | pool + command buffer |
//! | command encoder         | (open list section)     | render-pass scope     |
//! | fence                   | `ID3D12Fence`           | timeline semaphore    |
//! | semaphore               | fence-backed edge       | binary semaphore      |
//! | buffer view             | CBV/SRV/UAV             | (buffer, range)       |
//! | texture view            | SRV/UAV/RTV/DSV         | image view            |
//!
//! # Crates
//!
//! The public surface lives in [`base`]; [`bridge`] sits above it;
//! [`backends`] holds the concrete implementations. The null backend
//! (re-exported under `backends`) implements the full surface without a
//! GPU and backs the test suite.
//!
//! # Error model
//!
//! Creation never aborts: every fallible operation returns
//! [`base::Result`], failures are logged with a human-readable reason, and
//! a failed creation leaves the device usable. Contract violations —
//! unbalanced begin/end, foreign handles, draws without a bound pipeline —
//! abort instead, pointing at the offending call site.

pub use mica_base as base;
pub use mica_bridge as bridge;
pub use mica_common as common;

/// Includes a backend for each target API.
pub mod backends {
    pub use mica_null as null;
    pub use mica_vulkan as vulkan;

    #[cfg(windows)]
    pub use mica_d3d12 as d3d12;
}

/// The Mica prelude: the traits needed to call methods on handle aliases.
pub mod prelude {
    #[doc(no_inline)]
    pub use mica_base::{
        Buffer, BufferView, CommandBuffer, CommandEncoder, CommandQueue, DescriptorSet, Device,
        Fence, GraphicsPipeline, RootSignature, Sampler, Semaphore, Shader, SwapChain, Texture,
        TextureView,
    };
}
