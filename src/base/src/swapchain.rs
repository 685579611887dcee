//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Swapchains.
use std::any::Any;
use std::fmt;

use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::command::CommandQueueRef;
use crate::error::Result;
use crate::formats::TextureFormat;
use crate::resources::TextureRef;

/// Describes a swapchain.
#[derive(Clone)]
pub struct SwapChainDesc {
    /// The queue presentation happens on. Must be a
    /// [`Direct`](crate::QueueType::Direct) queue.
    pub present_queue: CommandQueueRef,
    /// The native window to present into.
    pub window: RawWindowHandle,
    /// The native display the window belongs to (used by the set-model
    /// backend for surface creation).
    pub display: RawDisplayHandle,
    pub width: u32,
    pub height: u32,
    pub back_buffer_count: u32,
    pub format: TextureFormat,
    /// When set, presentation waits for vertical sync.
    pub enable_sync: bool,
}

impl fmt::Debug for SwapChainDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwapChainDesc")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("back_buffer_count", &self.back_buffer_count)
            .field("format", &self.format)
            .field("enable_sync", &self.enable_sync)
            .finish()
    }
}

/// Trait for swapchain objects.
///
/// Exactly one back buffer is acquired at a time. After `acquire_next`, the
/// image must be transitioned `Uninitialized → RenderTarget → … → Present`
/// before the matching `present`.
///
/// # Valid Usage
///
///  - All methods are single-thread; typically the presenting thread.
///  - `acquire_next` and `present` must alternate.
///  - The swapchain must be destroyed only after the present queue has been
///    waited idle.
pub trait SwapChain: fmt::Debug + Any {
    fn as_any(&self) -> &dyn Any;

    /// Acquire the next back buffer, blocking on the frame-in-flight fence
    /// if the CPU is too far ahead.
    ///
    /// The returned texture is owned by the swapchain; its index is
    /// reported by `current_back_buffer_index` and is not required to be
    /// sequential.
    fn acquire_next(&mut self) -> Result<TextureRef>;

    /// Present the currently acquired back buffer. May block on driver-side
    /// queueing.
    ///
    /// A failed present returns the swapchain to the pre-acquire state;
    /// callers typically respond by calling `resize` on the next iteration.
    fn present(&mut self) -> Result<()>;

    /// The back buffer most recently returned by `acquire_next`.
    fn current_back_buffer(&self) -> Result<TextureRef>;

    fn current_back_buffer_index(&self) -> u32;

    fn back_buffer_count(&self) -> u32;

    /// Recreate the native swapchain with a new extent: waits the in-flight
    /// fences, destroys all back-buffer images, resets the frame counter,
    /// and allocates new images. Pending acquired images are abandoned.
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;

    fn desc(&self) -> &SwapChainDesc;
}

/// A swapchain in a single-owner box.
pub type SwapChainRef = Box<dyn SwapChain>;
