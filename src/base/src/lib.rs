//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! This crate is a part of [Mica](../mica/index.html) and provides the base
//! interface implemented by every backend.
//!
//! The interface is a capability set, not a class hierarchy: each entity
//! (device, queue, command buffer, resources, …) is a trait, and objects are
//! passed around as boxed trait objects. Creation goes through descriptor
//! structs and returns [`Result`] values — *creation never aborts*. A failed
//! creation leaves the device usable for subsequent, unrelated calls.
//!
//! # Handle model
//!
//! Shared objects use `Arc<dyn Trait>` aliases (`BufferRef`, `TextureRef`,
//! …). Dropping the last handle destroys the underlying object; it is the
//! caller's responsibility to have waited the relevant queues idle first.
//! Single-owner objects whose methods require exclusive access — command
//! buffers and swapchains — use `Box<dyn Trait>` aliases instead.
//!
//! Every object trait exposes `as_any` so a backend can recover its concrete
//! type from a handle it is given. Handing an object to a device other than
//! the one that created it is a programmer error and aborts.

pub mod arg;
pub mod command;
pub mod device;
pub mod error;
mod flags;
pub use self::flags::*;
pub mod formats;
pub mod limits;
pub mod pass;
pub mod pipeline;
pub mod resources;
pub mod sampler;
pub mod shader;
pub mod swapchain;
pub mod sync;

/// Represents a device memory size and offset value.
pub type DeviceSize = u64;

/// Specifies a viewport in a render pipeline.
///
/// Coordinates are canonical top-left-origin regardless of backend; the
/// set-model backend flips Y internally so both backends produce identical
/// output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// The X coordinate of the viewport's upper left corner.
    pub x: f32,
    /// The Y coordinate of the viewport's upper left corner.
    pub y: f32,
    /// The width of the viewport (measured in pixels).
    pub width: f32,
    /// The height of the viewport (measured in pixels).
    pub height: f32,
    /// The lower bound of the viewport's depth range.
    pub min_depth: f32,
    /// The upper bound of the viewport's depth range.
    pub max_depth: f32,
}

// Import all objects
#[doc(no_inline)]
pub use crate::arg::*;
#[doc(no_inline)]
pub use crate::command::*;
#[doc(no_inline)]
pub use crate::device::*;
#[doc(no_inline)]
pub use crate::error::{Error, ErrorKind, Result};
#[doc(no_inline)]
pub use crate::formats::*;
#[doc(no_inline)]
pub use crate::limits::*;
#[doc(no_inline)]
pub use crate::pass::*;
#[doc(no_inline)]
pub use crate::pipeline::*;
#[doc(no_inline)]
pub use crate::resources::*;
#[doc(no_inline)]
pub use crate::sampler::*;
#[doc(no_inline)]
pub use crate::shader::*;
#[doc(no_inline)]
pub use crate::swapchain::*;
#[doc(no_inline)]
pub use crate::sync::*;

#[doc(no_inline)]
pub use mica_common::{Extent2D, Extent3D, Rect2D};
