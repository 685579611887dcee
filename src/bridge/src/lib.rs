//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! # Mica Bind Bridge
//!
//! The bridge sits above the render interface: it consumes shader
//! reflection and a device, compiles an allocation plan of push constants /
//! root descriptors / descriptor sets / bindless tables that fits the
//! backend's root-signature budget, and at draw time issues the right bind
//! calls on a command encoder.
//!
//! The pieces, bottom up:
//!
//!  - [`reflection`] — the normalized vocabulary both reflection front-ends
//!    (HLSL reflection for DXIL, SPIR-V reflection for SPIR-V) are lowered
//!    into before they reach the bridge.
//!  - [`storage`] — CPU-side typed byte storage mirroring every constant
//!    buffer's struct layout; members are addressed by name and path.
//!  - [`layout`] — the layout compiler: reflection in, ordered binding
//!    entries + a root-signature descriptor out.
//!  - [`arena`] — the per-frame upload arena constant data is suballocated
//!    from.
//!  - [`bridge`] — the runtime: caches resource views and constant bytes,
//!    uploads once per frame, and drives the encoder.

pub mod arena;
pub mod bridge;
pub mod layout;
pub mod reflection;
pub mod storage;

pub use crate::arena::*;
pub use crate::bridge::*;
pub use crate::layout::*;
pub use crate::reflection::*;
pub use crate::storage::*;
