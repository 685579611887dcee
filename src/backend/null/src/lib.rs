//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Mica Null Backend — implements the Mica interface with no GPU at all.
//!
//! Every creation succeeds, commands are validated and executed against
//! CPU-side storage (buffer copies really copy bytes, so round-trip tests
//! observe real data flow), fences complete the moment their submission is
//! consumed, and the swapchain cycles back-buffer indices round-robin.
//!
//! The backend enforces the interface's state machines strictly — an
//! unbalanced `begin`/`end`, a draw without a bound pipeline, or a second
//! acquire without a present aborts — so misuse fails tests loudly instead
//! of passing silently.

mod cmd;
mod device;
mod resources;
mod swapchain;

pub use crate::device::NullDevice;
