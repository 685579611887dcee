//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Fences and semaphores.
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// Trait for fence objects.
///
/// A fence carries a monotonically non-decreasing 64-bit completion value.
/// Queues signal it through
/// [`SubmitDesc::signal_fences`](crate::SubmitDesc::signal_fences); the host
/// polls or blocks on it.
pub trait Fence: fmt::Debug + Send + Sync + Any {
    fn as_any(&self) -> &dyn Any;

    /// The highest value the device has signaled so far. Once a call
    /// returns `v`, every later call returns at least `v`.
    fn completed_value(&self) -> u64;

    /// Block the calling thread until `completed_value() >= value`, using
    /// an OS event rather than spinning.
    fn wait(&self, value: u64) -> Result<()>;
}

/// A boxed handle representing a fence.
pub type FenceRef = Arc<dyn Fence>;

/// Trait for semaphore objects.
///
/// Semaphores order work between queues on the device; they are never
/// host-waited. They are submitted through
/// [`SubmitDesc`](crate::SubmitDesc) wait/signal lists.
pub trait Semaphore: fmt::Debug + Send + Sync + Any {
    fn as_any(&self) -> &dyn Any;
}

/// A boxed handle representing a semaphore.
pub type SemaphoreRef = Arc<dyn Semaphore>;
