//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Test framework for Mica backend implementations.
//!
//! A backend crate instantiates the suite by implementing [`TestDriver`]
//! and invoking [`mica_generate_backend_tests!`] in its `tests/` directory.
//! The null backend runs the suite in CI; hardware backends run it wherever
//! a real device is available.
use mica_base as gfx;

pub mod backend_tests;

/// Supplies devices to the generated tests.
pub trait TestDriver {
    /// Call `runner` once per device the backend can open. A driver on a
    /// machine without a suitable adapter may call it zero times, skipping
    /// the suite.
    fn for_each_device(&self, runner: &mut dyn FnMut(&gfx::DeviceRef));
}

/// Initialize logging once per test binary.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Generates one `#[test]` per backend test case, given a test driver.
#[macro_export]
macro_rules! mica_generate_backend_tests {
    ($driver:expr) => {
        $crate::mica_test_single! { create_device, $driver }
        $crate::mica_test_single! { queue_wait_idle, $driver }
        $crate::mica_test_single! { fence_value_is_monotonic, $driver }
        $crate::mica_test_single! { cmd_buffer_records_and_submits, $driver }
        $crate::mica_test_single! { render_pass_requires_attachments, $driver }
        $crate::mica_test_single! { buffer_upload_roundtrip, $driver }
        $crate::mica_test_single! { descriptor_set_accepts_matching_views, $driver }
        $crate::mica_test_single! { texture_array_layer_views, $driver }
        $crate::mica_test_single! { clear_screen_smoke, $driver }
        $crate::mica_test_single! { swapchain_indices_form_permutation, $driver }
        $crate::mica_test_single! { swapchain_recreation, $driver }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! mica_test_single {
    ($(#[$m:meta])* $name:ident, $driver:expr) => {
        $(#[$m])*
        #[test]
        fn $name() {
            $crate::init_logger();
            $crate::backend_tests::$name(&$driver);
        }
    };
}
