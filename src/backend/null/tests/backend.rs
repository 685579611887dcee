//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Runs the backend-agnostic suite against the null device.
use mica_null::NullDevice;
use mica_test::{mica_generate_backend_tests, TestDriver};

struct NullDriver;

impl TestDriver for NullDriver {
    fn for_each_device(&self, runner: &mut dyn FnMut(&mica_base::DeviceRef)) {
        runner(&NullDevice::new_device());
    }
}

mica_generate_backend_tests! { NullDriver }
