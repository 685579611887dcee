//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Runs the backend-agnostic suite against a real D3D12 device when one is
//! present. The whole file is Windows-only, like the backend itself.
#![cfg(windows)]

use mica_d3d12::{D3D12Device, D3D12DeviceDesc};
use mica_test::{mica_generate_backend_tests, TestDriver};

struct D3D12Driver;

impl TestDriver for D3D12Driver {
    fn for_each_device(&self, runner: &mut dyn FnMut(&mica_base::DeviceRef)) {
        let desc = D3D12DeviceDesc {
            adapter_index: None,
            enable_debug_layer: std::env::var_os("MICA_VALIDATION").is_some(),
            enable_gpu_based_validation: false,
        };
        match D3D12Device::new(&desc) {
            Ok(device) => runner(&device),
            Err(err) => {
                eprintln!("skipping: no usable D3D12 device ({})", err);
            }
        }
    }
}

mica_generate_backend_tests! { D3D12Driver }
