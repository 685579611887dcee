//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Runs the backend-agnostic suite against a real Vulkan device when one
//! is present; machines without a Vulkan implementation skip the suite.
use mica_test::{mica_generate_backend_tests, TestDriver};
use mica_vulkan::{InstanceDesc, VulkanDevice, VulkanDeviceDesc};

struct VulkanDriver;

impl TestDriver for VulkanDriver {
    fn for_each_device(&self, runner: &mut dyn FnMut(&mica_base::DeviceRef)) {
        let instance_desc = InstanceDesc {
            enable_debug_layer: std::env::var_os("MICA_VALIDATION").is_some(),
            ..Default::default()
        };
        let device_desc = VulkanDeviceDesc {
            physical_device_index: None,
            queues: vec![
                (mica_base::QueueType::Direct, 1),
                (mica_base::QueueType::Copy, 1),
            ],
        };
        match VulkanDevice::new(&instance_desc, &device_desc) {
            Ok(device) => runner(&device),
            Err(err) => {
                eprintln!("skipping: no usable Vulkan device ({})", err);
            }
        }
    }
}

mica_generate_backend_tests! { VulkanDriver }
