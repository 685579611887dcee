//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Implementation of `Shader` for Vulkan.
use std::any::Any;

use ash::vk;
use log::error;

use mica_base as base;
use mica_base::{Error, ErrorKind, Result};

use crate::device::DeviceRef;
use crate::utils::translate_generic_error;

/// Implementation of `Shader` for Vulkan: a shader module created from a
/// SPIR-V blob. Blobs of any other category are rejected.
#[derive(Debug)]
pub struct VulkanShader {
    device: DeviceRef,
    vk_module: vk::ShaderModule,
    stage: base::ShaderStage,
    entry_point: String,
}

impl VulkanShader {
    pub(crate) fn new(device: DeviceRef, desc: &base::ShaderDesc) -> Result<Self> {
        if desc.category != base::ShaderBlobCategory::Spirv {
            error!(
                "shader '{}' is {:?}; this backend accepts SPIR-V only",
                desc.name, desc.category
            );
            return Err(Error::new(ErrorKind::Unsupported));
        }
        if desc.source.len() % 4 != 0 || desc.source.is_empty() {
            error!("shader '{}' has a malformed SPIR-V blob", desc.name);
            return Err(Error::new(ErrorKind::Validation));
        }
        // SPIR-V words are u32; the input is a byte span.
        let words: Vec<u32> = desc
            .source
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        let info = vk::ShaderModuleCreateInfo::default().code(&words);
        let vk_module = unsafe { device.raw().create_shader_module(&info, None) }
            .map_err(translate_generic_error)?;
        Ok(Self {
            device,
            vk_module,
            stage: desc.stage,
            entry_point: desc.entry_point.clone(),
        })
    }

    pub fn vk_shader_module(&self) -> vk::ShaderModule {
        self.vk_module
    }
}

impl Drop for VulkanShader {
    fn drop(&mut self) {
        unsafe {
            self.device.raw().destroy_shader_module(self.vk_module, None);
        }
    }
}

impl base::Shader for VulkanShader {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn stage(&self) -> base::ShaderStage {
        self.stage
    }

    fn entry_point(&self) -> &str {
        &self.entry_point
    }
}
