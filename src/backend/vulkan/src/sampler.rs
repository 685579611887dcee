//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Implementation of `Sampler` for Vulkan.
use std::any::Any;

use ash::vk;

use mica_base as base;
use mica_base::Result;

use crate::device::DeviceRef;
use crate::utils::{translate_compare_op, translate_generic_error};

fn translate_address_mode(value: base::AddressMode) -> vk::SamplerAddressMode {
    match value {
        base::AddressMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        base::AddressMode::Repeat => vk::SamplerAddressMode::REPEAT,
        base::AddressMode::Mirror => vk::SamplerAddressMode::MIRRORED_REPEAT,
    }
}

fn translate_filter(value: base::FilterMode) -> vk::Filter {
    match value {
        base::FilterMode::Nearest => vk::Filter::NEAREST,
        base::FilterMode::Linear => vk::Filter::LINEAR,
    }
}

fn translate_mip_filter(value: base::FilterMode) -> vk::SamplerMipmapMode {
    match value {
        base::FilterMode::Nearest => vk::SamplerMipmapMode::NEAREST,
        base::FilterMode::Linear => vk::SamplerMipmapMode::LINEAR,
    }
}

/// Create a raw `VkSampler` from a descriptor. Shared with the
/// static-sampler path of root-signature creation.
pub(crate) fn create_raw_sampler(device: &DeviceRef, desc: &base::SamplerDesc) -> Result<vk::Sampler> {
    let mut info = vk::SamplerCreateInfo::default()
        .mag_filter(translate_filter(desc.mag_filter))
        .min_filter(translate_filter(desc.min_filter))
        .mipmap_mode(translate_mip_filter(desc.mipmap_filter))
        .address_mode_u(translate_address_mode(desc.address_s))
        .address_mode_v(translate_address_mode(desc.address_t))
        .address_mode_w(translate_address_mode(desc.address_r))
        .min_lod(desc.lod_min)
        .max_lod(desc.lod_max)
        .anisotropy_enable(desc.anisotropy_clamp > 1)
        .max_anisotropy(desc.anisotropy_clamp.max(1) as f32);
    if let Some(compare) = desc.compare {
        info = info
            .compare_enable(true)
            .compare_op(translate_compare_op(compare));
    }
    unsafe { device.raw().create_sampler(&info, None) }.map_err(translate_generic_error)
}

/// Implementation of `Sampler` for Vulkan.
#[derive(Debug)]
pub struct VulkanSampler {
    device: DeviceRef,
    desc: base::SamplerDesc,
    vk_sampler: vk::Sampler,
}

impl VulkanSampler {
    pub(crate) fn new(device: DeviceRef, desc: &base::SamplerDesc) -> Result<Self> {
        let vk_sampler = create_raw_sampler(&device, desc)?;
        Ok(Self {
            device,
            desc: desc.clone(),
            vk_sampler,
        })
    }

    pub fn vk_sampler(&self) -> vk::Sampler {
        self.vk_sampler
    }
}

impl Drop for VulkanSampler {
    fn drop(&mut self) {
        unsafe {
            self.device.raw().destroy_sampler(self.vk_sampler, None);
        }
    }
}

impl base::Sampler for VulkanSampler {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn desc(&self) -> &base::SamplerDesc {
        &self.desc
    }
}
