//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Format translation.
use ash::vk;

use mica_base as base;

/// Translate a texture format, or `None` when Vulkan has no equivalent.
pub fn translate_texture_format(value: base::TextureFormat) -> Option<vk::Format> {
    use base::TextureFormat as F;
    Some(match value {
        F::Unknown => return None,
        F::R8Sint => vk::Format::R8_SINT,
        F::R8Uint => vk::Format::R8_UINT,
        F::R8Snorm => vk::Format::R8_SNORM,
        F::R8Unorm => vk::Format::R8_UNORM,
        F::R16Sint => vk::Format::R16_SINT,
        F::R16Uint => vk::Format::R16_UINT,
        F::R16Snorm => vk::Format::R16_SNORM,
        F::R16Unorm => vk::Format::R16_UNORM,
        F::R16Float => vk::Format::R16_SFLOAT,
        F::Rg8Sint => vk::Format::R8G8_SINT,
        F::Rg8Uint => vk::Format::R8G8_UINT,
        F::Rg8Snorm => vk::Format::R8G8_SNORM,
        F::Rg8Unorm => vk::Format::R8G8_UNORM,
        F::R32Sint => vk::Format::R32_SINT,
        F::R32Uint => vk::Format::R32_UINT,
        F::R32Float => vk::Format::R32_SFLOAT,
        F::Rg16Sint => vk::Format::R16G16_SINT,
        F::Rg16Uint => vk::Format::R16G16_UINT,
        F::Rg16Snorm => vk::Format::R16G16_SNORM,
        F::Rg16Unorm => vk::Format::R16G16_UNORM,
        F::Rg16Float => vk::Format::R16G16_SFLOAT,
        F::Rgba8Sint => vk::Format::R8G8B8A8_SINT,
        F::Rgba8Uint => vk::Format::R8G8B8A8_UINT,
        F::Rgba8Snorm => vk::Format::R8G8B8A8_SNORM,
        F::Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
        F::Rgba8UnormSrgb => vk::Format::R8G8B8A8_SRGB,
        F::Bgra8Unorm => vk::Format::B8G8R8A8_UNORM,
        F::Bgra8UnormSrgb => vk::Format::B8G8R8A8_SRGB,
        F::Rgb10a2Uint => vk::Format::A2B10G10R10_UINT_PACK32,
        F::Rgb10a2Unorm => vk::Format::A2B10G10R10_UNORM_PACK32,
        F::Rg11b10Float => vk::Format::B10G11R11_UFLOAT_PACK32,
        F::Rg32Sint => vk::Format::R32G32_SINT,
        F::Rg32Uint => vk::Format::R32G32_UINT,
        F::Rg32Float => vk::Format::R32G32_SFLOAT,
        F::Rgba16Sint => vk::Format::R16G16B16A16_SINT,
        F::Rgba16Uint => vk::Format::R16G16B16A16_UINT,
        F::Rgba16Snorm => vk::Format::R16G16B16A16_SNORM,
        F::Rgba16Unorm => vk::Format::R16G16B16A16_UNORM,
        F::Rgba16Float => vk::Format::R16G16B16A16_SFLOAT,
        F::Rgba32Sint => vk::Format::R32G32B32A32_SINT,
        F::Rgba32Uint => vk::Format::R32G32B32A32_UINT,
        F::Rgba32Float => vk::Format::R32G32B32A32_SFLOAT,
        F::S8 => vk::Format::S8_UINT,
        F::D16Unorm => vk::Format::D16_UNORM,
        F::D32Float => vk::Format::D32_SFLOAT,
        F::D24UnormS8Uint => vk::Format::D24_UNORM_S8_UINT,
        F::D32FloatS8Uint => vk::Format::D32_SFLOAT_S8_UINT,
    })
}

pub fn translate_vertex_format(value: base::VertexFormat) -> Option<vk::Format> {
    use base::VertexFormat as F;
    Some(match value {
        F::Unknown => return None,
        F::Uint8x2 => vk::Format::R8G8_UINT,
        F::Uint8x4 => vk::Format::R8G8B8A8_UINT,
        F::Sint8x2 => vk::Format::R8G8_SINT,
        F::Sint8x4 => vk::Format::R8G8B8A8_SINT,
        F::Unorm8x2 => vk::Format::R8G8_UNORM,
        F::Unorm8x4 => vk::Format::R8G8B8A8_UNORM,
        F::Snorm8x2 => vk::Format::R8G8_SNORM,
        F::Snorm8x4 => vk::Format::R8G8B8A8_SNORM,
        F::Uint16x2 => vk::Format::R16G16_UINT,
        F::Uint16x4 => vk::Format::R16G16B16A16_UINT,
        F::Sint16x2 => vk::Format::R16G16_SINT,
        F::Sint16x4 => vk::Format::R16G16B16A16_SINT,
        F::Unorm16x2 => vk::Format::R16G16_UNORM,
        F::Unorm16x4 => vk::Format::R16G16B16A16_UNORM,
        F::Snorm16x2 => vk::Format::R16G16_SNORM,
        F::Snorm16x4 => vk::Format::R16G16B16A16_SNORM,
        F::Float16x2 => vk::Format::R16G16_SFLOAT,
        F::Float16x4 => vk::Format::R16G16B16A16_SFLOAT,
        F::Uint32 => vk::Format::R32_UINT,
        F::Uint32x2 => vk::Format::R32G32_UINT,
        F::Uint32x3 => vk::Format::R32G32B32_UINT,
        F::Uint32x4 => vk::Format::R32G32B32A32_UINT,
        F::Sint32 => vk::Format::R32_SINT,
        F::Sint32x2 => vk::Format::R32G32_SINT,
        F::Sint32x3 => vk::Format::R32G32B32_SINT,
        F::Sint32x4 => vk::Format::R32G32B32A32_SINT,
        F::Float32 => vk::Format::R32_SFLOAT,
        F::Float32x2 => vk::Format::R32G32_SFLOAT,
        F::Float32x3 => vk::Format::R32G32B32_SFLOAT,
        F::Float32x4 => vk::Format::R32G32B32A32_SFLOAT,
    })
}

pub fn translate_index_format(value: base::IndexFormat) -> vk::IndexType {
    match value {
        base::IndexFormat::Uint16 => vk::IndexType::UINT16,
        base::IndexFormat::Uint32 => vk::IndexType::UINT32,
    }
}

/// The aspect mask implied by a format.
pub fn format_aspect_mask(value: base::TextureFormat) -> vk::ImageAspectFlags {
    let mut mask = vk::ImageAspectFlags::empty();
    if value.has_depth() {
        mask |= vk::ImageAspectFlags::DEPTH;
    }
    if value.has_stencil() {
        mask |= vk::ImageAspectFlags::STENCIL;
    }
    if mask.is_empty() {
        mask = vk::ImageAspectFlags::COLOR;
    }
    mask
}
