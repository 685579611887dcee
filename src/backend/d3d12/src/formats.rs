//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Format translation.
use windows::Win32::Graphics::Dxgi::Common::*;

use mica_base as base;

pub fn translate_texture_format(value: base::TextureFormat) -> Option<DXGI_FORMAT> {
    use base::TextureFormat as F;
    Some(match value {
        F::Unknown => return None,
        F::R8Sint => DXGI_FORMAT_R8_SINT,
        F::R8Uint => DXGI_FORMAT_R8_UINT,
        F::R8Snorm => DXGI_FORMAT_R8_SNORM,
        F::R8Unorm => DXGI_FORMAT_R8_UNORM,
        F::R16Sint => DXGI_FORMAT_R16_SINT,
        F::R16Uint => DXGI_FORMAT_R16_UINT,
        F::R16Snorm => DXGI_FORMAT_R16_SNORM,
        F::R16Unorm => DXGI_FORMAT_R16_UNORM,
        F::R16Float => DXGI_FORMAT_R16_FLOAT,
        F::Rg8Sint => DXGI_FORMAT_R8G8_SINT,
        F::Rg8Uint => DXGI_FORMAT_R8G8_UINT,
        F::Rg8Snorm => DXGI_FORMAT_R8G8_SNORM,
        F::Rg8Unorm => DXGI_FORMAT_R8G8_UNORM,
        F::R32Sint => DXGI_FORMAT_R32_SINT,
        F::R32Uint => DXGI_FORMAT_R32_UINT,
        F::R32Float => DXGI_FORMAT_R32_FLOAT,
        F::Rg16Sint => DXGI_FORMAT_R16G16_SINT,
        F::Rg16Uint => DXGI_FORMAT_R16G16_UINT,
        F::Rg16Snorm => DXGI_FORMAT_R16G16_SNORM,
        F::Rg16Unorm => DXGI_FORMAT_R16G16_UNORM,
        F::Rg16Float => DXGI_FORMAT_R16G16_FLOAT,
        F::Rgba8Sint => DXGI_FORMAT_R8G8B8A8_SINT,
        F::Rgba8Uint => DXGI_FORMAT_R8G8B8A8_UINT,
        F::Rgba8Snorm => DXGI_FORMAT_R8G8B8A8_SNORM,
        F::Rgba8Unorm => DXGI_FORMAT_R8G8B8A8_UNORM,
        F::Rgba8UnormSrgb => DXGI_FORMAT_R8G8B8A8_UNORM_SRGB,
        F::Bgra8Unorm => DXGI_FORMAT_B8G8R8A8_UNORM,
        F::Bgra8UnormSrgb => DXGI_FORMAT_B8G8R8A8_UNORM_SRGB,
        F::Rgb10a2Uint => DXGI_FORMAT_R10G10B10A2_UINT,
        F::Rgb10a2Unorm => DXGI_FORMAT_R10G10B10A2_UNORM,
        F::Rg11b10Float => DXGI_FORMAT_R11G11B10_FLOAT,
        F::Rg32Sint => DXGI_FORMAT_R32G32_SINT,
        F::Rg32Uint => DXGI_FORMAT_R32G32_UINT,
        F::Rg32Float => DXGI_FORMAT_R32G32_FLOAT,
        F::Rgba16Sint => DXGI_FORMAT_R16G16B16A16_SINT,
        F::Rgba16Uint => DXGI_FORMAT_R16G16B16A16_UINT,
        F::Rgba16Snorm => DXGI_FORMAT_R16G16B16A16_SNORM,
        F::Rgba16Unorm => DXGI_FORMAT_R16G16B16A16_UNORM,
        F::Rgba16Float => DXGI_FORMAT_R16G16B16A16_FLOAT,
        F::Rgba32Sint => DXGI_FORMAT_R32G32B32A32_SINT,
        F::Rgba32Uint => DXGI_FORMAT_R32G32B32A32_UINT,
        F::Rgba32Float => DXGI_FORMAT_R32G32B32A32_FLOAT,
        F::S8 => DXGI_FORMAT_R8_UINT,
        F::D16Unorm => DXGI_FORMAT_D16_UNORM,
        F::D32Float => DXGI_FORMAT_D32_FLOAT,
        F::D24UnormS8Uint => DXGI_FORMAT_D24_UNORM_S8_UINT,
        F::D32FloatS8Uint => DXGI_FORMAT_D32_FLOAT_S8X24_UINT,
    })
}

pub fn translate_vertex_format(value: base::VertexFormat) -> Option<DXGI_FORMAT> {
    use base::VertexFormat as F;
    Some(match value {
        F::Unknown => return None,
        F::Uint8x2 => DXGI_FORMAT_R8G8_UINT,
        F::Uint8x4 => DXGI_FORMAT_R8G8B8A8_UINT,
        F::Sint8x2 => DXGI_FORMAT_R8G8_SINT,
        F::Sint8x4 => DXGI_FORMAT_R8G8B8A8_SINT,
        F::Unorm8x2 => DXGI_FORMAT_R8G8_UNORM,
        F::Unorm8x4 => DXGI_FORMAT_R8G8B8A8_UNORM,
        F::Snorm8x2 => DXGI_FORMAT_R8G8_SNORM,
        F::Snorm8x4 => DXGI_FORMAT_R8G8B8A8_SNORM,
        F::Uint16x2 => DXGI_FORMAT_R16G16_UINT,
        F::Uint16x4 => DXGI_FORMAT_R16G16B16A16_UINT,
        F::Sint16x2 => DXGI_FORMAT_R16G16_SINT,
        F::Sint16x4 => DXGI_FORMAT_R16G16B16A16_SINT,
        F::Unorm16x2 => DXGI_FORMAT_R16G16_UNORM,
        F::Unorm16x4 => DXGI_FORMAT_R16G16B16A16_UNORM,
        F::Snorm16x2 => DXGI_FORMAT_R16G16_SNORM,
        F::Snorm16x4 => DXGI_FORMAT_R16G16B16A16_SNORM,
        F::Float16x2 => DXGI_FORMAT_R16G16_FLOAT,
        F::Float16x4 => DXGI_FORMAT_R16G16B16A16_FLOAT,
        F::Uint32 => DXGI_FORMAT_R32_UINT,
        F::Uint32x2 => DXGI_FORMAT_R32G32_UINT,
        F::Uint32x3 => DXGI_FORMAT_R32G32B32_UINT,
        F::Uint32x4 => DXGI_FORMAT_R32G32B32A32_UINT,
        F::Sint32 => DXGI_FORMAT_R32_SINT,
        F::Sint32x2 => DXGI_FORMAT_R32G32_SINT,
        F::Sint32x3 => DXGI_FORMAT_R32G32B32_SINT,
        F::Sint32x4 => DXGI_FORMAT_R32G32B32A32_SINT,
        F::Float32 => DXGI_FORMAT_R32_FLOAT,
        F::Float32x2 => DXGI_FORMAT_R32G32_FLOAT,
        F::Float32x3 => DXGI_FORMAT_R32G32B32_FLOAT,
        F::Float32x4 => DXGI_FORMAT_R32G32B32A32_FLOAT,
    })
}

pub fn translate_index_format(value: base::IndexFormat) -> DXGI_FORMAT {
    match value {
        base::IndexFormat::Uint16 => DXGI_FORMAT_R16_UINT,
        base::IndexFormat::Uint32 => DXGI_FORMAT_R32_UINT,
    }
}
