//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Translation helpers shared by the backend.
use windows::Win32::Foundation::{E_OUTOFMEMORY, DXGI_ERROR_DEVICE_REMOVED};
use windows::Win32::Graphics::Direct3D12::*;

use mica_base as base;
use mica_base::{Error, ErrorKind};

/// Translate an HRESULT-carrying error into the interface's error kinds.
pub fn translate_hresult(err: windows::core::Error) -> Error {
    let kind = match err.code() {
        E_OUTOFMEMORY => ErrorKind::OutOfMemory,
        DXGI_ERROR_DEVICE_REMOVED => ErrorKind::DeviceLost,
        code if code == D3D12_ERROR_ADAPTER_NOT_FOUND => ErrorKind::Unsupported,
        _ => ErrorKind::Backend,
    };
    Error::with_detail(kind, err.to_string())
}

pub(crate) fn translate_shader_visibility(
    stages: base::ShaderStageFlags,
) -> D3D12_SHADER_VISIBILITY {
    // A mask naming more than one stage must fall back to ALL; D3D12's
    // visibility field is not a bitmask.
    if stages == base::ShaderStageFlags::VERTEX {
        D3D12_SHADER_VISIBILITY_VERTEX
    } else if stages == base::ShaderStageFlags::PIXEL {
        D3D12_SHADER_VISIBILITY_PIXEL
    } else {
        D3D12_SHADER_VISIBILITY_ALL
    }
}

/// The resource states a buffer use-flag mask maps to.
pub(crate) fn buffer_usage_to_states(usage: base::BufferUsage) -> D3D12_RESOURCE_STATES {
    use base::BufferUsage as U;
    let mut states = D3D12_RESOURCE_STATE_COMMON;
    if usage.contains(U::COPY_SRC) {
        states |= D3D12_RESOURCE_STATE_COPY_SOURCE;
    }
    if usage.contains(U::COPY_DST) {
        states |= D3D12_RESOURCE_STATE_COPY_DEST;
    }
    if usage.contains(U::INDEX) {
        states |= D3D12_RESOURCE_STATE_INDEX_BUFFER;
    }
    if usage.contains(U::VERTEX) || usage.contains(U::CBUFFER) {
        states |= D3D12_RESOURCE_STATE_VERTEX_AND_CONSTANT_BUFFER;
    }
    if usage.contains(U::RESOURCE) {
        states |= D3D12_RESOURCE_STATE_NON_PIXEL_SHADER_RESOURCE
            | D3D12_RESOURCE_STATE_PIXEL_SHADER_RESOURCE;
    }
    if usage.contains(U::UNORDERED_ACCESS) {
        states |= D3D12_RESOURCE_STATE_UNORDERED_ACCESS;
    }
    if usage.contains(U::INDIRECT) {
        states |= D3D12_RESOURCE_STATE_INDIRECT_ARGUMENT;
    }
    states
}

/// The resource states a texture use-flag mask maps to. `UNINITIALIZED`
/// legalizes the first transition by mapping to the creation state.
pub(crate) fn texture_usage_to_states(usage: base::TextureUsage) -> D3D12_RESOURCE_STATES {
    use base::TextureUsage as U;
    if usage.contains(U::UNINITIALIZED) {
        return D3D12_RESOURCE_STATE_COMMON;
    }
    if usage.contains(U::PRESENT) {
        return D3D12_RESOURCE_STATE_PRESENT;
    }
    let mut states = D3D12_RESOURCE_STATE_COMMON;
    if usage.contains(U::COPY_SRC) {
        states |= D3D12_RESOURCE_STATE_COPY_SOURCE;
    }
    if usage.contains(U::COPY_DST) {
        states |= D3D12_RESOURCE_STATE_COPY_DEST;
    }
    if usage.contains(U::RESOURCE) {
        states |= D3D12_RESOURCE_STATE_NON_PIXEL_SHADER_RESOURCE
            | D3D12_RESOURCE_STATE_PIXEL_SHADER_RESOURCE;
    }
    if usage.contains(U::RENDER_TARGET) {
        states |= D3D12_RESOURCE_STATE_RENDER_TARGET;
    }
    if usage.contains(U::DEPTH_STENCIL_READ) {
        states |= D3D12_RESOURCE_STATE_DEPTH_READ;
    }
    if usage.contains(U::DEPTH_STENCIL_WRITE) {
        states |= D3D12_RESOURCE_STATE_DEPTH_WRITE;
    }
    if usage.contains(U::UNORDERED_ACCESS) {
        states |= D3D12_RESOURCE_STATE_UNORDERED_ACCESS;
    }
    states
}

pub(crate) fn translate_compare_func(value: base::CompareFunction) -> D3D12_COMPARISON_FUNC {
    match value {
        base::CompareFunction::Never => D3D12_COMPARISON_FUNC_NEVER,
        base::CompareFunction::Less => D3D12_COMPARISON_FUNC_LESS,
        base::CompareFunction::Equal => D3D12_COMPARISON_FUNC_EQUAL,
        base::CompareFunction::LessEqual => D3D12_COMPARISON_FUNC_LESS_EQUAL,
        base::CompareFunction::Greater => D3D12_COMPARISON_FUNC_GREATER,
        base::CompareFunction::NotEqual => D3D12_COMPARISON_FUNC_NOT_EQUAL,
        base::CompareFunction::GreaterEqual => D3D12_COMPARISON_FUNC_GREATER_EQUAL,
        base::CompareFunction::Always => D3D12_COMPARISON_FUNC_ALWAYS,
    }
}
