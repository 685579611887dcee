//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Buffers, textures, views, samplers, and shaders for D3D12.
use std::any::Any;
use std::ffi::c_void;

use log::error;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;

use mica_base as base;
use mica_base::{Buffer as _, Texture as _};
use mica_base::{Error, ErrorKind, Result};

use crate::descriptor::CpuDescriptor;
use crate::device::DeviceRef;
use crate::formats::translate_texture_format;
use crate::utils::translate_hresult;

fn heap_properties(kind: base::MemoryKind) -> D3D12_HEAP_PROPERTIES {
    D3D12_HEAP_PROPERTIES {
        Type: match kind {
            base::MemoryKind::Device => D3D12_HEAP_TYPE_DEFAULT,
            base::MemoryKind::Upload => D3D12_HEAP_TYPE_UPLOAD,
            base::MemoryKind::Readback => D3D12_HEAP_TYPE_READBACK,
        },
        ..Default::default()
    }
}

/// Implementation of `Buffer` for D3D12: a committed resource; upload and
/// readback memory stays persistently mapped.
#[derive(Debug)]
pub struct D3D12Buffer {
    device: DeviceRef,
    desc: base::BufferDesc,
    resource: ID3D12Resource,
    mapped: *mut u8,
}

unsafe impl Send for D3D12Buffer {}
unsafe impl Sync for D3D12Buffer {}

impl D3D12Buffer {
    pub(crate) fn new(device: DeviceRef, desc: &base::BufferDesc) -> Result<Self> {
        if desc.size == 0 {
            error!("buffer '{}' has zero size", desc.name);
            return Err(Error::new(ErrorKind::Validation));
        }
        let mut flags = D3D12_RESOURCE_FLAG_NONE;
        if desc.usage.contains(base::BufferUsage::UNORDERED_ACCESS) {
            flags |= D3D12_RESOURCE_FLAG_ALLOW_UNORDERED_ACCESS;
        }
        let resource_desc = D3D12_RESOURCE_DESC {
            Dimension: D3D12_RESOURCE_DIMENSION_BUFFER,
            Alignment: 0,
            Width: desc.size,
            Height: 1,
            DepthOrArraySize: 1,
            MipLevels: 1,
            Format: DXGI_FORMAT_UNKNOWN,
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                Quality: 0,
            },
            Layout: D3D12_TEXTURE_LAYOUT_ROW_MAJOR,
            Flags: flags,
        };
        // Upload heaps must start (and stay) in GENERIC_READ; readback
        // heaps in COPY_DEST; device-local buffers start in COMMON and are
        // transitioned by explicit barriers.
        let initial_state = match desc.memory {
            base::MemoryKind::Device => D3D12_RESOURCE_STATE_COMMON,
            base::MemoryKind::Upload => D3D12_RESOURCE_STATE_GENERIC_READ,
            base::MemoryKind::Readback => D3D12_RESOURCE_STATE_COPY_DEST,
        };

        let mut resource: Option<ID3D12Resource> = None;
        unsafe {
            device.raw().CreateCommittedResource(
                &heap_properties(desc.memory),
                D3D12_HEAP_FLAG_NONE,
                &resource_desc,
                initial_state,
                None,
                &mut resource,
            )
        }
        .map_err(translate_hresult)?;
        let resource = resource.expect("CreateCommittedResource returned no resource");

        let mut mapped = std::ptr::null_mut();
        if desc.memory != base::MemoryKind::Device {
            let mut data: *mut c_void = std::ptr::null_mut();
            unsafe { resource.Map(0, None, Some(&mut data)) }.map_err(translate_hresult)?;
            mapped = data as *mut u8;
        }

        Ok(Self {
            device,
            desc: desc.clone(),
            resource,
            mapped,
        })
    }

    pub fn raw(&self) -> &ID3D12Resource {
        &self.resource
    }

    pub fn gpu_virtual_address(&self) -> u64 {
        unsafe { self.resource.GetGPUVirtualAddress() }
    }
}

impl Drop for D3D12Buffer {
    fn drop(&mut self) {
        if !self.mapped.is_null() {
            unsafe { self.resource.Unmap(0, None) };
        }
        let _ = &self.device;
    }
}

impl base::Buffer for D3D12Buffer {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn desc(&self) -> &base::BufferDesc {
        &self.desc
    }

    fn map(&self, offset: u64, size: u64) -> Result<*mut u8> {
        if self.mapped.is_null() {
            error!("buffer '{}' is not host-visible", self.desc.name);
            return Err(Error::new(ErrorKind::Validation));
        }
        if offset + size > self.desc.size {
            error!(
                "map range {}..{} exceeds buffer size {}",
                offset,
                offset + size,
                self.desc.size
            );
            return Err(Error::new(ErrorKind::Validation));
        }
        Ok(unsafe { self.mapped.add(offset as usize) })
    }

    fn unmap(&self, _offset: u64, _size: u64) {}
}

/// Implementation of `Texture` for D3D12.
#[derive(Debug)]
pub struct D3D12Texture {
    device: DeviceRef,
    desc: base::TextureDesc,
    resource: ID3D12Resource,
}

unsafe impl Send for D3D12Texture {}
unsafe impl Sync for D3D12Texture {}

impl D3D12Texture {
    pub(crate) fn new(device: DeviceRef, desc: &base::TextureDesc) -> Result<Self> {
        if desc.width == 0 || desc.height == 0 {
            error!("texture '{}' has a zero extent", desc.name);
            return Err(Error::new(ErrorKind::Validation));
        }
        let Some(format) = translate_texture_format(desc.format) else {
            error!("texture format {:?} is not supported", desc.format);
            return Err(Error::new(ErrorKind::Unsupported));
        };

        let mut flags = D3D12_RESOURCE_FLAG_NONE;
        if desc.usage.contains(base::TextureUsage::RENDER_TARGET) {
            flags |= D3D12_RESOURCE_FLAG_ALLOW_RENDER_TARGET;
        }
        if desc.usage.contains(base::TextureUsage::DEPTH_STENCIL_WRITE)
            || desc.usage.contains(base::TextureUsage::DEPTH_STENCIL_READ)
        {
            flags |= D3D12_RESOURCE_FLAG_ALLOW_DEPTH_STENCIL;
        }
        if desc.usage.contains(base::TextureUsage::UNORDERED_ACCESS) {
            flags |= D3D12_RESOURCE_FLAG_ALLOW_UNORDERED_ACCESS;
        }

        let resource_desc = D3D12_RESOURCE_DESC {
            Dimension: match desc.dim {
                base::TextureDimension::Dim1D => D3D12_RESOURCE_DIMENSION_TEXTURE1D,
                base::TextureDimension::Dim3D => D3D12_RESOURCE_DIMENSION_TEXTURE3D,
                _ => D3D12_RESOURCE_DIMENSION_TEXTURE2D,
            },
            Alignment: 0,
            Width: desc.width as u64,
            Height: desc.height,
            DepthOrArraySize: desc.depth_or_array_size.max(1) as u16,
            MipLevels: desc.mip_levels.max(1) as u16,
            Format: format,
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: desc.sample_count.max(1),
                Quality: 0,
            },
            Layout: D3D12_TEXTURE_LAYOUT_UNKNOWN,
            Flags: flags,
        };

        let mut resource: Option<ID3D12Resource> = None;
        unsafe {
            device.raw().CreateCommittedResource(
                &heap_properties(base::MemoryKind::Device),
                D3D12_HEAP_FLAG_NONE,
                &resource_desc,
                D3D12_RESOURCE_STATE_COMMON,
                None,
                &mut resource,
            )
        }
        .map_err(translate_hresult)?;

        Ok(Self {
            device,
            desc: desc.clone(),
            resource: resource.expect("CreateCommittedResource returned no resource"),
        })
    }

    /// Wrap a swapchain back buffer.
    pub(crate) fn from_swapchain_buffer(
        device: DeviceRef,
        resource: ID3D12Resource,
        desc: base::TextureDesc,
    ) -> Self {
        Self {
            device,
            desc,
            resource,
        }
    }

    pub fn raw(&self) -> &ID3D12Resource {
        &self.resource
    }

    /// The flat subresource index of (mip, layer).
    pub fn subresource_index(&self, mip: u32, layer: u32) -> u32 {
        mip + layer * self.desc.mip_levels.max(1)
    }
}

impl base::Texture for D3D12Texture {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn desc(&self) -> &base::TextureDesc {
        &self.desc
    }
}

/// Implementation of `BufferView` for D3D12: a staged CPU descriptor
/// matching the view's declared use.
#[derive(Debug)]
pub struct D3D12BufferView {
    device: DeviceRef,
    desc: base::BufferViewDesc,
    /// CBV/SRV/UAV staging descriptor; vertex/index views need none.
    descriptor: Option<CpuDescriptor>,
}

unsafe impl Send for D3D12BufferView {}
unsafe impl Sync for D3D12BufferView {}

impl D3D12BufferView {
    pub(crate) fn new(device: DeviceRef, desc: &base::BufferViewDesc) -> Result<Self> {
        let buffer: &D3D12Buffer = desc
            .buffer
            .as_any()
            .downcast_ref()
            .expect("foreign buffer in view");
        if desc.range.offset + desc.range.size > buffer.desc.size {
            error!(
                "buffer view range {}..{} exceeds buffer size {}",
                desc.range.offset,
                desc.range.offset + desc.range.size,
                buffer.desc.size
            );
            return Err(Error::new(ErrorKind::Validation));
        }

        let descriptor = if desc.usage.contains(base::BufferUsage::CBUFFER) {
            let descriptor = device.cpu_resource_heap().allocate(1)?;
            let view_desc = D3D12_CONSTANT_BUFFER_VIEW_DESC {
                BufferLocation: buffer.gpu_virtual_address() + desc.range.offset,
                SizeInBytes: mica_common::align_up(
                    desc.range.size,
                    D3D12_CONSTANT_BUFFER_DATA_PLACEMENT_ALIGNMENT as u64,
                ) as u32,
            };
            unsafe {
                device
                    .raw()
                    .CreateConstantBufferView(Some(&view_desc), descriptor.cpu_handle(0));
            }
            Some(descriptor)
        } else if desc.usage.contains(base::BufferUsage::RESOURCE) {
            let descriptor = device.cpu_resource_heap().allocate(1)?;
            let stride = desc.stride.max(4);
            let view_desc = D3D12_SHADER_RESOURCE_VIEW_DESC {
                Format: DXGI_FORMAT_UNKNOWN,
                ViewDimension: D3D12_SRV_DIMENSION_BUFFER,
                Shader4ComponentMapping: D3D12_DEFAULT_SHADER_4_COMPONENT_MAPPING,
                Anonymous: D3D12_SHADER_RESOURCE_VIEW_DESC_0 {
                    Buffer: D3D12_BUFFER_SRV {
                        FirstElement: desc.range.offset / stride as u64,
                        NumElements: (desc.range.size / stride as u64) as u32,
                        StructureByteStride: stride,
                        Flags: D3D12_BUFFER_SRV_FLAG_NONE,
                    },
                },
            };
            unsafe {
                device.raw().CreateShaderResourceView(
                    buffer.raw(),
                    Some(&view_desc),
                    descriptor.cpu_handle(0),
                );
            }
            Some(descriptor)
        } else if desc.usage.contains(base::BufferUsage::UNORDERED_ACCESS) {
            let descriptor = device.cpu_resource_heap().allocate(1)?;
            let stride = desc.stride.max(4);
            let view_desc = D3D12_UNORDERED_ACCESS_VIEW_DESC {
                Format: DXGI_FORMAT_UNKNOWN,
                ViewDimension: D3D12_UAV_DIMENSION_BUFFER,
                Anonymous: D3D12_UNORDERED_ACCESS_VIEW_DESC_0 {
                    Buffer: D3D12_BUFFER_UAV {
                        FirstElement: desc.range.offset / stride as u64,
                        NumElements: (desc.range.size / stride as u64) as u32,
                        StructureByteStride: stride,
                        CounterOffsetInBytes: 0,
                        Flags: D3D12_BUFFER_UAV_FLAG_NONE,
                    },
                },
            };
            unsafe {
                device.raw().CreateUnorderedAccessView(
                    buffer.raw(),
                    None,
                    Some(&view_desc),
                    descriptor.cpu_handle(0),
                );
            }
            Some(descriptor)
        } else {
            None
        };

        Ok(Self {
            device,
            desc: desc.clone(),
            descriptor,
        })
    }

    pub(crate) fn staging_descriptor(&self) -> Option<&CpuDescriptor> {
        self.descriptor.as_ref()
    }

    pub(crate) fn buffer(&self) -> &D3D12Buffer {
        self.desc
            .buffer
            .as_any()
            .downcast_ref()
            .expect("foreign buffer in view")
    }
}

impl Drop for D3D12BufferView {
    fn drop(&mut self) {
        if let Some(descriptor) = self.descriptor.take() {
            self.device.cpu_resource_heap().free(descriptor);
        }
    }
}

impl base::BufferView for D3D12BufferView {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn desc(&self) -> &base::BufferViewDesc {
        &self.desc
    }
}

/// Implementation of `TextureView` for D3D12.
#[derive(Debug)]
pub struct D3D12TextureView {
    device: DeviceRef,
    desc: base::TextureViewDesc,
    descriptor: CpuDescriptor,
    /// Which CPU allocator `descriptor` came from.
    heap_kind: TextureViewHeap,
}

unsafe impl Send for D3D12TextureView {}
unsafe impl Sync for D3D12TextureView {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextureViewHeap {
    Resource,
    RenderTarget,
    DepthStencil,
}

impl D3D12TextureView {
    pub(crate) fn new(device: DeviceRef, desc: &base::TextureViewDesc) -> Result<Self> {
        let texture: &D3D12Texture = desc
            .texture
            .as_any()
            .downcast_ref()
            .expect("foreign texture in view");
        let format = if desc.format == base::TextureFormat::Unknown {
            texture.desc.format
        } else {
            desc.format
        };
        let Some(dxgi_format) = translate_texture_format(format) else {
            error!("view format {:?} is not supported", format);
            return Err(Error::new(ErrorKind::Unsupported));
        };
        let mip = desc.range.base_mip_level;
        let layer = desc.range.base_array_layer;
        // Array layers, or W slices for 3D views.
        let layer_count = if desc.range.array_layer_count == base::SubresourceRange::ALL {
            texture
                .desc
                .depth_or_array_size
                .max(1)
                .saturating_sub(layer)
                .max(1)
        } else {
            desc.range.array_layer_count
        };

        use base::TextureUsage as U;
        use base::TextureViewDimension as Dim;
        let (descriptor, heap_kind) = if desc.usage.contains(U::RENDER_TARGET) {
            let (view_dimension, anonymous) = match desc.dim {
                Dim::Dim1D => (
                    D3D12_RTV_DIMENSION_TEXTURE1D,
                    D3D12_RENDER_TARGET_VIEW_DESC_0 {
                        Texture1D: D3D12_TEX1D_RTV { MipSlice: mip },
                    },
                ),
                Dim::Dim1DArray => (
                    D3D12_RTV_DIMENSION_TEXTURE1DARRAY,
                    D3D12_RENDER_TARGET_VIEW_DESC_0 {
                        Texture1DArray: D3D12_TEX1D_ARRAY_RTV {
                            MipSlice: mip,
                            FirstArraySlice: layer,
                            ArraySize: layer_count,
                        },
                    },
                ),
                // Render-target views have no cube flavor; cube faces bind
                // as 2D array slices.
                Dim::Dim2DArray | Dim::Cube | Dim::CubeArray => (
                    D3D12_RTV_DIMENSION_TEXTURE2DARRAY,
                    D3D12_RENDER_TARGET_VIEW_DESC_0 {
                        Texture2DArray: D3D12_TEX2D_ARRAY_RTV {
                            MipSlice: mip,
                            FirstArraySlice: layer,
                            ArraySize: layer_count,
                            PlaneSlice: 0,
                        },
                    },
                ),
                Dim::Dim3D => (
                    D3D12_RTV_DIMENSION_TEXTURE3D,
                    D3D12_RENDER_TARGET_VIEW_DESC_0 {
                        Texture3D: D3D12_TEX3D_RTV {
                            MipSlice: mip,
                            FirstWSlice: layer,
                            WSize: layer_count,
                        },
                    },
                ),
                _ => (
                    D3D12_RTV_DIMENSION_TEXTURE2D,
                    D3D12_RENDER_TARGET_VIEW_DESC_0 {
                        Texture2D: D3D12_TEX2D_RTV {
                            MipSlice: mip,
                            PlaneSlice: 0,
                        },
                    },
                ),
            };
            let descriptor = device.cpu_rtv_heap().allocate(1)?;
            let view_desc = D3D12_RENDER_TARGET_VIEW_DESC {
                Format: dxgi_format,
                ViewDimension: view_dimension,
                Anonymous: anonymous,
            };
            unsafe {
                device.raw().CreateRenderTargetView(
                    texture.raw(),
                    Some(&view_desc),
                    descriptor.cpu_handle(0),
                );
            }
            (descriptor, TextureViewHeap::RenderTarget)
        } else if desc.usage.contains(U::DEPTH_STENCIL_WRITE)
            || desc.usage.contains(U::DEPTH_STENCIL_READ)
        {
            let (view_dimension, anonymous) = match desc.dim {
                Dim::Dim1D => (
                    D3D12_DSV_DIMENSION_TEXTURE1D,
                    D3D12_DEPTH_STENCIL_VIEW_DESC_0 {
                        Texture1D: D3D12_TEX1D_DSV { MipSlice: mip },
                    },
                ),
                Dim::Dim1DArray => (
                    D3D12_DSV_DIMENSION_TEXTURE1DARRAY,
                    D3D12_DEPTH_STENCIL_VIEW_DESC_0 {
                        Texture1DArray: D3D12_TEX1D_ARRAY_DSV {
                            MipSlice: mip,
                            FirstArraySlice: layer,
                            ArraySize: layer_count,
                        },
                    },
                ),
                Dim::Dim2DArray | Dim::Cube | Dim::CubeArray => (
                    D3D12_DSV_DIMENSION_TEXTURE2DARRAY,
                    D3D12_DEPTH_STENCIL_VIEW_DESC_0 {
                        Texture2DArray: D3D12_TEX2D_ARRAY_DSV {
                            MipSlice: mip,
                            FirstArraySlice: layer,
                            ArraySize: layer_count,
                        },
                    },
                ),
                Dim::Dim3D => {
                    error!("depth-stencil views cannot be three-dimensional");
                    return Err(Error::new(ErrorKind::Validation));
                }
                _ => (
                    D3D12_DSV_DIMENSION_TEXTURE2D,
                    D3D12_DEPTH_STENCIL_VIEW_DESC_0 {
                        Texture2D: D3D12_TEX2D_DSV { MipSlice: mip },
                    },
                ),
            };
            let descriptor = device.cpu_dsv_heap().allocate(1)?;
            let view_desc = D3D12_DEPTH_STENCIL_VIEW_DESC {
                Format: dxgi_format,
                ViewDimension: view_dimension,
                Flags: if desc.usage.contains(U::DEPTH_STENCIL_WRITE) {
                    D3D12_DSV_FLAG_NONE
                } else {
                    D3D12_DSV_FLAG_READ_ONLY_DEPTH
                },
                Anonymous: anonymous,
            };
            unsafe {
                device.raw().CreateDepthStencilView(
                    texture.raw(),
                    Some(&view_desc),
                    descriptor.cpu_handle(0),
                );
            }
            (descriptor, TextureViewHeap::DepthStencil)
        } else if desc.usage.contains(U::UNORDERED_ACCESS) {
            let (view_dimension, anonymous) = match desc.dim {
                Dim::Dim1D => (
                    D3D12_UAV_DIMENSION_TEXTURE1D,
                    D3D12_UNORDERED_ACCESS_VIEW_DESC_0 {
                        Texture1D: D3D12_TEX1D_UAV { MipSlice: mip },
                    },
                ),
                Dim::Dim1DArray => (
                    D3D12_UAV_DIMENSION_TEXTURE1DARRAY,
                    D3D12_UNORDERED_ACCESS_VIEW_DESC_0 {
                        Texture1DArray: D3D12_TEX1D_ARRAY_UAV {
                            MipSlice: mip,
                            FirstArraySlice: layer,
                            ArraySize: layer_count,
                        },
                    },
                ),
                Dim::Dim2DArray | Dim::Cube | Dim::CubeArray => (
                    D3D12_UAV_DIMENSION_TEXTURE2DARRAY,
                    D3D12_UNORDERED_ACCESS_VIEW_DESC_0 {
                        Texture2DArray: D3D12_TEX2D_ARRAY_UAV {
                            MipSlice: mip,
                            FirstArraySlice: layer,
                            ArraySize: layer_count,
                            PlaneSlice: 0,
                        },
                    },
                ),
                Dim::Dim3D => (
                    D3D12_UAV_DIMENSION_TEXTURE3D,
                    D3D12_UNORDERED_ACCESS_VIEW_DESC_0 {
                        Texture3D: D3D12_TEX3D_UAV {
                            MipSlice: mip,
                            FirstWSlice: layer,
                            WSize: layer_count,
                        },
                    },
                ),
                _ => (
                    D3D12_UAV_DIMENSION_TEXTURE2D,
                    D3D12_UNORDERED_ACCESS_VIEW_DESC_0 {
                        Texture2D: D3D12_TEX2D_UAV {
                            MipSlice: mip,
                            PlaneSlice: 0,
                        },
                    },
                ),
            };
            let descriptor = device.cpu_resource_heap().allocate(1)?;
            let view_desc = D3D12_UNORDERED_ACCESS_VIEW_DESC {
                Format: dxgi_format,
                ViewDimension: view_dimension,
                Anonymous: anonymous,
            };
            unsafe {
                device.raw().CreateUnorderedAccessView(
                    texture.raw(),
                    None,
                    Some(&view_desc),
                    descriptor.cpu_handle(0),
                );
            }
            (descriptor, TextureViewHeap::Resource)
        } else {
            let mip_count = if desc.range.mip_level_count == base::SubresourceRange::ALL {
                texture.desc.mip_levels.max(1) - mip
            } else {
                desc.range.mip_level_count
            };
            let (view_dimension, anonymous) = match desc.dim {
                Dim::Dim1D => (
                    D3D12_SRV_DIMENSION_TEXTURE1D,
                    D3D12_SHADER_RESOURCE_VIEW_DESC_0 {
                        Texture1D: D3D12_TEX1D_SRV {
                            MostDetailedMip: mip,
                            MipLevels: mip_count,
                            ResourceMinLODClamp: 0.0,
                        },
                    },
                ),
                Dim::Dim1DArray => (
                    D3D12_SRV_DIMENSION_TEXTURE1DARRAY,
                    D3D12_SHADER_RESOURCE_VIEW_DESC_0 {
                        Texture1DArray: D3D12_TEX1D_ARRAY_SRV {
                            MostDetailedMip: mip,
                            MipLevels: mip_count,
                            FirstArraySlice: layer,
                            ArraySize: layer_count,
                            ResourceMinLODClamp: 0.0,
                        },
                    },
                ),
                Dim::Dim2DArray => (
                    D3D12_SRV_DIMENSION_TEXTURE2DARRAY,
                    D3D12_SHADER_RESOURCE_VIEW_DESC_0 {
                        Texture2DArray: D3D12_TEX2D_ARRAY_SRV {
                            MostDetailedMip: mip,
                            MipLevels: mip_count,
                            FirstArraySlice: layer,
                            ArraySize: layer_count,
                            PlaneSlice: 0,
                            ResourceMinLODClamp: 0.0,
                        },
                    },
                ),
                Dim::Cube => (
                    D3D12_SRV_DIMENSION_TEXTURECUBE,
                    D3D12_SHADER_RESOURCE_VIEW_DESC_0 {
                        TextureCube: D3D12_TEXCUBE_SRV {
                            MostDetailedMip: mip,
                            MipLevels: mip_count,
                            ResourceMinLODClamp: 0.0,
                        },
                    },
                ),
                Dim::CubeArray => (
                    D3D12_SRV_DIMENSION_TEXTURECUBEARRAY,
                    D3D12_SHADER_RESOURCE_VIEW_DESC_0 {
                        TextureCubeArray: D3D12_TEXCUBE_ARRAY_SRV {
                            MostDetailedMip: mip,
                            MipLevels: mip_count,
                            First2DArrayFace: layer,
                            NumCubes: (layer_count / 6).max(1),
                            ResourceMinLODClamp: 0.0,
                        },
                    },
                ),
                Dim::Dim3D => (
                    D3D12_SRV_DIMENSION_TEXTURE3D,
                    D3D12_SHADER_RESOURCE_VIEW_DESC_0 {
                        Texture3D: D3D12_TEX3D_SRV {
                            MostDetailedMip: mip,
                            MipLevels: mip_count,
                            ResourceMinLODClamp: 0.0,
                        },
                    },
                ),
                _ => (
                    D3D12_SRV_DIMENSION_TEXTURE2D,
                    D3D12_SHADER_RESOURCE_VIEW_DESC_0 {
                        Texture2D: D3D12_TEX2D_SRV {
                            MostDetailedMip: mip,
                            MipLevels: mip_count,
                            PlaneSlice: 0,
                            ResourceMinLODClamp: 0.0,
                        },
                    },
                ),
            };
            let descriptor = device.cpu_resource_heap().allocate(1)?;
            let view_desc = D3D12_SHADER_RESOURCE_VIEW_DESC {
                Format: dxgi_format,
                ViewDimension: view_dimension,
                Shader4ComponentMapping: D3D12_DEFAULT_SHADER_4_COMPONENT_MAPPING,
                Anonymous: anonymous,
            };
            unsafe {
                device.raw().CreateShaderResourceView(
                    texture.raw(),
                    Some(&view_desc),
                    descriptor.cpu_handle(0),
                );
            }
            (descriptor, TextureViewHeap::Resource)
        };

        Ok(Self {
            device,
            desc: desc.clone(),
            descriptor,
            heap_kind,
        })
    }

    pub(crate) fn staging_descriptor(&self) -> &CpuDescriptor {
        &self.descriptor
    }

    pub(crate) fn is_shader_visible_kind(&self) -> bool {
        self.heap_kind == TextureViewHeap::Resource
    }
}

impl Drop for D3D12TextureView {
    fn drop(&mut self) {
        let descriptor = self.descriptor.clone();
        match self.heap_kind {
            TextureViewHeap::Resource => self.device.cpu_resource_heap().free(descriptor),
            TextureViewHeap::RenderTarget => self.device.cpu_rtv_heap().free(descriptor),
            TextureViewHeap::DepthStencil => self.device.cpu_dsv_heap().free(descriptor),
        }
    }
}

impl base::TextureView for D3D12TextureView {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn desc(&self) -> &base::TextureViewDesc {
        &self.desc
    }
}

/// Implementation of `Sampler` for D3D12: a staged sampler descriptor.
#[derive(Debug)]
pub struct D3D12Sampler {
    device: DeviceRef,
    desc: base::SamplerDesc,
    descriptor: CpuDescriptor,
}

unsafe impl Send for D3D12Sampler {}
unsafe impl Sync for D3D12Sampler {}

pub(crate) fn translate_address_mode(value: base::AddressMode) -> D3D12_TEXTURE_ADDRESS_MODE {
    match value {
        base::AddressMode::ClampToEdge => D3D12_TEXTURE_ADDRESS_MODE_CLAMP,
        base::AddressMode::Repeat => D3D12_TEXTURE_ADDRESS_MODE_WRAP,
        base::AddressMode::Mirror => D3D12_TEXTURE_ADDRESS_MODE_MIRROR,
    }
}

/// Build the combined min/mag/mip filter, honoring anisotropy and the
/// comparison flavor.
pub(crate) fn translate_filter(desc: &base::SamplerDesc) -> D3D12_FILTER {
    if desc.anisotropy_clamp > 1 {
        return if desc.compare.is_some() {
            D3D12_FILTER_COMPARISON_ANISOTROPIC
        } else {
            D3D12_FILTER_ANISOTROPIC
        };
    }
    let min = (desc.min_filter == base::FilterMode::Linear) as i32;
    let mag = (desc.mag_filter == base::FilterMode::Linear) as i32;
    let mip = (desc.mipmap_filter == base::FilterMode::Linear) as i32;
    let reduction = if desc.compare.is_some() {
        D3D12_FILTER_REDUCTION_TYPE_COMPARISON.0
    } else {
        D3D12_FILTER_REDUCTION_TYPE_STANDARD.0
    };
    D3D12_FILTER((min << 4 | mag << 2 | mip) | (reduction << 7))
}

impl D3D12Sampler {
    pub(crate) fn new(device: DeviceRef, desc: &base::SamplerDesc) -> Result<Self> {
        let descriptor = device.cpu_sampler_heap().allocate(1)?;
        let sampler_desc = D3D12_SAMPLER_DESC {
            Filter: translate_filter(desc),
            AddressU: translate_address_mode(desc.address_s),
            AddressV: translate_address_mode(desc.address_t),
            AddressW: translate_address_mode(desc.address_r),
            MipLODBias: 0.0,
            MaxAnisotropy: desc.anisotropy_clamp.max(1),
            ComparisonFunc: desc
                .compare
                .map(crate::utils::translate_compare_func)
                .unwrap_or(D3D12_COMPARISON_FUNC_NONE),
            BorderColor: [0.0; 4],
            MinLOD: desc.lod_min,
            MaxLOD: desc.lod_max,
        };
        unsafe {
            device
                .raw()
                .CreateSampler(&sampler_desc, descriptor.cpu_handle(0));
        }
        Ok(Self {
            device,
            desc: desc.clone(),
            descriptor,
        })
    }

    pub(crate) fn staging_descriptor(&self) -> &CpuDescriptor {
        &self.descriptor
    }
}

impl Drop for D3D12Sampler {
    fn drop(&mut self) {
        self.device.cpu_sampler_heap().free(self.descriptor.clone());
    }
}

impl base::Sampler for D3D12Sampler {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn desc(&self) -> &base::SamplerDesc {
        &self.desc
    }
}

/// Implementation of `Shader` for D3D12: a DXIL blob kept as bytes until
/// pipeline creation.
#[derive(Debug)]
pub struct D3D12Shader {
    bytecode: Vec<u8>,
    stage: base::ShaderStage,
    entry_point: String,
}

impl D3D12Shader {
    pub(crate) fn new(desc: &base::ShaderDesc) -> Result<Self> {
        if desc.category != base::ShaderBlobCategory::Dxil {
            error!(
                "shader '{}' is {:?}; this backend accepts DXIL only",
                desc.name, desc.category
            );
            return Err(Error::new(ErrorKind::Unsupported));
        }
        if desc.source.is_empty() {
            error!("shader '{}' has an empty blob", desc.name);
            return Err(Error::new(ErrorKind::Validation));
        }
        Ok(Self {
            bytecode: desc.source.clone(),
            stage: desc.stage,
            entry_point: desc.entry_point.clone(),
        })
    }

    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }
}

impl base::Shader for D3D12Shader {
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
