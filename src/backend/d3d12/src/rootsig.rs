//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Implementation of `RootSignature` and `DescriptorSet` for D3D12.
//!
//! The unified root signature serializes directly: the optional root
//! constant becomes a 32-bit-constants parameter, root descriptors become
//! root CBV/SRV/UAV parameters, and each declared descriptor set becomes
//! one descriptor table. Static samplers fold into the signature itself;
//! a set left empty by that folding produces no table parameter and needs
//! no descriptor-set object.
use std::any::Any;

use log::error;
use windows::Win32::Graphics::Direct3D::ID3DBlob;
use windows::Win32::Graphics::Direct3D12::*;

use mica_base as base;
use mica_base::{BufferView as _, TextureView as _};
use mica_base::{Error, ErrorKind, Result};

use crate::descriptor::GpuDescriptor;
use crate::device::DeviceRef;
use crate::resources::{translate_address_mode, translate_filter, D3D12BufferView, D3D12TextureView};
use crate::utils::{translate_hresult, translate_shader_visibility};

/// Which shader-visible heap a table draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TableKind {
    Resource,
    Sampler,
}

/// One writable element of a table: its offset within the heap slice, its
/// descriptor count, and its resource class.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TableElement {
    pub offset: u32,
    pub count: u32,
    pub ty: base::ResourceBindType,
}

#[derive(Debug, Clone)]
pub(crate) struct TableInfo {
    /// Root parameter index of this table.
    pub param: u32,
    pub kind: TableKind,
    /// Elements in declaration order, static samplers filtered out.
    pub elements: Vec<TableElement>,
    /// Total descriptor count of the table slice.
    pub total: u32,
}

#[derive(Debug)]
pub struct D3D12RootSignature {
    device: DeviceRef,
    desc: base::RootSignatureDesc,
    raw: ID3D12RootSignature,
    /// Root parameter index of the 32-bit-constants parameter.
    constant_param: Option<u32>,
    constant_dwords: u32,
    /// Root parameter index of root descriptor slot `i` is
    /// `root_descriptor_base + i`.
    root_descriptor_base: u32,
    /// Per declared set: the table description, or `None` for sets that
    /// folded entirely into static samplers.
    tables: Vec<Option<TableInfo>>,
}

unsafe impl Send for D3D12RootSignature {}
unsafe impl Sync for D3D12RootSignature {}

fn range_type(ty: base::ResourceBindType) -> D3D12_DESCRIPTOR_RANGE_TYPE {
    match ty {
        base::ResourceBindType::CBuffer => D3D12_DESCRIPTOR_RANGE_TYPE_CBV,
        base::ResourceBindType::Buffer | base::ResourceBindType::Texture => {
            D3D12_DESCRIPTOR_RANGE_TYPE_SRV
        }
        base::ResourceBindType::RwBuffer | base::ResourceBindType::RwTexture => {
            D3D12_DESCRIPTOR_RANGE_TYPE_UAV
        }
        base::ResourceBindType::Sampler => D3D12_DESCRIPTOR_RANGE_TYPE_SAMPLER,
    }
}

impl D3D12RootSignature {
    pub(crate) fn new(device: DeviceRef, desc: &base::RootSignatureDesc) -> Result<Self> {
        let cost = desc.dword_cost();
        if cost > base::limits::MAX_ROOT_SIGNATURE_DWORDS {
            error!(
                "root signature costs {} DWORDs, exceeding the budget of {}",
                cost,
                base::limits::MAX_ROOT_SIGNATURE_DWORDS
            );
            return Err(Error::new(ErrorKind::Unsupported));
        }

        let mut params: Vec<D3D12_ROOT_PARAMETER1> = Vec::new();
        let mut static_samplers: Vec<D3D12_STATIC_SAMPLER_DESC> = Vec::new();
        // Range storage must stay alive until serialization.
        let mut range_storage: Vec<Vec<D3D12_DESCRIPTOR_RANGE1>> = Vec::new();

        let mut constant_param = None;
        let mut constant_dwords = 0;
        if let Some(constant) = &desc.constant {
            constant_dwords = (constant.size + 3) / 4;
            constant_param = Some(params.len() as u32);
            params.push(D3D12_ROOT_PARAMETER1 {
                ParameterType: D3D12_ROOT_PARAMETER_TYPE_32BIT_CONSTANTS,
                Anonymous: D3D12_ROOT_PARAMETER1_0 {
                    Constants: D3D12_ROOT_CONSTANTS {
                        ShaderRegister: constant.slot,
                        RegisterSpace: constant.space,
                        Num32BitValues: constant_dwords,
                    },
                },
                ShaderVisibility: translate_shader_visibility(constant.stages),
            });
        }

        let root_descriptor_base = params.len() as u32;
        for root_descriptor in &desc.root_descriptors {
            let parameter_type = match root_descriptor.ty {
                base::ResourceBindType::CBuffer => D3D12_ROOT_PARAMETER_TYPE_CBV,
                base::ResourceBindType::Buffer => D3D12_ROOT_PARAMETER_TYPE_SRV,
                base::ResourceBindType::RwBuffer => D3D12_ROOT_PARAMETER_TYPE_UAV,
                other => {
                    error!("{:?} cannot be a root descriptor", other);
                    return Err(Error::new(ErrorKind::Validation));
                }
            };
            params.push(D3D12_ROOT_PARAMETER1 {
                ParameterType: parameter_type,
                Anonymous: D3D12_ROOT_PARAMETER1_0 {
                    Descriptor: D3D12_ROOT_DESCRIPTOR1 {
                        ShaderRegister: root_descriptor.slot,
                        RegisterSpace: root_descriptor.space,
                        Flags: D3D12_ROOT_DESCRIPTOR_FLAG_NONE,
                    },
                },
                ShaderVisibility: translate_shader_visibility(root_descriptor.stages),
            });
        }

        let mut tables: Vec<Option<TableInfo>> = Vec::with_capacity(desc.descriptor_sets.len());
        for set in &desc.descriptor_sets {
            let mut kind: Option<TableKind> = None;
            let mut ranges: Vec<D3D12_DESCRIPTOR_RANGE1> = Vec::new();
            let mut elements = Vec::new();
            let mut offset = 0u32;
            let mut visibility = base::ShaderStageFlags::empty();

            for element in &set.elements {
                if !element.static_samplers.is_empty() {
                    if element.ty != base::ResourceBindType::Sampler {
                        error!("static samplers are only legal on sampler elements");
                        return Err(Error::new(ErrorKind::Validation));
                    }
                    for (i, sampler) in element.static_samplers.iter().enumerate() {
                        static_samplers.push(D3D12_STATIC_SAMPLER_DESC {
                            Filter: translate_filter(sampler),
                            AddressU: translate_address_mode(sampler.address_s),
                            AddressV: translate_address_mode(sampler.address_t),
                            AddressW: translate_address_mode(sampler.address_r),
                            MipLODBias: 0.0,
                            MaxAnisotropy: sampler.anisotropy_clamp.max(1),
                            ComparisonFunc: sampler
                                .compare
                                .map(crate::utils::translate_compare_func)
                                .unwrap_or(D3D12_COMPARISON_FUNC_NONE),
                            BorderColor: D3D12_STATIC_BORDER_COLOR_TRANSPARENT_BLACK,
                            MinLOD: sampler.lod_min,
                            MaxLOD: sampler.lod_max,
                            ShaderRegister: element.slot + i as u32,
                            RegisterSpace: element.space,
                            ShaderVisibility: translate_shader_visibility(element.stages),
                        });
                    }
                    continue;
                }

                let element_kind = if element.ty == base::ResourceBindType::Sampler {
                    TableKind::Sampler
                } else {
                    TableKind::Resource
                };
                match kind {
                    None => kind = Some(element_kind),
                    Some(kind) if kind != element_kind => {
                        error!("a descriptor set cannot mix sampler and resource elements");
                        return Err(Error::new(ErrorKind::Unsupported));
                    }
                    Some(_) => {}
                }
                visibility |= element.stages;

                let bindless = element.count == 0;
                let count = if bindless {
                    // Unbounded: the range consumes the rest of the table.
                    u32::MAX
                } else {
                    element.count
                };
                ranges.push(D3D12_DESCRIPTOR_RANGE1 {
                    RangeType: range_type(element.ty),
                    NumDescriptors: count,
                    BaseShaderRegister: element.slot,
                    RegisterSpace: element.space,
                    Flags: if bindless {
                        D3D12_DESCRIPTOR_RANGE_FLAG_DESCRIPTORS_VOLATILE
                    } else {
                        D3D12_DESCRIPTOR_RANGE_FLAG_NONE
                    },
                    OffsetInDescriptorsFromTableStart: offset,
                });
                elements.push(TableElement {
                    offset,
                    count: element.count,
                    ty: element.ty,
                });
                offset += element.count.max(1);
            }

            if ranges.is_empty() {
                // Static samplers only: no table parameter, no set object.
                tables.push(None);
                continue;
            }

            let param = params.len() as u32;
            range_storage.push(ranges);
            let ranges_ref = range_storage.last().unwrap();
            params.push(D3D12_ROOT_PARAMETER1 {
                ParameterType: D3D12_ROOT_PARAMETER_TYPE_DESCRIPTOR_TABLE,
                Anonymous: D3D12_ROOT_PARAMETER1_0 {
                    DescriptorTable: D3D12_ROOT_DESCRIPTOR_TABLE1 {
                        NumDescriptorRanges: ranges_ref.len() as u32,
                        pDescriptorRanges: ranges_ref.as_ptr(),
                    },
                },
                ShaderVisibility: translate_shader_visibility(visibility),
            });
            tables.push(Some(TableInfo {
                param,
                kind: kind.expect("table without a kind"),
                elements,
                total: offset,
            }));
        }

        let versioned = D3D12_VERSIONED_ROOT_SIGNATURE_DESC {
            Version: D3D_ROOT_SIGNATURE_VERSION_1_1,
            Anonymous: D3D12_VERSIONED_ROOT_SIGNATURE_DESC_0 {
                Desc_1_1: D3D12_ROOT_SIGNATURE_DESC1 {
                    NumParameters: params.len() as u32,
                    pParameters: params.as_ptr(),
                    NumStaticSamplers: static_samplers.len() as u32,
                    pStaticSamplers: static_samplers.as_ptr(),
                    Flags: D3D12_ROOT_SIGNATURE_FLAG_ALLOW_INPUT_ASSEMBLER_INPUT_LAYOUT,
                },
            },
        };

        let mut blob: Option<ID3DBlob> = None;
        let mut error_blob: Option<ID3DBlob> = None;
        let serialized = unsafe {
            D3D12SerializeVersionedRootSignature(&versioned, &mut blob, Some(&mut error_blob))
        };
        if let Err(err) = serialized {
            if let Some(error_blob) = &error_blob {
                let message = unsafe {
                    std::slice::from_raw_parts(
                        error_blob.GetBufferPointer() as *const u8,
                        error_blob.GetBufferSize(),
                    )
                };
                error!(
                    "root signature serialization failed: {}",
                    String::from_utf8_lossy(message)
                );
            }
            return Err(translate_hresult(err));
        }
        let blob = blob.expect("serialization succeeded without a blob");
        let blob_bytes = unsafe {
            std::slice::from_raw_parts(blob.GetBufferPointer() as *const u8, blob.GetBufferSize())
        };
        let raw: ID3D12RootSignature = unsafe { device.raw().CreateRootSignature(0, blob_bytes) }
            .map_err(translate_hresult)?;

        Ok(Self {
            device,
            desc: desc.clone(),
            raw,
            constant_param,
            constant_dwords,
            root_descriptor_base,
            tables,
        })
    }

    pub fn raw(&self) -> &ID3D12RootSignature {
        &self.raw
    }

    pub(crate) fn constant_param(&self) -> Option<(u32, u32)> {
        self.constant_param.map(|param| (param, self.constant_dwords))
    }

    pub(crate) fn root_descriptor_param(&self, slot: u32) -> Option<(u32, base::ResourceBindType)> {
        let root_descriptor = self.desc.root_descriptors.get(slot as usize)?;
        Some((self.root_descriptor_base + slot, root_descriptor.ty))
    }

    pub(crate) fn table(&self, set_index: u32) -> Option<&TableInfo> {
        self.tables.get(set_index as usize)?.as_ref()
    }

    pub(crate) fn table_count(&self) -> usize {
        self.tables.len()
    }
}

impl base::RootSignature for D3D12RootSignature {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn desc(&self) -> &base::RootSignatureDesc {
        &self.desc
    }
}

/// Implementation of `DescriptorSet` for D3D12: a slice of the
/// shader-visible heap, sized for the table, written through descriptor
/// copies from the views' staging descriptors.
#[derive(Debug)]
pub struct D3D12DescriptorSet {
    device: DeviceRef,
    slice: Option<GpuDescriptor>,
    kind: TableKind,
    elements: Vec<TableElement>,
}

unsafe impl Send for D3D12DescriptorSet {}
unsafe impl Sync for D3D12DescriptorSet {}

impl D3D12DescriptorSet {
    pub(crate) fn new(
        device: DeviceRef,
        root_signature: &D3D12RootSignature,
        set_index: u32,
    ) -> Result<Option<Self>> {
        if set_index as usize >= root_signature.table_count() {
            error!(
                "descriptor set index out of range: expected < {}, got {}",
                root_signature.table_count(),
                set_index
            );
            return Err(Error::new(ErrorKind::Validation));
        }
        let Some(table) = root_signature.table(set_index) else {
            // Static-sampler-only set: nothing to allocate or bind.
            return Ok(None);
        };
        let slice = match table.kind {
            TableKind::Resource => device.gpu_resource_heap().allocate(table.total)?,
            TableKind::Sampler => device.gpu_sampler_heap().allocate(table.total)?,
        };
        Ok(Some(Self {
            device,
            slice: Some(slice),
            kind: table.kind,
            elements: table.elements.clone(),
        }))
    }

    pub(crate) fn gpu_handle(&self) -> windows::Win32::Graphics::Direct3D12::D3D12_GPU_DESCRIPTOR_HANDLE {
        self.slice.as_ref().expect("slice already freed").gpu_handle(0)
    }

    pub(crate) fn kind(&self) -> TableKind {
        self.kind
    }
}

impl Drop for D3D12DescriptorSet {
    fn drop(&mut self) {
        if let Some(slice) = self.slice.take() {
            match self.kind {
                TableKind::Resource => self.device.gpu_resource_heap().free(slice),
                TableKind::Sampler => self.device.gpu_sampler_heap().free(slice),
            }
        }
    }
}

impl base::DescriptorSet for D3D12DescriptorSet {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn set_resource(
        &self,
        element: u32,
        array_index: u32,
        view: &base::ResourceViewRef,
    ) -> Result<()> {
        let Some(info) = self.elements.get(element as usize) else {
            error!(
                "descriptor-set element out of range: expected < {}, got {}",
                self.elements.len(),
                element
            );
            return Err(Error::new(ErrorKind::Validation));
        };
        if info.count != 0 && array_index >= info.count {
            error!(
                "descriptor array index out of range: expected < {}, got {}",
                info.count, array_index
            );
            return Err(Error::new(ErrorKind::Validation));
        }
        if self.kind == TableKind::Sampler {
            error!("sampler tables are populated via static samplers only");
            return Err(Error::new(ErrorKind::Validation));
        }

        let staging = match (info.ty, view) {
            (
                base::ResourceBindType::CBuffer
                | base::ResourceBindType::Buffer
                | base::ResourceBindType::RwBuffer,
                base::ResourceViewRef::Buffer(buffer_view),
            ) => {
                let view: &D3D12BufferView = buffer_view
                    .as_any()
                    .downcast_ref()
                    .expect("foreign buffer view");
                view.staging_descriptor()
                    .ok_or_else(|| {
                        error!("the buffer view was not created for shader binding");
                        Error::new(ErrorKind::Validation)
                    })?
                    .cpu_handle(0)
            }
            (
                base::ResourceBindType::Texture | base::ResourceBindType::RwTexture,
                base::ResourceViewRef::Texture(texture_view),
            ) => {
                let view: &D3D12TextureView = texture_view
                    .as_any()
                    .downcast_ref()
                    .expect("foreign texture view");
                if !view.is_shader_visible_kind() {
                    error!("render-target/depth views cannot be bound in descriptor sets");
                    return Err(Error::new(ErrorKind::Validation));
                }
                view.staging_descriptor().cpu_handle(0)
            }
            _ => {
                error!("resource view does not match binding type {:?}", info.ty);
                return Err(Error::new(ErrorKind::Validation));
            }
        };

        let slice = self.slice.as_ref().expect("slice already freed");
        unsafe {
            self.device.raw().CopyDescriptorsSimple(
                1,
                slice.cpu_handle(info.offset + array_index),
                staging,
                D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV,
            );
        }
        Ok(())
    }
}
