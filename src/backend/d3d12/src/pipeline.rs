//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Implementation of `GraphicsPipeline` for D3D12.
use std::any::Any;
use std::ffi::CString;
use std::mem::ManuallyDrop;

use log::error;
use windows::core::PCSTR;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;

use mica_base as base;
use mica_base::{RootSignature as _, Shader as _};
use mica_base::{Error, ErrorKind, Result};

use crate::device::DeviceRef;
use crate::formats::{translate_texture_format, translate_vertex_format};
use crate::resources::D3D12Shader;
use crate::rootsig::D3D12RootSignature;
use crate::utils::{translate_compare_func, translate_hresult};

fn translate_blend_factor(value: base::BlendFactor) -> D3D12_BLEND {
    use base::BlendFactor as F;
    match value {
        F::Zero => D3D12_BLEND_ZERO,
        F::One => D3D12_BLEND_ONE,
        F::Src => D3D12_BLEND_SRC_COLOR,
        F::OneMinusSrc => D3D12_BLEND_INV_SRC_COLOR,
        F::SrcAlpha => D3D12_BLEND_SRC_ALPHA,
        F::OneMinusSrcAlpha => D3D12_BLEND_INV_SRC_ALPHA,
        F::Dst => D3D12_BLEND_DEST_COLOR,
        F::OneMinusDst => D3D12_BLEND_INV_DEST_COLOR,
        F::DstAlpha => D3D12_BLEND_DEST_ALPHA,
        F::OneMinusDstAlpha => D3D12_BLEND_INV_DEST_ALPHA,
        F::SrcAlphaSaturated => D3D12_BLEND_SRC_ALPHA_SAT,
        F::Constant => D3D12_BLEND_BLEND_FACTOR,
        F::OneMinusConstant => D3D12_BLEND_INV_BLEND_FACTOR,
    }
}

fn translate_blend_op(value: base::BlendOperation) -> D3D12_BLEND_OP {
    use base::BlendOperation as O;
    match value {
        O::Add => D3D12_BLEND_OP_ADD,
        O::Subtract => D3D12_BLEND_OP_SUBTRACT,
        O::ReverseSubtract => D3D12_BLEND_OP_REV_SUBTRACT,
        O::Min => D3D12_BLEND_OP_MIN,
        O::Max => D3D12_BLEND_OP_MAX,
    }
}

fn translate_stencil_op(value: base::StencilOperation) -> D3D12_STENCIL_OP {
    use base::StencilOperation as O;
    match value {
        O::Keep => D3D12_STENCIL_OP_KEEP,
        O::Zero => D3D12_STENCIL_OP_ZERO,
        O::Replace => D3D12_STENCIL_OP_REPLACE,
        O::Invert => D3D12_STENCIL_OP_INVERT,
        O::IncrementClamp => D3D12_STENCIL_OP_INCR_SAT,
        O::DecrementClamp => D3D12_STENCIL_OP_DECR_SAT,
        O::IncrementWrap => D3D12_STENCIL_OP_INCR,
        O::DecrementWrap => D3D12_STENCIL_OP_DECR,
    }
}

fn translate_stencil_face(value: &base::StencilFaceState) -> D3D12_DEPTH_STENCILOP_DESC {
    D3D12_DEPTH_STENCILOP_DESC {
        StencilFailOp: translate_stencil_op(value.fail_op),
        StencilDepthFailOp: translate_stencil_op(value.depth_fail_op),
        StencilPassOp: translate_stencil_op(value.pass_op),
        StencilFunc: translate_compare_func(value.compare),
    }
}

fn topology_type(value: base::PrimitiveTopology) -> D3D12_PRIMITIVE_TOPOLOGY_TYPE {
    use base::PrimitiveTopology as T;
    match value {
        T::PointList => D3D12_PRIMITIVE_TOPOLOGY_TYPE_POINT,
        T::LineList | T::LineStrip => D3D12_PRIMITIVE_TOPOLOGY_TYPE_LINE,
        T::TriangleList | T::TriangleStrip => D3D12_PRIMITIVE_TOPOLOGY_TYPE_TRIANGLE,
    }
}

fn topology(value: base::PrimitiveTopology) -> D3D_PRIMITIVE_TOPOLOGY {
    use base::PrimitiveTopology as T;
    match value {
        T::PointList => D3D_PRIMITIVE_TOPOLOGY_POINTLIST,
        T::LineList => D3D_PRIMITIVE_TOPOLOGY_LINELIST,
        T::LineStrip => D3D_PRIMITIVE_TOPOLOGY_LINESTRIP,
        T::TriangleList => D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST,
        T::TriangleStrip => D3D_PRIMITIVE_TOPOLOGY_TRIANGLESTRIP,
    }
}

fn write_mask(value: base::ColorWriteFlags) -> u8 {
    let mut mask = 0u8;
    if value.contains(base::ColorWriteFlags::RED) {
        mask |= D3D12_COLOR_WRITE_ENABLE_RED.0 as u8;
    }
    if value.contains(base::ColorWriteFlags::GREEN) {
        mask |= D3D12_COLOR_WRITE_ENABLE_GREEN.0 as u8;
    }
    if value.contains(base::ColorWriteFlags::BLUE) {
        mask |= D3D12_COLOR_WRITE_ENABLE_BLUE.0 as u8;
    }
    if value.contains(base::ColorWriteFlags::ALPHA) {
        mask |= D3D12_COLOR_WRITE_ENABLE_ALPHA.0 as u8;
    }
    mask
}

/// Implementation of `GraphicsPipeline` for D3D12.
#[derive(Debug)]
pub struct D3D12GraphicsPipeline {
    _device: DeviceRef,
    raw: ID3D12PipelineState,
    topology: D3D_PRIMITIVE_TOPOLOGY,
    vertex_strides: Vec<u32>,
}

unsafe impl Send for D3D12GraphicsPipeline {}
unsafe impl Sync for D3D12GraphicsPipeline {}

impl D3D12GraphicsPipeline {
    pub(crate) fn new(device: DeviceRef, desc: &base::GraphicsPipelineDesc) -> Result<Self> {
        let root_signature: &D3D12RootSignature = desc
            .root_signature
            .as_any()
            .downcast_ref()
            .expect("foreign root signature in pipeline");

        let bytecode = |entry: &Option<base::ShaderEntry>| -> Result<D3D12_SHADER_BYTECODE> {
            let Some(entry) = entry else {
                return Ok(D3D12_SHADER_BYTECODE::default());
            };
            let shader: &D3D12Shader = entry
                .shader
                .as_any()
                .downcast_ref()
                .expect("foreign shader in pipeline");
            Ok(D3D12_SHADER_BYTECODE {
                pShaderBytecode: shader.bytecode().as_ptr() as *const _,
                BytecodeLength: shader.bytecode().len(),
            })
        };
        if desc.vs.is_none() {
            error!("pipeline '{}' has no vertex shader", desc.name);
            return Err(Error::new(ErrorKind::Validation));
        }

        // Semantic-name strings must outlive pipeline creation.
        let semantic_names: Vec<CString> = desc
            .vertex_layouts
            .iter()
            .flat_map(|layout| layout.elements.iter())
            .map(|element| {
                CString::new(element.semantic.as_str())
                    .map_err(|_| Error::new(ErrorKind::Validation))
            })
            .collect::<Result<_>>()?;

        let mut input_elements = Vec::new();
        let mut name_index = 0;
        for (slot, layout) in desc.vertex_layouts.iter().enumerate() {
            for element in &layout.elements {
                let Some(format) = translate_vertex_format(element.format) else {
                    error!("vertex format {:?} is not supported", element.format);
                    return Err(Error::new(ErrorKind::Unsupported));
                };
                input_elements.push(D3D12_INPUT_ELEMENT_DESC {
                    SemanticName: PCSTR(semantic_names[name_index].as_ptr() as *const u8),
                    SemanticIndex: element.semantic_index,
                    Format: format,
                    InputSlot: slot as u32,
                    AlignedByteOffset: element.offset as u32,
                    InputSlotClass: match layout.step_mode {
                        base::VertexStepMode::Vertex => {
                            D3D12_INPUT_CLASSIFICATION_PER_VERTEX_DATA
                        }
                        base::VertexStepMode::Instance => {
                            D3D12_INPUT_CLASSIFICATION_PER_INSTANCE_DATA
                        }
                    },
                    InstanceDataStepRate: match layout.step_mode {
                        base::VertexStepMode::Vertex => 0,
                        base::VertexStepMode::Instance => 1,
                    },
                });
                name_index += 1;
            }
        }

        let mut blend = D3D12_BLEND_DESC {
            AlphaToCoverageEnable: desc.multi_sample.alpha_to_coverage_enable.into(),
            IndependentBlendEnable: true.into(),
            ..Default::default()
        };
        for (i, target) in desc.color_targets.iter().enumerate().take(8) {
            let mut rt = D3D12_RENDER_TARGET_BLEND_DESC {
                RenderTargetWriteMask: write_mask(target.write_mask),
                ..Default::default()
            };
            if let Some(state) = &target.blend {
                rt.BlendEnable = true.into();
                rt.SrcBlend = translate_blend_factor(state.color.src);
                rt.DestBlend = translate_blend_factor(state.color.dst);
                rt.BlendOp = translate_blend_op(state.color.op);
                rt.SrcBlendAlpha = translate_blend_factor(state.alpha.src);
                rt.DestBlendAlpha = translate_blend_factor(state.alpha.dst);
                rt.BlendOpAlpha = translate_blend_op(state.alpha.op);
            }
            blend.RenderTarget[i] = rt;
        }

        let rasterizer = D3D12_RASTERIZER_DESC {
            FillMode: match desc.primitive.poly {
                base::PolygonMode::Fill => D3D12_FILL_MODE_SOLID,
                _ => D3D12_FILL_MODE_WIREFRAME,
            },
            CullMode: match desc.primitive.cull {
                base::CullMode::Front => D3D12_CULL_MODE_FRONT,
                base::CullMode::Back => D3D12_CULL_MODE_BACK,
                base::CullMode::None => D3D12_CULL_MODE_NONE,
            },
            FrontCounterClockwise: (desc.primitive.front_face == base::FrontFace::Ccw).into(),
            DepthBias: desc
                .depth_stencil
                .as_ref()
                .map(|ds| ds.depth_bias.constant)
                .unwrap_or(0),
            DepthBiasClamp: desc
                .depth_stencil
                .as_ref()
                .map(|ds| ds.depth_bias.clamp)
                .unwrap_or(0.0),
            SlopeScaledDepthBias: desc
                .depth_stencil
                .as_ref()
                .map(|ds| ds.depth_bias.slope_scale)
                .unwrap_or(0.0),
            DepthClipEnable: (!desc.primitive.unclipped_depth).into(),
            MultisampleEnable: (desc.multi_sample.count > 1).into(),
            AntialiasedLineEnable: false.into(),
            ForcedSampleCount: 0,
            ConservativeRaster: if desc.primitive.conservative {
                D3D12_CONSERVATIVE_RASTERIZATION_MODE_ON
            } else {
                D3D12_CONSERVATIVE_RASTERIZATION_MODE_OFF
            },
        };

        let mut depth_stencil = D3D12_DEPTH_STENCIL_DESC::default();
        let mut dsv_format = DXGI_FORMAT_UNKNOWN;
        if let Some(ds) = &desc.depth_stencil {
            dsv_format = translate_texture_format(ds.format).ok_or_else(|| {
                error!("depth format {:?} is not supported", ds.format);
                Error::new(ErrorKind::Unsupported)
            })?;
            depth_stencil.DepthEnable = true.into();
            depth_stencil.DepthWriteMask = if ds.depth_write_enable {
                D3D12_DEPTH_WRITE_MASK_ALL
            } else {
                D3D12_DEPTH_WRITE_MASK_ZERO
            };
            depth_stencil.DepthFunc = translate_compare_func(ds.depth_compare);
            if let Some(stencil) = &ds.stencil {
                depth_stencil.StencilEnable = true.into();
                depth_stencil.StencilReadMask = stencil.read_mask as u8;
                depth_stencil.StencilWriteMask = stencil.write_mask as u8;
                depth_stencil.FrontFace = translate_stencil_face(&stencil.front);
                depth_stencil.BackFace = translate_stencil_face(&stencil.back);
            }
        }

        let mut pso_desc = D3D12_GRAPHICS_PIPELINE_STATE_DESC {
            pRootSignature: ManuallyDrop::new(Some(root_signature.raw().clone())),
            VS: bytecode(&desc.vs)?,
            PS: bytecode(&desc.ps)?,
            BlendState: blend,
            SampleMask: desc.multi_sample.mask as u32,
            RasterizerState: rasterizer,
            DepthStencilState: depth_stencil,
            InputLayout: D3D12_INPUT_LAYOUT_DESC {
                pInputElementDescs: input_elements.as_ptr(),
                NumElements: input_elements.len() as u32,
            },
            IBStripCutValue: match desc.primitive.strip_index_format {
                Some(base::IndexFormat::Uint16) => {
                    D3D12_INDEX_BUFFER_STRIP_CUT_VALUE_0xFFFF
                }
                Some(base::IndexFormat::Uint32) => {
                    D3D12_INDEX_BUFFER_STRIP_CUT_VALUE_0xFFFFFFFF
                }
                None => D3D12_INDEX_BUFFER_STRIP_CUT_VALUE_DISABLED,
            },
            PrimitiveTopologyType: topology_type(desc.primitive.topology),
            NumRenderTargets: desc.color_targets.len().min(8) as u32,
            DSVFormat: dsv_format,
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: desc.multi_sample.count.max(1),
                Quality: 0,
            },
            ..Default::default()
        };
        for (i, target) in desc.color_targets.iter().enumerate().take(8) {
            pso_desc.RTVFormats[i] = translate_texture_format(target.format).ok_or_else(|| {
                error!("color format {:?} is not supported", target.format);
                Error::new(ErrorKind::Unsupported)
            })?;
        }

        let result = unsafe { device.raw().CreateGraphicsPipelineState(&pso_desc) };
        let _ = ManuallyDrop::into_inner(pso_desc.pRootSignature);
        let raw: ID3D12PipelineState = result.map_err(translate_hresult)?;

        Ok(Self {
            _device: device,
            raw,
            topology: topology(desc.primitive.topology),
            vertex_strides: desc
                .vertex_layouts
                .iter()
                .map(|layout| layout.array_stride as u32)
                .collect(),
        })
    }

    pub fn raw(&self) -> &ID3D12PipelineState {
        &self.raw
    }

    pub(crate) fn topology(&self) -> D3D_PRIMITIVE_TOPOLOGY {
        self.topology
    }

    pub(crate) fn vertex_strides(&self) -> &[u32] {
        &self.vertex_strides
    }
}

impl base::GraphicsPipeline for D3D12GraphicsPipeline {
    fn as_any(&self) -> &dyn Any {
        self
    }
}
