//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Implementation of `GraphicsPipeline` for Vulkan.
use std::any::Any;
use std::ffi::CString;

use ash::vk;
use log::error;

use mica_base as base;
use mica_base::{RootSignature as _, Shader as _};
use mica_base::{Error, ErrorKind, Result};

use crate::arg::VulkanRootSignature;
use crate::device::DeviceRef;
use crate::formats::translate_vertex_format;
use crate::renderpass::create_compatibility_pass;
use crate::shader::VulkanShader;
use crate::utils::{translate_compare_op, translate_generic_error};

fn translate_topology(value: base::PrimitiveTopology) -> vk::PrimitiveTopology {
    match value {
        base::PrimitiveTopology::PointList => vk::PrimitiveTopology::POINT_LIST,
        base::PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
        base::PrimitiveTopology::LineStrip => vk::PrimitiveTopology::LINE_STRIP,
        base::PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        base::PrimitiveTopology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
    }
}

fn translate_cull_mode(value: base::CullMode) -> vk::CullModeFlags {
    match value {
        base::CullMode::Front => vk::CullModeFlags::FRONT,
        base::CullMode::Back => vk::CullModeFlags::BACK,
        base::CullMode::None => vk::CullModeFlags::NONE,
    }
}

/// The negative-height viewport flip used to honor the interface's
/// top-left-origin contract also mirrors screen-space winding, so the
/// declared front face is reversed here to compensate.
fn translate_front_face(value: base::FrontFace) -> vk::FrontFace {
    match value {
        base::FrontFace::Ccw => vk::FrontFace::CLOCKWISE,
        base::FrontFace::Cw => vk::FrontFace::COUNTER_CLOCKWISE,
    }
}

fn translate_polygon_mode(value: base::PolygonMode) -> vk::PolygonMode {
    match value {
        base::PolygonMode::Fill => vk::PolygonMode::FILL,
        base::PolygonMode::Line => vk::PolygonMode::LINE,
        base::PolygonMode::Point => vk::PolygonMode::POINT,
    }
}

fn translate_blend_factor(value: base::BlendFactor) -> vk::BlendFactor {
    use base::BlendFactor as F;
    match value {
        F::Zero => vk::BlendFactor::ZERO,
        F::One => vk::BlendFactor::ONE,
        F::Src => vk::BlendFactor::SRC_COLOR,
        F::OneMinusSrc => vk::BlendFactor::ONE_MINUS_SRC_COLOR,
        F::SrcAlpha => vk::BlendFactor::SRC_ALPHA,
        F::OneMinusSrcAlpha => vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
        F::Dst => vk::BlendFactor::DST_COLOR,
        F::OneMinusDst => vk::BlendFactor::ONE_MINUS_DST_COLOR,
        F::DstAlpha => vk::BlendFactor::DST_ALPHA,
        F::OneMinusDstAlpha => vk::BlendFactor::ONE_MINUS_DST_ALPHA,
        F::SrcAlphaSaturated => vk::BlendFactor::SRC_ALPHA_SATURATE,
        F::Constant => vk::BlendFactor::CONSTANT_COLOR,
        F::OneMinusConstant => vk::BlendFactor::ONE_MINUS_CONSTANT_COLOR,
    }
}

fn translate_blend_op(value: base::BlendOperation) -> vk::BlendOp {
    use base::BlendOperation as O;
    match value {
        O::Add => vk::BlendOp::ADD,
        O::Subtract => vk::BlendOp::SUBTRACT,
        O::ReverseSubtract => vk::BlendOp::REVERSE_SUBTRACT,
        O::Min => vk::BlendOp::MIN,
        O::Max => vk::BlendOp::MAX,
    }
}

fn translate_stencil_op(value: base::StencilOperation) -> vk::StencilOp {
    use base::StencilOperation as O;
    match value {
        O::Keep => vk::StencilOp::KEEP,
        O::Zero => vk::StencilOp::ZERO,
        O::Replace => vk::StencilOp::REPLACE,
        O::Invert => vk::StencilOp::INVERT,
        O::IncrementClamp => vk::StencilOp::INCREMENT_AND_CLAMP,
        O::DecrementClamp => vk::StencilOp::DECREMENT_AND_CLAMP,
        O::IncrementWrap => vk::StencilOp::INCREMENT_AND_WRAP,
        O::DecrementWrap => vk::StencilOp::DECREMENT_AND_WRAP,
    }
}

fn translate_stencil_face(
    value: &base::StencilFaceState,
    read_mask: u32,
    write_mask: u32,
) -> vk::StencilOpState {
    vk::StencilOpState {
        fail_op: translate_stencil_op(value.fail_op),
        pass_op: translate_stencil_op(value.pass_op),
        depth_fail_op: translate_stencil_op(value.depth_fail_op),
        compare_op: translate_compare_op(value.compare),
        compare_mask: read_mask,
        write_mask,
        reference: 0,
    }
}

fn translate_write_mask(value: base::ColorWriteFlags) -> vk::ColorComponentFlags {
    let mut mask = vk::ColorComponentFlags::empty();
    if value.contains(base::ColorWriteFlags::RED) {
        mask |= vk::ColorComponentFlags::R;
    }
    if value.contains(base::ColorWriteFlags::GREEN) {
        mask |= vk::ColorComponentFlags::G;
    }
    if value.contains(base::ColorWriteFlags::BLUE) {
        mask |= vk::ColorComponentFlags::B;
    }
    if value.contains(base::ColorWriteFlags::ALPHA) {
        mask |= vk::ColorComponentFlags::A;
    }
    mask
}

/// Implementation of `GraphicsPipeline` for Vulkan.
#[derive(Debug)]
pub struct VulkanGraphicsPipeline {
    device: DeviceRef,
    vk_pipeline: vk::Pipeline,
}

impl VulkanGraphicsPipeline {
    pub(crate) fn new(device: DeviceRef, desc: &base::GraphicsPipelineDesc) -> Result<Self> {
        let root_signature: &VulkanRootSignature = desc
            .root_signature
            .as_any()
            .downcast_ref()
            .expect("foreign root signature in pipeline");

        // Shader stages.
        let mut entry_names = Vec::new();
        let mut stage_infos = Vec::new();
        for (entry, stage) in [
            (&desc.vs, vk::ShaderStageFlags::VERTEX),
            (&desc.ps, vk::ShaderStageFlags::FRAGMENT),
        ] {
            let Some(entry) = entry else { continue };
            let shader: &VulkanShader = entry
                .shader
                .as_any()
                .downcast_ref()
                .expect("foreign shader in pipeline");
            let name = CString::new(entry.entry_point.as_str()).map_err(|_| {
                error!("entry point contains an interior NUL");
                Error::new(ErrorKind::Validation)
            })?;
            entry_names.push(name);
            stage_infos.push((stage, shader.vk_shader_module()));
        }
        if stage_infos.is_empty() {
            error!("pipeline '{}' has no shader stages", desc.name);
            return Err(Error::new(ErrorKind::Validation));
        }
        let stages: Vec<vk::PipelineShaderStageCreateInfo<'_>> = stage_infos
            .iter()
            .zip(entry_names.iter())
            .map(|(&(stage, module), name)| {
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(stage)
                    .module(module)
                    .name(name)
            })
            .collect();

        // Vertex input.
        let mut vertex_bindings = Vec::new();
        let mut vertex_attributes = Vec::new();
        for (index, layout) in desc.vertex_layouts.iter().enumerate() {
            vertex_bindings.push(vk::VertexInputBindingDescription {
                binding: index as u32,
                stride: layout.array_stride as u32,
                input_rate: match layout.step_mode {
                    base::VertexStepMode::Vertex => vk::VertexInputRate::VERTEX,
                    base::VertexStepMode::Instance => vk::VertexInputRate::INSTANCE,
                },
            });
            for element in &layout.elements {
                let Some(format) = translate_vertex_format(element.format) else {
                    error!("vertex format {:?} is not supported", element.format);
                    return Err(Error::new(ErrorKind::Unsupported));
                };
                vertex_attributes.push(vk::VertexInputAttributeDescription {
                    location: element.location,
                    binding: index as u32,
                    format,
                    offset: element.offset as u32,
                });
            }
        }
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(translate_topology(desc.primitive.topology))
            .primitive_restart_enable(desc.primitive.strip_index_format.is_some());

        // Viewport/scissor are dynamic; only the counts matter here.
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let depth_bias_enabled = desc
            .depth_stencil
            .as_ref()
            .map(|ds| {
                ds.depth_bias.constant != 0
                    || ds.depth_bias.slope_scale != 0.0
                    || ds.depth_bias.clamp != 0.0
            })
            .unwrap_or(false);
        let mut rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(!desc.primitive.unclipped_depth)
            .polygon_mode(translate_polygon_mode(desc.primitive.poly))
            .cull_mode(translate_cull_mode(desc.primitive.cull))
            .front_face(translate_front_face(desc.primitive.front_face))
            .line_width(1.0);
        if depth_bias_enabled {
            let bias = &desc.depth_stencil.as_ref().unwrap().depth_bias;
            rasterization = rasterization
                .depth_bias_enable(true)
                .depth_bias_constant_factor(bias.constant as f32)
                .depth_bias_slope_factor(bias.slope_scale)
                .depth_bias_clamp(bias.clamp);
        }

        let sample_mask = [desc.multi_sample.mask as u32];
        let multisample = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::from_raw(desc.multi_sample.count.max(1)))
            .sample_mask(&sample_mask)
            .alpha_to_coverage_enable(desc.multi_sample.alpha_to_coverage_enable);

        let mut depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default();
        if let Some(ds) = &desc.depth_stencil {
            depth_stencil = depth_stencil
                .depth_test_enable(true)
                .depth_write_enable(ds.depth_write_enable)
                .depth_compare_op(translate_compare_op(ds.depth_compare));
            if let Some(stencil) = &ds.stencil {
                depth_stencil = depth_stencil
                    .stencil_test_enable(true)
                    .front(translate_stencil_face(
                        &stencil.front,
                        stencil.read_mask,
                        stencil.write_mask,
                    ))
                    .back(translate_stencil_face(
                        &stencil.back,
                        stencil.read_mask,
                        stencil.write_mask,
                    ));
            }
        }

        let blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> = desc
            .color_targets
            .iter()
            .map(|target| {
                let mut state = vk::PipelineColorBlendAttachmentState::default()
                    .color_write_mask(translate_write_mask(target.write_mask));
                if let Some(blend) = &target.blend {
                    state = state
                        .blend_enable(true)
                        .src_color_blend_factor(translate_blend_factor(blend.color.src))
                        .dst_color_blend_factor(translate_blend_factor(blend.color.dst))
                        .color_blend_op(translate_blend_op(blend.color.op))
                        .src_alpha_blend_factor(translate_blend_factor(blend.alpha.src))
                        .dst_alpha_blend_factor(translate_blend_factor(blend.alpha.dst))
                        .alpha_blend_op(translate_blend_op(blend.alpha.op));
                }
                state
            })
            .collect();
        let color_blend =
            vk::PipelineColorBlendStateCreateInfo::default().attachments(&blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        // A throwaway pass establishes render-pass compatibility.
        let color_formats: Vec<base::TextureFormat> =
            desc.color_targets.iter().map(|t| t.format).collect();
        let render_pass = create_compatibility_pass(
            &device,
            &color_formats,
            desc.depth_stencil.as_ref().map(|ds| ds.format),
            desc.multi_sample.count,
        )?;

        let info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(root_signature.vk_pipeline_layout())
            .render_pass(render_pass)
            .subpass(0);

        let result = unsafe {
            device
                .raw()
                .create_graphics_pipelines(vk::PipelineCache::null(), &[info], None)
        };
        unsafe { device.raw().destroy_render_pass(render_pass, None) };

        let vk_pipeline = match result {
            Ok(pipelines) => pipelines[0],
            Err((_, result)) => {
                error!("graphics pipeline creation failed: {:?}", result);
                return Err(translate_generic_error(result));
            }
        };

        Ok(Self {
            device,
            vk_pipeline,
        })
    }

    pub fn vk_pipeline(&self) -> vk::Pipeline {
        self.vk_pipeline
    }
}

impl Drop for VulkanGraphicsPipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.raw().destroy_pipeline(self.vk_pipeline, None);
        }
    }
}

impl base::GraphicsPipeline for VulkanGraphicsPipeline {
    fn as_any(&self) -> &dyn Any {
        self
    }
}
