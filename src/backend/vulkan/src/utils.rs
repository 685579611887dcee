//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Translation helpers shared by the backend.
use ash::vk;

use mica_base as base;
use mica_base::{Error, ErrorKind};

/// Translate a subset of `vk::Result` values into the interface's error
/// kinds. Unlisted values map to [`ErrorKind::Backend`] with the native
/// code attached as detail.
pub fn translate_generic_error(result: vk::Result) -> Error {
    match result {
        vk::Result::ERROR_OUT_OF_DEVICE_MEMORY | vk::Result::ERROR_OUT_OF_HOST_MEMORY => {
            Error::with_detail(ErrorKind::OutOfMemory, format!("{:?}", result))
        }
        vk::Result::ERROR_DEVICE_LOST => Error::new(ErrorKind::DeviceLost),
        vk::Result::ERROR_FRAGMENTED_POOL | vk::Result::ERROR_OUT_OF_POOL_MEMORY => {
            Error::with_detail(ErrorKind::OutOfMemory, format!("{:?}", result))
        }
        result => Error::with_detail(ErrorKind::Backend, format!("{:?}", result)),
    }
}

pub(crate) fn translate_shader_stage_flags(value: base::ShaderStageFlags) -> vk::ShaderStageFlags {
    let mut ret = vk::ShaderStageFlags::empty();
    if value.contains(base::ShaderStageFlags::VERTEX) {
        ret |= vk::ShaderStageFlags::VERTEX;
    }
    if value.contains(base::ShaderStageFlags::PIXEL) {
        ret |= vk::ShaderStageFlags::FRAGMENT;
    }
    if value.contains(base::ShaderStageFlags::COMPUTE) {
        ret |= vk::ShaderStageFlags::COMPUTE;
    }
    if ret.is_empty() {
        ret = vk::ShaderStageFlags::ALL;
    }
    ret
}

pub(crate) fn translate_compare_op(value: base::CompareFunction) -> vk::CompareOp {
    match value {
        base::CompareFunction::Never => vk::CompareOp::NEVER,
        base::CompareFunction::Less => vk::CompareOp::LESS,
        base::CompareFunction::Equal => vk::CompareOp::EQUAL,
        base::CompareFunction::LessEqual => vk::CompareOp::LESS_OR_EQUAL,
        base::CompareFunction::Greater => vk::CompareOp::GREATER,
        base::CompareFunction::NotEqual => vk::CompareOp::NOT_EQUAL,
        base::CompareFunction::GreaterEqual => vk::CompareOp::GREATER_OR_EQUAL,
        base::CompareFunction::Always => vk::CompareOp::ALWAYS,
    }
}

pub(crate) fn translate_subresource_range(
    value: &base::SubresourceRange,
    aspect_mask: vk::ImageAspectFlags,
) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask,
        base_mip_level: value.base_mip_level,
        level_count: if value.mip_level_count == base::SubresourceRange::ALL {
            vk::REMAINING_MIP_LEVELS
        } else {
            value.mip_level_count
        },
        base_array_layer: value.base_array_layer,
        layer_count: if value.array_layer_count == base::SubresourceRange::ALL {
            vk::REMAINING_ARRAY_LAYERS
        } else {
            value.array_layer_count
        },
    }
}

pub(crate) fn translate_bind_type(ty: base::ResourceBindType, dynamic: bool) -> vk::DescriptorType {
    match ty {
        base::ResourceBindType::CBuffer => {
            if dynamic {
                vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC
            } else {
                vk::DescriptorType::UNIFORM_BUFFER
            }
        }
        base::ResourceBindType::Buffer | base::ResourceBindType::RwBuffer => {
            if dynamic {
                vk::DescriptorType::STORAGE_BUFFER_DYNAMIC
            } else {
                vk::DescriptorType::STORAGE_BUFFER
            }
        }
        base::ResourceBindType::Texture => vk::DescriptorType::SAMPLED_IMAGE,
        base::ResourceBindType::RwTexture => vk::DescriptorType::STORAGE_IMAGE,
        base::ResourceBindType::Sampler => vk::DescriptorType::SAMPLER,
    }
}

/// The (stage, access) pair a buffer use-flag mask translates to.
pub(crate) fn buffer_usage_to_stage_access(
    usage: base::BufferUsage,
) -> (vk::PipelineStageFlags, vk::AccessFlags) {
    use base::BufferUsage as U;
    let mut stages = vk::PipelineStageFlags::empty();
    let mut access = vk::AccessFlags::empty();

    if usage.contains(U::MAP_READ) {
        stages |= vk::PipelineStageFlags::HOST;
        access |= vk::AccessFlags::HOST_READ;
    }
    if usage.contains(U::MAP_WRITE) {
        stages |= vk::PipelineStageFlags::HOST;
        access |= vk::AccessFlags::HOST_WRITE;
    }
    if usage.contains(U::COPY_SRC) {
        stages |= vk::PipelineStageFlags::TRANSFER;
        access |= vk::AccessFlags::TRANSFER_READ;
    }
    if usage.contains(U::COPY_DST) {
        stages |= vk::PipelineStageFlags::TRANSFER;
        access |= vk::AccessFlags::TRANSFER_WRITE;
    }
    if usage.contains(U::INDEX) {
        stages |= vk::PipelineStageFlags::VERTEX_INPUT;
        access |= vk::AccessFlags::INDEX_READ;
    }
    if usage.contains(U::VERTEX) {
        stages |= vk::PipelineStageFlags::VERTEX_INPUT;
        access |= vk::AccessFlags::VERTEX_ATTRIBUTE_READ;
    }
    if usage.contains(U::CBUFFER) {
        stages |= vk::PipelineStageFlags::VERTEX_SHADER | vk::PipelineStageFlags::FRAGMENT_SHADER;
        access |= vk::AccessFlags::UNIFORM_READ;
    }
    if usage.contains(U::RESOURCE) {
        stages |= vk::PipelineStageFlags::VERTEX_SHADER | vk::PipelineStageFlags::FRAGMENT_SHADER;
        access |= vk::AccessFlags::SHADER_READ;
    }
    if usage.contains(U::UNORDERED_ACCESS) {
        stages |= vk::PipelineStageFlags::VERTEX_SHADER | vk::PipelineStageFlags::FRAGMENT_SHADER;
        access |= vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE;
    }
    if usage.contains(U::INDIRECT) {
        stages |= vk::PipelineStageFlags::DRAW_INDIRECT;
        access |= vk::AccessFlags::INDIRECT_COMMAND_READ;
    }
    if stages.is_empty() {
        // `COMMON` or an empty mask: no prior/later scope.
        stages = vk::PipelineStageFlags::TOP_OF_PIPE;
    }
    (stages, access)
}

/// The (stage, access, layout) triple a texture use-flag mask translates
/// to. A mask is expected to name one use; combined masks resolve to the
/// union of stages/accesses and the layout of the strongest use.
pub(crate) fn texture_usage_to_stage_access_layout(
    usage: base::TextureUsage,
) -> (vk::PipelineStageFlags, vk::AccessFlags, vk::ImageLayout) {
    use base::TextureUsage as U;

    if usage.contains(U::UNINITIALIZED) {
        return (
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::AccessFlags::empty(),
            vk::ImageLayout::UNDEFINED,
        );
    }
    if usage.contains(U::PRESENT) {
        return (
            vk::PipelineStageFlags::BOTTOM_OF_PIPE,
            vk::AccessFlags::empty(),
            vk::ImageLayout::PRESENT_SRC_KHR,
        );
    }

    let mut stages = vk::PipelineStageFlags::empty();
    let mut access = vk::AccessFlags::empty();
    let mut layout = vk::ImageLayout::GENERAL;

    if usage.contains(U::COPY_SRC) {
        stages |= vk::PipelineStageFlags::TRANSFER;
        access |= vk::AccessFlags::TRANSFER_READ;
        layout = vk::ImageLayout::TRANSFER_SRC_OPTIMAL;
    }
    if usage.contains(U::COPY_DST) {
        stages |= vk::PipelineStageFlags::TRANSFER;
        access |= vk::AccessFlags::TRANSFER_WRITE;
        layout = vk::ImageLayout::TRANSFER_DST_OPTIMAL;
    }
    if usage.contains(U::RESOURCE) {
        stages |= vk::PipelineStageFlags::VERTEX_SHADER | vk::PipelineStageFlags::FRAGMENT_SHADER;
        access |= vk::AccessFlags::SHADER_READ;
        layout = vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL;
    }
    if usage.contains(U::DEPTH_STENCIL_READ) {
        stages |= vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
            | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS;
        access |= vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ;
        layout = vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL;
    }
    if usage.contains(U::DEPTH_STENCIL_WRITE) {
        stages |= vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
            | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS;
        access |= vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
            | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
        layout = vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL;
    }
    if usage.contains(U::RENDER_TARGET) {
        stages |= vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT;
        access |= vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE;
        layout = vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL;
    }
    if usage.contains(U::UNORDERED_ACCESS) {
        stages |= vk::PipelineStageFlags::VERTEX_SHADER | vk::PipelineStageFlags::FRAGMENT_SHADER;
        access |= vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE;
        layout = vk::ImageLayout::GENERAL;
    }
    if stages.is_empty() {
        stages = vk::PipelineStageFlags::TOP_OF_PIPE;
    }
    (stages, access, layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mica_base::{BufferUsage, TextureUsage};

    #[test]
    fn uninitialized_maps_to_undefined_layout() {
        let (stages, access, layout) =
            texture_usage_to_stage_access_layout(TextureUsage::UNINITIALIZED);
        assert_eq!(stages, vk::PipelineStageFlags::TOP_OF_PIPE);
        assert_eq!(access, vk::AccessFlags::empty());
        assert_eq!(layout, vk::ImageLayout::UNDEFINED);
    }

    #[test]
    fn present_maps_to_present_src() {
        let (stages, access, layout) = texture_usage_to_stage_access_layout(TextureUsage::PRESENT);
        assert_eq!(stages, vk::PipelineStageFlags::BOTTOM_OF_PIPE);
        assert_eq!(access, vk::AccessFlags::empty());
        assert_eq!(layout, vk::ImageLayout::PRESENT_SRC_KHR);
    }

    #[test]
    fn render_target_is_color_attachment() {
        let (stages, access, layout) =
            texture_usage_to_stage_access_layout(TextureUsage::RENDER_TARGET);
        assert_eq!(stages, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT);
        assert!(access.contains(vk::AccessFlags::COLOR_ATTACHMENT_WRITE));
        assert_eq!(layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
    }

    #[test]
    fn copy_states_pick_transfer_layouts() {
        let (_, _, src) = texture_usage_to_stage_access_layout(TextureUsage::COPY_SRC);
        let (_, _, dst) = texture_usage_to_stage_access_layout(TextureUsage::COPY_DST);
        assert_eq!(src, vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
        assert_eq!(dst, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
    }

    #[test]
    fn buffer_vertex_and_index_use_vertex_input() {
        let (stages, access) = buffer_usage_to_stage_access(BufferUsage::VERTEX);
        assert_eq!(stages, vk::PipelineStageFlags::VERTEX_INPUT);
        assert_eq!(access, vk::AccessFlags::VERTEX_ATTRIBUTE_READ);

        let (stages, access) = buffer_usage_to_stage_access(BufferUsage::INDEX);
        assert_eq!(stages, vk::PipelineStageFlags::VERTEX_INPUT);
        assert_eq!(access, vk::AccessFlags::INDEX_READ);
    }

    #[test]
    fn combined_buffer_mask_unions_scopes() {
        let (stages, access) =
            buffer_usage_to_stage_access(BufferUsage::COPY_DST | BufferUsage::CBUFFER);
        assert!(stages.contains(vk::PipelineStageFlags::TRANSFER));
        assert!(stages.contains(vk::PipelineStageFlags::FRAGMENT_SHADER));
        assert!(access.contains(vk::AccessFlags::TRANSFER_WRITE));
        assert!(access.contains(vk::AccessFlags::UNIFORM_READ));
    }
}
