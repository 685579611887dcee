//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Transient render pass and framebuffer synthesis.
//!
//! The interface exposes only `begin_render_pass`; this backend builds a
//! single-subpass `VkRenderPass` and a `VkFramebuffer` per call, hands them
//! to the encoder, and retires them once the command buffer is re-recorded.
//! Pipeline creation reuses the same synthesis to obtain a compatible pass
//! from color/depth formats alone.
use ash::vk;
use log::error;

use mica_base as base;
use mica_base::TextureView as _;
use mica_base::{Error, ErrorKind, Result};

use crate::device::DeviceRef;
use crate::formats::translate_texture_format;
use crate::image::VulkanImageView;
use crate::utils::translate_generic_error;

fn translate_load_op(value: base::LoadOp) -> vk::AttachmentLoadOp {
    match value {
        base::LoadOp::DontCare => vk::AttachmentLoadOp::DONT_CARE,
        base::LoadOp::Load => vk::AttachmentLoadOp::LOAD,
        base::LoadOp::Clear => vk::AttachmentLoadOp::CLEAR,
    }
}

fn translate_store_op(value: base::StoreOp) -> vk::AttachmentStoreOp {
    match value {
        base::StoreOp::Store => vk::AttachmentStoreOp::STORE,
        base::StoreOp::Discard => vk::AttachmentStoreOp::DONT_CARE,
    }
}

/// A render pass + framebuffer pair owned by one encoder invocation.
pub(crate) struct TransientPass {
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
    pub extent: vk::Extent2D,
    pub clear_values: Vec<vk::ClearValue>,
}

impl std::fmt::Debug for TransientPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransientPass")
            .field("render_pass", &self.render_pass)
            .field("framebuffer", &self.framebuffer)
            .field("extent", &self.extent)
            .field("clear_values_len", &self.clear_values.len())
            .finish()
    }
}

impl TransientPass {
    pub(crate) unsafe fn destroy(&self, raw: &ash::Device) {
        raw.destroy_framebuffer(self.framebuffer, None);
        raw.destroy_render_pass(self.render_pass, None);
    }
}

/// Build a single-subpass render pass from formats. `for_clear_load` feeds
/// the load/store ops; pipeline compatibility passes use don't-care ops.
fn build_render_pass(
    device: &DeviceRef,
    color: &[(base::TextureFormat, vk::AttachmentLoadOp, vk::AttachmentStoreOp)],
    depth: Option<(
        base::TextureFormat,
        vk::AttachmentLoadOp,
        vk::AttachmentStoreOp,
        vk::AttachmentLoadOp,
        vk::AttachmentStoreOp,
    )>,
    samples: u32,
) -> Result<vk::RenderPass> {
    let mut attachments = Vec::with_capacity(color.len() + 1);
    let mut color_refs = Vec::with_capacity(color.len());

    for &(format, load, store) in color {
        let Some(vk_format) = translate_texture_format(format) else {
            error!("color attachment format {:?} is not supported", format);
            return Err(Error::new(ErrorKind::Unsupported));
        };
        let initial_layout = if load == vk::AttachmentLoadOp::LOAD {
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
        } else {
            vk::ImageLayout::UNDEFINED
        };
        color_refs.push(vk::AttachmentReference {
            attachment: attachments.len() as u32,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        });
        attachments.push(
            vk::AttachmentDescription::default()
                .format(vk_format)
                .samples(vk::SampleCountFlags::from_raw(samples.max(1)))
                .load_op(load)
                .store_op(store)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(initial_layout)
                .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
        );
    }

    let mut depth_ref = vk::AttachmentReference::default();
    let has_depth = depth.is_some();
    if let Some((format, depth_load, depth_store, stencil_load, stencil_store)) = depth {
        let Some(vk_format) = translate_texture_format(format) else {
            error!("depth attachment format {:?} is not supported", format);
            return Err(Error::new(ErrorKind::Unsupported));
        };
        let initial_layout = if depth_load == vk::AttachmentLoadOp::LOAD
            || stencil_load == vk::AttachmentLoadOp::LOAD
        {
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
        } else {
            vk::ImageLayout::UNDEFINED
        };
        depth_ref = vk::AttachmentReference {
            attachment: attachments.len() as u32,
            layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        };
        attachments.push(
            vk::AttachmentDescription::default()
                .format(vk_format)
                .samples(vk::SampleCountFlags::from_raw(samples.max(1)))
                .load_op(depth_load)
                .store_op(depth_store)
                .stencil_load_op(stencil_load)
                .stencil_store_op(stencil_store)
                .initial_layout(initial_layout)
                .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
        );
    }

    let mut subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs);
    if has_depth {
        subpass = subpass.depth_stencil_attachment(&depth_ref);
    }
    let subpasses = [subpass];

    let info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&subpasses);
    unsafe { device.raw().create_render_pass(&info, None) }.map_err(translate_generic_error)
}

/// A compatibility pass for pipeline creation; destroyed by the caller as
/// soon as the pipeline exists.
pub(crate) fn create_compatibility_pass(
    device: &DeviceRef,
    color_formats: &[base::TextureFormat],
    depth_format: Option<base::TextureFormat>,
    samples: u32,
) -> Result<vk::RenderPass> {
    let color: Vec<_> = color_formats
        .iter()
        .map(|&f| {
            (
                f,
                vk::AttachmentLoadOp::DONT_CARE,
                vk::AttachmentStoreOp::STORE,
            )
        })
        .collect();
    let depth = depth_format.map(|f| {
        (
            f,
            vk::AttachmentLoadOp::DONT_CARE,
            vk::AttachmentStoreOp::STORE,
            vk::AttachmentLoadOp::DONT_CARE,
            vk::AttachmentStoreOp::STORE,
        )
    });
    build_render_pass(device, &color, depth, samples)
}

/// Synthesize the transient pass + framebuffer for one `begin_render_pass`.
pub(crate) fn create_transient_pass(
    device: &DeviceRef,
    desc: &base::RenderPassDesc,
) -> Result<TransientPass> {
    if desc.color_attachments.is_empty() && desc.depth_stencil_attachment.is_none() {
        error!("render pass '{}' has no attachments", desc.name);
        return Err(Error::new(ErrorKind::Validation));
    }

    let color: Vec<_> = desc
        .color_attachments
        .iter()
        .map(|a| {
            (
                view_format(&a.target),
                translate_load_op(a.load),
                translate_store_op(a.store),
            )
        })
        .collect();
    let depth = desc.depth_stencil_attachment.as_ref().map(|a| {
        (
            view_format(&a.target),
            translate_load_op(a.depth_load),
            translate_store_op(a.depth_store),
            translate_load_op(a.stencil_load),
            translate_store_op(a.stencil_store),
        )
    });
    let samples = desc
        .color_attachments
        .first()
        .map(|a| texture_samples(&a.target))
        .or_else(|| {
            desc.depth_stencil_attachment
                .as_ref()
                .map(|a| texture_samples(&a.target))
        })
        .unwrap_or(1);

    let render_pass = build_render_pass(device, &color, depth, samples)?;

    // The framebuffer extent is the max of every attachment's extent.
    let mut extent = vk::Extent2D::default();
    let mut image_views = Vec::new();
    let mut clear_values = Vec::new();

    for attachment in &desc.color_attachments {
        let view: &VulkanImageView = attachment
            .target
            .as_any()
            .downcast_ref()
            .expect("foreign texture view in render pass");
        image_views.push(view.vk_image_view());
        let (w, h) = view_extent(&attachment.target);
        extent.width = extent.width.max(w);
        extent.height = extent.height.max(h);
        clear_values.push(vk::ClearValue {
            color: vk::ClearColorValue {
                float32: [
                    attachment.clear_value.r,
                    attachment.clear_value.g,
                    attachment.clear_value.b,
                    attachment.clear_value.a,
                ],
            },
        });
    }
    if let Some(attachment) = &desc.depth_stencil_attachment {
        let view: &VulkanImageView = attachment
            .target
            .as_any()
            .downcast_ref()
            .expect("foreign texture view in render pass");
        image_views.push(view.vk_image_view());
        let (w, h) = view_extent(&attachment.target);
        extent.width = extent.width.max(w);
        extent.height = extent.height.max(h);
        clear_values.push(vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: attachment.clear_value.depth,
                stencil: attachment.clear_value.stencil as u32,
            },
        });
    }

    let fb_info = vk::FramebufferCreateInfo::default()
        .render_pass(render_pass)
        .attachments(&image_views)
        .width(extent.width)
        .height(extent.height)
        .layers(1);
    let framebuffer = match unsafe { device.raw().create_framebuffer(&fb_info, None) } {
        Ok(fb) => fb,
        Err(result) => {
            unsafe { device.raw().destroy_render_pass(render_pass, None) };
            return Err(translate_generic_error(result));
        }
    };

    Ok(TransientPass {
        render_pass,
        framebuffer,
        extent,
        clear_values,
    })
}

fn view_format(view: &base::TextureViewRef) -> base::TextureFormat {
    let desc = view.desc();
    if desc.format == base::TextureFormat::Unknown {
        base::Texture::desc(&*desc.texture).format
    } else {
        desc.format
    }
}

fn view_extent(view: &base::TextureViewRef) -> (u32, u32) {
    let texture = base::Texture::desc(&*view.desc().texture);
    let mip = view.desc().range.base_mip_level;
    ((texture.width >> mip).max(1), (texture.height >> mip).max(1))
}

fn texture_samples(view: &base::TextureViewRef) -> u32 {
    base::Texture::desc(&*view.desc().texture).sample_count.max(1)
}
