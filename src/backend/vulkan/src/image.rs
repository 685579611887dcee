//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Implementation of `Texture` and `TextureView` for Vulkan.
use std::any::Any;

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use log::error;
use parking_lot::Mutex;

use mica_base as base;
use mica_base::Texture as _;
use mica_base::{Error, ErrorKind, Result};

use crate::device::DeviceRef;
use crate::formats::{format_aspect_mask, translate_texture_format};
use crate::utils::{translate_generic_error, translate_subresource_range};

fn translate_texture_usage(usage: base::TextureUsage) -> vk::ImageUsageFlags {
    use base::TextureUsage as U;
    let mut ret = vk::ImageUsageFlags::empty();
    if usage.contains(U::COPY_SRC) {
        ret |= vk::ImageUsageFlags::TRANSFER_SRC;
    }
    if usage.contains(U::COPY_DST) {
        ret |= vk::ImageUsageFlags::TRANSFER_DST;
    }
    if usage.contains(U::RESOURCE) {
        ret |= vk::ImageUsageFlags::SAMPLED;
    }
    if usage.contains(U::RENDER_TARGET) {
        ret |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
    }
    if usage.contains(U::DEPTH_STENCIL_READ) || usage.contains(U::DEPTH_STENCIL_WRITE) {
        ret |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    if usage.contains(U::UNORDERED_ACCESS) {
        ret |= vk::ImageUsageFlags::STORAGE;
    }
    ret
}

/// Implementation of `Texture` for Vulkan.
///
/// Swapchain back buffers wrap images the swapchain owns; those skip the
/// allocator and are not destroyed on drop.
#[derive(Debug)]
pub struct VulkanImage {
    device: DeviceRef,
    desc: base::TextureDesc,
    vk_image: vk::Image,
    allocation: Mutex<Option<Allocation>>,
    owned: bool,
}

unsafe impl Send for VulkanImage {}
unsafe impl Sync for VulkanImage {}

impl VulkanImage {
    pub(crate) fn new(device: DeviceRef, desc: &base::TextureDesc) -> Result<Self> {
        if desc.width == 0 || desc.height == 0 {
            error!("texture '{}' has a zero extent", desc.name);
            return Err(Error::new(ErrorKind::Validation));
        }
        let Some(format) = translate_texture_format(desc.format) else {
            error!(
                "texture format {:?} is not supported by this backend",
                desc.format
            );
            return Err(Error::new(ErrorKind::Unsupported));
        };

        let (image_type, extent, layers) = match desc.dim {
            base::TextureDimension::Dim1D => (
                vk::ImageType::TYPE_1D,
                vk::Extent3D {
                    width: desc.width,
                    height: 1,
                    depth: 1,
                },
                desc.depth_or_array_size.max(1),
            ),
            base::TextureDimension::Dim3D => (
                vk::ImageType::TYPE_3D,
                vk::Extent3D {
                    width: desc.width,
                    height: desc.height,
                    depth: desc.depth_or_array_size.max(1),
                },
                1,
            ),
            _ => (
                vk::ImageType::TYPE_2D,
                vk::Extent3D {
                    width: desc.width,
                    height: desc.height,
                    depth: 1,
                },
                desc.depth_or_array_size.max(1),
            ),
        };

        let info = vk::ImageCreateInfo::default()
            .image_type(image_type)
            .format(format)
            .extent(extent)
            .mip_levels(desc.mip_levels.max(1))
            .array_layers(layers)
            .samples(vk::SampleCountFlags::from_raw(desc.sample_count.max(1)))
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(translate_texture_usage(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let vk_image =
            unsafe { device.raw().create_image(&info, None) }.map_err(translate_generic_error)?;
        let requirements = unsafe { device.raw().get_image_memory_requirements(vk_image) };

        let allocation = device
            .allocator()
            .lock()
            .as_mut()
            .expect("allocator already torn down")
            .allocate(&AllocationCreateDesc {
                name: &desc.name,
                requirements,
                location: MemoryLocation::GpuOnly,
                linear: false,
                allocation_scheme: if desc.hints.contains(base::ResourceHints::DEDICATED) {
                    AllocationScheme::DedicatedImage(vk_image)
                } else {
                    AllocationScheme::GpuAllocatorManaged
                },
            })
            .map_err(|err| {
                error!("image allocation failed: {}", err);
                unsafe { device.raw().destroy_image(vk_image, None) };
                Error::with_detail(ErrorKind::OutOfMemory, err.to_string())
            })?;

        if let Err(result) = unsafe {
            device
                .raw()
                .bind_image_memory(vk_image, allocation.memory(), allocation.offset())
        } {
            unsafe { device.raw().destroy_image(vk_image, None) };
            let _ = device
                .allocator()
                .lock()
                .as_mut()
                .map(|a| a.free(allocation));
            return Err(translate_generic_error(result));
        }

        Ok(Self {
            device,
            desc: desc.clone(),
            vk_image,
            allocation: Mutex::new(Some(allocation)),
            owned: true,
        })
    }

    /// Wrap a swapchain-owned image.
    pub(crate) fn from_swapchain_image(
        device: DeviceRef,
        vk_image: vk::Image,
        desc: base::TextureDesc,
    ) -> Self {
        Self {
            device,
            desc,
            vk_image,
            allocation: Mutex::new(None),
            owned: false,
        }
    }

    pub fn vk_image(&self) -> vk::Image {
        self.vk_image
    }
}

impl Drop for VulkanImage {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.lock().take() {
            if let Some(allocator) = self.device.allocator().lock().as_mut() {
                let _ = allocator.free(allocation);
            }
        }
        if self.owned {
            unsafe {
                self.device.raw().destroy_image(self.vk_image, None);
            }
        }
    }
}

impl base::Texture for VulkanImage {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn desc(&self) -> &base::TextureDesc {
        &self.desc
    }
}

/// Implementation of `TextureView` for Vulkan.
#[derive(Debug)]
pub struct VulkanImageView {
    device: DeviceRef,
    desc: base::TextureViewDesc,
    vk_view: vk::ImageView,
}

unsafe impl Send for VulkanImageView {}
unsafe impl Sync for VulkanImageView {}

impl VulkanImageView {
    pub(crate) fn new(device: DeviceRef, desc: &base::TextureViewDesc) -> Result<Self> {
        let image: &VulkanImage = desc
            .texture
            .as_any()
            .downcast_ref()
            .expect("foreign texture in view");

        let format = if desc.format == base::TextureFormat::Unknown {
            base::Texture::desc(image).format
        } else {
            desc.format
        };
        let Some(vk_format) = translate_texture_format(format) else {
            error!("view format {:?} is not supported", format);
            return Err(Error::new(ErrorKind::Unsupported));
        };

        let view_type = match desc.dim {
            base::TextureViewDimension::Dim1D => vk::ImageViewType::TYPE_1D,
            base::TextureViewDimension::Dim3D => vk::ImageViewType::TYPE_3D,
            base::TextureViewDimension::Dim1DArray => vk::ImageViewType::TYPE_1D_ARRAY,
            base::TextureViewDimension::Dim2DArray => vk::ImageViewType::TYPE_2D_ARRAY,
            base::TextureViewDimension::Cube => vk::ImageViewType::CUBE,
            base::TextureViewDimension::CubeArray => vk::ImageViewType::CUBE_ARRAY,
            _ => vk::ImageViewType::TYPE_2D,
        };

        let info = vk::ImageViewCreateInfo::default()
            .image(image.vk_image())
            .view_type(view_type)
            .format(vk_format)
            .subresource_range(translate_subresource_range(
                &desc.range,
                format_aspect_mask(format),
            ));

        let vk_view = unsafe { device.raw().create_image_view(&info, None) }
            .map_err(translate_generic_error)?;
        Ok(Self {
            device,
            desc: desc.clone(),
            vk_view,
        })
    }

    pub fn vk_image_view(&self) -> vk::ImageView {
        self.vk_view
    }
}

impl Drop for VulkanImageView {
    fn drop(&mut self) {
        unsafe {
            self.device.raw().destroy_image_view(self.vk_view, None);
        }
    }
}

impl base::TextureView for VulkanImageView {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn desc(&self) -> &base::TextureViewDesc {
        &self.desc
    }
}
