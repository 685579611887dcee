//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Implementation of `SwapChain` for Vulkan.
//!
//! The frame index and the back-buffer index are deliberately decoupled:
//! `vkAcquireNextImageKHR` may return images in any order, so per-frame
//! sync objects (image-available semaphore, in-flight fence) cycle with
//! the frame counter while the render-finished semaphore belongs to the
//! acquired image.
use std::any::Any;
use std::sync::Arc;

use ash::vk;
use log::{error, warn};

use mica_base as base;
use mica_base::CommandQueue as _;
use mica_base::{Error, ErrorKind, Result};

use crate::cmd::queue::{SwapchainSync, VulkanQueue};
use crate::device::DeviceRef;
use crate::formats::translate_texture_format;
use crate::image::VulkanImage;
use crate::utils::translate_generic_error;

struct FrameSync {
    image_available: vk::Semaphore,
    in_flight: vk::Fence,
}

pub struct VulkanSwapChain {
    device: DeviceRef,
    desc: base::SwapChainDesc,
    surface: vk::SurfaceKHR,
    swapchain: vk::SwapchainKHR,
    /// One wrapper per swapchain image.
    textures: Vec<base::TextureRef>,
    /// One render-finished semaphore per swapchain image.
    render_finished: Vec<vk::Semaphore>,
    /// One sync pair per frame in flight.
    frames: Vec<FrameSync>,
    frame_counter: u64,
    current_image: u32,
    acquired: bool,
}

impl std::fmt::Debug for VulkanSwapChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanSwapChain")
            .field("desc", &self.desc)
            .field("images", &self.textures.len())
            .field("frame_counter", &self.frame_counter)
            .finish()
    }
}

impl VulkanSwapChain {
    pub(crate) fn new(device: DeviceRef, desc: &base::SwapChainDesc) -> Result<Self> {
        if desc.back_buffer_count < 2 {
            error!(
                "swapchain needs at least two back buffers, got {}",
                desc.back_buffer_count
            );
            return Err(Error::new(ErrorKind::Validation));
        }
        let queue: &VulkanQueue = desc
            .present_queue
            .as_any()
            .downcast_ref()
            .expect("foreign queue in swapchain descriptor");

        let surface = unsafe {
            ash_window::create_surface(
                device.entry(),
                device.instance(),
                desc.display,
                desc.window,
                None,
            )
        }
        .map_err(|result| {
            error!("surface creation failed: {:?}", result);
            translate_generic_error(result)
        })?;

        let supported = unsafe {
            device.surface_loader().get_physical_device_surface_support(
                device.physical_device(),
                queue.family_index(),
                surface,
            )
        }
        .unwrap_or(false);
        if !supported {
            error!("the present queue's family cannot present to this surface");
            unsafe { device.surface_loader().destroy_surface(surface, None) };
            return Err(Error::new(ErrorKind::Unsupported));
        }

        let mut out = Self {
            device,
            desc: desc.clone(),
            surface,
            swapchain: vk::SwapchainKHR::null(),
            textures: Vec::new(),
            render_finished: Vec::new(),
            frames: Vec::new(),
            frame_counter: 0,
            current_image: 0,
            acquired: false,
        };
        out.create_native(desc.width, desc.height)?;
        Ok(out)
    }

    fn create_native(&mut self, width: u32, height: u32) -> Result<()> {
        let device = &self.device;
        let Some(format) = translate_texture_format(self.desc.format) else {
            error!("swapchain format {:?} is not supported", self.desc.format);
            return Err(Error::new(ErrorKind::Unsupported));
        };

        let caps = unsafe {
            device
                .surface_loader()
                .get_physical_device_surface_capabilities(device.physical_device(), self.surface)
        }
        .map_err(translate_generic_error)?;

        let formats = unsafe {
            device
                .surface_loader()
                .get_physical_device_surface_formats(device.physical_device(), self.surface)
        }
        .map_err(translate_generic_error)?;
        let surface_format = formats
            .iter()
            .find(|f| f.format == format)
            .copied()
            .or_else(|| formats.first().copied())
            .ok_or_else(|| {
                error!("the surface reports no formats");
                Error::new(ErrorKind::Unsupported)
            })?;
        if surface_format.format != format {
            warn!(
                "surface does not support {:?}; falling back to {:?}",
                format, surface_format.format
            );
        }

        let present_modes = unsafe {
            device
                .surface_loader()
                .get_physical_device_surface_present_modes(device.physical_device(), self.surface)
        }
        .map_err(translate_generic_error)?;
        let present_mode = if self.desc.enable_sync {
            vk::PresentModeKHR::FIFO
        } else {
            [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]
                .into_iter()
                .find(|mode| present_modes.contains(mode))
                .unwrap_or(vk::PresentModeKHR::FIFO)
        };

        let image_count = self
            .desc
            .back_buffer_count
            .max(caps.min_image_count)
            .min(if caps.max_image_count == 0 {
                u32::MAX
            } else {
                caps.max_image_count
            });
        let extent = if caps.current_extent.width != u32::MAX {
            caps.current_extent
        } else {
            vk::Extent2D { width, height }
        };

        let old_swapchain = self.swapchain;
        let info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(
                vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_SRC,
            )
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = unsafe { device.swapchain_loader().create_swapchain(&info, None) }
            .map_err(translate_generic_error)?;
        if old_swapchain != vk::SwapchainKHR::null() {
            unsafe {
                device
                    .swapchain_loader()
                    .destroy_swapchain(old_swapchain, None)
            };
        }
        self.swapchain = swapchain;
        self.desc.width = extent.width;
        self.desc.height = extent.height;

        let images = unsafe { device.swapchain_loader().get_swapchain_images(swapchain) }
            .map_err(translate_generic_error)?;

        self.textures = images
            .iter()
            .enumerate()
            .map(|(i, &image)| {
                Arc::new(VulkanImage::from_swapchain_image(
                    device.clone(),
                    image,
                    base::TextureDesc {
                        dim: base::TextureDimension::Dim2D,
                        width: extent.width,
                        height: extent.height,
                        depth_or_array_size: 1,
                        mip_levels: 1,
                        sample_count: 1,
                        format: self.desc.format,
                        usage: base::TextureUsage::RENDER_TARGET
                            | base::TextureUsage::PRESENT
                            | base::TextureUsage::COPY_SRC,
                        hints: Default::default(),
                        name: format!("backbuffer-{}", i),
                    },
                )) as base::TextureRef
            })
            .collect();

        self.render_finished = images
            .iter()
            .map(|_| {
                unsafe {
                    device
                        .raw()
                        .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
                }
                .map_err(translate_generic_error)
            })
            .collect::<Result<_>>()?;

        let frames_in_flight = self.desc.back_buffer_count as usize;
        self.frames = (0..frames_in_flight)
            .map(|_| {
                let image_available = unsafe {
                    device
                        .raw()
                        .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
                }
                .map_err(translate_generic_error)?;
                let in_flight = unsafe {
                    device.raw().create_fence(
                        &vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED),
                        None,
                    )
                }
                .map_err(translate_generic_error)?;
                Ok(FrameSync {
                    image_available,
                    in_flight,
                })
            })
            .collect::<Result<_>>()?;

        self.frame_counter = 0;
        self.current_image = 0;
        self.acquired = false;
        Ok(())
    }

    fn destroy_sync(&mut self) {
        let raw = self.device.raw();
        unsafe {
            for semaphore in self.render_finished.drain(..) {
                raw.destroy_semaphore(semaphore, None);
            }
            for frame in self.frames.drain(..) {
                raw.destroy_semaphore(frame.image_available, None);
                raw.destroy_fence(frame.in_flight, None);
            }
        }
    }

    fn present_queue(&self) -> &VulkanQueue {
        self.desc
            .present_queue
            .as_any()
            .downcast_ref()
            .expect("foreign queue in swapchain descriptor")
    }
}

impl Drop for VulkanSwapChain {
    fn drop(&mut self) {
        // Idle-wait mirrors the interface requirement that the queue be
        // drained before destruction; it keeps teardown safe even when the
        // caller forgot.
        let _ = base::CommandQueue::wait_idle(self.present_queue());
        self.textures.clear();
        self.destroy_sync();
        unsafe {
            self.device
                .swapchain_loader()
                .destroy_swapchain(self.swapchain, None);
            self.device.surface_loader().destroy_surface(self.surface, None);
        }
    }
}

impl base::SwapChain for VulkanSwapChain {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn acquire_next(&mut self) -> Result<base::TextureRef> {
        assert!(
            !self.acquired,
            "acquire_next called while a back buffer is outstanding"
        );
        let frame_index = (self.frame_counter % self.frames.len() as u64) as usize;
        let frame = &self.frames[frame_index];
        let raw = self.device.raw();

        unsafe {
            raw.wait_for_fences(&[frame.in_flight], true, u64::MAX)
                .map_err(translate_generic_error)?;
            raw.reset_fences(&[frame.in_flight])
                .map_err(translate_generic_error)?;
        }

        let (image_index, suboptimal) = unsafe {
            self.device.swapchain_loader().acquire_next_image(
                self.swapchain,
                u64::MAX,
                frame.image_available,
                vk::Fence::null(),
            )
        }
        .map_err(|result| {
            error!("acquire failed: {:?}", result);
            translate_generic_error(result)
        })?;
        if suboptimal {
            warn!("swapchain is suboptimal; consider resizing");
        }

        // The next submission on the present queue picks these up.
        self.present_queue().register_swapchain_sync(SwapchainSync {
            wait_semaphore: Some(frame.image_available),
            signal_semaphore: Some(self.render_finished[image_index as usize]),
            signal_fence: Some(frame.in_flight),
        });

        self.frame_counter += 1;
        self.current_image = image_index;
        self.acquired = true;
        Ok(self.textures[image_index as usize].clone())
    }

    fn present(&mut self) -> Result<()> {
        assert!(self.acquired, "present without a matching acquire_next");
        self.acquired = false;

        // If nothing was submitted since the acquire, consume the pending
        // sync so the present below has a signaled semaphore to wait on.
        self.present_queue().flush_swapchain_sync()?;

        let wait_semaphores = [self.render_finished[self.current_image as usize]];
        let swapchains = [self.swapchain];
        let image_indices = [self.current_image];
        let info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let queue = self.present_queue();
        match unsafe {
            self.device
                .swapchain_loader()
                .queue_present(queue.vk_queue(), &info)
        } {
            Ok(_) => Ok(()),
            Err(result) => {
                error!("present failed: {:?}", result);
                Err(translate_generic_error(result))
            }
        }
    }

    fn current_back_buffer(&self) -> Result<base::TextureRef> {
        if !self.acquired {
            error!("no back buffer is acquired");
            return Err(Error::new(ErrorKind::Validation));
        }
        Ok(self.textures[self.current_image as usize].clone())
    }

    fn current_back_buffer_index(&self) -> u32 {
        self.current_image
    }

    fn back_buffer_count(&self) -> u32 {
        self.textures.len() as u32
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        base::CommandQueue::wait_idle(self.present_queue())?;
        self.textures.clear();
        self.destroy_sync();
        self.create_native(width, height)
    }

    fn desc(&self) -> &base::SwapChainDesc {
        &self.desc
    }
}
