//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Implementation of `Device` for Vulkan.
use std::any::Any;
use std::borrow::Cow;
use std::ffi::{c_void, CStr, CString};
use std::sync::Arc;

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use log::{debug, error, info, warn};
use parking_lot::Mutex;

use mica_base as base;
use mica_base::{CommandQueue as _, RootSignature as _};
use mica_base::{Error, ErrorKind, Result};

use crate::arg::{DescriptorPoolAllocator, VulkanDescriptorSet, VulkanRootSignature};
use crate::buffer::{VulkanBuffer, VulkanBufferView};
use crate::cmd::queue::VulkanQueue;
use crate::cmd::{VulkanCommandBuffer, VulkanFence, VulkanSemaphore};
use crate::image::{VulkanImage, VulkanImageView};
use crate::pipeline::VulkanGraphicsPipeline;
use crate::sampler::VulkanSampler;
use crate::shader::VulkanShader;
use crate::swapchain::VulkanSwapChain;
use crate::utils::translate_generic_error;

/// Instance-level configuration.
#[derive(Debug, Clone)]
pub struct InstanceDesc {
    pub app_name: String,
    pub app_version: u32,
    pub engine_name: String,
    pub engine_version: u32,
    pub enable_debug_layer: bool,
    pub enable_gpu_based_validation: bool,
}

impl Default for InstanceDesc {
    fn default() -> Self {
        Self {
            app_name: "mica".to_owned(),
            app_version: 0,
            engine_name: "mica".to_owned(),
            engine_version: 0,
            enable_debug_layer: false,
            enable_gpu_based_validation: false,
        }
    }
}

/// Device-level configuration: adapter selection plus requested queue
/// counts per queue type. An empty queue list requests one direct queue.
#[derive(Debug, Clone, Default)]
pub struct VulkanDeviceDesc {
    pub physical_device_index: Option<u32>,
    pub queues: Vec<(base::QueueType, u32)>,
}

/// Shared device state every child object holds a reference to.
pub(crate) struct DeviceShared {
    entry: ash::Entry,
    instance: ash::Instance,
    debug_utils: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    surface_loader: ash::khr::surface::Instance,
    physical_device: vk::PhysicalDevice,
    raw: ash::Device,
    swapchain_loader: ash::khr::swapchain::Device,
    allocator: Mutex<Option<Allocator>>,
    descriptor_pools: Mutex<DescriptorPoolAllocator>,
    detail: base::DeviceDetail,
}

pub(crate) type DeviceRef = Arc<DeviceShared>;

impl DeviceShared {
    pub(crate) fn raw(&self) -> &ash::Device {
        &self.raw
    }

    pub(crate) fn entry(&self) -> &ash::Entry {
        &self.entry
    }

    pub(crate) fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    pub(crate) fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub(crate) fn surface_loader(&self) -> &ash::khr::surface::Instance {
        &self.surface_loader
    }

    pub(crate) fn swapchain_loader(&self) -> &ash::khr::swapchain::Device {
        &self.swapchain_loader
    }

    pub(crate) fn allocator(&self) -> &Mutex<Option<Allocator>> {
        &self.allocator
    }

    pub(crate) fn descriptor_pools(&self) -> &Mutex<DescriptorPoolAllocator> {
        &self.descriptor_pools
    }
}

impl Drop for DeviceShared {
    fn drop(&mut self) {
        unsafe {
            let _ = self.raw.device_wait_idle();
            self.descriptor_pools.lock().destroy(&self.raw);
            // The allocator logs leaks on drop; release it before the
            // device goes away.
            *self.allocator.lock() = None;
            self.raw.destroy_device(None);
            if let Some((loader, messenger)) = self.debug_utils.take() {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

impl std::fmt::Debug for DeviceShared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceShared")
            .field("detail", &self.detail)
            .finish()
    }
}

unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _types: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    let message = if callback_data.is_null() {
        Cow::Borrowed("<no message>")
    } else {
        let data = &*callback_data;
        if data.p_message.is_null() {
            Cow::Borrowed("<no message>")
        } else {
            CStr::from_ptr(data.p_message).to_string_lossy()
        }
    };
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        error!("[vulkan] {}", message);
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        warn!("[vulkan] {}", message);
    } else {
        debug!("[vulkan] {}", message);
    }
    vk::FALSE
}

/// Platform surface extensions this backend knows how to enable.
const SURFACE_EXTENSIONS: &[&CStr] = &[
    ash::khr::surface::NAME,
    ash::khr::win32_surface::NAME,
    ash::khr::xlib_surface::NAME,
    ash::khr::xcb_surface::NAME,
    ash::khr::wayland_surface::NAME,
    ash::khr::android_surface::NAME,
    ash::ext::metal_surface::NAME,
];

/// Implementation of `Device` for Vulkan.
#[derive(Debug)]
pub struct VulkanDevice {
    shared: DeviceRef,
    /// Queues per type, in slot order.
    direct_queues: Vec<base::CommandQueueRef>,
    compute_queues: Vec<base::CommandQueueRef>,
    copy_queues: Vec<base::CommandQueueRef>,
}

impl VulkanDevice {
    /// Create an instance, pick a physical device, and open a logical
    /// device with the requested queues.
    pub fn new(
        instance_desc: &InstanceDesc,
        device_desc: &VulkanDeviceDesc,
    ) -> Result<base::DeviceRef> {
        let entry = unsafe { ash::Entry::load() }.map_err(|err| {
            error!("failed to load the Vulkan loader: {}", err);
            Error::with_detail(ErrorKind::Unsupported, err.to_string())
        })?;

        let app_name = CString::new(instance_desc.app_name.as_str())
            .unwrap_or_else(|_| CString::new("mica").unwrap());
        let engine_name = CString::new(instance_desc.engine_name.as_str())
            .unwrap_or_else(|_| CString::new("mica").unwrap());
        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(instance_desc.app_version)
            .engine_name(&engine_name)
            .engine_version(instance_desc.engine_version)
            .api_version(vk::API_VERSION_1_2);

        let available_extensions =
            unsafe { entry.enumerate_instance_extension_properties(None) }.unwrap_or_default();
        let has_extension = |name: &CStr| {
            available_extensions
                .iter()
                .any(|ext| ext.extension_name_as_c_str().map_or(false, |n| n == name))
        };

        let mut extensions: Vec<*const i8> = SURFACE_EXTENSIONS
            .iter()
            .filter(|&&name| has_extension(name))
            .map(|&name| name.as_ptr())
            .collect();
        if instance_desc.enable_debug_layer && has_extension(ash::ext::debug_utils::NAME) {
            extensions.push(ash::ext::debug_utils::NAME.as_ptr());
        }

        let available_layers =
            unsafe { entry.enumerate_instance_layer_properties() }.unwrap_or_default();
        let validation_layer = c"VK_LAYER_KHRONOS_validation";
        let mut layers: Vec<*const i8> = Vec::new();
        if instance_desc.enable_debug_layer {
            let found = available_layers.iter().any(|layer| {
                layer
                    .layer_name_as_c_str()
                    .map_or(false, |n| n == validation_layer)
            });
            if found {
                layers.push(validation_layer.as_ptr());
            } else {
                warn!("validation layer requested but not installed");
            }
        }

        let gpu_validation_features = [vk::ValidationFeatureEnableEXT::GPU_ASSISTED];
        let mut validation_features = vk::ValidationFeaturesEXT::default()
            .enabled_validation_features(&gpu_validation_features);

        let mut instance_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layers);
        if instance_desc.enable_gpu_based_validation {
            instance_info = instance_info.push_next(&mut validation_features);
        }

        let instance = unsafe { entry.create_instance(&instance_info, None) }.map_err(|err| {
            error!("instance creation failed: {:?}", err);
            translate_generic_error(err)
        })?;

        let debug_utils = if instance_desc.enable_debug_layer
            && has_extension(ash::ext::debug_utils::NAME)
        {
            let loader = ash::ext::debug_utils::Instance::new(&entry, &instance);
            let info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                .message_severity(
                    vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                        | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
                )
                .message_type(
                    vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                        | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                        | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                )
                .pfn_user_callback(Some(debug_callback));
            match unsafe { loader.create_debug_utils_messenger(&info, None) } {
                Ok(messenger) => Some((loader, messenger)),
                Err(result) => {
                    warn!("debug messenger creation failed: {:?}", result);
                    None
                }
            }
        } else {
            None
        };

        // Physical device selection: an explicit index wins, otherwise the
        // first discrete GPU, otherwise device zero.
        let physical_devices = unsafe { instance.enumerate_physical_devices() }
            .map_err(translate_generic_error)?;
        if physical_devices.is_empty() {
            error!("no Vulkan physical devices present");
            unsafe { instance.destroy_instance(None) };
            return Err(Error::new(ErrorKind::Unsupported));
        }
        let physical_device = match device_desc.physical_device_index {
            Some(index) => *physical_devices.get(index as usize).ok_or_else(|| {
                error!(
                    "physical device index {} out of range ({} present)",
                    index,
                    physical_devices.len()
                );
                Error::new(ErrorKind::Validation)
            })?,
            None => physical_devices
                .iter()
                .copied()
                .find(|&pd| {
                    let props = unsafe { instance.get_physical_device_properties(pd) };
                    props.device_type == vk::PhysicalDeviceType::DISCRETE_GPU
                })
                .unwrap_or(physical_devices[0]),
        };
        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        info!(
            "selected adapter: {}",
            unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }.to_string_lossy()
        );

        // Map each queue type onto a family.
        let family_props =
            unsafe { instance.get_physical_device_queue_family_properties(physical_device) };
        let find_family = |required: vk::QueueFlags, excluded: vk::QueueFlags| {
            family_props.iter().position(|props| {
                props.queue_flags.contains(required)
                    && !props.queue_flags.intersects(excluded)
            })
        };
        let graphics_family = find_family(vk::QueueFlags::GRAPHICS, vk::QueueFlags::empty())
            .ok_or_else(|| {
                error!("the adapter has no graphics queue family");
                Error::new(ErrorKind::Unsupported)
            })? as u32;
        let compute_family = find_family(vk::QueueFlags::COMPUTE, vk::QueueFlags::GRAPHICS)
            .map(|f| f as u32)
            .unwrap_or(graphics_family);
        let copy_family = find_family(
            vk::QueueFlags::TRANSFER,
            vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE,
        )
        .map(|f| f as u32)
        .unwrap_or(compute_family);

        let family_of = |ty: base::QueueType| match ty {
            base::QueueType::Direct => graphics_family,
            base::QueueType::Compute => compute_family,
            base::QueueType::Copy => copy_family,
        };

        let mut requested: Vec<(base::QueueType, u32)> = device_desc.queues.clone();
        if requested.is_empty() {
            requested.push((base::QueueType::Direct, 1));
        }

        // Total queue counts per family, clamped to what the family offers.
        let mut family_counts: std::collections::BTreeMap<u32, u32> = Default::default();
        for &(ty, count) in &requested {
            *family_counts.entry(family_of(ty)).or_default() += count;
        }
        for (&family, count) in family_counts.iter_mut() {
            let limit = family_props[family as usize].queue_count;
            if *count > limit {
                warn!(
                    "family {} offers {} queues, {} requested; clamping",
                    family, limit, count
                );
                *count = limit;
            }
        }

        let priorities: Vec<Vec<f32>> = family_counts
            .values()
            .map(|&count| vec![1.0f32; count as usize])
            .collect();
        let queue_infos: Vec<vk::DeviceQueueCreateInfo<'_>> = family_counts
            .keys()
            .zip(priorities.iter())
            .map(|(&family, priorities)| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(priorities)
            })
            .collect();

        let device_extensions = [ash::khr::swapchain::NAME.as_ptr()];
        let mut vulkan12_features = vk::PhysicalDeviceVulkan12Features::default()
            .timeline_semaphore(true)
            .descriptor_indexing(true)
            .runtime_descriptor_array(true)
            .descriptor_binding_partially_bound(true);
        let device_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&device_extensions)
            .push_next(&mut vulkan12_features);

        let raw = unsafe { instance.create_device(physical_device, &device_info, None) }
            .map_err(|result| {
                error!("device creation failed: {:?}", result);
                unsafe { instance.destroy_instance(None) };
                translate_generic_error(result)
            })?;

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: raw.clone(),
            physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        })
        .map_err(|err| {
            error!("memory allocator creation failed: {}", err);
            Error::with_detail(ErrorKind::Backend, err.to_string())
        })?;

        let limits = &properties.limits;
        let detail = base::DeviceDetail {
            cbuffer_alignment: limits.min_uniform_buffer_offset_alignment.max(1) as u32,
            upload_texture_alignment: limits.optimal_buffer_copy_offset_alignment.max(1) as u32,
            upload_texture_row_alignment: limits.optimal_buffer_copy_row_pitch_alignment.max(1)
                as u32,
            map_alignment: limits.non_coherent_atom_size.max(1) as u32,
        };

        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
        let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &raw);

        let shared = Arc::new(DeviceShared {
            entry,
            instance,
            debug_utils,
            surface_loader,
            physical_device,
            raw,
            swapchain_loader,
            allocator: Mutex::new(Some(allocator)),
            descriptor_pools: Mutex::new(DescriptorPoolAllocator::new()),
            detail,
        });

        // Materialize the queues, handing out per-family indices.
        let mut next_index: std::collections::BTreeMap<u32, u32> = Default::default();
        let mut direct_queues = Vec::new();
        let mut compute_queues = Vec::new();
        let mut copy_queues = Vec::new();
        for &(ty, count) in &requested {
            let family = family_of(ty);
            for _ in 0..count {
                let index = next_index.entry(family).or_default();
                if *index >= family_counts[&family] {
                    warn!("queue request for {:?} exceeded the family capacity", ty);
                    break;
                }
                let raw_queue = unsafe { shared.raw.get_device_queue(family, *index) };
                *index += 1;
                let queue: base::CommandQueueRef =
                    Arc::new(VulkanQueue::new(shared.clone(), raw_queue, family, ty));
                match ty {
                    base::QueueType::Direct => direct_queues.push(queue),
                    base::QueueType::Compute => compute_queues.push(queue),
                    base::QueueType::Copy => copy_queues.push(queue),
                }
            }
        }

        Ok(Arc::new(Self {
            shared,
            direct_queues,
            compute_queues,
            copy_queues,
        }))
    }

    pub(crate) fn shared(&self) -> &DeviceRef {
        &self.shared
    }
}

impl base::Device for VulkanDevice {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn backend(&self) -> base::Backend {
        base::Backend::Vulkan
    }

    fn detail(&self) -> base::DeviceDetail {
        self.shared.detail
    }

    fn command_queue(&self, ty: base::QueueType, slot: u32) -> Option<base::CommandQueueRef> {
        let list = match ty {
            base::QueueType::Direct => &self.direct_queues,
            base::QueueType::Compute => &self.compute_queues,
            base::QueueType::Copy => &self.copy_queues,
        };
        list.get(slot as usize).cloned()
    }

    fn create_command_buffer(
        &self,
        queue: &base::CommandQueueRef,
    ) -> Result<base::CommandBufferRef> {
        let queue: &VulkanQueue = queue
            .as_any()
            .downcast_ref()
            .expect("foreign queue passed to vulkan device");
        Ok(Box::new(VulkanCommandBuffer::new(
            self.shared.clone(),
            queue,
        )?))
    }

    fn create_fence(&self, initial_value: u64) -> Result<base::FenceRef> {
        Ok(Arc::new(VulkanFence::new(self.shared.clone(), initial_value)?))
    }

    fn create_semaphore(&self) -> Result<base::SemaphoreRef> {
        Ok(Arc::new(VulkanSemaphore::new(self.shared.clone())?))
    }

    fn create_swap_chain(&self, desc: &base::SwapChainDesc) -> Result<base::SwapChainRef> {
        Ok(Box::new(VulkanSwapChain::new(self.shared.clone(), desc)?))
    }

    fn create_buffer(&self, desc: &base::BufferDesc) -> Result<base::BufferRef> {
        Ok(Arc::new(VulkanBuffer::new(self.shared.clone(), desc)?))
    }

    fn create_buffer_view(&self, desc: &base::BufferViewDesc) -> Result<base::BufferViewRef> {
        Ok(Arc::new(VulkanBufferView::new(desc)?))
    }

    fn create_texture(&self, desc: &base::TextureDesc) -> Result<base::TextureRef> {
        Ok(Arc::new(VulkanImage::new(self.shared.clone(), desc)?))
    }

    fn create_texture_view(&self, desc: &base::TextureViewDesc) -> Result<base::TextureViewRef> {
        Ok(Arc::new(VulkanImageView::new(self.shared.clone(), desc)?))
    }

    fn create_shader(&self, desc: &base::ShaderDesc) -> Result<base::ShaderRef> {
        Ok(Arc::new(VulkanShader::new(self.shared.clone(), desc)?))
    }

    fn create_root_signature(
        &self,
        desc: &base::RootSignatureDesc,
    ) -> Result<base::RootSignatureRef> {
        Ok(Arc::new(VulkanRootSignature::new(
            self.shared.clone(),
            desc,
        )?))
    }

    fn create_graphics_pipeline(
        &self,
        desc: &base::GraphicsPipelineDesc,
    ) -> Result<base::GraphicsPipelineRef> {
        Ok(Arc::new(VulkanGraphicsPipeline::new(
            self.shared.clone(),
            desc,
        )?))
    }

    fn create_descriptor_set(
        &self,
        root_signature: &base::RootSignatureRef,
        set_index: u32,
    ) -> Result<Option<base::DescriptorSetRef>> {
        let concrete: &VulkanRootSignature = root_signature
            .as_any()
            .downcast_ref()
            .expect("foreign root signature passed to vulkan device");
        // Unlike the table-model backend, static-sampler-only sets still
        // need a set object here: immutable samplers live in the layout but
        // the set must be bound.
        Ok(Some(Arc::new(VulkanDescriptorSet::new(
            self.shared.clone(),
            concrete,
            set_index,
        )?)))
    }

    fn create_sampler(&self, desc: &base::SamplerDesc) -> Result<base::SamplerRef> {
        Ok(Arc::new(VulkanSampler::new(self.shared.clone(), desc)?))
    }
}
