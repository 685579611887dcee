//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Implementation of `RootSignature` and `DescriptorSet` for Vulkan.
//!
//! A root signature lowers onto a `VkPipelineLayout`: the interface's
//! descriptor-set layouts map 1-to-1 onto `VkDescriptorSetLayout`s, the
//! optional root constant becomes the push-constant range, and root
//! descriptors become dynamic-offset buffer descriptors in a synthetic
//! first set owned by the root signature. When that synthetic set exists,
//! every declared set index shifts up by one native set number.
use std::any::Any;

use ash::vk;
use log::error;
use parking_lot::Mutex;

use mica_base as base;
use mica_base::{BufferView as _, TextureView as _};
use mica_base::{Error, ErrorKind, Result};

use crate::arg::pool::PoolAllocation;
use crate::device::DeviceRef;
use crate::sampler::create_raw_sampler;
use crate::utils::{translate_bind_type, translate_generic_error, translate_shader_stage_flags};

/// Descriptor capacity reserved for a bindless (count 0) binding.
pub const BINDLESS_ARRAY_CAPACITY: u32 = 1024;

/// One writable element of a set layout: its binding slot and descriptor
/// type, indexed in declaration order with static samplers filtered out.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ElementInfo {
    pub slot: u32,
    pub ty: vk::DescriptorType,
}

#[derive(Debug)]
pub struct VulkanRootSignature {
    device: DeviceRef,
    desc: base::RootSignatureDesc,
    /// Declared set layouts, 1:1 with `desc.descriptor_sets`.
    set_layouts: Vec<vk::DescriptorSetLayout>,
    /// The synthetic set 0 layout, present when root descriptors exist.
    root_set_layout: Option<vk::DescriptorSetLayout>,
    /// The synthetic set instance, allocated once per root signature.
    root_set: Mutex<Option<PoolAllocation>>,
    /// Per-slot descriptor types of the synthetic set.
    root_descriptor_types: Vec<vk::DescriptorType>,
    vk_layout: vk::PipelineLayout,
    /// Immutable samplers kept alive for the layout's lifetime.
    static_samplers: Vec<vk::Sampler>,
    /// Writable-element maps per declared set.
    element_maps: Vec<Vec<ElementInfo>>,
    push_constant_stages: vk::ShaderStageFlags,
}

impl VulkanRootSignature {
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

        let raw = device.raw();
        let mut static_samplers = Vec::new();
        let mut set_layouts = Vec::with_capacity(desc.descriptor_sets.len());
        let mut element_maps = Vec::with_capacity(desc.descriptor_sets.len());

        // Cleanup helper for partially constructed layouts.
        let destroy_all = |layouts: &[vk::DescriptorSetLayout], samplers: &[vk::Sampler]| unsafe {
            for &layout in layouts {
                raw.destroy_descriptor_set_layout(layout, None);
            }
            for &sampler in samplers {
                raw.destroy_sampler(sampler, None);
            }
        };

        for set in &desc.descriptor_sets {
            // Immutable-sampler arrays must outlive the create call.
            let mut sampler_storage: Vec<Vec<vk::Sampler>> = Vec::new();
            let mut flags = Vec::with_capacity(set.elements.len());
            let mut bindings = Vec::with_capacity(set.elements.len());
            let mut elements = Vec::new();

            for element in &set.elements {
                let stage_flags = translate_shader_stage_flags(element.stages);
                let bindless = element.count == 0;
                let ty = translate_bind_type(element.ty, false);

                if !element.static_samplers.is_empty() {
                    if element.ty != base::ResourceBindType::Sampler {
                        error!("static samplers are only legal on sampler elements");
                        destroy_all(&set_layouts, &static_samplers);
                        return Err(Error::new(ErrorKind::Validation));
                    }
                    let mut samplers = Vec::with_capacity(element.static_samplers.len());
                    for sampler_desc in &element.static_samplers {
                        match create_raw_sampler(&device, sampler_desc) {
                            Ok(sampler) => {
                                samplers.push(sampler);
                                static_samplers.push(sampler);
                            }
                            Err(err) => {
                                destroy_all(&set_layouts, &static_samplers);
                                return Err(err);
                            }
                        }
                    }
                    sampler_storage.push(samplers);
                    flags.push(vk::DescriptorBindingFlags::empty());
                    bindings.push((element.slot, ty, 0u32, stage_flags, true));
                    continue;
                }

                let count = if bindless {
                    BINDLESS_ARRAY_CAPACITY
                } else {
                    element.count
                };
                flags.push(if bindless {
                    vk::DescriptorBindingFlags::PARTIALLY_BOUND
                } else {
                    vk::DescriptorBindingFlags::empty()
                });
                bindings.push((element.slot, ty, count, stage_flags, false));
                elements.push(ElementInfo {
                    slot: element.slot,
                    ty,
                });
            }

            // Materialize the actual binding structs now that the sampler
            // arrays have stable addresses.
            let mut sampler_iter = sampler_storage.iter();
            let vk_bindings: Vec<vk::DescriptorSetLayoutBinding<'_>> = bindings
                .iter()
                .map(|&(slot, ty, count, stage_flags, is_static)| {
                    let binding = vk::DescriptorSetLayoutBinding::default()
                        .binding(slot)
                        .descriptor_type(ty)
                        .stage_flags(stage_flags);
                    if is_static {
                        let samplers = sampler_iter.next().expect("sampler storage exhausted");
                        binding.immutable_samplers(samplers)
                    } else {
                        binding.descriptor_count(count)
                    }
                })
                .collect();

            let mut flags_info =
                vk::DescriptorSetLayoutBindingFlagsCreateInfo::default().binding_flags(&flags);
            let info = vk::DescriptorSetLayoutCreateInfo::default()
                .bindings(&vk_bindings)
                .push_next(&mut flags_info);

            match unsafe { raw.create_descriptor_set_layout(&info, None) } {
                Ok(layout) => {
                    set_layouts.push(layout);
                    element_maps.push(elements);
                }
                Err(result) => {
                    destroy_all(&set_layouts, &static_samplers);
                    return Err(translate_generic_error(result));
                }
            }
        }

        // The synthetic first set realizing root descriptors.
        let root_descriptor_types: Vec<vk::DescriptorType> = desc
            .root_descriptors
            .iter()
            .map(|rd| translate_bind_type(rd.ty, true))
            .collect();
        let root_set_layout = if root_descriptor_types.is_empty() {
            None
        } else {
            let bindings: Vec<vk::DescriptorSetLayoutBinding<'_>> = desc
                .root_descriptors
                .iter()
                .enumerate()
                .map(|(i, rd)| {
                    vk::DescriptorSetLayoutBinding::default()
                        .binding(i as u32)
                        .descriptor_type(root_descriptor_types[i])
                        .descriptor_count(1)
                        .stage_flags(translate_shader_stage_flags(rd.stages))
                })
                .collect();
            let info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
            match unsafe { raw.create_descriptor_set_layout(&info, None) } {
                Ok(layout) => Some(layout),
                Err(result) => {
                    destroy_all(&set_layouts, &static_samplers);
                    return Err(translate_generic_error(result));
                }
            }
        };

        let mut all_layouts = Vec::with_capacity(set_layouts.len() + 1);
        if let Some(layout) = root_set_layout {
            all_layouts.push(layout);
        }
        all_layouts.extend_from_slice(&set_layouts);

        let push_constant_stages = desc
            .constant
            .as_ref()
            .map(|c| translate_shader_stage_flags(c.stages))
            .unwrap_or(vk::ShaderStageFlags::empty());
        let push_ranges: Vec<vk::PushConstantRange> = desc
            .constant
            .as_ref()
            .map(|c| {
                vec![vk::PushConstantRange {
                    stage_flags: push_constant_stages,
                    offset: 0,
                    size: c.size,
                }]
            })
            .unwrap_or_default();

        let layout_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&all_layouts)
            .push_constant_ranges(&push_ranges);
        let vk_layout = match unsafe { raw.create_pipeline_layout(&layout_info, None) } {
            Ok(layout) => layout,
            Err(result) => {
                if let Some(layout) = root_set_layout {
                    unsafe { raw.destroy_descriptor_set_layout(layout, None) };
                }
                destroy_all(&set_layouts, &static_samplers);
                return Err(translate_generic_error(result));
            }
        };

        // Allocate the synthetic set once; it lives as long as the root
        // signature does.
        let root_set = match root_set_layout {
            Some(layout) => Some(unsafe {
                device
                    .descriptor_pools()
                    .lock()
                    .allocate(device.raw(), layout)?
            }),
            None => None,
        };

        Ok(Self {
            device,
            desc: desc.clone(),
            set_layouts,
            root_set_layout,
            root_set: Mutex::new(root_set),
            root_descriptor_types,
            vk_layout,
            static_samplers,
            element_maps,
            push_constant_stages,
        })
    }

    pub fn vk_pipeline_layout(&self) -> vk::PipelineLayout {
        self.vk_layout
    }

    /// `1` when the synthetic root-descriptor set occupies native set 0.
    pub fn set_offset(&self) -> u32 {
        if self.root_set_layout.is_some() {
            1
        } else {
            0
        }
    }

    pub(crate) fn push_constant_stages(&self) -> vk::ShaderStageFlags {
        self.push_constant_stages
    }

    pub(crate) fn root_set(&self) -> Option<vk::DescriptorSet> {
        self.root_set.lock().as_ref().map(|a| a.set)
    }

    pub(crate) fn root_descriptor_types(&self) -> &[vk::DescriptorType] {
        &self.root_descriptor_types
    }

    pub(crate) fn declared_set_layout(&self, index: usize) -> Option<vk::DescriptorSetLayout> {
        self.set_layouts.get(index).copied()
    }

    pub(crate) fn element_map(&self, index: usize) -> Option<&[ElementInfo]> {
        self.element_maps.get(index).map(|v| v.as_slice())
    }
}

impl Drop for VulkanRootSignature {
    fn drop(&mut self) {
        let raw = self.device.raw();
        unsafe {
            if let Some(allocation) = self.root_set.lock().take() {
                self.device.descriptor_pools().lock().free(raw, allocation);
            }
            raw.destroy_pipeline_layout(self.vk_layout, None);
            if let Some(layout) = self.root_set_layout {
                raw.destroy_descriptor_set_layout(layout, None);
            }
            for &layout in &self.set_layouts {
                raw.destroy_descriptor_set_layout(layout, None);
            }
            for &sampler in &self.static_samplers {
                raw.destroy_sampler(sampler, None);
            }
        }
    }
}

impl base::RootSignature for VulkanRootSignature {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn desc(&self) -> &base::RootSignatureDesc {
        &self.desc
    }
}

/// Implementation of `DescriptorSet` for Vulkan: a pool-allocated
/// `VkDescriptorSet` plus the writable-element map of its layout.
#[derive(Debug)]
pub struct VulkanDescriptorSet {
    device: DeviceRef,
    allocation: Mutex<Option<PoolAllocation>>,
    vk_set: vk::DescriptorSet,
    elements: Vec<ElementInfo>,
}

impl VulkanDescriptorSet {
    pub(crate) fn new(
        device: DeviceRef,
        root_signature: &VulkanRootSignature,
        set_index: u32,
    ) -> Result<Self> {
        let Some(layout) = root_signature.declared_set_layout(set_index as usize) else {
            error!(
                "descriptor set index out of range: expected < {}, got {}",
                root_signature.desc.descriptor_sets.len(),
                set_index
            );
            return Err(Error::new(ErrorKind::Validation));
        };
        let elements = root_signature
            .element_map(set_index as usize)
            .expect("layout without an element map")
            .to_vec();

        let allocation = unsafe {
            device
                .descriptor_pools()
                .lock()
                .allocate(device.raw(), layout)?
        };
        Ok(Self {
            device,
            vk_set: allocation.set,
            allocation: Mutex::new(Some(allocation)),
            elements,
        })
    }

    pub fn vk_descriptor_set(&self) -> vk::DescriptorSet {
        self.vk_set
    }
}

impl Drop for VulkanDescriptorSet {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.lock().take() {
            unsafe {
                self.device
                    .descriptor_pools()
                    .lock()
                    .free(self.device.raw(), allocation);
            }
        }
    }
}

impl base::DescriptorSet for VulkanDescriptorSet {
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

        let write = vk::WriteDescriptorSet::default()
            .dst_set(self.vk_set)
            .dst_binding(info.slot)
            .dst_array_element(array_index)
            .descriptor_type(info.ty);

        match (info.ty, view) {
            (
                vk::DescriptorType::UNIFORM_BUFFER | vk::DescriptorType::STORAGE_BUFFER,
                base::ResourceViewRef::Buffer(buffer_view),
            ) => {
                let view: &crate::buffer::VulkanBufferView = buffer_view
                    .as_any()
                    .downcast_ref()
                    .expect("foreign buffer view");
                let range = base::BufferView::desc(&**buffer_view).range;
                let buffer_info = [vk::DescriptorBufferInfo {
                    buffer: view.vk_buffer(),
                    offset: range.offset,
                    range: range.size,
                }];
                unsafe {
                    self.device
                        .raw()
                        .update_descriptor_sets(&[write.buffer_info(&buffer_info)], &[]);
                }
                Ok(())
            }
            (
                vk::DescriptorType::SAMPLED_IMAGE | vk::DescriptorType::STORAGE_IMAGE,
                base::ResourceViewRef::Texture(texture_view),
            ) => {
                let view: &crate::image::VulkanImageView = texture_view
                    .as_any()
                    .downcast_ref()
                    .expect("foreign texture view");
                let layout = if info.ty == vk::DescriptorType::STORAGE_IMAGE {
                    vk::ImageLayout::GENERAL
                } else {
                    vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
                };
                let image_info = [vk::DescriptorImageInfo {
                    sampler: vk::Sampler::null(),
                    image_view: view.vk_image_view(),
                    image_layout: layout,
                }];
                unsafe {
                    self.device
                        .raw()
                        .update_descriptor_sets(&[write.image_info(&image_info)], &[]);
                }
                Ok(())
            }
            _ => {
                error!(
                    "resource view does not match descriptor type {:?}",
                    info.ty
                );
                Err(Error::new(ErrorKind::Validation))
            }
        }
    }
}
