//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Implementation of `Device` for D3D12.
use std::any::Any;
use std::sync::Arc;

use log::{error, info, warn};
use windows::core::Interface;
use windows::Win32::Graphics::Direct3D::D3D_FEATURE_LEVEL_12_0;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::*;

use mica_base as base;
use mica_base::{CommandQueue as _, RootSignature as _};
use mica_base::{Error, ErrorKind, Result};

use crate::cmd::queue::D3D12Queue;
use crate::cmd::{D3D12CommandBuffer, D3D12Fence, D3D12Semaphore};
use crate::descriptor::{CpuDescriptorAllocator, GpuDescriptorAllocator};
use crate::pipeline::D3D12GraphicsPipeline;
use crate::resources::{
    D3D12Buffer, D3D12BufferView, D3D12Sampler, D3D12Shader, D3D12Texture, D3D12TextureView,
};
use crate::rootsig::{D3D12DescriptorSet, D3D12RootSignature};
use crate::swapchain::D3D12SwapChain;
use crate::utils::translate_hresult;
use crate::{
    CPU_DESCRIPTOR_KEEP_FREE_PAGES, CPU_DESCRIPTOR_PAGE_SIZE, GPU_RESOURCE_HEAP_SIZE,
    GPU_SAMPLER_HEAP_SIZE,
};

/// Device-level configuration.
#[derive(Debug, Clone, Default)]
pub struct D3D12DeviceDesc {
    pub adapter_index: Option<u32>,
    pub enable_debug_layer: bool,
    pub enable_gpu_based_validation: bool,
}

/// Shared device state every child object holds a reference to.
pub(crate) struct DeviceShared {
    raw: ID3D12Device,
    dxgi_factory: IDXGIFactory4,
    #[allow(dead_code)]
    adapter: IDXGIAdapter1,
    cpu_resource_heap: CpuDescriptorAllocator,
    cpu_rtv_heap: CpuDescriptorAllocator,
    cpu_dsv_heap: CpuDescriptorAllocator,
    cpu_sampler_heap: CpuDescriptorAllocator,
    gpu_resource_heap: GpuDescriptorAllocator,
    gpu_sampler_heap: GpuDescriptorAllocator,
}

pub(crate) type DeviceRef = Arc<DeviceShared>;

unsafe impl Send for DeviceShared {}
unsafe impl Sync for DeviceShared {}

impl DeviceShared {
    pub(crate) fn raw(&self) -> &ID3D12Device {
        &self.raw
    }

    pub(crate) fn dxgi_factory(&self) -> &IDXGIFactory4 {
        &self.dxgi_factory
    }

    pub(crate) fn cpu_resource_heap(&self) -> &CpuDescriptorAllocator {
        &self.cpu_resource_heap
    }

    pub(crate) fn cpu_rtv_heap(&self) -> &CpuDescriptorAllocator {
        &self.cpu_rtv_heap
    }

    pub(crate) fn cpu_dsv_heap(&self) -> &CpuDescriptorAllocator {
        &self.cpu_dsv_heap
    }

    pub(crate) fn cpu_sampler_heap(&self) -> &CpuDescriptorAllocator {
        &self.cpu_sampler_heap
    }

    pub(crate) fn gpu_resource_heap(&self) -> &GpuDescriptorAllocator {
        &self.gpu_resource_heap
    }

    pub(crate) fn gpu_sampler_heap(&self) -> &GpuDescriptorAllocator {
        &self.gpu_sampler_heap
    }
}

impl std::fmt::Debug for DeviceShared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceShared").finish()
    }
}

/// Implementation of `Device` for D3D12.
#[derive(Debug)]
pub struct D3D12Device {
    shared: DeviceRef,
    direct_queue: base::CommandQueueRef,
    compute_queue: base::CommandQueueRef,
    copy_queue: base::CommandQueueRef,
}

impl D3D12Device {
    /// Enable the debug layer if requested, pick an adapter, and open the
    /// device with one queue of each type.
    pub fn new(desc: &D3D12DeviceDesc) -> Result<base::DeviceRef> {
        if desc.enable_debug_layer {
            let mut debug: Option<ID3D12Debug> = None;
            match unsafe { D3D12GetDebugInterface(&mut debug) } {
                Ok(()) => {
                    let debug = debug.expect("debug interface without an object");
                    unsafe { debug.EnableDebugLayer() };
                    if desc.enable_gpu_based_validation {
                        match debug.cast::<ID3D12Debug1>() {
                            Ok(debug1) => unsafe {
                                debug1.SetEnableGPUBasedValidation(true);
                            },
                            Err(_) => warn!("GPU-based validation is unavailable"),
                        }
                    }
                }
                Err(err) => warn!("debug layer requested but unavailable: {}", err),
            }
        }

        let factory_flags = if desc.enable_debug_layer {
            DXGI_CREATE_FACTORY_DEBUG
        } else {
            0
        };
        let dxgi_factory: IDXGIFactory4 =
            unsafe { CreateDXGIFactory2(factory_flags) }.map_err(translate_hresult)?;

        // Adapter selection: an explicit index wins; otherwise the first
        // adapter that can open a 12.0 device.
        let mut selected: Option<(IDXGIAdapter1, ID3D12Device)> = None;
        for index in 0.. {
            let adapter = match unsafe { dxgi_factory.EnumAdapters1(index) } {
                Ok(adapter) => adapter,
                Err(_) => break,
            };
            if let Some(wanted) = desc.adapter_index {
                if index != wanted {
                    continue;
                }
            }
            let mut device: Option<ID3D12Device> = None;
            if unsafe { D3D12CreateDevice(&adapter, D3D_FEATURE_LEVEL_12_0, &mut device) }.is_ok()
            {
                let device = device.expect("D3D12CreateDevice returned no device");
                let adapter_desc = unsafe { adapter.GetDesc1() }.unwrap_or_default();
                info!(
                    "selected adapter: {}",
                    String::from_utf16_lossy(
                        &adapter_desc.Description
                            [..adapter_desc
                                .Description
                                .iter()
                                .position(|&c| c == 0)
                                .unwrap_or(adapter_desc.Description.len())]
                    )
                );
                selected = Some((adapter, device));
                break;
            }
            if desc.adapter_index.is_some() {
                break;
            }
        }
        let Some((adapter, raw)) = selected else {
            error!("no adapter supports feature level 12.0");
            return Err(Error::new(ErrorKind::Unsupported));
        };

        let cpu_resource_heap = CpuDescriptorAllocator::new(
            raw.clone(),
            D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV,
            CPU_DESCRIPTOR_PAGE_SIZE,
            CPU_DESCRIPTOR_KEEP_FREE_PAGES,
        );
        let cpu_rtv_heap = CpuDescriptorAllocator::new(
            raw.clone(),
            D3D12_DESCRIPTOR_HEAP_TYPE_RTV,
            CPU_DESCRIPTOR_PAGE_SIZE,
            CPU_DESCRIPTOR_KEEP_FREE_PAGES,
        );
        let cpu_dsv_heap = CpuDescriptorAllocator::new(
            raw.clone(),
            D3D12_DESCRIPTOR_HEAP_TYPE_DSV,
            CPU_DESCRIPTOR_PAGE_SIZE,
            CPU_DESCRIPTOR_KEEP_FREE_PAGES,
        );
        let cpu_sampler_heap = CpuDescriptorAllocator::new(
            raw.clone(),
            D3D12_DESCRIPTOR_HEAP_TYPE_SAMPLER,
            CPU_DESCRIPTOR_PAGE_SIZE,
            CPU_DESCRIPTOR_KEEP_FREE_PAGES,
        );
        let gpu_resource_heap = GpuDescriptorAllocator::new(
            &raw,
            D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV,
            GPU_RESOURCE_HEAP_SIZE,
        )?;
        let gpu_sampler_heap = GpuDescriptorAllocator::new(
            &raw,
            D3D12_DESCRIPTOR_HEAP_TYPE_SAMPLER,
            GPU_SAMPLER_HEAP_SIZE,
        )?;

        let shared = Arc::new(DeviceShared {
            raw,
            dxgi_factory,
            adapter,
            cpu_resource_heap,
            cpu_rtv_heap,
            cpu_dsv_heap,
            cpu_sampler_heap,
            gpu_resource_heap,
            gpu_sampler_heap,
        });

        let direct_queue: base::CommandQueueRef =
            Arc::new(D3D12Queue::new(shared.clone(), base::QueueType::Direct)?);
        let compute_queue: base::CommandQueueRef =
            Arc::new(D3D12Queue::new(shared.clone(), base::QueueType::Compute)?);
        let copy_queue: base::CommandQueueRef =
            Arc::new(D3D12Queue::new(shared.clone(), base::QueueType::Copy)?);

        Ok(Arc::new(Self {
            shared,
            direct_queue,
            compute_queue,
            copy_queue,
        }))
    }
}

impl base::Device for D3D12Device {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn backend(&self) -> base::Backend {
        base::Backend::D3D12
    }

    fn detail(&self) -> base::DeviceDetail {
        base::DeviceDetail {
            cbuffer_alignment: D3D12_CONSTANT_BUFFER_DATA_PLACEMENT_ALIGNMENT,
            upload_texture_alignment: D3D12_TEXTURE_DATA_PLACEMENT_ALIGNMENT,
            upload_texture_row_alignment: D3D12_TEXTURE_DATA_PITCH_ALIGNMENT,
            map_alignment: 1,
        }
    }

    fn command_queue(&self, ty: base::QueueType, slot: u32) -> Option<base::CommandQueueRef> {
        if slot != 0 {
            return None;
        }
        Some(match ty {
            base::QueueType::Direct => self.direct_queue.clone(),
            base::QueueType::Compute => self.compute_queue.clone(),
            base::QueueType::Copy => self.copy_queue.clone(),
        })
    }

    fn create_command_buffer(
        &self,
        queue: &base::CommandQueueRef,
    ) -> Result<base::CommandBufferRef> {
        let queue: &D3D12Queue = queue
            .as_any()
            .downcast_ref()
            .expect("foreign queue passed to d3d12 device");
        Ok(Box::new(D3D12CommandBuffer::new(self.shared.clone(), queue)?))
    }

    fn create_fence(&self, initial_value: u64) -> Result<base::FenceRef> {
        Ok(Arc::new(D3D12Fence::new(self.shared.clone(), initial_value)?))
    }

    fn create_semaphore(&self) -> Result<base::SemaphoreRef> {
        Ok(Arc::new(D3D12Semaphore::new(self.shared.clone())?))
    }

    fn create_swap_chain(&self, desc: &base::SwapChainDesc) -> Result<base::SwapChainRef> {
        Ok(Box::new(D3D12SwapChain::new(self.shared.clone(), desc)?))
    }

    fn create_buffer(&self, desc: &base::BufferDesc) -> Result<base::BufferRef> {
        Ok(Arc::new(D3D12Buffer::new(self.shared.clone(), desc)?))
    }

    fn create_buffer_view(&self, desc: &base::BufferViewDesc) -> Result<base::BufferViewRef> {
        Ok(Arc::new(D3D12BufferView::new(self.shared.clone(), desc)?))
    }

    fn create_texture(&self, desc: &base::TextureDesc) -> Result<base::TextureRef> {
        Ok(Arc::new(D3D12Texture::new(self.shared.clone(), desc)?))
    }

    fn create_texture_view(&self, desc: &base::TextureViewDesc) -> Result<base::TextureViewRef> {
        Ok(Arc::new(D3D12TextureView::new(self.shared.clone(), desc)?))
    }

    fn create_shader(&self, desc: &base::ShaderDesc) -> Result<base::ShaderRef> {
        Ok(Arc::new(D3D12Shader::new(desc)?))
    }

    fn create_root_signature(
        &self,
        desc: &base::RootSignatureDesc,
    ) -> Result<base::RootSignatureRef> {
        Ok(Arc::new(D3D12RootSignature::new(self.shared.clone(), desc)?))
    }

    fn create_graphics_pipeline(
        &self,
        desc: &base::GraphicsPipelineDesc,
    ) -> Result<base::GraphicsPipelineRef> {
        Ok(Arc::new(D3D12GraphicsPipeline::new(
            self.shared.clone(),
            desc,
        )?))
    }

    fn create_descriptor_set(
        &self,
        root_signature: &base::RootSignatureRef,
        set_index: u32,
    ) -> Result<Option<base::DescriptorSetRef>> {
        let concrete: &D3D12RootSignature = root_signature
            .as_any()
            .downcast_ref()
            .expect("foreign root signature passed to d3d12 device");
        Ok(D3D12DescriptorSet::new(self.shared.clone(), concrete, set_index)?
            .map(|set| Arc::new(set) as base::DescriptorSetRef))
    }

    fn create_sampler(&self, desc: &base::SamplerDesc) -> Result<base::SamplerRef> {
        Ok(Arc::new(D3D12Sampler::new(self.shared.clone(), desc)?))
    }
}
