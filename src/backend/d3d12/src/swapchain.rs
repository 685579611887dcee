//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Implementation of `SwapChain` for D3D12: a DXGI flip-discard swapchain
//! with per-frame fence values pacing the CPU.
use std::any::Any;
use std::sync::Arc;

use log::error;
use raw_window_handle::RawWindowHandle;
use windows::core::Interface;
use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Direct3D12::ID3D12Resource;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;

use mica_base as base;
use mica_base::{CommandQueue as _, Fence as _};
use mica_base::{Error, ErrorKind, Result};

use crate::cmd::queue::D3D12Queue;
use crate::cmd::sync::D3D12Fence;
use crate::device::DeviceRef;
use crate::formats::translate_texture_format;
use crate::resources::D3D12Texture;
use crate::utils::translate_hresult;

pub struct D3D12SwapChain {
    device: DeviceRef,
    desc: base::SwapChainDesc,
    swapchain: IDXGISwapChain3,
    textures: Vec<base::TextureRef>,
    /// Paces the CPU: one fence value per submitted frame.
    frame_fence: D3D12Fence,
    frame_values: Vec<u64>,
    next_value: u64,
    current_index: u32,
    acquired: bool,
}

impl std::fmt::Debug for D3D12SwapChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D3D12SwapChain")
            .field("desc", &self.desc)
            .field("current_index", &self.current_index)
            .finish()
    }
}

impl D3D12SwapChain {
    pub(crate) fn new(device: DeviceRef, desc: &base::SwapChainDesc) -> Result<Self> {
        if desc.back_buffer_count < 2 {
            error!(
                "swapchain needs at least two back buffers, got {}",
                desc.back_buffer_count
            );
            return Err(Error::new(ErrorKind::Validation));
        }
        let RawWindowHandle::Win32(window) = desc.window else {
            error!("this backend presents into Win32 windows only");
            return Err(Error::new(ErrorKind::Unsupported));
        };
        let hwnd = HWND(window.hwnd.get() as isize);

        let Some(format) = translate_texture_format(desc.format) else {
            error!("swapchain format {:?} is not supported", desc.format);
            return Err(Error::new(ErrorKind::Unsupported));
        };
        let queue: &D3D12Queue = desc
            .present_queue
            .as_any()
            .downcast_ref()
            .expect("foreign queue in swapchain descriptor");
        if queue.queue_type() != base::QueueType::Direct {
            error!("swapchain requires a direct queue for presentation");
            return Err(Error::new(ErrorKind::Validation));
        }

        let swapchain_desc = DXGI_SWAP_CHAIN_DESC1 {
            Width: desc.width,
            Height: desc.height,
            Format: format,
            Stereo: false.into(),
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                Quality: 0,
            },
            BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
            BufferCount: desc.back_buffer_count,
            Scaling: DXGI_SCALING_STRETCH,
            SwapEffect: DXGI_SWAP_EFFECT_FLIP_DISCARD,
            AlphaMode: DXGI_ALPHA_MODE_IGNORE,
            Flags: 0,
        };
        let swapchain: IDXGISwapChain1 = unsafe {
            device.dxgi_factory().CreateSwapChainForHwnd(
                queue.raw(),
                hwnd,
                &swapchain_desc,
                None,
                None,
            )
        }
        .map_err(translate_hresult)?;
        let swapchain: IDXGISwapChain3 = swapchain.cast().map_err(translate_hresult)?;

        let frame_fence = D3D12Fence::new(device.clone(), 0)?;
        let mut out = Self {
            device,
            desc: desc.clone(),
            swapchain,
            textures: Vec::new(),
            frame_fence,
            frame_values: vec![0; desc.back_buffer_count as usize],
            next_value: 0,
            current_index: 0,
            acquired: false,
        };
        out.wrap_back_buffers()?;
        Ok(out)
    }

    fn wrap_back_buffers(&mut self) -> Result<()> {
        self.textures.clear();
        for i in 0..self.desc.back_buffer_count {
            let resource: ID3D12Resource =
                unsafe { self.swapchain.GetBuffer(i) }.map_err(translate_hresult)?;
            self.textures.push(Arc::new(D3D12Texture::from_swapchain_buffer(
                self.device.clone(),
                resource,
                base::TextureDesc {
                    dim: base::TextureDimension::Dim2D,
                    width: self.desc.width,
                    height: self.desc.height,
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
            )) as base::TextureRef);
        }
        Ok(())
    }

    fn present_queue(&self) -> &D3D12Queue {
        self.desc
            .present_queue
            .as_any()
            .downcast_ref()
            .expect("foreign queue in swapchain descriptor")
    }
}

impl base::SwapChain for D3D12SwapChain {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn acquire_next(&mut self) -> Result<base::TextureRef> {
        assert!(
            !self.acquired,
            "acquire_next called while a back buffer is outstanding"
        );
        let index = unsafe { self.swapchain.GetCurrentBackBufferIndex() };

        // Block until the frame that last used this back buffer retires.
        let pending = self.frame_values[index as usize];
        if pending != 0 {
            self.frame_fence.wait(pending)?;
        }

        self.current_index = index;
        self.acquired = true;
        Ok(self.textures[index as usize].clone())
    }

    fn present(&mut self) -> Result<()> {
        assert!(self.acquired, "present without a matching acquire_next");
        self.acquired = false;

        let sync_interval = if self.desc.enable_sync { 1 } else { 0 };
        let result = unsafe { self.swapchain.Present(sync_interval, 0) };
        if result.is_err() {
            error!("present failed: {:?}", result);
            return Err(Error::with_detail(
                ErrorKind::DeviceLost,
                format!("{:?}", result),
            ));
        }

        // Mark this back buffer busy until the queue passes this point.
        self.next_value += 1;
        let queue = self.present_queue();
        unsafe {
            queue
                .raw()
                .Signal(self.frame_fence.raw(), self.next_value)
        }
        .map_err(translate_hresult)?;
        self.frame_values[self.current_index as usize] = self.next_value;
        Ok(())
    }

    fn current_back_buffer(&self) -> Result<base::TextureRef> {
        if !self.acquired {
            error!("no back buffer is acquired");
            return Err(Error::new(ErrorKind::Validation));
        }
        Ok(self.textures[self.current_index as usize].clone())
    }

    fn current_back_buffer_index(&self) -> u32 {
        self.current_index
    }

    fn back_buffer_count(&self) -> u32 {
        self.desc.back_buffer_count
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.present_queue().wait_idle()?;
        // All back-buffer references must be gone before ResizeBuffers.
        self.textures.clear();
        let format = translate_texture_format(self.desc.format)
            .expect("validated at creation");
        unsafe {
            self.swapchain
                .ResizeBuffers(self.desc.back_buffer_count, width, height, format, 0)
                .map_err(translate_hresult)?;
        }
        self.desc.width = width;
        self.desc.height = height;
        self.frame_values.iter_mut().for_each(|v| *v = 0);
        self.next_value = 0;
        self.current_index = 0;
        self.acquired = false;
        self.wrap_back_buffers()
    }

    fn desc(&self) -> &base::SwapChainDesc {
        &self.desc
    }
}

impl Drop for D3D12SwapChain {
    fn drop(&mut self) {
        let _ = self.present_queue().wait_idle();
    }
}
