//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! A swapchain that cycles indices without presenting anywhere.
use std::any::Any;
use std::sync::Arc;

use log::error;

use mica_base as base;
use mica_base::CommandQueue as _;
use mica_base::{Error, ErrorKind, Result};

use crate::resources::NullTexture;

#[derive(Debug)]
pub struct NullSwapChain {
    desc: base::SwapChainDesc,
    textures: Vec<base::TextureRef>,
    current: u32,
    acquired: bool,
    /// Total acquires since creation or the last resize.
    frame_counter: u64,
}

fn make_back_buffers(desc: &base::SwapChainDesc) -> Result<Vec<base::TextureRef>> {
    (0..desc.back_buffer_count)
        .map(|i| {
            let texture = NullTexture::new(&base::TextureDesc {
                dim: base::TextureDimension::Dim2D,
                width: desc.width,
                height: desc.height,
                depth_or_array_size: 1,
                mip_levels: 1,
                sample_count: 1,
                format: desc.format,
                usage: base::TextureUsage::RENDER_TARGET
                    | base::TextureUsage::PRESENT
                    | base::TextureUsage::COPY_SRC,
                hints: Default::default(),
                name: format!("backbuffer-{}", i),
            })?;
            Ok(Arc::new(texture) as base::TextureRef)
        })
        .collect()
}

impl NullSwapChain {
    pub(crate) fn new(desc: &base::SwapChainDesc) -> Result<Self> {
        if desc.back_buffer_count < 2 {
            error!(
                "swapchain needs at least two back buffers, got {}",
                desc.back_buffer_count
            );
            return Err(Error::new(ErrorKind::Validation));
        }
        if desc.format.is_depth_stencil() || desc.format == base::TextureFormat::Unknown {
            error!("swapchain format {:?} is not presentable", desc.format);
            return Err(Error::new(ErrorKind::Unsupported));
        }
        if desc.present_queue.queue_type() != base::QueueType::Direct {
            error!("swapchain requires a direct queue for presentation");
            return Err(Error::new(ErrorKind::Validation));
        }
        Ok(Self {
            textures: make_back_buffers(desc)?,
            desc: desc.clone(),
            current: 0,
            acquired: false,
            frame_counter: 0,
        })
    }
}

impl base::SwapChain for NullSwapChain {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn acquire_next(&mut self) -> Result<base::TextureRef> {
        assert!(
            !self.acquired,
            "acquire_next called while a back buffer is outstanding"
        );
        self.current = (self.frame_counter % self.desc.back_buffer_count as u64) as u32;
        self.frame_counter += 1;
        self.acquired = true;
        Ok(self.textures[self.current as usize].clone())
    }

    fn present(&mut self) -> Result<()> {
        assert!(self.acquired, "present without a matching acquire_next");
        self.acquired = false;
        Ok(())
    }

    fn current_back_buffer(&self) -> Result<base::TextureRef> {
        if !self.acquired {
            error!("no back buffer is acquired");
            return Err(Error::new(ErrorKind::Validation));
        }
        Ok(self.textures[self.current as usize].clone())
    }

    fn current_back_buffer_index(&self) -> u32 {
        self.current
    }

    fn back_buffer_count(&self) -> u32 {
        self.desc.back_buffer_count
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        // A lost acquired image is abandoned, matching a native recreate.
        self.desc.width = width;
        self.desc.height = height;
        self.textures = make_back_buffers(&self.desc)?;
        self.current = 0;
        self.acquired = false;
        self.frame_counter = 0;
        Ok(())
    }

    fn desc(&self) -> &base::SwapChainDesc {
        &self.desc
    }
}
