//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! CPU-backed resources for the null backend.
use std::any::Any;
use std::cell::UnsafeCell;

use log::error;

use mica_base as base;
use mica_base::Buffer as _;
use mica_base::{Error, ErrorKind, Result};

/// A buffer whose contents live in host memory. Copies between null
/// buffers move real bytes, which is what makes upload/readback round-trip
/// tests observable on this backend.
#[derive(Debug)]
pub struct NullBuffer {
    desc: base::BufferDesc,
    data: UnsafeCell<Vec<u8>>,
}

// The mapped-pointer contract makes concurrent access a caller bug; the
// storage itself never reallocates.
unsafe impl Send for NullBuffer {}
unsafe impl Sync for NullBuffer {}

impl NullBuffer {
    pub(crate) fn new(desc: &base::BufferDesc) -> Result<Self> {
        if desc.size == 0 {
            error!("buffer size must be non-zero");
            return Err(Error::new(ErrorKind::Validation));
        }
        Ok(Self {
            desc: desc.clone(),
            data: UnsafeCell::new(vec![0u8; desc.size as usize]),
        })
    }

    /// Copy bytes between null buffers. Used by command recording.
    pub(crate) fn copy_from(
        &self,
        dst_offset: u64,
        src: &NullBuffer,
        src_offset: u64,
        size: u64,
    ) {
        assert!(src_offset + size <= src.desc.size, "copy source out of range");
        assert!(dst_offset + size <= self.desc.size, "copy target out of range");
        unsafe {
            let src_ptr = (*src.data.get()).as_ptr().add(src_offset as usize);
            let dst_ptr = (*self.data.get()).as_mut_ptr().add(dst_offset as usize);
            std::ptr::copy_nonoverlapping(src_ptr, dst_ptr, size as usize);
        }
    }
}

impl base::Buffer for NullBuffer {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn desc(&self) -> &base::BufferDesc {
        &self.desc
    }

    fn map(&self, offset: u64, size: u64) -> Result<*mut u8> {
        if self.desc.memory == base::MemoryKind::Device {
            error!("cannot map device-local buffer '{}'", self.desc.name);
            return Err(Error::new(ErrorKind::Validation));
        }
        if offset + size > self.desc.size {
            error!(
                "map range {}..{} exceeds buffer size {}",
                offset,
                offset + size,
                self.desc.size
            );
            return Err(Error::new(ErrorKind::Validation));
        }
        unsafe { Ok((*self.data.get()).as_mut_ptr().add(offset as usize)) }
    }

    fn unmap(&self, _offset: u64, _size: u64) {}
}

#[derive(Debug)]
pub struct NullTexture {
    desc: base::TextureDesc,
}

impl NullTexture {
    pub(crate) fn new(desc: &base::TextureDesc) -> Result<Self> {
        if desc.width == 0 || desc.height == 0 {
            error!("texture extent must be non-zero");
            return Err(Error::new(ErrorKind::Validation));
        }
        if desc.format == base::TextureFormat::Unknown {
            error!("texture format must be known");
            return Err(Error::new(ErrorKind::Validation));
        }
        Ok(Self { desc: desc.clone() })
    }
}

impl base::Texture for NullTexture {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn desc(&self) -> &base::TextureDesc {
        &self.desc
    }
}

#[derive(Debug)]
pub struct NullBufferView {
    desc: base::BufferViewDesc,
}

impl NullBufferView {
    pub(crate) fn new(desc: &base::BufferViewDesc) -> Result<Self> {
        let buffer_size = desc.buffer.desc().size;
        if desc.range.offset + desc.range.size > buffer_size {
            error!(
                "buffer view range {}..{} exceeds buffer size {}",
                desc.range.offset,
                desc.range.offset + desc.range.size,
                buffer_size
            );
            return Err(Error::new(ErrorKind::Validation));
        }
        Ok(Self { desc: desc.clone() })
    }
}

impl base::BufferView for NullBufferView {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn desc(&self) -> &base::BufferViewDesc {
        &self.desc
    }
}

#[derive(Debug)]
pub struct NullTextureView {
    desc: base::TextureViewDesc,
}

impl NullTextureView {
    pub(crate) fn new(desc: &base::TextureViewDesc) -> Result<Self> {
        Ok(Self { desc: desc.clone() })
    }
}

impl base::TextureView for NullTextureView {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn desc(&self) -> &base::TextureViewDesc {
        &self.desc
    }
}

#[derive(Debug)]
pub struct NullSampler {
    desc: base::SamplerDesc,
}

impl NullSampler {
    pub(crate) fn new(desc: &base::SamplerDesc) -> Self {
        Self { desc: desc.clone() }
    }
}

impl base::Sampler for NullSampler {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn desc(&self) -> &base::SamplerDesc {
        &self.desc
    }
}

#[derive(Debug)]
pub struct NullShader {
    stage: base::ShaderStage,
    entry_point: String,
}

impl NullShader {
    pub(crate) fn new(desc: &base::ShaderDesc) -> Result<Self> {
        if desc.source.is_empty() {
            error!("shader '{}' has empty bytecode", desc.name);
            return Err(Error::new(ErrorKind::Validation));
        }
        Ok(Self {
            stage: desc.stage,
            entry_point: desc.entry_point.clone(),
        })
    }
}

impl base::Shader for NullShader {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn stage(&self) -> base::ShaderStage {
        self.stage
    }

    fn entry_point(&self) -> &str {
        &self.entry_point
    }
}

#[derive(Debug)]
pub struct NullRootSignature {
    desc: base::RootSignatureDesc,
}

impl NullRootSignature {
    pub(crate) fn new(desc: &base::RootSignatureDesc) -> Result<Self> {
        let cost = desc.dword_cost();
        if cost > base::limits::MAX_ROOT_SIGNATURE_DWORDS {
            error!(
                "root signature costs {} DWORDs, exceeding the budget of {}",
                cost,
                base::limits::MAX_ROOT_SIGNATURE_DWORDS
            );
            return Err(Error::new(ErrorKind::Unsupported));
        }
        Ok(Self { desc: desc.clone() })
    }
}

impl base::RootSignature for NullRootSignature {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn desc(&self) -> &base::RootSignatureDesc {
        &self.desc
    }
}

#[derive(Debug)]
pub struct NullGraphicsPipeline;

impl base::GraphicsPipeline for NullGraphicsPipeline {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One writable element of a null descriptor set.
#[derive(Debug)]
struct SetElement {
    ty: base::ResourceBindType,
    views: parking_lot::Mutex<Vec<Option<base::ResourceViewRef>>>,
}

/// A descriptor set that stores the written views so tests can assert on
/// them indirectly (through bind-bridge behavior).
#[derive(Debug)]
pub struct NullDescriptorSet {
    elements: Vec<SetElement>,
}

impl NullDescriptorSet {
    /// Build from a set layout; static-sampler elements are not writable
    /// and therefore not represented.
    pub(crate) fn new(layout: &base::DescriptorSetLayoutDesc) -> Self {
        let elements = layout
            .elements
            .iter()
            .filter(|e| e.static_samplers.is_empty())
            .map(|e| SetElement {
                ty: e.ty,
                views: parking_lot::Mutex::new(vec![None; e.count as usize]),
            })
            .collect();
        Self { elements }
    }
}

impl base::DescriptorSet for NullDescriptorSet {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn set_resource(
        &self,
        element: u32,
        array_index: u32,
        view: &base::ResourceViewRef,
    ) -> Result<()> {
        let Some(slot) = self.elements.get(element as usize) else {
            error!(
                "descriptor-set element out of range: expected < {}, got {}",
                self.elements.len(),
                element
            );
            return Err(Error::new(ErrorKind::Validation));
        };
        let compatible = match slot.ty {
            base::ResourceBindType::CBuffer
            | base::ResourceBindType::Buffer
            | base::ResourceBindType::RwBuffer => view.as_buffer().is_some(),
            base::ResourceBindType::Texture | base::ResourceBindType::RwTexture => {
                view.as_texture().is_some()
            }
            base::ResourceBindType::Sampler => false,
        };
        if !compatible {
            error!("view type incompatible with binding type {:?}", slot.ty);
            return Err(Error::new(ErrorKind::Validation));
        }
        let mut views = slot.views.lock();
        let len = views.len();
        let Some(cell) = views.get_mut(array_index as usize) else {
            error!(
                "descriptor array index out of range: expected < {}, got {}",
                len, array_index
            );
            return Err(Error::new(ErrorKind::Validation));
        };
        *cell = Some(view.clone());
        Ok(())
    }
}

#[derive(Debug)]
pub struct NullSemaphore;

impl base::Semaphore for NullSemaphore {
    fn as_any(&self) -> &dyn Any {
        self
    }
}
