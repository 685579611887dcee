//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! The runtime half of the bind bridge.
//!
//! A [`BindBridge`] is built once per material from a compiled
//! [`BridgeLayout`]: it owns the root signature, one descriptor set per
//! populated set index, and the CPU bytes of every constant buffer. Per
//! frame the caller mutates constants through [`BindBridge::cbuffer_mut`],
//! points bindings at views through [`BindBridge::set_resource`], calls
//! [`BindBridge::upload`] once, and finally [`BindBridge::bind`] on the
//! draw encoder.
use std::collections::BTreeMap;

use log::error;

use mica_base::{
    BufferRange, BufferViewDesc, BufferViewRef, CommandEncoder, DescriptorSetRef, DeviceRef,
    DeviceSize, Error, ErrorKind, ResourceBindType, ResourceViewRef, Result, RootSignatureRef,
    TextureFormat,
};
use mica_base::{DescriptorSet as _, Device as _};
use mica_common::align_up;

use crate::arena::CBufferArena;
use crate::layout::{BindingEntry, BindingId, BridgeLayout};
use crate::storage::{StructRootId, StructuredBufferStorage, StructuredView};

#[derive(Debug)]
enum RuntimeBinding {
    PushConst {
        size: u32,
        cbuffer: Option<StructRootId>,
    },
    RootDescriptor {
        root_index: u32,
        ty: ResourceBindType,
        cbuffer: Option<StructRootId>,
    },
    DescriptorSet {
        set_index: u32,
        /// Element index after static-sampler filtering.
        element_index: u32,
        bind_count: u32,
        ty: ResourceBindType,
        cbuffer: Option<StructRootId>,
    },
}

#[derive(Debug)]
struct DescSetBinding {
    ty: ResourceBindType,
    views: Vec<Option<ResourceViewRef>>,
}

#[derive(Debug, Default)]
struct DescSetRecord {
    set: Option<DescriptorSetRef>,
    bindings: Vec<DescSetBinding>,
}

/// See the module documentation.
pub struct BindBridge {
    device: DeviceRef,
    root_signature: RootSignatureRef,
    storage: StructuredBufferStorage,
    bindings: Vec<RuntimeBinding>,
    name_to_id: BTreeMap<String, BindingId>,
    /// Indexed by root-descriptor slot.
    root_desc_views: Vec<Option<BufferViewRef>>,
    /// Indexed by set index.
    desc_sets: Vec<DescSetRecord>,
}

impl BindBridge {
    /// Build the runtime from a compiled layout: creates the root
    /// signature, allocates a descriptor set for every set that has
    /// regular (non-static-sampler, non-bindless) bindings or static
    /// samplers, and lays out the CPU constant storage.
    pub fn new(device: &DeviceRef, layout: &BridgeLayout) -> Result<Self> {
        let storage = layout.storage_builder().build();
        let root_signature = device.create_root_signature(&layout.root_signature_desc())?;

        // Regular bindings per set, in element order; static samplers are
        // filtered out here, which is what makes the remap below necessary.
        let mut set_regular: BTreeMap<u32, Vec<&crate::layout::DescriptorSetEntry>> =
            BTreeMap::new();
        let mut sets_with_static_samplers: Vec<u32> = Vec::new();
        let mut max_set_index = None;
        let mut max_root_index = None;

        for entry in layout.bindings() {
            match entry {
                BindingEntry::RootDescriptor(e) => {
                    max_root_index = Some(max_root_index.map_or(e.root_index, |m: u32| {
                        m.max(e.root_index)
                    }));
                }
                BindingEntry::DescriptorSet(e) => {
                    max_set_index =
                        Some(max_set_index.map_or(e.set_index, |m: u32| m.max(e.set_index)));
                    if e.is_static_sampler {
                        sets_with_static_samplers.push(e.set_index);
                    } else if e.bind_count != 0 {
                        set_regular.entry(e.set_index).or_default().push(e);
                    }
                }
                BindingEntry::PushConst(_) => {}
            }
        }

        let mut desc_sets: Vec<DescSetRecord> = Vec::new();
        desc_sets.resize_with(max_set_index.map_or(0, |m| m as usize + 1), Default::default);
        let root_desc_views = vec![None; max_root_index.map_or(0, |m| m as usize + 1)];

        // (set, declared element index) -> filtered element index.
        let mut element_remap: BTreeMap<(u32, u32), u32> = BTreeMap::new();
        for (&set_index, entries) in set_regular.iter_mut() {
            entries.sort_by_key(|e| e.element_index);
            let record = &mut desc_sets[set_index as usize];
            for (filtered, entry) in entries.iter().enumerate() {
                element_remap.insert((set_index, entry.element_index), filtered as u32);
                record.bindings.push(DescSetBinding {
                    ty: entry.ty,
                    views: vec![None; entry.bind_count as usize],
                });
            }
        }

        let mut bindings = Vec::with_capacity(layout.bindings().len());
        for entry in layout.bindings() {
            bindings.push(match entry {
                BindingEntry::PushConst(e) => RuntimeBinding::PushConst {
                    size: e.size,
                    cbuffer: storage.root_id(&e.name),
                },
                BindingEntry::RootDescriptor(e) => RuntimeBinding::RootDescriptor {
                    root_index: e.root_index,
                    ty: e.ty,
                    cbuffer: if e.ty == ResourceBindType::CBuffer {
                        storage.root_id(&e.name)
                    } else {
                        None
                    },
                },
                BindingEntry::DescriptorSet(e) => RuntimeBinding::DescriptorSet {
                    set_index: e.set_index,
                    element_index: element_remap
                        .get(&(e.set_index, e.element_index))
                        .copied()
                        .unwrap_or(e.element_index),
                    bind_count: e.bind_count,
                    ty: e.ty,
                    cbuffer: if e.ty == ResourceBindType::CBuffer {
                        storage.root_id(&e.name)
                    } else {
                        None
                    },
                },
            });
        }

        for (set_index, record) in desc_sets.iter_mut().enumerate() {
            let set_index = set_index as u32;
            let has_regular = !record.bindings.is_empty();
            let has_static = sets_with_static_samplers.contains(&set_index);
            // Pure bindless sets (and gaps) get no set object here; bindless
            // arrays are bound by the caller directly.
            if !has_regular && !has_static {
                continue;
            }
            record.set = device.create_descriptor_set(&root_signature, set_index)?;
        }

        Ok(Self {
            device: device.clone(),
            root_signature,
            storage,
            bindings,
            name_to_id: layout.name_index().clone(),
            root_desc_views,
            desc_sets,
        })
    }

    pub fn root_signature(&self) -> &RootSignatureRef {
        &self.root_signature
    }

    pub fn binding_id(&self, name: &str) -> Option<BindingId> {
        self.name_to_id.get(name).copied()
    }

    /// Point a descriptor-set binding at a resource view. The write is
    /// cached; no backend call happens until [`bind`](Self::bind).
    ///
    /// Attempts on push-constant, root-descriptor, sampler, or
    /// static-sampler bindings fail with a logged error and no state
    /// change, as do out-of-range ids/indices and type mismatches.
    pub fn set_resource(
        &mut self,
        id: BindingId,
        view: &ResourceViewRef,
        array_index: u32,
    ) -> Result<()> {
        let Some(binding) = self.bindings.get(id as usize) else {
            error!(
                "binding id out of range: expected < {}, got {}",
                self.bindings.len(),
                id
            );
            return Err(Error::new(ErrorKind::Validation));
        };
        let (set_index, element_index, bind_count, ty) = match *binding {
            RuntimeBinding::PushConst { .. } => {
                error!("cannot set a resource on a push constant");
                return Err(Error::new(ErrorKind::Validation));
            }
            RuntimeBinding::RootDescriptor { .. } => {
                error!("cannot set a resource on a root descriptor");
                return Err(Error::new(ErrorKind::Validation));
            }
            RuntimeBinding::DescriptorSet {
                set_index,
                element_index,
                bind_count,
                ty,
                ..
            } => (set_index, element_index, bind_count, ty),
        };
        if ty == ResourceBindType::Sampler {
            error!("cannot set a resource on a sampler binding");
            return Err(Error::new(ErrorKind::Validation));
        }
        if bind_count == 0 {
            error!("cannot set a resource on a bindless binding");
            return Err(Error::new(ErrorKind::Validation));
        }
        if array_index >= bind_count {
            error!(
                "array index out of range: expected < {}, got {}",
                bind_count, array_index
            );
            return Err(Error::new(ErrorKind::Validation));
        }
        let compatible = match ty {
            ResourceBindType::CBuffer | ResourceBindType::Buffer | ResourceBindType::RwBuffer => {
                matches!(view, ResourceViewRef::Buffer(_))
            }
            ResourceBindType::Texture | ResourceBindType::RwTexture => {
                matches!(view, ResourceViewRef::Texture(_))
            }
            ResourceBindType::Sampler => false,
        };
        if !compatible {
            error!("resource view type does not match binding type {:?}", ty);
            return Err(Error::new(ErrorKind::Validation));
        }

        let record = &mut self.desc_sets[set_index as usize];
        let slot = &mut record.bindings[element_index as usize].views[array_index as usize];
        *slot = Some(view.clone());
        Ok(())
    }

    /// `set_resource` by reflected name.
    pub fn set_resource_by_name(
        &mut self,
        name: &str,
        view: &ResourceViewRef,
        array_index: u32,
    ) -> Result<()> {
        let Some(id) = self.binding_id(name) else {
            error!("cannot find binding name: {}", name);
            return Err(Error::new(ErrorKind::Validation));
        };
        self.set_resource(id, view, array_index)
    }

    /// A mutable typed view over the constant buffer behind a binding, or
    /// `None` when the binding has no CPU storage.
    pub fn cbuffer_mut(&mut self, id: BindingId) -> Option<StructuredView<'_>> {
        let root = self.binding_cbuffer(id)?;
        Some(self.storage.view_mut(root))
    }

    /// [`cbuffer_mut`](Self::cbuffer_mut) by reflected name.
    pub fn cbuffer_by_name(&mut self, name: &str) -> Option<StructuredView<'_>> {
        let id = self.binding_id(name)?;
        self.cbuffer_mut(id)
    }

    /// The raw bytes of the constant buffer behind a binding.
    pub fn cbuffer_bytes(&self, id: BindingId, array_index: u32) -> Option<&[u8]> {
        let root = self.binding_cbuffer(id)?;
        Some(self.storage.span(root, array_index))
    }

    fn binding_cbuffer(&self, id: BindingId) -> Option<StructRootId> {
        match self.bindings.get(id as usize)? {
            RuntimeBinding::PushConst { cbuffer, .. }
            | RuntimeBinding::RootDescriptor { cbuffer, .. }
            | RuntimeBinding::DescriptorSet { cbuffer, .. } => *cbuffer,
        }
    }

    /// Copy every root-descriptor and descriptor-set constant buffer into
    /// the arena, aligned to the device's constant-buffer alignment, and
    /// register the resulting buffer views with their bindings. Run once
    /// per frame per material, before [`bind`](Self::bind).
    ///
    /// Push-constant bytes are not uploaded: they flow straight from CPU
    /// storage at bind time.
    pub fn upload(&mut self, arena: &mut CBufferArena) -> Result<()> {
        let alignment = self.device.detail().cbuffer_alignment.max(1) as DeviceSize;

        for id in 0..self.bindings.len() {
            match self.bindings[id] {
                RuntimeBinding::RootDescriptor {
                    root_index,
                    ty: ResourceBindType::CBuffer,
                    cbuffer: Some(root),
                } => {
                    let span = self.storage.span(root, 0);
                    if span.is_empty() {
                        continue;
                    }
                    let upload_size = align_up(span.len() as DeviceSize, alignment);
                    let alloc = arena.allocate(upload_size, alignment)?;
                    alloc.write(span);
                    let view = self.device.create_buffer_view(&BufferViewDesc {
                        buffer: alloc.buffer.clone(),
                        range: BufferRange {
                            offset: alloc.offset,
                            size: upload_size,
                        },
                        stride: 0,
                        format: TextureFormat::Unknown,
                        usage: mica_base::BufferUsage::CBUFFER,
                    })?;
                    self.root_desc_views[root_index as usize] = Some(view);
                }
                RuntimeBinding::DescriptorSet {
                    set_index,
                    element_index,
                    bind_count,
                    ty: ResourceBindType::CBuffer,
                    cbuffer: Some(root),
                } => {
                    let elements = self.storage.root_elements(root);
                    for array_index in 0..bind_count {
                        if elements == 0 && array_index > 0 {
                            break;
                        }
                        let span = self.storage.span(root, array_index);
                        if span.is_empty() {
                            continue;
                        }
                        let upload_size = align_up(span.len() as DeviceSize, alignment);
                        let alloc = arena.allocate(upload_size, alignment)?;
                        alloc.write(span);
                        let view = self.device.create_buffer_view(&BufferViewDesc {
                            buffer: alloc.buffer.clone(),
                            range: BufferRange {
                                offset: alloc.offset,
                                size: upload_size,
                            },
                            stride: 0,
                            format: TextureFormat::Unknown,
                            usage: mica_base::BufferUsage::CBUFFER,
                        })?;
                        let record = &mut self.desc_sets[set_index as usize];
                        record.bindings[element_index as usize].views[array_index as usize] =
                            Some(ResourceViewRef::Buffer(view));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Issue the bind calls on `encoder`, in binding order: the push
    /// constant (at most one), each populated root descriptor, then each
    /// populated descriptor set. Cached view writes are flushed into the
    /// sets first; sampler elements are skipped (they are immutable static
    /// samplers on backends that fold them into the root signature).
    pub fn bind(&self, encoder: &mut dyn CommandEncoder) -> Result<()> {
        for binding in &self.bindings {
            if let RuntimeBinding::PushConst {
                size,
                cbuffer: Some(root),
            } = binding
            {
                if *size == 0 {
                    break;
                }
                let span = self.storage.span(*root, 0);
                let len = span.len().min(*size as usize);
                if len > 0 {
                    encoder.push_constants(&span[..len]);
                }
                break;
            }
        }

        for (slot, view) in self.root_desc_views.iter().enumerate() {
            if let Some(view) = view {
                encoder.bind_root_descriptor(slot as u32, view);
            }
        }

        for (set_index, record) in self.desc_sets.iter().enumerate() {
            let Some(set) = &record.set else {
                continue;
            };
            for (element, binding) in record.bindings.iter().enumerate() {
                if binding.ty == ResourceBindType::Sampler {
                    continue;
                }
                for (array_index, view) in binding.views.iter().enumerate() {
                    if let Some(view) = view {
                        set.set_resource(element as u32, array_index as u32, view)?;
                    }
                }
            }
            encoder.bind_descriptor_set(set_index as u32, set);
        }
        Ok(())
    }

    /// Drop all cached view references and owned constant-buffer views.
    /// The CPU constant storage is preserved.
    pub fn clear(&mut self) {
        for view in &mut self.root_desc_views {
            *view = None;
        }
        for record in &mut self.desc_sets {
            for binding in &mut record.bindings {
                for view in &mut binding.views {
                    *view = None;
                }
            }
        }
    }
}

impl std::fmt::Debug for BindBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindBridge")
            .field("bindings", &self.bindings.len())
            .field("root_descriptors", &self.root_desc_views.len())
            .field("descriptor_sets", &self.desc_sets.len())
            .finish()
    }
}
