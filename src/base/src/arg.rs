//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Root signatures and descriptor sets.
//!
//! The unified model: a root signature is an ordered list of root
//! parameters — at most one push-constant range, zero or more root
//! descriptors (a resource view bound directly, 2 DWORDs each), and zero or
//! more descriptor-set layouts (1 DWORD each) — plus static samplers
//! embedded in set elements. The table-model backend serializes this into a
//! native root signature; the set-model backend lowers it onto a pipeline
//! layout whose set layouts correspond 1-to-1 with the descriptor-set
//! layouts declared here.
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::resources::ResourceViewRef;
use crate::sampler::SamplerDesc;
use crate::ShaderStageFlags;

/// The resource class a binding accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceBindType {
    /// Constant buffer view.
    CBuffer,
    /// Read-only buffer (SRV / storage buffer read).
    Buffer,
    /// Read-only texture (SRV / sampled image).
    Texture,
    Sampler,
    /// Read-write buffer (UAV / storage buffer).
    RwBuffer,
    /// Read-write texture (UAV / storage image).
    RwTexture,
}

/// The single root-constant range of a root signature.
///
/// `size` is in bytes and must not exceed
/// [`MAX_PUSH_CONSTANT_BYTES`](crate::limits::MAX_PUSH_CONSTANT_BYTES).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootConstantDesc {
    pub slot: u32,
    pub space: u32,
    pub size: u32,
    pub stages: ShaderStageFlags,
}

/// A root descriptor: a buffer view embedded directly in the root signature,
/// bypassing any table. Costs 2 DWORDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootDescriptorDesc {
    pub slot: u32,
    pub space: u32,
    pub ty: ResourceBindType,
    pub stages: ShaderStageFlags,
}

/// One element of a descriptor-set layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorSetElement {
    pub slot: u32,
    pub space: u32,
    pub ty: ResourceBindType,
    /// Number of descriptors; `0` marks a bindless (unbounded) array, which
    /// must be the sole element of its set.
    pub count: u32,
    pub stages: ShaderStageFlags,
    /// For sampler elements resolved at root-signature build time: one
    /// descriptor per array index. Non-empty marks the element immutable.
    pub static_samplers: Vec<SamplerDesc>,
}

/// An ordered list of elements making up one descriptor set.
///
/// Within one set, slots are unique per resource class.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescriptorSetLayoutDesc {
    pub elements: Vec<DescriptorSetElement>,
}

/// Describes a root signature.
#[derive(Debug, Clone, Default)]
pub struct RootSignatureDesc {
    pub constant: Option<RootConstantDesc>,
    pub root_descriptors: Vec<RootDescriptorDesc>,
    /// Descriptor-set layouts in declaration order; the index into this list
    /// is the `set_index` used by `create_descriptor_set` and
    /// `bind_descriptor_set`.
    pub descriptor_sets: Vec<DescriptorSetLayoutDesc>,
}

impl RootSignatureDesc {
    /// The DWORD cost of this signature against the 64-DWORD budget:
    /// push constants cost their size in DWORDs, root descriptors 2 each,
    /// tables 1 each.
    pub fn dword_cost(&self) -> u32 {
        let constant = self
            .constant
            .as_ref()
            .map_or(0, |c| (c.size + 3) / 4);
        constant + self.root_descriptors.len() as u32 * 2 + self.descriptor_sets.len() as u32
    }
}

/// Trait for root signature objects. Immutable; referenced by pipelines,
/// descriptor sets, and encoders.
pub trait RootSignature: fmt::Debug + Send + Sync + Any {
    fn as_any(&self) -> &dyn Any;

    fn desc(&self) -> &RootSignatureDesc;
}

/// A boxed handle representing a root signature.
pub type RootSignatureRef = Arc<dyn RootSignature>;

/// Trait for descriptor-set objects.
///
/// A descriptor set is allocated from a device for one `set_index` of a root
/// signature and holds one resource-view reference per (element, array
/// index).
///
/// # Valid Usage
///
///  - One thread writes a given set at a time; different sets may be
///    written concurrently.
///  - The view's creation use must be compatible with the element's
///    [`ResourceBindType`].
pub trait DescriptorSet: fmt::Debug + Send + Sync + Any {
    fn as_any(&self) -> &dyn Any;

    /// Write `view` into `element` at `array_index`.
    fn set_resource(&self, element: u32, array_index: u32, view: &ResourceViewRef) -> Result<()>;
}

/// A boxed handle representing a descriptor set.
pub type DescriptorSetRef = Arc<dyn DescriptorSet>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dword_cost_sums_parameters() {
        let desc = RootSignatureDesc {
            constant: Some(RootConstantDesc {
                slot: 0,
                space: 0,
                size: 192,
                stages: ShaderStageFlags::graphics(),
            }),
            root_descriptors: vec![RootDescriptorDesc {
                slot: 1,
                space: 0,
                ty: ResourceBindType::CBuffer,
                stages: ShaderStageFlags::graphics(),
            }],
            descriptor_sets: vec![DescriptorSetLayoutDesc::default(); 3],
        };
        assert_eq!(desc.dword_cost(), 48 + 2 + 3);
    }
}
