//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Sampler objects.
use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Texture coordinate addressing outside `[0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    #[default]
    ClampToEdge,
    Repeat,
    Mirror,
}

/// Texel filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

/// Specifies a predicate on two numeric values used during various kinds of
/// tests (depth test, sampler compare).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Describes a sampler. Immutable after creation.
///
/// Equality and hashing are decidable by value (float fields compare by
/// bit pattern) so static samplers can be deduplicated.
#[derive(Debug, Clone)]
pub struct SamplerDesc {
    pub address_s: AddressMode,
    pub address_t: AddressMode,
    pub address_r: AddressMode,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub mipmap_filter: FilterMode,
    pub lod_min: f32,
    pub lod_max: f32,
    pub compare: Option<CompareFunction>,
    /// Maximum anisotropy; zero disables anisotropic filtering.
    pub anisotropy_clamp: u32,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            address_s: AddressMode::ClampToEdge,
            address_t: AddressMode::ClampToEdge,
            address_r: AddressMode::ClampToEdge,
            min_filter: FilterMode::Linear,
            mag_filter: FilterMode::Linear,
            mipmap_filter: FilterMode::Linear,
            lod_min: 0.0,
            lod_max: f32::MAX,
            compare: None,
            anisotropy_clamp: 0,
        }
    }
}

impl PartialEq for SamplerDesc {
    fn eq(&self, other: &Self) -> bool {
        self.address_s == other.address_s
            && self.address_t == other.address_t
            && self.address_r == other.address_r
            && self.min_filter == other.min_filter
            && self.mag_filter == other.mag_filter
            && self.mipmap_filter == other.mipmap_filter
            && self.lod_min.to_bits() == other.lod_min.to_bits()
            && self.lod_max.to_bits() == other.lod_max.to_bits()
            && self.compare == other.compare
            && self.anisotropy_clamp == other.anisotropy_clamp
    }
}

impl Eq for SamplerDesc {}

impl Hash for SamplerDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address_s.hash(state);
        self.address_t.hash(state);
        self.address_r.hash(state);
        self.min_filter.hash(state);
        self.mag_filter.hash(state);
        self.mipmap_filter.hash(state);
        self.lod_min.to_bits().hash(state);
        self.lod_max.to_bits().hash(state);
        self.compare.hash(state);
        self.anisotropy_clamp.hash(state);
    }
}

/// Trait for sampler objects.
pub trait Sampler: fmt::Debug + Send + Sync + Any {
    fn as_any(&self) -> &dyn Any;

    fn desc(&self) -> &SamplerDesc;
}

/// A boxed handle representing a sampler.
pub type SamplerRef = Arc<dyn Sampler>;
