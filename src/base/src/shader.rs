//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Shader blobs.
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// The bytecode category of a shader blob. A backend accepts only its
/// matching category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderBlobCategory {
    Dxil,
    Spirv,
    Msl,
}

/// A single shader stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Pixel,
    Compute,
}

impl From<ShaderStage> for crate::ShaderStageFlags {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => crate::ShaderStageFlags::VERTEX,
            ShaderStage::Pixel => crate::ShaderStageFlags::PIXEL,
            ShaderStage::Compute => crate::ShaderStageFlags::COMPUTE,
        }
    }
}

/// Describes a shader: raw bytecode plus its category tag.
#[derive(Clone)]
pub struct ShaderDesc {
    pub source: Vec<u8>,
    pub category: ShaderBlobCategory,
    pub stage: ShaderStage,
    pub entry_point: String,
    pub name: String,
}

impl fmt::Debug for ShaderDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderDesc")
            .field("source", &format_args!("<{} bytes>", self.source.len()))
            .field("category", &self.category)
            .field("stage", &self.stage)
            .field("entry_point", &self.entry_point)
            .field("name", &self.name)
            .finish()
    }
}

/// Trait for shader objects. Immutable.
pub trait Shader: fmt::Debug + Send + Sync + Any {
    fn as_any(&self) -> &dyn Any;

    fn stage(&self) -> ShaderStage;

    fn entry_point(&self) -> &str;
}

/// A boxed handle representing a shader.
pub type ShaderRef = Arc<dyn Shader>;
