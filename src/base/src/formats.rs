//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Texture, vertex, and index format vocabulary.

/// Texture element formats.
///
/// The names follow the `<channels><bits>_<interpretation>` convention of
/// the table-model API; each backend translates to its native equivalent
/// and reports `Unsupported` for combinations its hardware cannot realize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    #[default]
    Unknown,

    R8Sint,
    R8Uint,
    R8Snorm,
    R8Unorm,

    R16Sint,
    R16Uint,
    R16Snorm,
    R16Unorm,
    R16Float,

    Rg8Sint,
    Rg8Uint,
    Rg8Snorm,
    Rg8Unorm,

    R32Sint,
    R32Uint,
    R32Float,

    Rg16Sint,
    Rg16Uint,
    Rg16Snorm,
    Rg16Unorm,
    Rg16Float,

    Rgba8Sint,
    Rgba8Uint,
    Rgba8Snorm,
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,

    Rgb10a2Uint,
    Rgb10a2Unorm,
    Rg11b10Float,

    Rg32Sint,
    Rg32Uint,
    Rg32Float,

    Rgba16Sint,
    Rgba16Uint,
    Rgba16Snorm,
    Rgba16Unorm,
    Rgba16Float,

    Rgba32Sint,
    Rgba32Uint,
    Rgba32Float,

    S8,
    D16Unorm,
    D32Float,
    D24UnormS8Uint,
    D32FloatS8Uint,
}

impl TextureFormat {
    pub fn has_depth(&self) -> bool {
        matches!(
            *self,
            TextureFormat::D16Unorm
                | TextureFormat::D32Float
                | TextureFormat::D24UnormS8Uint
                | TextureFormat::D32FloatS8Uint
        )
    }

    pub fn has_stencil(&self) -> bool {
        matches!(
            *self,
            TextureFormat::S8 | TextureFormat::D24UnormS8Uint | TextureFormat::D32FloatS8Uint
        )
    }

    pub fn is_depth_stencil(&self) -> bool {
        self.has_depth() || self.has_stencil()
    }

    /// Bytes per texel, or `None` for `Unknown`.
    pub fn size_in_bytes(&self) -> Option<u32> {
        use TextureFormat::*;
        Some(match *self {
            Unknown => return None,
            R8Sint | R8Uint | R8Snorm | R8Unorm | S8 => 1,
            R16Sint | R16Uint | R16Snorm | R16Unorm | R16Float | Rg8Sint | Rg8Uint | Rg8Snorm
            | Rg8Unorm | D16Unorm => 2,
            R32Sint | R32Uint | R32Float | Rg16Sint | Rg16Uint | Rg16Snorm | Rg16Unorm
            | Rg16Float | Rgba8Sint | Rgba8Uint | Rgba8Snorm | Rgba8Unorm | Rgba8UnormSrgb
            | Bgra8Unorm | Bgra8UnormSrgb | Rgb10a2Uint | Rgb10a2Unorm | Rg11b10Float
            | D32Float | D24UnormS8Uint => 4,
            Rg32Sint | Rg32Uint | Rg32Float | Rgba16Sint | Rgba16Uint | Rgba16Snorm
            | Rgba16Unorm | Rgba16Float | D32FloatS8Uint => 8,
            Rgba32Sint | Rgba32Uint | Rgba32Float => 16,
        })
    }
}

/// Vertex attribute formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VertexFormat {
    #[default]
    Unknown,

    Uint8x2,
    Uint8x4,
    Sint8x2,
    Sint8x4,
    Unorm8x2,
    Unorm8x4,
    Snorm8x2,
    Snorm8x4,
    Uint16x2,
    Uint16x4,
    Sint16x2,
    Sint16x4,
    Unorm16x2,
    Unorm16x4,
    Snorm16x2,
    Snorm16x4,
    Float16x2,
    Float16x4,
    Uint32,
    Uint32x2,
    Uint32x3,
    Uint32x4,
    Sint32,
    Sint32x2,
    Sint32x3,
    Sint32x4,
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
}

impl VertexFormat {
    /// Byte size of one attribute of this format.
    pub fn size_in_bytes(&self) -> Option<u32> {
        use VertexFormat::*;
        Some(match *self {
            Unknown => return None,
            Uint8x2 | Sint8x2 | Unorm8x2 | Snorm8x2 => 2,
            Uint8x4 | Sint8x4 | Unorm8x4 | Snorm8x4 | Uint16x2 | Sint16x2 | Unorm16x2
            | Snorm16x2 | Float16x2 | Uint32 | Sint32 | Float32 => 4,
            Uint16x4 | Sint16x4 | Unorm16x4 | Snorm16x4 | Float16x4 | Uint32x2 | Sint32x2
            | Float32x2 => 8,
            Uint32x3 | Sint32x3 | Float32x3 => 12,
            Uint32x4 | Sint32x4 | Float32x4 => 16,
        })
    }
}

/// Index buffer element formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

impl IndexFormat {
    pub fn size_in_bytes(&self) -> u32 {
        match *self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_stencil_classification() {
        assert!(TextureFormat::D32Float.has_depth());
        assert!(!TextureFormat::D32Float.has_stencil());
        assert!(TextureFormat::D24UnormS8Uint.has_depth());
        assert!(TextureFormat::D24UnormS8Uint.has_stencil());
        assert!(TextureFormat::S8.has_stencil());
        assert!(!TextureFormat::S8.has_depth());
        assert!(!TextureFormat::Rgba8Unorm.is_depth_stencil());
    }
}
