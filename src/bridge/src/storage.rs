//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! CPU-side structured storage for constant buffers.
//!
//! The bridge keeps the bytes of every constant buffer on the CPU, shaped
//! like the shader-side struct: a tree of named types with offsets, element
//! sizes, and array strides. Materials mutate members through
//! [`StructuredView`]s addressed by name and path; once per frame the
//! bridge copies whole buffers into the upload arena.
use std::collections::HashMap;

/// Identifies a type node within one storage instance.
pub type StructTypeId = usize;

/// Identifies a root (one constant buffer) within one storage instance.
pub type StructRootId = usize;

#[derive(Debug, Clone)]
struct TypeNode {
    #[allow(dead_code)]
    name: String,
    /// Byte size of a single element of this type.
    size: u32,
    members: Vec<MemberNode>,
}

#[derive(Debug, Clone)]
struct MemberNode {
    name: String,
    type_id: StructTypeId,
    offset: u32,
    /// Array element count; `0` = not an array.
    elements: u32,
}

#[derive(Debug, Clone)]
struct RootNode {
    name: String,
    type_id: StructTypeId,
    /// Array element count; `0` = not an array.
    elements: u32,
    /// Byte offset of this root's storage in the arena.
    offset: usize,
    /// Byte size of one element.
    element_size: usize,
}

/// Incrementally describes the storage shape while reflection is walked.
#[derive(Debug, Clone, Default)]
pub struct StructuredBufferBuilder {
    types: Vec<TypeNode>,
    roots: Vec<(String, StructTypeId, u32)>,
    alignment: u32,
}

impl StructuredBufferBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-root alignment; `0` packs roots tightly.
    pub fn set_alignment(&mut self, alignment: u32) {
        self.alignment = alignment;
    }

    /// Register a type node and return its id.
    pub fn add_type(&mut self, name: &str, size: u32) -> StructTypeId {
        self.types.push(TypeNode {
            name: name.to_owned(),
            size,
            members: Vec::new(),
        });
        self.types.len() - 1
    }

    /// Attach a member to a previously added struct type.
    pub fn add_member(
        &mut self,
        parent: StructTypeId,
        child: StructTypeId,
        name: &str,
        offset: u32,
        elements: u32,
    ) {
        self.types[parent].members.push(MemberNode {
            name: name.to_owned(),
            type_id: child,
            offset,
            elements,
        });
    }

    /// Register a root: one constant buffer (or push-constant block).
    pub fn add_root(&mut self, name: &str, type_id: StructTypeId, elements: u32) {
        self.roots.push((name.to_owned(), type_id, elements));
    }

    /// Lay out the arena and produce the storage.
    pub fn build(&self) -> StructuredBufferStorage {
        let align = self.alignment.max(1) as usize;
        let mut offset = 0usize;
        let mut roots = Vec::with_capacity(self.roots.len());
        let mut name_to_root = HashMap::new();

        for (name, type_id, elements) in &self.roots {
            let element_size = self.types[*type_id].size as usize;
            let total = element_size * (*elements).max(1) as usize;
            offset = mica_common::align_up_usize(offset, align);
            name_to_root.entry(name.clone()).or_insert(roots.len());
            roots.push(RootNode {
                name: name.clone(),
                type_id: *type_id,
                elements: *elements,
                offset,
                element_size,
            });
            offset += total;
        }

        StructuredBufferStorage {
            types: self.types.clone(),
            roots,
            name_to_root,
            data: vec![0u8; offset],
        }
    }
}

/// The storage proper: the type tree plus one byte arena holding every
/// root back to back.
#[derive(Debug, Clone, Default)]
pub struct StructuredBufferStorage {
    types: Vec<TypeNode>,
    roots: Vec<RootNode>,
    name_to_root: HashMap<String, StructRootId>,
    data: Vec<u8>,
}

impl StructuredBufferStorage {
    pub fn root_id(&self, name: &str) -> Option<StructRootId> {
        self.name_to_root.get(name).copied()
    }

    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// The array element count of a root (`0` = not an array).
    pub fn root_elements(&self, root: StructRootId) -> u32 {
        self.roots[root].elements
    }

    pub fn root_name(&self, root: StructRootId) -> &str {
        &self.roots[root].name
    }

    /// The bytes of one array element of a root.
    pub fn span(&self, root: StructRootId, array_index: u32) -> &[u8] {
        let node = &self.roots[root];
        if node.elements != 0 && array_index >= node.elements {
            return &[];
        }
        let start = node.offset + node.element_size * array_index as usize;
        &self.data[start..start + node.element_size]
    }

    /// A mutable view over one root.
    pub fn view_mut(&mut self, root: StructRootId) -> StructuredView<'_> {
        let node = self.roots[root].clone();
        StructuredView {
            offset: node.offset,
            size: node.element_size * node.elements.max(1) as usize,
            element_size: node.element_size,
            elements: node.elements,
            type_id: node.type_id,
            storage: self,
        }
    }

    /// A mutable view over one root, by name.
    pub fn view_by_name(&mut self, name: &str) -> Option<StructuredView<'_>> {
        let root = self.root_id(name)?;
        Some(self.view_mut(root))
    }
}

/// A mutable window into the storage, covering one (sub-)object.
///
/// Navigation never copies: `field` and `element` narrow the window,
/// `write` mutates the underlying bytes in place.
#[derive(Debug)]
pub struct StructuredView<'a> {
    storage: &'a mut StructuredBufferStorage,
    offset: usize,
    size: usize,
    element_size: usize,
    /// `0` = the viewed object is not an array.
    elements: u32,
    type_id: StructTypeId,
}

impl<'a> StructuredView<'a> {
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn elements(&self) -> u32 {
        self.elements
    }

    /// Narrow to the named member of the viewed struct.
    pub fn field(self, name: &str) -> Option<StructuredView<'a>> {
        let member = self.storage.types[self.type_id]
            .members
            .iter()
            .find(|m| m.name == name)?
            .clone();
        let size = self.storage.types[member.type_id].size as usize;
        Some(StructuredView {
            offset: self.offset + member.offset as usize,
            size: size * member.elements.max(1) as usize,
            element_size: size,
            elements: member.elements,
            type_id: member.type_id,
            storage: self.storage,
        })
    }

    /// Narrow to one element of the viewed array.
    pub fn element(self, index: u32) -> Option<StructuredView<'a>> {
        if self.elements == 0 || index >= self.elements {
            return None;
        }
        Some(StructuredView {
            offset: self.offset + self.element_size * index as usize,
            size: self.element_size,
            element_size: self.element_size,
            elements: 0,
            type_id: self.type_id,
            storage: self.storage,
        })
    }

    /// Overwrite the viewed bytes from the start of the window.
    ///
    /// Returns `false` (and writes nothing) if `bytes` is longer than the
    /// window.
    pub fn write(&mut self, bytes: &[u8]) -> bool {
        if bytes.len() > self.size {
            return false;
        }
        self.storage.data[self.offset..self.offset + bytes.len()].copy_from_slice(bytes);
        true
    }

    /// `field(name)` + `write(bytes)` in one call, without consuming the
    /// parent view.
    pub fn set_field(&mut self, name: &str, bytes: &[u8]) -> bool {
        let member = match self.storage.types[self.type_id]
            .members
            .iter()
            .find(|m| m.name == name)
        {
            Some(m) => m.clone(),
            None => return false,
        };
        let size = self.storage.types[member.type_id].size as usize;
        let span = size * member.elements.max(1) as usize;
        if bytes.len() > span {
            return false;
        }
        let start = self.offset + member.offset as usize;
        self.storage.data[start..start + bytes.len()].copy_from_slice(bytes);
        true
    }

    /// The viewed bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.storage.data[self.offset..self.offset + self.size]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mat4_bytes(diag: f32) -> Vec<u8> {
        let mut out = Vec::with_capacity(64);
        for row in 0..4 {
            for col in 0..4 {
                let v = if row == col { diag } else { 0.0f32 };
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        out
    }

    /// model, mvp, modelInv: three mat4s, 192 bytes.
    fn per_object_storage() -> StructuredBufferStorage {
        let mut builder = StructuredBufferBuilder::new();
        let root_ty = builder.add_type("PerObjectData", 192);
        let mat_ty = builder.add_type("float4x4", 64);
        builder.add_member(root_ty, mat_ty, "model", 0, 0);
        builder.add_member(root_ty, mat_ty, "mvp", 64, 0);
        builder.add_member(root_ty, mat_ty, "modelInv", 128, 0);
        builder.add_root("PerObject", root_ty, 0);
        builder.build()
    }

    #[test]
    fn field_writes_land_at_member_offsets() {
        let mut storage = per_object_storage();
        let identity = mat4_bytes(1.0);

        let mut view = storage.view_by_name("PerObject").unwrap();
        assert!(view.set_field("mvp", &identity));

        let span = storage.span(storage.root_id("PerObject").unwrap(), 0);
        assert_eq!(span.len(), 192);
        assert_eq!(&span[64..128], &identity[..]);
        assert!(span[..64].iter().all(|&b| b == 0));
        assert!(span[128..].iter().all(|&b| b == 0));
    }

    #[test]
    fn round_trips_bitwise() {
        let mut storage = per_object_storage();
        let m = mat4_bytes(2.5);
        let mut view = storage.view_by_name("PerObject").unwrap();
        assert!(view.set_field("modelInv", &m));
        let root = storage.root_id("PerObject").unwrap();
        assert_eq!(&storage.span(root, 0)[128..192], &m[..]);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let mut storage = per_object_storage();
        let mut view = storage.view_by_name("PerObject").unwrap();
        assert!(!view.set_field("missing", &[0u8; 4]));
        assert!(storage.view_by_name("NotARoot").is_none());
    }

    #[test]
    fn array_roots_stride_by_element_size() {
        let mut builder = StructuredBufferBuilder::new();
        let vec_ty = builder.add_type("float4", 16);
        builder.add_root("Lights", vec_ty, 4);
        let mut storage = builder.build();

        let root = storage.root_id("Lights").unwrap();
        let payload = [7u8; 16];
        {
            let view = storage.view_mut(root);
            let mut third = view.element(2).unwrap();
            assert!(third.write(&payload));
        }
        assert_eq!(storage.span(root, 2), &payload[..]);
        assert!(storage.span(root, 0).iter().all(|&b| b == 0));
        assert!(storage.span(root, 4).is_empty());
    }

    #[test]
    fn nested_struct_paths_resolve() {
        let mut builder = StructuredBufferBuilder::new();
        let outer = builder.add_type("Scene", 96);
        let inner = builder.add_type("Fog", 32);
        let scalar = builder.add_type("float", 4);
        builder.add_member(outer, inner, "fog", 64, 0);
        builder.add_member(inner, scalar, "density", 16, 0);
        builder.add_root("Scene", outer, 0);
        let mut storage = builder.build();

        let view = storage.view_by_name("Scene").unwrap();
        let mut density = view.field("fog").unwrap().field("density").unwrap();
        assert!(density.write(&1.5f32.to_le_bytes()));

        let root = storage.root_id("Scene").unwrap();
        assert_eq!(&storage.span(root, 0)[80..84], &1.5f32.to_le_bytes());
    }

    #[test]
    fn roots_are_aligned_when_requested() {
        let mut builder = StructuredBufferBuilder::new();
        builder.set_alignment(256);
        let small = builder.add_type("float", 4);
        builder.add_root("A", small, 0);
        builder.add_root("B", small, 0);
        let mut storage = builder.build();

        let b = storage.root_id("B").unwrap();
        {
            let mut view = storage.view_mut(b);
            assert!(view.write(&3.0f32.to_le_bytes()));
        }
        let a = storage.root_id("A").unwrap();
        assert!(storage.span(a, 0).iter().all(|&x| x == 0));
        assert_eq!(storage.span(b, 0), &3.0f32.to_le_bytes());
    }
}
