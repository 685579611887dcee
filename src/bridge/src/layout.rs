//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! The layout compiler: shader reflection in, an ordered binding plan out.
//!
//! The HLSL path runs the table-model cost minimization: it promotes the
//! best constant buffer to a root constant and single-element buffers to
//! root descriptors, buckets the rest into per-(kind, space) tables, and
//! demotes promotions until the plan fits the 64-DWORD budget. The SPIR-V
//! path keeps the shader's own (set, binding) grouping and never invents
//! promotions; the caller is responsible for keeping push constants small.
use std::collections::BTreeMap;

use log::{error, warn};

use mica_base::limits::{MAX_PUSH_CONSTANT_BYTES, MAX_ROOT_SIGNATURE_DWORDS};
use mica_base::{
    DescriptorSetElement, DescriptorSetLayoutDesc, Error, ErrorKind, ResourceBindType,
    Result, RootConstantDesc, RootDescriptorDesc, RootSignatureDesc, SamplerDesc,
    ShaderStageFlags,
};

use crate::reflection::{HlslInputType, HlslShaderDesc, SpirvShaderDesc};
use crate::storage::{StructTypeId, StructuredBufferBuilder};

/// Binding id within one layout; also the index into the entry list.
pub type BindingId = u32;

/// A static-sampler override applied by name during the layout build.
#[derive(Debug, Clone)]
pub struct StaticSamplerOverride {
    /// The reflected name of the sampler binding to replace.
    pub name: String,
    /// One descriptor per array index of the binding.
    pub samplers: Vec<SamplerDesc>,
}

/// The root-constant slice of the plan.
#[derive(Debug, Clone)]
pub struct PushConstEntry {
    pub name: String,
    pub id: BindingId,
    pub slot: u32,
    pub space: u32,
    pub stages: ShaderStageFlags,
    /// Size in bytes.
    pub size: u32,
}

/// A binding promoted to a root descriptor.
#[derive(Debug, Clone)]
pub struct RootDescriptorEntry {
    pub name: String,
    pub id: BindingId,
    pub ty: ResourceBindType,
    pub slot: u32,
    pub space: u32,
    pub stages: ShaderStageFlags,
    /// Index into the root-descriptor parameter list, dense from zero.
    pub root_index: u32,
}

/// A binding living in a descriptor set / table.
#[derive(Debug, Clone)]
pub struct DescriptorSetEntry {
    pub name: String,
    pub id: BindingId,
    pub ty: ResourceBindType,
    /// Descriptor count; `0` marks a bindless array.
    pub bind_count: u32,
    pub slot: u32,
    pub space: u32,
    pub stages: ShaderStageFlags,
    pub set_index: u32,
    /// Position within the set, before static-sampler filtering.
    pub element_index: u32,
    pub is_static_sampler: bool,
    pub static_samplers: Vec<SamplerDesc>,
}

/// One entry of the compiled plan.
#[derive(Debug, Clone)]
pub enum BindingEntry {
    PushConst(PushConstEntry),
    RootDescriptor(RootDescriptorEntry),
    DescriptorSet(DescriptorSetEntry),
}

impl BindingEntry {
    pub fn name(&self) -> &str {
        match self {
            BindingEntry::PushConst(e) => &e.name,
            BindingEntry::RootDescriptor(e) => &e.name,
            BindingEntry::DescriptorSet(e) => &e.name,
        }
    }

    pub fn id(&self) -> BindingId {
        match self {
            BindingEntry::PushConst(e) => e.id,
            BindingEntry::RootDescriptor(e) => e.id,
            BindingEntry::DescriptorSet(e) => e.id,
        }
    }

    fn set_id(&mut self, id: BindingId) {
        match self {
            BindingEntry::PushConst(e) => e.id = id,
            BindingEntry::RootDescriptor(e) => e.id = id,
            BindingEntry::DescriptorSet(e) => e.id = id,
        }
    }
}

/// The compiled plan: ordered binding entries, a name index, and the
/// builder for the CPU constant-buffer storage. Immutable after build.
#[derive(Debug, Clone, Default)]
pub struct BridgeLayout {
    bindings: Vec<BindingEntry>,
    name_to_id: BTreeMap<String, BindingId>,
    storage_builder: StructuredBufferBuilder,
}

impl BridgeLayout {
    /// Compile a layout from HLSL reflection (table-model rules).
    pub fn from_hlsl(
        desc: &HlslShaderDesc,
        static_samplers: &[StaticSamplerOverride],
    ) -> Result<Self> {
        let mut bindings = build_entries_hlsl(desc)?;
        apply_static_samplers(&mut bindings, static_samplers);
        validate_bindless_isolation(&bindings)?;

        let mut layout = Self {
            bindings,
            name_to_id: BTreeMap::new(),
            storage_builder: storage_builder_from_hlsl(desc),
        };
        layout.build_binding_index();
        Ok(layout)
    }

    /// Compile a layout from SPIR-V reflection (set-model rules).
    pub fn from_spirv(
        desc: &SpirvShaderDesc,
        static_samplers: &[StaticSamplerOverride],
    ) -> Result<Self> {
        let mut bindings = build_entries_spirv(desc)?;
        apply_static_samplers(&mut bindings, static_samplers);
        validate_bindless_isolation(&bindings)?;

        let mut layout = Self {
            bindings,
            name_to_id: BTreeMap::new(),
            storage_builder: storage_builder_from_spirv(desc),
        };
        layout.build_binding_index();
        Ok(layout)
    }

    pub fn bindings(&self) -> &[BindingEntry] {
        &self.bindings
    }

    pub fn binding_id(&self, name: &str) -> Option<BindingId> {
        self.name_to_id.get(name).copied()
    }

    pub(crate) fn storage_builder(&self) -> &StructuredBufferBuilder {
        &self.storage_builder
    }

    pub(crate) fn name_index(&self) -> &BTreeMap<String, BindingId> {
        &self.name_to_id
    }

    /// Lower the plan into the interface's root-signature descriptor.
    pub fn root_signature_desc(&self) -> RootSignatureDesc {
        let mut desc = RootSignatureDesc::default();

        for entry in &self.bindings {
            if let BindingEntry::PushConst(pc) = entry {
                desc.constant = Some(RootConstantDesc {
                    slot: pc.slot,
                    space: pc.space,
                    size: pc.size,
                    stages: pc.stages,
                });
                break;
            }
        }

        let mut root_entries: Vec<&RootDescriptorEntry> = self
            .bindings
            .iter()
            .filter_map(|b| match b {
                BindingEntry::RootDescriptor(e) => Some(e),
                _ => None,
            })
            .collect();
        root_entries.sort_by_key(|e| e.root_index);
        desc.root_descriptors = root_entries
            .iter()
            .map(|e| RootDescriptorDesc {
                slot: e.slot,
                space: e.space,
                ty: e.ty,
                stages: e.stages,
            })
            .collect();

        let mut sets: BTreeMap<u32, Vec<&DescriptorSetEntry>> = BTreeMap::new();
        for entry in &self.bindings {
            if let BindingEntry::DescriptorSet(e) = entry {
                sets.entry(e.set_index).or_default().push(e);
            }
        }
        for (_, mut elements) in sets {
            elements.sort_by_key(|e| e.element_index);
            desc.descriptor_sets.push(DescriptorSetLayoutDesc {
                elements: elements
                    .iter()
                    .map(|e| DescriptorSetElement {
                        slot: e.slot,
                        space: e.space,
                        ty: e.ty,
                        count: e.bind_count,
                        stages: e.stages,
                        static_samplers: e.static_samplers.clone(),
                    })
                    .collect(),
            });
        }

        desc
    }

    fn build_binding_index(&mut self) {
        self.name_to_id.clear();
        for (id, entry) in self.bindings.iter_mut().enumerate() {
            entry.set_id(id as BindingId);
        }
        for entry in &self.bindings {
            let name = entry.name();
            if !name.is_empty() {
                self.name_to_id
                    .entry(name.to_owned())
                    .or_insert(entry.id());
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Table,
    RootDescriptor,
    RootConstant,
}

/// Bucket every `Table`-placed resource into tables: one table per
/// (resource-vs-sampler, register-space), spaces ascending, slots ascending
/// within a table. Resource tables come before sampler tables.
fn build_tables(desc: &HlslShaderDesc, placements: &[Placement]) -> Vec<Vec<usize>> {
    let mut resource_spaces: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    let mut sampler_spaces: BTreeMap<u32, Vec<usize>> = BTreeMap::new();

    for (i, res) in desc.bound_resources.iter().enumerate() {
        if placements[i] != Placement::Table {
            continue;
        }
        let target = if res.ty.bind_type() == ResourceBindType::Sampler {
            &mut sampler_spaces
        } else {
            &mut resource_spaces
        };
        target.entry(res.space).or_default().push(i);
    }

    let mut tables = Vec::new();
    for (_, mut indices) in resource_spaces {
        indices.sort_by_key(|&i| desc.bound_resources[i].bind_point);
        tables.push(indices);
    }
    for (_, mut indices) in sampler_spaces {
        indices.sort_by_key(|&i| desc.bound_resources[i].bind_point);
        tables.push(indices);
    }
    tables
}

fn build_entries_hlsl(desc: &HlslShaderDesc) -> Result<Vec<BindingEntry>> {
    let max_root_bytes = MAX_PUSH_CONSTANT_BYTES as u32;

    if desc.bound_resources.is_empty() {
        return Ok(Vec::new());
    }
    let resources = &desc.bound_resources;
    let mut placements = vec![Placement::Table; resources.len()];

    // Pick the root-constant candidate: a constant buffer bound to exactly
    // one register, small enough for the root-constant slot, with the
    // lowest (space, slot). The tie policy is space first, then slot.
    let mut best: Option<usize> = None;
    for (i, binding) in resources.iter().enumerate() {
        if binding.ty != HlslInputType::CBuffer || binding.bind_count != 1 {
            continue;
        }
        let cbuffer = match desc.cbuffer_by_name(&binding.name) {
            Some(cb) => cb,
            None => {
                error!("cannot find cbuffer data: {}", binding.name);
                return Err(Error::new(ErrorKind::Validation));
            }
        };
        if cbuffer.size > max_root_bytes {
            continue;
        }
        let better = match best {
            None => true,
            Some(j) => {
                let other = &resources[j];
                (binding.space, binding.bind_point) < (other.space, other.bind_point)
            }
        };
        if better {
            best = Some(i);
        }
    }

    let mut has_root_constant = false;
    let mut root_constant_size = 0u32;
    let root_constant_index = best;
    if let Some(i) = best {
        root_constant_size = desc
            .cbuffer_by_name(&resources[i].name)
            .expect("candidate cbuffer vanished")
            .size;
        has_root_constant = true;
        placements[i] = Placement::RootConstant;
    }

    // Promote single-element constant/typed buffers to root descriptors.
    let mut as_root_desc = Vec::new();
    for (i, binding) in resources.iter().enumerate() {
        if placements[i] != Placement::Table || binding.bind_count != 1 {
            continue;
        }
        let ty = binding.ty.bind_type();
        if matches!(
            ty,
            ResourceBindType::CBuffer | ResourceBindType::Buffer | ResourceBindType::RwBuffer
        ) {
            as_root_desc.push(i);
            placements[i] = Placement::RootDescriptor;
        }
    }

    // Shrink until the plan fits the budget: the constant goes first, then
    // root descriptors starting from the largest register.
    let tables = loop {
        as_root_desc.sort_by_key(|&i| (resources[i].space, resources[i].bind_point));
        let tables = build_tables(desc, &placements);

        let mut total_dwords = 0u32;
        if has_root_constant {
            total_dwords += (root_constant_size + 3) / 4;
        }
        total_dwords += as_root_desc.len() as u32 * 2;
        total_dwords += tables.len() as u32;
        if total_dwords <= MAX_ROOT_SIGNATURE_DWORDS {
            break tables;
        }

        if has_root_constant {
            has_root_constant = false;
            if let Some(i) = root_constant_index {
                as_root_desc.push(i);
                placements[i] = Placement::RootDescriptor;
            }
            continue;
        }
        if let Some(i) = as_root_desc.pop() {
            placements[i] = Placement::Table;
            continue;
        }
        error!(
            "cannot fit bindings into the {}-DWORD root signature budget",
            MAX_ROOT_SIGNATURE_DWORDS
        );
        return Err(Error::new(ErrorKind::Unsupported));
    };

    let mut bindings = Vec::new();
    if has_root_constant {
        let i = root_constant_index.expect("root constant without an index");
        let binding = &resources[i];
        bindings.push(BindingEntry::PushConst(PushConstEntry {
            name: binding.name.clone(),
            id: 0,
            slot: binding.bind_point,
            space: binding.space,
            stages: binding.stages,
            size: root_constant_size,
        }));
    }
    for (root_index, &i) in as_root_desc.iter().enumerate() {
        let binding = &resources[i];
        bindings.push(BindingEntry::RootDescriptor(RootDescriptorEntry {
            name: binding.name.clone(),
            id: 0,
            ty: binding.ty.bind_type(),
            slot: binding.bind_point,
            space: binding.space,
            stages: binding.stages,
            root_index: root_index as u32,
        }));
    }
    for (set_index, table) in tables.iter().enumerate() {
        for (element_index, &i) in table.iter().enumerate() {
            let binding = &resources[i];
            bindings.push(BindingEntry::DescriptorSet(DescriptorSetEntry {
                name: binding.name.clone(),
                id: 0,
                ty: binding.ty.bind_type(),
                bind_count: binding.bind_count,
                slot: binding.bind_point,
                space: binding.space,
                stages: binding.stages,
                set_index: set_index as u32,
                element_index: element_index as u32,
                is_static_sampler: false,
                static_samplers: Vec::new(),
            }));
        }
    }
    Ok(bindings)
}

fn build_entries_spirv(desc: &SpirvShaderDesc) -> Result<Vec<BindingEntry>> {
    if desc.resource_bindings.is_empty() && desc.push_constants.is_empty() {
        return Ok(Vec::new());
    }

    let mut bindings = Vec::new();
    if let Some(pc) = desc.push_constants.first() {
        if pc.size as usize > MAX_PUSH_CONSTANT_BYTES {
            error!(
                "push constant block '{}' is {} bytes, exceeding the {}-byte slot",
                pc.name, pc.size, MAX_PUSH_CONSTANT_BYTES
            );
            return Err(Error::new(ErrorKind::Unsupported));
        }
        bindings.push(BindingEntry::PushConst(PushConstEntry {
            name: pc.name.clone(),
            id: 0,
            slot: 0,
            space: 0,
            stages: pc.stages,
            size: pc.size,
        }));
        if desc.push_constants.len() > 1 {
            warn!(
                "multiple push constants detected, only the first is used: {}",
                desc.push_constants.len()
            );
        }
    }

    let mut per_set: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (i, binding) in desc.resource_bindings.iter().enumerate() {
        per_set.entry(binding.set).or_default().push(i);
    }

    for (set_order, (_, mut indices)) in per_set.into_iter().enumerate() {
        indices.sort_by_key(|&i| desc.resource_bindings[i].binding);
        for (element_index, &i) in indices.iter().enumerate() {
            let binding = &desc.resource_bindings[i];
            let count = if binding.unbounded {
                0
            } else {
                binding.array_size.max(1)
            };
            bindings.push(BindingEntry::DescriptorSet(DescriptorSetEntry {
                name: binding.name.clone(),
                id: 0,
                ty: binding.kind.bind_type(),
                bind_count: count,
                slot: binding.binding,
                space: binding.set,
                stages: binding.stages,
                set_index: set_order as u32,
                element_index: element_index as u32,
                is_static_sampler: false,
                static_samplers: Vec::new(),
            }));
        }
    }
    Ok(bindings)
}

/// Replace matching sampler entries with immutable static samplers.
/// Unknown names and array-size mismatches are logged and skipped.
fn apply_static_samplers(bindings: &mut [BindingEntry], overrides: &[StaticSamplerOverride]) {
    for binding in bindings.iter_mut() {
        if let BindingEntry::DescriptorSet(e) = binding {
            if e.ty == ResourceBindType::Sampler {
                e.is_static_sampler = false;
            }
        }
    }
    for over in overrides {
        if over.name.is_empty() || over.samplers.is_empty() {
            continue;
        }
        let mut matched = false;
        for binding in bindings.iter_mut() {
            let BindingEntry::DescriptorSet(e) = binding else {
                continue;
            };
            if e.ty != ResourceBindType::Sampler || e.name != over.name {
                continue;
            }
            matched = true;
            if over.samplers.len() as u32 != e.bind_count {
                error!(
                    "static sampler count mismatch on '{}': binding has {}, override has {}",
                    e.name,
                    e.bind_count,
                    over.samplers.len()
                );
                continue;
            }
            e.is_static_sampler = true;
            e.static_samplers = over.samplers.clone();
        }
        if !matched {
            error!("static sampler name not found: {}", over.name);
        }
    }
}

/// A bindless (count 0) entry must be the sole occupant of its set.
fn validate_bindless_isolation(bindings: &[BindingEntry]) -> Result<()> {
    let mut set_totals: BTreeMap<u32, u32> = BTreeMap::new();
    let mut bindless_sets: Vec<(u32, u32, &str)> = Vec::new();
    for binding in bindings {
        if let BindingEntry::DescriptorSet(e) = binding {
            *set_totals.entry(e.set_index).or_default() += 1;
            if e.bind_count == 0 {
                bindless_sets.push((e.set_index, e.space, e.name.as_str()));
            }
        }
    }
    for (set, space, name) in bindless_sets {
        if set_totals[&set] > 1 {
            error!(
                "set {} illegally mixes the bindless array '{}' with other bindings",
                space, name
            );
            return Err(Error::new(ErrorKind::Validation));
        }
    }
    Ok(())
}

/// Walk `src` (an index into `types`) and mirror its members under `dst`.
fn add_members_recursive(
    builder: &mut StructuredBufferBuilder,
    types: &[crate::reflection::ShaderTypeDesc],
    src: usize,
    dst: StructTypeId,
) {
    let mut stack = vec![(src, dst)];
    while let Some((src, dst)) = stack.pop() {
        for member in &types[src].members {
            let member_ty = &types[member.type_index];
            let child = builder.add_type(&member_ty.name, member_ty.size);
            builder.add_member(dst, child, &member.name, member.offset, member.elements);
            stack.push((member.type_index, child));
        }
    }
}

fn storage_builder_from_hlsl(desc: &HlslShaderDesc) -> StructuredBufferBuilder {
    let mut builder = StructuredBufferBuilder::new();
    builder.set_alignment(0);

    for res in &desc.bound_resources {
        if res.ty != HlslInputType::CBuffer {
            continue;
        }
        let Some(cb) = desc.cbuffer_by_name(&res.name) else {
            continue;
        };
        if cb.is_view {
            // `ConstantBuffer<T> Name`: one variable whose type is the block.
            let var = &cb.variables[0];
            let ty = &desc.types[var.type_index];
            let root_ty = builder.add_type(&ty.name, cb.size);
            let elements = if res.bind_count > 1 { res.bind_count } else { 0 };
            builder.add_root(&var.name, root_ty, elements);
            add_members_recursive(&mut builder, &desc.types, var.type_index, root_ty);
        } else {
            // Legacy `cbuffer` block: a synthetic root named after the block
            // keeps the whole buffer addressable; the loose variables become
            // its members.
            let block_ty = builder.add_type(&cb.name, cb.size);
            builder.add_root(&cb.name, block_ty, 0);
            for var in &cb.variables {
                let ty = &desc.types[var.type_index];
                let child = builder.add_type(&ty.name, ty.size);
                builder.add_member(block_ty, child, &var.name, var.start_offset, var.elements);
                add_members_recursive(&mut builder, &desc.types, var.type_index, child);
            }
        }
    }
    builder
}

fn storage_builder_from_spirv(desc: &SpirvShaderDesc) -> StructuredBufferBuilder {
    let mut builder = StructuredBufferBuilder::new();
    builder.set_alignment(0);

    for pc in &desc.push_constants {
        let ty = &desc.types[pc.type_index];
        let root_ty = builder.add_type(&ty.name, pc.size);
        builder.add_root(&pc.name, root_ty, 0);
        add_members_recursive(&mut builder, &desc.types, pc.type_index, root_ty);
    }
    for res in &desc.resource_bindings {
        if res.kind != crate::reflection::SpirvResourceKind::UniformBuffer {
            continue;
        }
        let Some(type_index) = res.type_index else {
            continue;
        };
        let ty = &desc.types[type_index];
        if res.is_view {
            let mut element_size = res.block_size;
            if res.array_size > 0 {
                element_size /= res.array_size;
            }
            let root_ty = builder.add_type(&ty.name, element_size);
            builder.add_root(&res.name, root_ty, res.array_size);
            add_members_recursive(&mut builder, &desc.types, type_index, root_ty);
        } else {
            let block_ty = builder.add_type(&res.name, res.block_size);
            builder.add_root(&res.name, block_ty, 0);
            for member in &ty.members {
                let member_ty = &desc.types[member.type_index];
                let child = builder.add_type(&member_ty.name, member_ty.size);
                builder.add_member(block_ty, child, &member.name, member.offset, member.elements);
                add_members_recursive(&mut builder, &desc.types, member.type_index, child);
            }
        }
    }
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::*;
    use mica_base::ShaderStageFlags as Stages;

    fn cbuffer_resource(name: &str, slot: u32, space: u32) -> HlslBoundResource {
        HlslBoundResource {
            name: name.to_owned(),
            ty: HlslInputType::CBuffer,
            bind_point: slot,
            bind_count: 1,
            space,
            stages: Stages::graphics(),
        }
    }

    fn texture_resource(name: &str, slot: u32, space: u32, count: u32) -> HlslBoundResource {
        HlslBoundResource {
            name: name.to_owned(),
            ty: HlslInputType::Texture,
            bind_point: slot,
            bind_count: count,
            space,
            stages: Stages::PIXEL,
        }
    }

    fn sampler_resource(name: &str, slot: u32, space: u32) -> HlslBoundResource {
        HlslBoundResource {
            name: name.to_owned(),
            ty: HlslInputType::Sampler,
            bind_point: slot,
            bind_count: 1,
            space,
            stages: Stages::PIXEL,
        }
    }

    /// A `ConstantBuffer<T>` style cbuffer with one struct variable.
    fn view_cbuffer(desc: &mut HlslShaderDesc, name: &str, size: u32) {
        let type_index = desc.types.len();
        desc.types.push(ShaderTypeDesc {
            name: format!("{}Data", name),
            size,
            members: vec![],
        });
        desc.cbuffers.push(HlslCBuffer {
            name: name.to_owned(),
            size,
            variables: vec![HlslVariable {
                name: name.to_owned(),
                start_offset: 0,
                type_index,
                elements: 0,
            }],
            is_view: true,
        });
    }

    #[test]
    fn lone_small_cbuffer_becomes_push_constant() {
        let mut desc = HlslShaderDesc::default();
        desc.bound_resources.push(cbuffer_resource("PerObject", 0, 0));
        view_cbuffer(&mut desc, "PerObject", 192);

        let layout = BridgeLayout::from_hlsl(&desc, &[]).unwrap();
        assert_eq!(layout.bindings().len(), 1);
        match &layout.bindings()[0] {
            BindingEntry::PushConst(pc) => assert_eq!(pc.size, 192),
            other => panic!("expected push constant, got {:?}", other),
        }

        let rs = layout.root_signature_desc();
        assert_eq!(rs.dword_cost(), 48);
        assert!(rs.root_descriptors.is_empty());
        assert!(rs.descriptor_sets.is_empty());
    }

    #[test]
    fn root_constant_tie_prefers_space_then_slot() {
        let mut desc = HlslShaderDesc::default();
        desc.bound_resources.push(cbuffer_resource("HighSpace", 0, 1));
        desc.bound_resources.push(cbuffer_resource("LowSpace", 5, 0));
        view_cbuffer(&mut desc, "HighSpace", 64);
        view_cbuffer(&mut desc, "LowSpace", 64);

        let layout = BridgeLayout::from_hlsl(&desc, &[]).unwrap();
        let push = layout
            .bindings()
            .iter()
            .find_map(|b| match b {
                BindingEntry::PushConst(pc) => Some(pc),
                _ => None,
            })
            .expect("one cbuffer must be promoted");
        // Space 0 wins even though its register slot is larger.
        assert_eq!(push.name, "LowSpace");

        let other = layout
            .bindings()
            .iter()
            .find_map(|b| match b {
                BindingEntry::RootDescriptor(rd) => Some(rd),
                _ => None,
            })
            .expect("the loser stays a root descriptor");
        assert_eq!(other.name, "HighSpace");
    }

    #[test]
    fn oversized_cbuffer_is_not_a_push_constant_candidate() {
        let mut desc = HlslShaderDesc::default();
        desc.bound_resources.push(cbuffer_resource("Big", 0, 0));
        view_cbuffer(&mut desc, "Big", 512);

        let layout = BridgeLayout::from_hlsl(&desc, &[]).unwrap();
        assert!(matches!(
            layout.bindings()[0],
            BindingEntry::RootDescriptor(_)
        ));
    }

    #[test]
    fn tables_bucket_by_kind_and_space() {
        let mut desc = HlslShaderDesc::default();
        desc.bound_resources.push(texture_resource("AlbedoMaps", 0, 0, 4));
        desc.bound_resources.push(texture_resource("ShadowMap", 3, 0, 1));
        desc.bound_resources.push(texture_resource("EnvMap", 0, 1, 1));
        desc.bound_resources.push(sampler_resource("LinearSampler", 0, 0));

        let layout = BridgeLayout::from_hlsl(&desc, &[]).unwrap();
        let rs = layout.root_signature_desc();
        // space-0 resources, space-1 resources, space-0 samplers.
        assert_eq!(rs.descriptor_sets.len(), 3);
        assert_eq!(rs.descriptor_sets[0].elements.len(), 2);
        assert_eq!(rs.descriptor_sets[0].elements[0].slot, 0);
        assert_eq!(rs.descriptor_sets[0].elements[1].slot, 3);
        assert_eq!(rs.descriptor_sets[1].elements[0].space, 1);
        assert_eq!(
            rs.descriptor_sets[2].elements[0].ty,
            ResourceBindType::Sampler
        );
        assert!(rs.dword_cost() <= MAX_ROOT_SIGNATURE_DWORDS);
    }

    #[test]
    fn budget_overflow_demotes_constant_then_descriptors() {
        // 33 small cbuffers: the naive plan is 16 DWORDs of constant + 64
        // of root descriptors, far past the budget. The constant goes
        // first, then descriptors demote from the largest register.
        let mut desc = HlslShaderDesc::default();
        for i in 0..33 {
            let name = format!("CB{}", i);
            desc.bound_resources.push(cbuffer_resource(&name, i, 0));
            view_cbuffer(&mut desc, &name, 64);
        }

        let layout = BridgeLayout::from_hlsl(&desc, &[]).unwrap();
        let rs = layout.root_signature_desc();
        assert!(rs.dword_cost() <= MAX_ROOT_SIGNATURE_DWORDS);
        assert!(rs.constant.is_none());
        // Whatever fell out of the root-descriptor list must have landed in
        // a table, not vanished.
        let in_tables: usize = rs.descriptor_sets.iter().map(|s| s.elements.len()).sum();
        assert_eq!(rs.root_descriptors.len() + in_tables, 33);
        // The table holds the highest registers.
        let max_root_slot = rs.root_descriptors.iter().map(|r| r.slot).max().unwrap();
        let min_table_slot = rs
            .descriptor_sets
            .iter()
            .flat_map(|s| s.elements.iter().map(|e| e.slot))
            .min()
            .unwrap();
        assert!(max_root_slot < min_table_slot);
    }

    #[test]
    fn impossible_budget_fails_loudly() {
        // 70 separate spaces make 70 tables; no demotion can help.
        let mut desc = HlslShaderDesc::default();
        for i in 0..70 {
            desc.bound_resources
                .push(texture_resource(&format!("T{}", i), 0, i, 2));
        }
        let err = BridgeLayout::from_hlsl(&desc, &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    fn spirv_binding(
        name: &str,
        kind: SpirvResourceKind,
        set: u32,
        binding: u32,
    ) -> SpirvResourceBinding {
        SpirvResourceBinding {
            name: name.to_owned(),
            kind,
            set,
            binding,
            array_size: 0,
            unbounded: false,
            stages: Stages::graphics(),
            type_index: None,
            block_size: 0,
            is_view: false,
        }
    }

    #[test]
    fn spirv_groups_by_set_and_binding() {
        let mut desc = SpirvShaderDesc::default();
        desc.resource_bindings
            .push(spirv_binding("samp", SpirvResourceKind::Sampler, 1, 1));
        desc.resource_bindings
            .push(spirv_binding("tex", SpirvResourceKind::SampledImage, 1, 0));
        desc.resource_bindings
            .push(spirv_binding("params", SpirvResourceKind::StorageBuffer, 0, 0));

        let layout = BridgeLayout::from_spirv(&desc, &[]).unwrap();
        let rs = layout.root_signature_desc();
        assert_eq!(rs.descriptor_sets.len(), 2);
        assert_eq!(rs.descriptor_sets[0].elements[0].ty, ResourceBindType::RwBuffer);
        assert_eq!(rs.descriptor_sets[1].elements[0].slot, 0);
        assert_eq!(rs.descriptor_sets[1].elements[1].slot, 1);
    }

    #[test]
    fn spirv_keeps_first_push_constant_only() {
        let mut desc = SpirvShaderDesc::default();
        desc.types.push(ShaderTypeDesc {
            name: "Push".into(),
            size: 16,
            members: vec![],
        });
        desc.push_constants.push(SpirvPushConstant {
            name: "first".into(),
            size: 16,
            stages: Stages::VERTEX,
            type_index: 0,
        });
        desc.push_constants.push(SpirvPushConstant {
            name: "second".into(),
            size: 16,
            stages: Stages::PIXEL,
            type_index: 0,
        });

        let layout = BridgeLayout::from_spirv(&desc, &[]).unwrap();
        let pushes: Vec<_> = layout
            .bindings()
            .iter()
            .filter(|b| matches!(b, BindingEntry::PushConst(_)))
            .collect();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].name(), "first");
    }

    #[test]
    fn bindless_must_live_alone() {
        let mut desc = SpirvShaderDesc::default();
        let mut bindless = spirv_binding("all_textures", SpirvResourceKind::SampledImage, 2, 0);
        bindless.unbounded = true;
        desc.resource_bindings.push(bindless);
        desc.resource_bindings
            .push(spirv_binding("extras", SpirvResourceKind::StorageBuffer, 2, 1));

        let err = BridgeLayout::from_spirv(&desc, &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn bindless_alone_is_legal() {
        let mut desc = SpirvShaderDesc::default();
        let mut bindless = spirv_binding("all_textures", SpirvResourceKind::SampledImage, 2, 0);
        bindless.unbounded = true;
        desc.resource_bindings.push(bindless);

        let layout = BridgeLayout::from_spirv(&desc, &[]).unwrap();
        let rs = layout.root_signature_desc();
        assert_eq!(rs.descriptor_sets.len(), 1);
        assert_eq!(rs.descriptor_sets[0].elements[0].count, 0);
    }

    #[test]
    fn static_sampler_override_marks_entry() {
        let mut desc = HlslShaderDesc::default();
        desc.bound_resources.push(texture_resource("Albedo", 0, 0, 1));
        desc.bound_resources.push(sampler_resource("LinearSampler", 0, 0));

        let overrides = [StaticSamplerOverride {
            name: "LinearSampler".into(),
            samplers: vec![SamplerDesc::default()],
        }];
        let layout = BridgeLayout::from_hlsl(&desc, &overrides).unwrap();
        let entry = layout
            .bindings()
            .iter()
            .find_map(|b| match b {
                BindingEntry::DescriptorSet(e) if e.name == "LinearSampler" => Some(e),
                _ => None,
            })
            .unwrap();
        assert!(entry.is_static_sampler);
        assert_eq!(entry.static_samplers.len(), 1);

        let rs = layout.root_signature_desc();
        let sampler_set = &rs.descriptor_sets[1];
        assert_eq!(sampler_set.elements[0].static_samplers.len(), 1);
    }

    #[test]
    fn static_sampler_count_mismatch_is_skipped() {
        let mut desc = HlslShaderDesc::default();
        desc.bound_resources.push(sampler_resource("Samplers", 0, 0));

        let overrides = [StaticSamplerOverride {
            name: "Samplers".into(),
            samplers: vec![SamplerDesc::default(), SamplerDesc::default()],
        }];
        let layout = BridgeLayout::from_hlsl(&desc, &overrides).unwrap();
        let entry = layout
            .bindings()
            .iter()
            .find_map(|b| match b {
                BindingEntry::DescriptorSet(e) => Some(e),
                _ => None,
            })
            .unwrap();
        assert!(!entry.is_static_sampler);
    }

    #[test]
    fn names_resolve_to_binding_ids() {
        let mut desc = HlslShaderDesc::default();
        desc.bound_resources.push(cbuffer_resource("PerObject", 0, 0));
        desc.bound_resources.push(texture_resource("Albedo", 0, 0, 1));
        view_cbuffer(&mut desc, "PerObject", 128);

        let layout = BridgeLayout::from_hlsl(&desc, &[]).unwrap();
        let id = layout.binding_id("Albedo").unwrap();
        assert_eq!(layout.bindings()[id as usize].name(), "Albedo");
        assert!(layout.binding_id("Missing").is_none());
    }
}
