//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! End-to-end bridge behavior against the null device, observed through a
//! recording encoder.
use std::any::Any;

use mica_base as gfx;
use mica_base::{BufferView as _, Device as _};
use mica_bridge::{
    BindBridge, BridgeLayout, CBufferArena, HlslBoundResource, HlslCBuffer, HlslInputType,
    HlslShaderDesc, HlslVariable, ShaderMemberDesc, ShaderTypeDesc, SpirvResourceBinding,
    SpirvResourceKind, SpirvShaderDesc,
};
use mica_null::NullDevice;

/// Records every bind call so tests can assert on the exact sequence.
#[derive(Debug, Default)]
struct RecordingEncoder {
    push_constants: Vec<Vec<u8>>,
    root_descriptors: Vec<(u32, gfx::BufferViewRef)>,
    descriptor_sets: Vec<u32>,
}

impl gfx::CommandEncoder for RecordingEncoder {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn set_viewport(&mut self, _viewport: gfx::Viewport) {}

    fn set_scissor(&mut self, _rect: gfx::Rect2D) {}

    fn bind_vertex_buffers(&mut self, _views: &[gfx::VertexBufferView]) {}

    fn bind_index_buffer(&mut self, _view: gfx::IndexBufferView) {}

    fn bind_root_signature(&mut self, _root_signature: &gfx::RootSignatureRef) {}

    fn bind_graphics_pipeline(&mut self, _pipeline: &gfx::GraphicsPipelineRef) {}

    fn push_constants(&mut self, data: &[u8]) {
        self.push_constants.push(data.to_vec());
    }

    fn bind_root_descriptor(&mut self, slot: u32, view: &gfx::BufferViewRef) {
        self.root_descriptors.push((slot, view.clone()));
    }

    fn bind_descriptor_set(&mut self, slot: u32, _set: &gfx::DescriptorSetRef) {
        self.descriptor_sets.push(slot);
    }

    fn draw(&mut self, _: u32, _: u32, _: u32, _: u32) {}

    fn draw_indexed(&mut self, _: u32, _: u32, _: u32, _: i32, _: u32) {}
}

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

/// `ConstantBuffer<PerObjectData> PerObject` with model/mvp/modelInv mat4s.
fn per_object_reflection(size: u32) -> HlslShaderDesc {
    let mut desc = HlslShaderDesc::default();
    let mat_ty = ShaderTypeDesc {
        name: "float4x4".into(),
        size: 64,
        members: vec![],
    };
    desc.types.push(ShaderTypeDesc {
        name: "PerObjectData".into(),
        size,
        members: vec![
            ShaderMemberDesc {
                name: "model".into(),
                type_index: 1,
                offset: 0,
                elements: 0,
            },
            ShaderMemberDesc {
                name: "mvp".into(),
                type_index: 1,
                offset: 64,
                elements: 0,
            },
            ShaderMemberDesc {
                name: "modelInv".into(),
                type_index: 1,
                offset: 128,
                elements: 0,
            },
        ],
    });
    desc.types.push(mat_ty);
    desc.cbuffers.push(HlslCBuffer {
        name: "PerObject".into(),
        size,
        variables: vec![HlslVariable {
            name: "PerObject".into(),
            start_offset: 0,
            type_index: 0,
            elements: 0,
        }],
        is_view: true,
    });
    desc.bound_resources.push(HlslBoundResource {
        name: "PerObject".into(),
        ty: HlslInputType::CBuffer,
        bind_point: 0,
        bind_count: 1,
        space: 0,
        stages: gfx::ShaderStageFlags::graphics(),
    });
    desc
}

/// Spec scenario: a 192-byte constant buffer is promoted to the push
/// constant; binding pushes exactly 192 bytes and binds no descriptor set.
#[test]
fn push_constant_flows_from_storage() {
    let device = NullDevice::new_device();
    let layout = BridgeLayout::from_hlsl(&per_object_reflection(192), &[]).unwrap();
    let mut bridge = BindBridge::new(&device, &layout).unwrap();
    let mut arena = CBufferArena::new(device.clone(), 64 * 1024);

    let identity = mat4_bytes(1.0);
    let mut cbuffer = bridge.cbuffer_by_name("PerObject").unwrap();
    assert!(cbuffer.set_field("mvp", &identity));

    bridge.upload(&mut arena).unwrap();

    let mut encoder = RecordingEncoder::default();
    bridge.bind(&mut encoder).unwrap();

    assert_eq!(encoder.push_constants.len(), 1);
    let pushed = &encoder.push_constants[0];
    assert_eq!(pushed.len(), 192);
    assert_eq!(&pushed[64..128], &identity[..]);
    assert!(pushed[..64].iter().all(|&b| b == 0));
    assert!(encoder.descriptor_sets.is_empty());
    assert!(encoder.root_descriptors.is_empty());
}

/// An oversized constant buffer becomes a root descriptor; upload places
/// it in the arena aligned to the device's constant-buffer alignment.
#[test]
fn root_descriptor_cbuffer_uploads_into_arena() {
    let device = NullDevice::new_device();
    let mut reflection = per_object_reflection(512);
    reflection.types[0].size = 512;
    let layout = BridgeLayout::from_hlsl(&reflection, &[]).unwrap();
    let mut bridge = BindBridge::new(&device, &layout).unwrap();
    let mut arena = CBufferArena::new(device.clone(), 64 * 1024);

    let m = mat4_bytes(3.0);
    bridge
        .cbuffer_by_name("PerObject")
        .unwrap()
        .set_field("model", &m);

    bridge.upload(&mut arena).unwrap();

    let mut encoder = RecordingEncoder::default();
    bridge.bind(&mut encoder).unwrap();

    assert!(encoder.push_constants.is_empty());
    assert_eq!(encoder.root_descriptors.len(), 1);
    let (slot, view) = &encoder.root_descriptors[0];
    assert_eq!(*slot, 0);
    // 512 is already 256-aligned.
    assert_eq!(view.desc().range.size, 512);
    assert_eq!(view.desc().usage, gfx::BufferUsage::CBUFFER);
}

/// Re-uploading after a frame reset suballocates from the same arena block.
#[test]
fn upload_is_repeatable_across_frames() {
    let device = NullDevice::new_device();
    let mut reflection = per_object_reflection(512);
    reflection.types[0].size = 512;
    let layout = BridgeLayout::from_hlsl(&reflection, &[]).unwrap();
    let mut bridge = BindBridge::new(&device, &layout).unwrap();
    let mut arena = CBufferArena::new(device.clone(), 4 * 1024);

    for _ in 0..8 {
        bridge.upload(&mut arena).unwrap();
        bridge.clear();
        arena.reset();
    }
    // One block suffices for a 512-byte upload.
    assert_eq!(arena.capacity(), 4 * 1024);
}

fn spirv_texture_reflection() -> SpirvShaderDesc {
    let mut desc = SpirvShaderDesc::default();
    desc.resource_bindings.push(SpirvResourceBinding {
        name: "Albedo".into(),
        kind: SpirvResourceKind::SampledImage,
        set: 0,
        binding: 0,
        array_size: 0,
        unbounded: false,
        stages: gfx::ShaderStageFlags::PIXEL,
        type_index: None,
        block_size: 0,
        is_view: false,
    });
    desc.resource_bindings.push(SpirvResourceBinding {
        name: "Params".into(),
        kind: SpirvResourceKind::UniformBuffer,
        set: 0,
        binding: 1,
        array_size: 0,
        unbounded: false,
        stages: gfx::ShaderStageFlags::graphics(),
        type_index: Some(0),
        block_size: 64,
        is_view: true,
    });
    desc.types.push(ShaderTypeDesc {
        name: "ParamsData".into(),
        size: 64,
        members: vec![ShaderMemberDesc {
            name: "tint".into(),
            type_index: 1,
            offset: 0,
            elements: 0,
        }],
    });
    desc.types.push(ShaderTypeDesc {
        name: "float4".into(),
        size: 16,
        members: vec![],
    });
    desc
}

#[test]
fn descriptor_set_views_are_cached_until_bind() {
    let device = NullDevice::new_device();
    let layout = BridgeLayout::from_spirv(&spirv_texture_reflection(), &[]).unwrap();
    let mut bridge = BindBridge::new(&device, &layout).unwrap();
    let mut arena = CBufferArena::new(device.clone(), 64 * 1024);

    let texture = device
        .create_texture(&gfx::TextureDesc {
            width: 4,
            height: 4,
            format: gfx::TextureFormat::Rgba8Unorm,
            usage: gfx::TextureUsage::RESOURCE,
            name: "albedo".into(),
            ..Default::default()
        })
        .unwrap();
    let view = device
        .create_texture_view(&gfx::TextureViewDesc {
            texture,
            dim: gfx::TextureViewDimension::Dim2D,
            format: gfx::TextureFormat::Rgba8Unorm,
            range: gfx::SubresourceRange::all(),
            usage: gfx::TextureUsage::RESOURCE,
        })
        .unwrap();

    bridge
        .set_resource_by_name("Albedo", &gfx::ResourceViewRef::Texture(view), 0)
        .unwrap();
    bridge
        .cbuffer_by_name("Params")
        .unwrap()
        .set_field("tint", &[0xffu8; 16]);
    bridge.upload(&mut arena).unwrap();

    let mut encoder = RecordingEncoder::default();
    bridge.bind(&mut encoder).unwrap();

    // Everything lives in one set on the set-model path: one set bind, no
    // push constants, no root descriptors.
    assert_eq!(encoder.descriptor_sets, vec![0]);
    assert!(encoder.push_constants.is_empty());
    assert!(encoder.root_descriptors.is_empty());
}

#[test]
fn set_resource_rejects_wrong_targets() {
    let device = NullDevice::new_device();
    let layout = BridgeLayout::from_hlsl(&per_object_reflection(192), &[]).unwrap();
    let mut bridge = BindBridge::new(&device, &layout).unwrap();

    let buffer = device
        .create_buffer(&gfx::BufferDesc {
            size: 64,
            memory: gfx::MemoryKind::Device,
            usage: gfx::BufferUsage::RESOURCE,
            name: "payload".into(),
            ..Default::default()
        })
        .unwrap();
    let buffer_view = device
        .create_buffer_view(&gfx::BufferViewDesc {
            buffer,
            range: gfx::BufferRange {
                offset: 0,
                size: 64,
            },
            stride: 0,
            format: gfx::TextureFormat::Unknown,
            usage: gfx::BufferUsage::RESOURCE,
        })
        .unwrap();
    let view = gfx::ResourceViewRef::Buffer(buffer_view);

    // The only binding is the push constant: no resource may land on it.
    let id = bridge.binding_id("PerObject").unwrap();
    assert!(bridge.set_resource(id, &view, 0).is_err());
    // Unknown ids and names fail without state changes.
    assert!(bridge.set_resource(99, &view, 0).is_err());
    assert!(bridge.set_resource_by_name("Nope", &view, 0).is_err());
}

#[test]
fn set_resource_validates_types_and_ranges() {
    let device = NullDevice::new_device();
    let layout = BridgeLayout::from_spirv(&spirv_texture_reflection(), &[]).unwrap();
    let mut bridge = BindBridge::new(&device, &layout).unwrap();

    let buffer = device
        .create_buffer(&gfx::BufferDesc {
            size: 64,
            memory: gfx::MemoryKind::Device,
            usage: gfx::BufferUsage::RESOURCE,
            name: "payload".into(),
            ..Default::default()
        })
        .unwrap();
    let buffer_view = device
        .create_buffer_view(&gfx::BufferViewDesc {
            buffer,
            range: gfx::BufferRange {
                offset: 0,
                size: 64,
            },
            stride: 0,
            format: gfx::TextureFormat::Unknown,
            usage: gfx::BufferUsage::RESOURCE,
        })
        .unwrap();
    let wrong = gfx::ResourceViewRef::Buffer(buffer_view);

    // Buffer view into a texture binding: type mismatch.
    assert!(bridge.set_resource_by_name("Albedo", &wrong, 0).is_err());
    // Array index out of range on a single-descriptor binding.
    let texture = device
        .create_texture(&gfx::TextureDesc {
            width: 4,
            height: 4,
            format: gfx::TextureFormat::Rgba8Unorm,
            usage: gfx::TextureUsage::RESOURCE,
            name: "t".into(),
            ..Default::default()
        })
        .unwrap();
    let texture_view = device
        .create_texture_view(&gfx::TextureViewDesc {
            texture,
            dim: gfx::TextureViewDimension::Dim2D,
            format: gfx::TextureFormat::Rgba8Unorm,
            range: gfx::SubresourceRange::all(),
            usage: gfx::TextureUsage::RESOURCE,
        })
        .unwrap();
    let right = gfx::ResourceViewRef::Texture(texture_view);
    assert!(bridge.set_resource_by_name("Albedo", &right, 1).is_err());
    assert!(bridge.set_resource_by_name("Albedo", &right, 0).is_ok());
}

#[test]
fn clear_preserves_cpu_storage() {
    let device = NullDevice::new_device();
    let layout = BridgeLayout::from_hlsl(&per_object_reflection(192), &[]).unwrap();
    let mut bridge = BindBridge::new(&device, &layout).unwrap();

    let m = mat4_bytes(4.0);
    bridge
        .cbuffer_by_name("PerObject")
        .unwrap()
        .set_field("mvp", &m);
    bridge.clear();

    // Constant bytes survive a clear; only view references are dropped.
    let id = bridge.binding_id("PerObject").unwrap();
    let bytes = bridge.cbuffer_bytes(id, 0).unwrap();
    assert_eq!(&bytes[64..128], &m[..]);

    let mut encoder = RecordingEncoder::default();
    bridge.bind(&mut encoder).unwrap();
    assert_eq!(encoder.push_constants.len(), 1);
}
