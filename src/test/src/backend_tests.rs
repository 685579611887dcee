//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! Backend-agnostic test cases.
//!
//! Each function takes a [`TestDriver`](crate::TestDriver) and exercises
//! one contract of the interface against every device the driver yields.
use mica_base as gfx;
use mica_base::{
    Buffer as _, CommandBuffer as _, CommandQueue as _, DescriptorSet as _, Device as _,
    Fence as _, SwapChain as _, Texture as _, TextureView as _,
};
use raw_window_handle::{
    RawDisplayHandle, RawWindowHandle, WebDisplayHandle, WebWindowHandle,
};

use crate::TestDriver;

/// A window handle usable where no real window system is present. Hardware
/// drivers that cannot present into it simply skip the swapchain cases by
/// returning `None` from [`TestDriver::for_each_device`]-supplied windows.
pub fn offscreen_window() -> (RawWindowHandle, RawDisplayHandle) {
    (
        RawWindowHandle::Web(WebWindowHandle::new(1)),
        RawDisplayHandle::Web(WebDisplayHandle::new()),
    )
}

fn direct_queue(device: &gfx::DeviceRef) -> gfx::CommandQueueRef {
    device
        .command_queue(gfx::QueueType::Direct, 0)
        .expect("device has no direct queue")
}

pub fn create_device<T: TestDriver>(driver: &T) {
    driver.for_each_device(&mut |device| {
        let detail = device.detail();
        assert!(detail.cbuffer_alignment.is_power_of_two());
    });
}

pub fn queue_wait_idle<T: TestDriver>(driver: &T) {
    driver.for_each_device(&mut |device| {
        let queue = direct_queue(device);
        queue.wait_idle().unwrap();
    });
}

pub fn fence_value_is_monotonic<T: TestDriver>(driver: &T) {
    driver.for_each_device(&mut |device| {
        let queue = direct_queue(device);
        let fence = device.create_fence(0).unwrap();
        assert_eq!(fence.completed_value(), 0);

        queue
            .submit(gfx::SubmitDesc {
                signal_fences: &[(&fence, 1)],
                ..Default::default()
            })
            .unwrap();
        fence.wait(1).unwrap();
        assert!(fence.completed_value() >= 1);

        queue
            .submit(gfx::SubmitDesc {
                signal_fences: &[(&fence, 3)],
                ..Default::default()
            })
            .unwrap();
        fence.wait(3).unwrap();
        let observed = fence.completed_value();
        assert!(observed >= 3);
        // Once a value has been observed, later reads never regress.
        assert!(fence.completed_value() >= observed);
    });
}

pub fn cmd_buffer_records_and_submits<T: TestDriver>(driver: &T) {
    driver.for_each_device(&mut |device| {
        let queue = direct_queue(device);
        let fence = device.create_fence(0).unwrap();
        let mut cb = device.create_command_buffer(&queue).unwrap();

        // Two full record/submit cycles through the state machine.
        for round in 1..=2u64 {
            cb.begin().unwrap();
            cb.end().unwrap();
            queue
                .submit(gfx::SubmitDesc {
                    command_buffers: &[&*cb],
                    signal_fences: &[(&fence, round)],
                    ..Default::default()
                })
                .unwrap();
            fence.wait(round).unwrap();
        }
        queue.wait_idle().unwrap();
    });
}

pub fn render_pass_requires_attachments<T: TestDriver>(driver: &T) {
    driver.for_each_device(&mut |device| {
        let queue = direct_queue(device);
        let mut cb = device.create_command_buffer(&queue).unwrap();
        cb.begin().unwrap();
        let result = cb.begin_render_pass(&gfx::RenderPassDesc::default());
        assert!(result.is_err());
        // The failure must leave the command buffer recordable.
        cb.end().unwrap();
    });
}

/// Spec scenario: write vertex data into an upload buffer, copy it through
/// a device-local buffer into a readback buffer, and compare bytewise.
pub fn buffer_upload_roundtrip<T: TestDriver>(driver: &T) {
    driver.for_each_device(&mut |device| {
        let queue = device
            .command_queue(gfx::QueueType::Copy, 0)
            .or_else(|| device.command_queue(gfx::QueueType::Direct, 0))
            .expect("no queue fit for copies");

        // Three vertices of (pos: 3 floats, color: 3 floats).
        let vertices: Vec<f32> = (0..18).map(|i| i as f32 * 0.25).collect();
        let mut bytes = Vec::with_capacity(vertices.len() * 4);
        for v in &vertices {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let size = bytes.len() as u64;

        let upload = device
            .create_buffer(&gfx::BufferDesc {
                size,
                memory: gfx::MemoryKind::Upload,
                usage: gfx::BufferUsage::COPY_SRC | gfx::BufferUsage::MAP_WRITE,
                name: "upload".into(),
                ..Default::default()
            })
            .unwrap();
        let device_local = device
            .create_buffer(&gfx::BufferDesc {
                size,
                memory: gfx::MemoryKind::Device,
                usage: gfx::BufferUsage::COPY_SRC
                    | gfx::BufferUsage::COPY_DST
                    | gfx::BufferUsage::VERTEX,
                name: "vertices".into(),
                ..Default::default()
            })
            .unwrap();
        let readback = device
            .create_buffer(&gfx::BufferDesc {
                size,
                memory: gfx::MemoryKind::Readback,
                usage: gfx::BufferUsage::COPY_DST | gfx::BufferUsage::MAP_READ,
                name: "readback".into(),
                ..Default::default()
            })
            .unwrap();

        unsafe {
            let ptr = upload.map(0, size).unwrap();
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len());
            upload.unmap(0, size);
        }

        let fence = device.create_fence(0).unwrap();
        let mut cb = device.create_command_buffer(&queue).unwrap();
        cb.begin().unwrap();
        cb.resource_barrier(
            &[gfx::BufferBarrier {
                buffer: &device_local,
                before: gfx::BufferUsage::COMMON,
                after: gfx::BufferUsage::COPY_DST,
                queue_transfer: None,
            }],
            &[],
        );
        cb.copy_buffer_to_buffer(&device_local, 0, &upload, 0, size);
        cb.resource_barrier(
            &[gfx::BufferBarrier {
                buffer: &device_local,
                before: gfx::BufferUsage::COPY_DST,
                after: gfx::BufferUsage::COPY_SRC,
                queue_transfer: None,
            }],
            &[],
        );
        cb.copy_buffer_to_buffer(&readback, 0, &device_local, 0, size);
        cb.end().unwrap();
        queue
            .submit(gfx::SubmitDesc {
                command_buffers: &[&*cb],
                signal_fences: &[(&fence, 1)],
                ..Default::default()
            })
            .unwrap();
        fence.wait(1).unwrap();

        let mut observed = vec![0u8; bytes.len()];
        unsafe {
            let ptr = readback.map(0, size).unwrap();
            std::ptr::copy_nonoverlapping(ptr, observed.as_mut_ptr(), observed.len());
            readback.unmap(0, size);
        }
        assert_eq!(observed, bytes);
    });
}

pub fn descriptor_set_accepts_matching_views<T: TestDriver>(driver: &T) {
    driver.for_each_device(&mut |device| {
        let root_signature = device
            .create_root_signature(&gfx::RootSignatureDesc {
                descriptor_sets: vec![gfx::DescriptorSetLayoutDesc {
                    elements: vec![gfx::DescriptorSetElement {
                        slot: 0,
                        space: 0,
                        ty: gfx::ResourceBindType::Texture,
                        count: 1,
                        stages: gfx::ShaderStageFlags::PIXEL,
                        static_samplers: vec![],
                    }],
                }],
                ..Default::default()
            })
            .unwrap();
        let set = device
            .create_descriptor_set(&root_signature, 0)
            .unwrap()
            .expect("a texture set needs a set object");

        let texture = device
            .create_texture(&gfx::TextureDesc {
                width: 16,
                height: 16,
                format: gfx::TextureFormat::Rgba8Unorm,
                usage: gfx::TextureUsage::RESOURCE,
                name: "checker".into(),
                ..Default::default()
            })
            .unwrap();
        let view = device
            .create_texture_view(&gfx::TextureViewDesc {
                texture: texture.clone(),
                dim: gfx::TextureViewDimension::Dim2D,
                format: gfx::TextureFormat::Rgba8Unorm,
                range: gfx::SubresourceRange::all(),
                usage: gfx::TextureUsage::RESOURCE,
            })
            .unwrap();

        set.set_resource(0, 0, &gfx::ResourceViewRef::Texture(view))
            .unwrap();

        // A buffer view must be rejected by a texture binding.
        let buffer = device
            .create_buffer(&gfx::BufferDesc {
                size: 256,
                memory: gfx::MemoryKind::Device,
                usage: gfx::BufferUsage::RESOURCE,
                name: "wrong".into(),
                ..Default::default()
            })
            .unwrap();
        let buffer_view = device
            .create_buffer_view(&gfx::BufferViewDesc {
                buffer,
                range: gfx::BufferRange {
                    offset: 0,
                    size: 256,
                },
                stride: 0,
                format: gfx::TextureFormat::Unknown,
                usage: gfx::BufferUsage::RESOURCE,
            })
            .unwrap();
        assert!(set
            .set_resource(0, 0, &gfx::ResourceViewRef::Buffer(buffer_view))
            .is_err());
    });
}

/// Hardware backends cannot present into the offscreen handle; their
/// swapchain cases degrade to a logged skip instead of a failure.
/// Views into array textures must honor the view dimension and the
/// sub-resource range: a slice view is not the whole resource.
pub fn texture_array_layer_views<T: TestDriver>(driver: &T) {
    driver.for_each_device(&mut |device| {
        let texture = device
            .create_texture(&gfx::TextureDesc {
                dim: gfx::TextureDimension::Dim2D,
                width: 32,
                height: 32,
                depth_or_array_size: 6,
                mip_levels: 2,
                format: gfx::TextureFormat::Rgba8Unorm,
                usage: gfx::TextureUsage::RESOURCE | gfx::TextureUsage::RENDER_TARGET,
                name: "layered".into(),
                ..Default::default()
            })
            .unwrap();

        // A shader view over layers 2..4 of the base mip.
        let sampled = device
            .create_texture_view(&gfx::TextureViewDesc {
                texture: texture.clone(),
                dim: gfx::TextureViewDimension::Dim2DArray,
                format: gfx::TextureFormat::Rgba8Unorm,
                range: gfx::SubresourceRange {
                    base_array_layer: 2,
                    array_layer_count: 2,
                    base_mip_level: 0,
                    mip_level_count: 1,
                },
                usage: gfx::TextureUsage::RESOURCE,
            })
            .unwrap();
        assert_eq!(sampled.desc().range.base_array_layer, 2);
        assert_eq!(sampled.desc().range.array_layer_count, 2);

        // A render-target view of a single slice at mip 1.
        let target = device
            .create_texture_view(&gfx::TextureViewDesc {
                texture: texture.clone(),
                dim: gfx::TextureViewDimension::Dim2DArray,
                format: gfx::TextureFormat::Rgba8Unorm,
                range: gfx::SubresourceRange {
                    base_array_layer: 3,
                    array_layer_count: 1,
                    base_mip_level: 1,
                    mip_level_count: 1,
                },
                usage: gfx::TextureUsage::RENDER_TARGET,
            })
            .unwrap();
        assert_eq!(target.desc().range.base_array_layer, 3);
        assert_eq!(target.desc().dim, gfx::TextureViewDimension::Dim2DArray);
    });
}

fn make_swap_chain(
    device: &gfx::DeviceRef,
    queue: &gfx::CommandQueueRef,
    width: u32,
    height: u32,
    back_buffer_count: u32,
) -> Option<gfx::SwapChainRef> {
    let (window, display) = offscreen_window();
    match device.create_swap_chain(&gfx::SwapChainDesc {
        present_queue: queue.clone(),
        window,
        display,
        width,
        height,
        back_buffer_count,
        format: gfx::TextureFormat::Rgba8Unorm,
        enable_sync: false,
    }) {
        Ok(swap_chain) => Some(swap_chain),
        Err(err) => {
            log::warn!("skipping swapchain case; creation failed: {}", err);
            None
        }
    }
}

/// Spec scenario: ten cleared frames through a two-buffer swapchain.
pub fn clear_screen_smoke<T: TestDriver>(driver: &T) {
    driver.for_each_device(&mut |device| {
        let queue = direct_queue(device);
        let Some(mut swap_chain) = make_swap_chain(device, &queue, 1280, 720, 2) else {
            return;
        };
        let fence = device.create_fence(0).unwrap();

        for frame in 1..=10u64 {
            let back_buffer = swap_chain.acquire_next().unwrap();
            let view = device
                .create_texture_view(&gfx::TextureViewDesc {
                    texture: back_buffer.clone(),
                    dim: gfx::TextureViewDimension::Dim2D,
                    format: back_buffer.desc().format,
                    range: gfx::SubresourceRange::first(),
                    usage: gfx::TextureUsage::RENDER_TARGET,
                })
                .unwrap();

            let mut cb = device.create_command_buffer(&queue).unwrap();
            cb.begin().unwrap();
            cb.resource_barrier(
                &[],
                &[gfx::TextureBarrier {
                    texture: &back_buffer,
                    before: gfx::TextureUsage::UNINITIALIZED,
                    after: gfx::TextureUsage::RENDER_TARGET,
                    range: None,
                    queue_transfer: None,
                }],
            );
            let encoder = cb
                .begin_render_pass(&gfx::RenderPassDesc {
                    color_attachments: vec![gfx::ColorAttachment {
                        target: view,
                        load: gfx::LoadOp::Clear,
                        store: gfx::StoreOp::Store,
                        clear_value: gfx::ColorClearValue {
                            r: 0.1,
                            g: 0.1,
                            b: 0.1,
                            a: 1.0,
                        },
                    }],
                    depth_stencil_attachment: None,
                    name: "clear".into(),
                })
                .unwrap();
            cb.end_render_pass(encoder);
            cb.resource_barrier(
                &[],
                &[gfx::TextureBarrier {
                    texture: &back_buffer,
                    before: gfx::TextureUsage::RENDER_TARGET,
                    after: gfx::TextureUsage::PRESENT,
                    range: None,
                    queue_transfer: None,
                }],
            );
            cb.end().unwrap();
            queue
                .submit(gfx::SubmitDesc {
                    command_buffers: &[&*cb],
                    signal_fences: &[(&fence, frame)],
                    ..Default::default()
                })
                .unwrap();
            swap_chain.present().unwrap();
            fence.wait(frame).unwrap();
        }
        queue.wait_idle().unwrap();
    });
}

/// Over `N * back_buffer_count` frames, every back-buffer index must be
/// returned exactly `N` times — though not necessarily in order.
pub fn swapchain_indices_form_permutation<T: TestDriver>(driver: &T) {
    driver.for_each_device(&mut |device| {
        let queue = direct_queue(device);
        let count = 3u32;
        let rounds = 4u32;
        let Some(mut swap_chain) = make_swap_chain(device, &queue, 640, 480, count) else {
            return;
        };

        let mut seen = vec![0u32; count as usize];
        for _ in 0..count * rounds {
            let _ = swap_chain.acquire_next().unwrap();
            let index = swap_chain.current_back_buffer_index();
            assert!(index < count);
            seen[index as usize] += 1;
            swap_chain.present().unwrap();
        }
        assert!(seen.iter().all(|&n| n == rounds), "indices {:?}", seen);
        queue.wait_idle().unwrap();
    });
}

/// Spec scenario: resize destroys the back buffers, recreates the native
/// swapchain at the new extent, and restarts frame accounting.
pub fn swapchain_recreation<T: TestDriver>(driver: &T) {
    driver.for_each_device(&mut |device| {
        let queue = direct_queue(device);
        let Some(mut swap_chain) = make_swap_chain(device, &queue, 800, 600, 2) else {
            return;
        };

        let first = swap_chain.acquire_next().unwrap();
        assert_eq!(first.desc().width, 800);
        swap_chain.present().unwrap();
        drop(first);
        queue.wait_idle().unwrap();

        swap_chain.resize(400, 300).unwrap();
        assert_eq!(swap_chain.desc().width, 400);
        assert_eq!(swap_chain.desc().height, 300);

        let next = swap_chain.acquire_next().unwrap();
        assert_eq!(next.desc().width, 400);
        assert_eq!(next.desc().height, 300);
        swap_chain.present().unwrap();
        queue.wait_idle().unwrap();
    });
}
