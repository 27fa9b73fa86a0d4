//! Integration test: descriptor set binds, barriers and render pass translation.
//!
//! Run with: cargo test -p glvk-command --test descriptors_and_passes

mod common;

use ash::vk;
use common::*;
use glvk_command::barrier::barrier_bits;
use glvk_command::{
    AccessBarrier, BeginInfo, ClearValue, CommandBuffer, CommandBufferLevel, CommandError,
    RenderPassBegin,
};
use glvk_core::descriptor::{DescriptorInfo, WriteDescriptorSet};
use glvk_core::renderpass::SubpassDescription;
use glvk_core::resource::SamplerInfo;
use glvk_core::GlvkConfig;
use glvk_protocol::gl::{self, BarrierBits};
use glvk_protocol::records::CLEAR_FLOAT;
use glvk_protocol::Command;

#[test]
fn test_descriptor_resolves_to_reworked_index() {
    let device = make_device();
    let set_layout = device
        .create_descriptor_set_layout(vec![
            layout_binding(0, vk::DescriptorType::UNIFORM_BUFFER, 3),
            layout_binding(1, vk::DescriptorType::UNIFORM_BUFFER, 2),
            layout_binding(2, vk::DescriptorType::UNIFORM_BUFFER, 1),
            layout_binding(3, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 1),
        ])
        .unwrap();
    let layout = device
        .create_pipeline_layout(vec![set_layout.clone()], Vec::new())
        .unwrap();
    let set = device.allocate_descriptor_set(&set_layout);
    let uniforms = buffer(&device, 512);
    let sampler = device.create_sampler(SamplerInfo::default()).unwrap();
    let (_, framebuffer) = color_pass(&device, 16, 16);
    let view = framebuffer.attachments[0].clone();

    set.write(&[
        WriteDescriptorSet {
            binding: 2,
            first_element: 0,
            infos: vec![DescriptorInfo::Buffer {
                buffer: uniforms.clone(),
                offset: 128,
                range: 64,
            }],
        },
        WriteDescriptorSet {
            binding: 3,
            first_element: 0,
            infos: vec![DescriptorInfo::Image {
                view: Some(view.clone()),
                sampler: Some(sampler.clone()),
            }],
        },
    ])
    .unwrap();

    let mut cmd = CommandBuffer::new(device.clone(), CommandBufferLevel::Primary);
    cmd.begin(BeginInfo::default()).unwrap();
    cmd.bind_descriptor_sets(vk::PipelineBindPoint::GRAPHICS, &layout, 0, &[set], &[])
        .unwrap();
    cmd.end().unwrap();

    let commands = decode(cmd.stream());
    assert_eq!(commands.len(), 2);
    match commands[0] {
        Command::BindBufferRange(r) => {
            assert_eq!(r.index, 5);
            assert_eq!(r.target, gl::UNIFORM_BUFFER);
            assert_eq!(r.buffer, uniforms.gl_name);
            assert_eq!((r.offset, r.size), (128, 64));
        }
        other => panic!("unexpected {:?}", other),
    }
    match commands[1] {
        Command::BindTexture(r) => {
            assert_eq!(r.unit, 0);
            assert_eq!(r.texture, view.gl_name);
            assert_eq!(r.target, gl::TEXTURE_2D);
            assert_eq!(r.sampler, sampler.gl_name);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_dynamic_offsets_apply_in_binding_order() {
    let device = make_device();
    let set_layout = device
        .create_descriptor_set_layout(vec![
            layout_binding(0, vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC, 2),
            layout_binding(1, vk::DescriptorType::STORAGE_BUFFER_DYNAMIC, 1),
        ])
        .unwrap();
    let layout = device
        .create_pipeline_layout(vec![set_layout.clone()], Vec::new())
        .unwrap();
    let set = device.allocate_descriptor_set(&set_layout);
    let data = buffer(&device, 4096);
    let info = |offset| DescriptorInfo::Buffer {
        buffer: data.clone(),
        offset,
        range: 256,
    };
    set.write(&[
        WriteDescriptorSet {
            binding: 0,
            first_element: 0,
            infos: vec![info(0), info(256)],
        },
        WriteDescriptorSet {
            binding: 1,
            first_element: 0,
            infos: vec![info(0)],
        },
    ])
    .unwrap();

    let mut cmd = CommandBuffer::new(device.clone(), CommandBufferLevel::Primary);
    cmd.begin(BeginInfo::default()).unwrap();
    assert!(matches!(
        cmd.bind_descriptor_sets(
            vk::PipelineBindPoint::COMPUTE,
            &layout,
            0,
            std::slice::from_ref(&set),
            &[512]
        ),
        Err(CommandError::DynamicOffsetCount {
            expected: 3,
            got: 1
        })
    ));
    cmd.bind_descriptor_sets(
        vk::PipelineBindPoint::COMPUTE,
        &layout,
        0,
        std::slice::from_ref(&set),
        &[1024, 2048, 3072],
    )
    .unwrap();
    cmd.end().unwrap();

    let ranges: Vec<(u32, u32, u64)> = decode(cmd.stream())
        .iter()
        .map(|c| match c {
            Command::BindBufferRange(r) => (r.target, r.index, r.offset),
            other => panic!("unexpected {:?}", other),
        })
        .collect();
    assert_eq!(
        ranges,
        vec![
            (gl::UNIFORM_BUFFER, 0, 1024),
            (gl::UNIFORM_BUFFER, 1, 256 + 2048),
            (gl::SHADER_STORAGE_BUFFER, 0, 3072),
        ]
    );
}

#[test]
fn test_barrier_translation() {
    assert_eq!(barrier_bits(vk::AccessFlags::MEMORY_READ), BarrierBits::ALL);
    assert_eq!(barrier_bits(vk::AccessFlags::empty()), BarrierBits::empty());
    assert_eq!(
        barrier_bits(vk::AccessFlags::INDEX_READ | vk::AccessFlags::UNIFORM_READ),
        BarrierBits::ELEMENT_ARRAY | BarrierBits::UNIFORM
    );

    let device = make_device();
    let mut cmd = CommandBuffer::new(device, CommandBufferLevel::Primary);
    cmd.begin(BeginInfo::default()).unwrap();
    // Source-only masks produce nothing
    cmd.pipeline_barrier(
        vk::PipelineStageFlags::TRANSFER,
        vk::PipelineStageFlags::TRANSFER,
        &[AccessBarrier::new(vk::AccessFlags::TRANSFER_WRITE, vk::AccessFlags::empty())],
    )
    .unwrap();
    cmd.pipeline_barrier(
        vk::PipelineStageFlags::COMPUTE_SHADER,
        vk::PipelineStageFlags::FRAGMENT_SHADER,
        &[
            AccessBarrier::new(vk::AccessFlags::SHADER_WRITE, vk::AccessFlags::SHADER_READ),
            AccessBarrier::new(vk::AccessFlags::SHADER_WRITE, vk::AccessFlags::INDIRECT_COMMAND_READ),
        ],
    )
    .unwrap();
    cmd.end().unwrap();

    let commands = decode(cmd.stream());
    assert_eq!(commands.len(), 1);
    match commands[0] {
        Command::MemoryBarrier(r) => assert_eq!(
            BarrierBits::from_bits_retain(r.bits),
            BarrierBits::TEXTURE_FETCH
                | BarrierBits::SHADER_IMAGE_ACCESS
                | BarrierBits::SHADER_STORAGE
                | BarrierBits::COMMAND
        ),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_render_pass_binds_and_clears() {
    let device = make_device();
    let (render_pass, framebuffer) = color_pass(&device, 40, 30);
    let mut cmd = CommandBuffer::new(device.clone(), CommandBufferLevel::Primary);
    cmd.begin(BeginInfo::default()).unwrap();

    let begin = RenderPassBegin {
        render_pass: render_pass.clone(),
        framebuffer: framebuffer.clone(),
        render_area: full_area(40, 30),
        clear_values: vec![ClearValue::Color([0.25, 0.5, 0.75, 1.0])],
    };
    cmd.begin_render_pass(&begin).unwrap();
    assert!(matches!(
        cmd.begin_render_pass(&begin),
        Err(CommandError::RenderPassActive)
    ));
    assert!(matches!(cmd.next_subpass(), Err(CommandError::NoMoreSubpasses(0))));
    cmd.end_render_pass().unwrap();
    cmd.begin_render_pass(&begin).unwrap();
    cmd.end_render_pass().unwrap();
    cmd.end().unwrap();

    let commands = decode(cmd.stream());
    assert_eq!(
        names(cmd.stream()),
        vec![
            "BindFramebuffer",
            "SetScissor",
            "ClearColor",
            "BindFramebuffer",
            "SetScissor",
            "ClearColor"
        ]
    );
    match commands[0] {
        Command::BindFramebuffer(r) => {
            assert_eq!(r.framebuffer, framebuffer.subpass_framebuffers[0]);
            assert_eq!(r.draw_buffer_count, 1);
        }
        other => panic!("unexpected {:?}", other),
    }
    match commands[1] {
        Command::SetScissor(r) => assert_eq!((r.x, r.y, r.width, r.height), (0, 0, 40, 30)),
        other => panic!("unexpected {:?}", other),
    }
    match commands[2] {
        Command::ClearColor(r) => {
            assert_eq!(r.draw_buffer, 0);
            assert_eq!(r.kind, CLEAR_FLOAT);
            assert_eq!(r.value, [0.25f32, 0.5, 0.75, 1.0].map(f32::to_bits));
        }
        other => panic!("unexpected {:?}", other),
    }

    // Defaults are restored once per buffer, after the main stream
    assert_eq!(names(cmd.after_stream()), vec!["RestoreDefaults"]);
}

#[test]
fn test_render_pass_validation() {
    let device = make_device();
    let (render_pass, framebuffer) = color_pass(&device, 8, 8);
    let mut cmd = CommandBuffer::new(device.clone(), CommandBufferLevel::Primary);
    cmd.begin(BeginInfo::default()).unwrap();

    assert!(matches!(
        cmd.begin_render_pass(&RenderPassBegin {
            render_pass: render_pass.clone(),
            framebuffer: framebuffer.clone(),
            render_area: full_area(8, 8),
            clear_values: Vec::new(),
        }),
        Err(CommandError::ClearValueCount {
            expected: 1,
            got: 0
        })
    ));
    assert!(matches!(cmd.end_render_pass(), Err(CommandError::NoRenderPass)));

    let mut secondary = CommandBuffer::new(device, CommandBufferLevel::Secondary);
    secondary.begin(BeginInfo::default()).unwrap();
    assert!(matches!(
        secondary.begin_render_pass(&RenderPassBegin {
            render_pass,
            framebuffer,
            render_area: full_area(8, 8),
            clear_values: vec![ClearValue::Color([0.0; 4])],
        }),
        Err(CommandError::InvalidArgument(_))
    ));
}

#[test]
fn test_restore_defaults_can_be_disabled() {
    let mut config = GlvkConfig::default();
    config.replay.restore_defaults = false;
    let device = make_device_with(config, Vec::new());
    let (render_pass, framebuffer) = color_pass(&device, 8, 8);

    let mut cmd = CommandBuffer::new(device.clone(), CommandBufferLevel::Primary);
    cmd.begin(BeginInfo::default()).unwrap();
    cmd.begin_render_pass(&RenderPassBegin {
        render_pass,
        framebuffer,
        render_area: full_area(8, 8),
        clear_values: vec![ClearValue::Color([0.0; 4])],
    })
    .unwrap();
    cmd.end_render_pass().unwrap();
    cmd.end().unwrap();
    assert!(cmd.after_stream().is_empty());
}

#[test]
fn test_later_subpass_clears_with_begin_values() {
    let device = make_device();
    let render_pass = device
        .create_render_pass(
            vec![color_attachment(), color_attachment()],
            vec![
                SubpassDescription {
                    color: vec![Some(0)],
                    ..Default::default()
                },
                SubpassDescription {
                    color: vec![Some(0), Some(1)],
                    ..Default::default()
                },
            ],
        )
        .unwrap();
    let views = vec![color_view(&device, 16, 16), color_view(&device, 16, 16)];
    let framebuffer = device
        .create_framebuffer(&render_pass, views, 16, 16, 1)
        .unwrap();

    let mut cmd = CommandBuffer::new(device.clone(), CommandBufferLevel::Primary);
    cmd.begin(BeginInfo::default()).unwrap();
    cmd.begin_render_pass(&RenderPassBegin {
        render_pass,
        framebuffer: framebuffer.clone(),
        render_area: full_area(16, 16),
        clear_values: vec![
            ClearValue::Color([1.0, 0.0, 0.0, 1.0]),
            ClearValue::Color([0.0, 0.0, 1.0, 1.0]),
        ],
    })
    .unwrap();
    cmd.next_subpass().unwrap();
    cmd.end_render_pass().unwrap();
    cmd.end().unwrap();

    assert_eq!(
        names(cmd.stream()),
        vec![
            "BindFramebuffer",
            "SetScissor",
            "ClearColor",
            "BindFramebuffer",
            "SetScissor",
            "ClearColor"
        ]
    );
    let commands = decode(cmd.stream());
    match commands[3] {
        Command::BindFramebuffer(r) => {
            assert_eq!(r.framebuffer, framebuffer.subpass_framebuffers[1]);
            assert_eq!(r.draw_buffer_count, 2);
        }
        other => panic!("unexpected {:?}", other),
    }
    // Attachment 0 was cleared in subpass 0; only attachment 1 clears here
    match commands[5] {
        Command::ClearColor(r) => {
            assert_eq!(r.draw_buffer, 1);
            assert_eq!(r.value, [0.0f32, 0.0, 1.0, 1.0].map(f32::to_bits));
        }
        other => panic!("unexpected {:?}", other),
    }
}
