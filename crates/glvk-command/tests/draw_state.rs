//! Integration test: pipeline binds, geometry resolution, draws and push constants.
//!
//! Run with: cargo test -p glvk-command --test draw_state

mod common;

use std::sync::Arc;

use ash::vk;
use common::*;
use glvk_command::{BeginInfo, ClearValue, CommandBuffer, CommandBufferLevel, CommandError, RenderPassBegin};
use glvk_core::pipeline::PushConstantRange;
use glvk_core::reflect::PushConstantMember;
use glvk_core::GlvkConfig;
use glvk_protocol::records::DEFAULT_GEOMETRY;
use glvk_protocol::{gl, Command, UniformType};

fn recording_in_pass(device: &Arc<glvk_core::Device>) -> CommandBuffer {
    let (render_pass, framebuffer) = color_pass(device, 64, 64);
    let mut cmd = CommandBuffer::new(device.clone(), CommandBufferLevel::Primary);
    cmd.begin(BeginInfo::default()).unwrap();
    cmd.begin_render_pass(&RenderPassBegin {
        render_pass,
        framebuffer,
        render_area: full_area(64, 64),
        clear_values: vec![ClearValue::Color([0.0; 4])],
    })
    .unwrap();
    cmd
}

fn finish(cmd: &mut CommandBuffer) -> Vec<Command> {
    cmd.end_render_pass().unwrap();
    cmd.end().unwrap();
    decode(cmd.stream())
}

fn geometry_binds(commands: &[Command]) -> Vec<u64> {
    commands
        .iter()
        .filter_map(|c| match c {
            Command::BindGeometry(r) => Some(r.geometry),
            _ => None,
        })
        .collect()
}

#[test]
fn test_identical_bindings_reuse_geometry() {
    let device = make_device();
    let layout = empty_layout(&device);
    let pipeline = graphics_pipeline(&device, &layout, vertex_input(true));
    let vertices = buffer(&device, 1024);

    let mut cmd = recording_in_pass(&device);
    cmd.bind_pipeline(&pipeline).unwrap();
    cmd.bind_vertex_buffers(0, &[(vertices.clone(), 0)]).unwrap();
    cmd.draw(3, 1, 0, 0).unwrap();
    cmd.draw(3, 1, 3, 0).unwrap();
    // Rebinding the same buffer resolves to the same entry
    cmd.bind_vertex_buffers(0, &[(vertices.clone(), 0)]).unwrap();
    cmd.draw(3, 1, 6, 0).unwrap();
    let commands = finish(&mut cmd);

    let binds = geometry_binds(&commands);
    assert_eq!(binds.len(), 1);
    assert_ne!(binds[0], DEFAULT_GEOMETRY);
    assert_eq!(device.geometry_cache().len(), 1);
    assert!(cmd.resources().geometry(binds[0]).is_some());

    // A second buffer recorded later reuses the cached entry too
    let mut again = recording_in_pass(&device);
    again.bind_pipeline(&pipeline).unwrap();
    again.bind_vertex_buffers(0, &[(vertices, 0)]).unwrap();
    again.draw(3, 1, 0, 0).unwrap();
    let commands = finish(&mut again);
    assert_eq!(geometry_binds(&commands), binds);
    assert_eq!(device.geometry_cache().stats().created, 1);
}

#[test]
fn test_changed_bindings_emit_new_geometry() {
    let device = make_device();
    let layout = empty_layout(&device);
    let pipeline = graphics_pipeline(&device, &layout, vertex_input(true));
    let first = buffer(&device, 256);
    let second = buffer(&device, 256);

    let mut cmd = recording_in_pass(&device);
    cmd.bind_pipeline(&pipeline).unwrap();
    cmd.bind_vertex_buffers(0, &[(first, 0)]).unwrap();
    cmd.draw(3, 1, 0, 0).unwrap();
    cmd.bind_vertex_buffers(0, &[(second, 64)]).unwrap();
    cmd.draw(3, 1, 0, 0).unwrap();
    let commands = finish(&mut cmd);

    let binds = geometry_binds(&commands);
    assert_eq!(binds.len(), 2);
    assert_ne!(binds[0], binds[1]);
    assert_eq!(cmd.resources().geometry_count(), 2);
}

#[test]
fn test_pipeline_without_vertex_input_uses_default_geometry() {
    let device = make_device();
    let layout = empty_layout(&device);
    let with_input = graphics_pipeline(&device, &layout, vertex_input(true));
    let without_input = graphics_pipeline(&device, &layout, vertex_input(false));
    let vertices = buffer(&device, 256);

    let mut cmd = recording_in_pass(&device);
    cmd.bind_pipeline(&without_input).unwrap();
    cmd.draw(3, 1, 0, 0).unwrap();
    cmd.bind_vertex_buffers(0, &[(vertices, 0)]).unwrap();
    cmd.bind_pipeline(&with_input).unwrap();
    cmd.draw(3, 1, 0, 0).unwrap();
    // Switching back changes the vertex-input hash again
    cmd.bind_pipeline(&without_input).unwrap();
    cmd.draw(3, 1, 0, 0).unwrap();
    let commands = finish(&mut cmd);

    let binds = geometry_binds(&commands);
    assert_eq!(binds.len(), 3);
    assert_eq!(binds[0], DEFAULT_GEOMETRY);
    assert_ne!(binds[1], DEFAULT_GEOMETRY);
    assert_eq!(binds[2], DEFAULT_GEOMETRY);
}

#[test]
fn test_draw_emits_program_then_geometry_then_draw() {
    let device = make_device();
    let layout = empty_layout(&device);
    let pipeline = graphics_pipeline(&device, &layout, vertex_input(false));

    let mut cmd = recording_in_pass(&device);
    cmd.bind_pipeline(&pipeline).unwrap();
    cmd.draw(4, 2, 1, 0).unwrap();
    let commands = finish(&mut cmd);

    let kinds: Vec<&str> = commands.iter().map(|c| c.kind().name()).collect();
    let program = kinds.iter().position(|k| *k == "BindProgram").unwrap();
    let geometry = kinds.iter().position(|k| *k == "BindGeometry").unwrap();
    let draw = kinds.iter().position(|k| *k == "Draw").unwrap();
    assert!(program < geometry && geometry < draw);
    // Viewport and scissor are dynamic in the test pipelines
    assert!(!kinds.contains(&"SetViewport"));

    match commands[draw] {
        Command::Draw(r) => {
            assert_eq!(r.mode, gl::TRIANGLES);
            assert_eq!(r.vertex_count, 4);
            assert_eq!(r.instance_count, 2);
            assert_eq!(r.first_vertex, 1);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_draw_preconditions() {
    let device = make_device();
    let layout = empty_layout(&device);
    let pipeline = graphics_pipeline(&device, &layout, vertex_input(false));

    let mut outside = CommandBuffer::new(device.clone(), CommandBufferLevel::Primary);
    outside.begin(BeginInfo::default()).unwrap();
    outside.bind_pipeline(&pipeline).unwrap();
    assert!(matches!(outside.draw(3, 1, 0, 0), Err(CommandError::NoRenderPass)));

    let mut cmd = recording_in_pass(&device);
    assert!(matches!(
        cmd.draw(3, 1, 0, 0),
        Err(CommandError::NoPipeline("graphics"))
    ));
    cmd.bind_pipeline(&pipeline).unwrap();
    assert!(matches!(
        cmd.draw_indexed(3, 1, 0, 0, 0),
        Err(CommandError::NoIndexBuffer)
    ));
    assert!(matches!(cmd.dispatch(1, 1, 1), Err(CommandError::RenderPassActive)));
}

#[test]
fn test_draw_indexed_offsets_by_first_index() {
    let device = make_device();
    let layout = empty_layout(&device);
    let pipeline = graphics_pipeline(&device, &layout, vertex_input(true));
    let vertices = buffer(&device, 1024);
    let indices = buffer(&device, 1024);

    let mut cmd = recording_in_pass(&device);
    cmd.bind_pipeline(&pipeline).unwrap();
    cmd.bind_vertex_buffers(0, &[(vertices, 0)]).unwrap();
    cmd.bind_index_buffer(&indices, 8, vk::IndexType::UINT16).unwrap();
    cmd.draw_indexed(6, 1, 3, -2, 0).unwrap();
    assert!(matches!(
        cmd.draw_indexed_indirect(&indices, 0, 1, 20),
        Err(CommandError::InvalidArgument(_))
    ));
    let commands = finish(&mut cmd);

    let draw = commands
        .iter()
        .find_map(|c| match c {
            Command::DrawIndexed(r) => Some(*r),
            _ => None,
        })
        .unwrap();
    assert_eq!(draw.offset, 8 + 3 * 2);
    assert_eq!(draw.index_type, gl::UNSIGNED_SHORT);
    assert_eq!(draw.index_count, 6);
    assert_eq!(draw.base_vertex, -2);

    let geometry = geometry_binds(&commands)[0];
    let entry = cmd.resources().geometry(geometry).unwrap();
    assert_eq!(entry.layout().element_buffer, Some(indices.gl_name));
}

#[test]
fn test_dispatch_needs_compute_pipeline() {
    let device = make_device();
    let layout = empty_layout(&device);
    let pipeline = compute_pipeline(&device, &layout);
    let args = buffer(&device, 64);

    let mut cmd = CommandBuffer::new(device.clone(), CommandBufferLevel::Primary);
    cmd.begin(BeginInfo::default()).unwrap();
    assert!(matches!(
        cmd.dispatch(1, 1, 1),
        Err(CommandError::NoPipeline("compute"))
    ));
    cmd.bind_pipeline(&pipeline).unwrap();
    cmd.dispatch(8, 4, 1).unwrap();
    cmd.dispatch_indirect(&args, 16).unwrap();
    cmd.end().unwrap();

    assert_eq!(
        names(cmd.stream()),
        vec!["BindProgram", "Dispatch", "DispatchIndirect"]
    );
    match decode(cmd.stream())[0] {
        Command::BindProgram(r) => {
            assert_eq!(r.program, pipeline.program);
            assert_eq!(r.bind_point, glvk_protocol::records::BIND_POINT_COMPUTE);
        }
        other => panic!("unexpected {:?}", other),
    }
}

fn push_device() -> Arc<glvk_core::Device> {
    let member = PushConstantMember {
        name: "scale".into(),
        offset: 0,
        ty: UniformType::Vec4,
        array_size: 1,
        location: 3,
    };
    make_device_with(
        GlvkConfig::default(),
        vec![shader(
            vk::ShaderStageFlags::COMPUTE,
            Vec::new(),
            vec![member],
        )],
    )
}

fn vec4_bytes(values: [f32; 4]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

fn push_records(commands: &[Command]) -> Vec<(usize, [u32; 16])> {
    commands
        .iter()
        .enumerate()
        .filter_map(|(i, c)| match c {
            Command::PushConstant(r) => {
                assert_eq!(r.location, 3);
                assert_eq!(r.count, 4);
                Some((i, r.data))
            }
            _ => None,
        })
        .collect()
}

#[test]
fn test_push_constants_queue_until_first_pipeline() {
    let device = push_device();
    let layout = push_layout(&device, 16);
    let pipeline = compute_pipeline(&device, &layout);

    let mut cmd = CommandBuffer::new(device.clone(), CommandBufferLevel::Primary);
    cmd.begin(BeginInfo::default()).unwrap();
    cmd.push_constants(&layout, vk::ShaderStageFlags::COMPUTE, 0, &vec4_bytes([1.0, 2.0, 3.0, 4.0]))
        .unwrap();
    assert_eq!(cmd.recorded_words(), 0);

    cmd.bind_pipeline(&pipeline).unwrap();
    cmd.push_constants(&layout, vk::ShaderStageFlags::COMPUTE, 0, &vec4_bytes([5.0, 6.0, 7.0, 8.0]))
        .unwrap();
    cmd.end().unwrap();

    let commands = decode(cmd.stream());
    assert!(matches!(commands[0], Command::BindProgram(_)));
    let pushes = push_records(&commands);
    assert_eq!(pushes.len(), 2);
    // The queued write lands right after the program bind
    assert_eq!(pushes[0].0, 1);
    assert_eq!(pushes[0].1[..4], [1.0f32, 2.0, 3.0, 4.0].map(f32::to_bits));
    assert_eq!(pushes[1].1[..4], [5.0f32, 6.0, 7.0, 8.0].map(f32::to_bits));
}

#[test]
fn test_pipeline_switch_reapplies_push_constants() {
    let device = push_device();
    let layout = push_layout(&device, 16);
    let first = compute_pipeline(&device, &layout);
    let second = compute_pipeline(&device, &layout);

    let mut cmd = CommandBuffer::new(device.clone(), CommandBufferLevel::Primary);
    cmd.begin(BeginInfo::default()).unwrap();
    cmd.bind_pipeline(&first).unwrap();
    cmd.push_constants(&layout, vk::ShaderStageFlags::COMPUTE, 0, &vec4_bytes([0.5; 4]))
        .unwrap();
    cmd.bind_pipeline(&second).unwrap();
    cmd.end().unwrap();

    let commands = decode(cmd.stream());
    let kinds: Vec<&str> = commands.iter().map(|c| c.kind().name()).collect();
    assert_eq!(
        kinds,
        vec!["BindProgram", "PushConstant", "BindProgram", "PushConstant"]
    );
    let pushes = push_records(&commands);
    assert_eq!(pushes[1].1[..4], [0.5f32; 4].map(f32::to_bits));
}

#[test]
fn test_push_constant_validation() {
    let device = push_device();
    let layout = push_layout(&device, 16);
    let mut cmd = CommandBuffer::new(device.clone(), CommandBufferLevel::Primary);
    cmd.begin(BeginInfo::default()).unwrap();

    let stages = vk::ShaderStageFlags::COMPUTE;
    assert!(matches!(
        cmd.push_constants(&layout, stages, 2, &[0; 4]),
        Err(CommandError::InvalidArgument(_))
    ));
    assert!(matches!(
        cmd.push_constants(&layout, stages, 0, &[0; 6]),
        Err(CommandError::InvalidArgument(_))
    ));
    // Outside the layout's single 16-byte range
    assert!(matches!(
        cmd.push_constants(&layout, stages, 16, &[0; 4]),
        Err(CommandError::InvalidArgument(_))
    ));
    assert!(matches!(
        cmd.push_constants(&layout, stages, 252, &[0; 8]),
        Err(CommandError::InvalidArgument(_))
    ));
}

#[test]
fn test_offsets_near_u32_max_are_rejected() {
    let device = push_device();
    let layout = push_layout(&device, 16);
    let pool = device
        .create_query_pool(vk::QueryType::OCCLUSION, 4)
        .unwrap();
    let mut cmd = CommandBuffer::new(device.clone(), CommandBufferLevel::Primary);
    cmd.begin(BeginInfo::default()).unwrap();

    assert!(matches!(
        cmd.push_constants(&layout, vk::ShaderStageFlags::COMPUTE, u32::MAX - 3, &[0; 8]),
        Err(CommandError::InvalidArgument(_))
    ));
    assert!(matches!(
        cmd.reset_query_pool(&pool, u32::MAX, 2),
        Err(CommandError::InvalidArgument(_))
    ));
    let viewport = vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: 8.0,
        height: 8.0,
        min_depth: 0.0,
        max_depth: 1.0,
    };
    assert!(matches!(
        cmd.set_viewport(u32::MAX, &[viewport, viewport]),
        Err(CommandError::InvalidArgument(_))
    ));
    assert!(matches!(
        cmd.set_scissor(u32::MAX, &[full_area(8, 8), full_area(8, 8)]),
        Err(CommandError::InvalidArgument(_))
    ));
    // Nothing was recorded by the rejected calls
    cmd.end().unwrap();
    assert!(cmd.stream().is_empty());

    let overflowing = device.create_pipeline_layout(
        Vec::new(),
        vec![PushConstantRange {
            stages: vk::ShaderStageFlags::ALL,
            offset: u32::MAX - 3,
            size: 8,
        }],
    );
    assert!(overflowing.is_err());
}
