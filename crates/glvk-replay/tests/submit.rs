//! Integration test: queue submission against a recording context.
//!
//! Run with: cargo test -p glvk-replay --test submit

mod common;

use ash::vk;
use common::*;
use glvk_command::{BeginInfo, CommandBuffer, CommandBufferLevel, CommandBufferState, CommandError};
use glvk_core::geometry::GeometryLayout;
use glvk_core::memory::PendingUpload;
use glvk_core::objects::GlObject;
use glvk_core::GlvkConfig;
use glvk_replay::{BackendError, GlBackend, GlCall, ReplayError};

#[test]
fn test_uploads_run_before_the_stream_and_defaults_after() {
    let h = Harness::new();
    let pipeline = graphics_pipeline(&h.device, true);
    let vertices = bound_buffer(
        &h.device,
        64,
        0,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    );
    let data: Vec<u8> = (0..64).collect();
    {
        let memory = vertices.memory().unwrap().memory.clone();
        let mut mapped = memory.lock(0, vk::WHOLE_SIZE).unwrap();
        mapped.as_mut_slice().copy_from_slice(&data);
        // Coherent memory flushes on unlock
    }

    let cmd = frame(&h.device, BeginInfo::default(), &pipeline, Some(&vertices), 2);
    h.take_calls();
    let stats = h.submit(&cmd);
    let calls = h.take_calls();

    assert_eq!(stats.uploads, 1);
    assert_eq!(
        calls[0],
        GlCall::BufferSubData {
            buffer: vertices.gl_name,
            offset: 0,
            len: 64
        }
    );
    assert!(matches!(calls[1], GlCall::BindDrawFramebuffer { .. }));
    assert_eq!(h.buffer_contents(&vertices), data);

    let n = calls.len();
    assert_eq!(calls[n - 3], GlCall::UseProgram(0));
    assert_eq!(calls[n - 2], GlCall::BindVertexArray(0));
    assert_eq!(
        calls[n - 1],
        GlCall::BindDrawFramebuffer {
            framebuffer: 0,
            draw_buffer_count: 1
        }
    );
    assert_eq!(calls.iter().filter(|c| c.is_work()).count(), 2);
}

#[test]
fn test_stats_count_records_and_calls() {
    let h = Harness::new();
    let pipeline = graphics_pipeline(&h.device, true);
    let vertices = buffer(&h.device, 256);
    let cmd = frame(&h.device, BeginInfo::default(), &pipeline, Some(&vertices), 3);
    let records = cmd.stream().validate().unwrap() + cmd.after_stream().validate().unwrap();

    h.take_calls();
    let stats = h.submit(&cmd);
    let calls = h.take_calls();

    assert_eq!(stats.records, records);
    assert_eq!(stats.calls, calls.len());
    assert_eq!(stats.vaos_created, 1);
    assert_eq!(stats.uploads, 0);
    assert_eq!(h.queue.submissions(), 1);
}

#[test]
fn test_vertex_array_created_once_then_retired() {
    let h = Harness::new();
    let pipeline = graphics_pipeline(&h.device, true);
    let vertices = buffer(&h.device, 256);
    let cmd = frame(&h.device, BeginInfo::default(), &pipeline, Some(&vertices), 1);

    h.take_calls();
    let first = h.submit(&cmd);
    let calls = h.take_calls();
    assert_eq!(first.vaos_created, 1);
    let vao = calls
        .iter()
        .find_map(|c| match c {
            GlCall::CreateVertexArray { name, .. } => Some(*name),
            _ => None,
        })
        .unwrap();
    let bind = position(&calls, |c| *c == GlCall::BindVertexArray(vao)).unwrap();
    let draw = position(&calls, GlCall::is_work).unwrap();
    assert!(bind < draw);

    // Resubmitting reuses the vertex array
    let second = h.submit(&cmd);
    assert_eq!(second.vaos_created, 0);
    assert!(!h
        .take_calls()
        .iter()
        .any(|c| matches!(c, GlCall::CreateVertexArray { .. })));

    // Destroying the vertex buffer and dropping the last user retires it
    h.device.destroy_buffer(&vertices);
    drop(cmd);
    let plain = graphics_pipeline(&h.device, false);
    let next = frame(&h.device, BeginInfo::default(), &plain, None, 1);
    h.take_calls();
    let stats = h.submit(&next);
    assert_eq!(stats.vaos_deleted, 1);
    assert_eq!(h.take_calls()[0], GlCall::DeleteVertexArray(vao));
}

#[test]
fn test_draws_without_vertex_input_share_one_empty_vertex_array() {
    let h = Harness::new();
    let pipeline = graphics_pipeline(&h.device, false);
    let a = frame(&h.device, BeginInfo::default(), &pipeline, None, 2);
    let b = frame(&h.device, BeginInfo::default(), &pipeline, None, 1);

    h.take_calls();
    h.submit(&a);
    h.submit(&b);
    let calls = h.take_calls();

    let created: Vec<_> = calls
        .iter()
        .filter_map(|c| match c {
            GlCall::CreateVertexArray { name, layout } => Some((*name, layout.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(created.len(), 1);
    let (empty, layout) = &created[0];
    assert_eq!(*layout, GeometryLayout::default());
    assert_eq!(
        calls
            .iter()
            .filter(|c| **c == GlCall::BindVertexArray(*empty))
            .count(),
        2
    );
}

#[test]
fn test_one_time_buffers_submit_once() {
    let h = Harness::new();
    let pipeline = graphics_pipeline(&h.device, false);
    let cmd = frame(&h.device, BeginInfo::one_time(), &pipeline, None, 1);

    h.submit(&cmd);
    assert_eq!(cmd.state(), CommandBufferState::Invalid);
    h.take_calls();
    let again = h.queue.submit(&cmd, &h.context);
    assert!(matches!(
        again,
        Err(ReplayError::Command(CommandError::AlreadySubmitted))
    ));
    assert!(h.take_calls().is_empty());
    assert_eq!(h.queue.submissions(), 1);
}

#[test]
fn test_submit_all_runs_buffers_in_order() {
    let h = Harness::new();
    let pipeline = graphics_pipeline(&h.device, false);
    let a = frame(&h.device, BeginInfo::default(), &pipeline, None, 1);
    let b = frame(&h.device, BeginInfo::default(), &pipeline, None, 2);

    h.take_calls();
    let stats = h.queue.submit_all(&[&a, &b], &h.context).unwrap();
    let calls = h.take_calls();

    assert_eq!(stats.calls, calls.len());
    assert_eq!(calls.iter().filter(|c| c.is_work()).count(), 3);
    // Each buffer restores defaults after its own stream
    assert_eq!(
        calls
            .iter()
            .filter(|c| **c == GlCall::UseProgram(0))
            .count(),
        2
    );
    assert_eq!(h.queue.submissions(), 2);
}

#[test]
fn test_restore_defaults_can_be_disabled() {
    let mut config = GlvkConfig::default();
    config.replay.restore_defaults = false;
    let h = Harness::with_config(config);
    let pipeline = graphics_pipeline(&h.device, false);
    let cmd = frame(&h.device, BeginInfo::default(), &pipeline, None, 1);

    assert!(cmd.after_stream().is_empty());
    h.take_calls();
    h.submit(&cmd);
    assert!(!h.take_calls().contains(&GlCall::UseProgram(0)));
}

#[test]
fn test_submit_all_checks_every_buffer_before_claiming() {
    let h = Harness::new();
    let pipeline = graphics_pipeline(&h.device, false);
    let once = frame(&h.device, BeginInfo::one_time(), &pipeline, None, 1);
    let mut recording = CommandBuffer::new(h.device.clone(), CommandBufferLevel::Primary);
    recording.begin(BeginInfo::default()).unwrap();

    h.take_calls();
    let result = h.queue.submit_all(&[&once, &recording], &h.context);
    assert!(matches!(
        result,
        Err(ReplayError::Command(CommandError::NotExecutable(
            CommandBufferState::Recording
        )))
    ));
    assert!(h.take_calls().is_empty());
    assert_eq!(h.queue.submissions(), 0);

    // The one-time buffer was never claimed
    assert_eq!(once.state(), CommandBufferState::Executable);
    h.submit(&once);
    assert_eq!(once.state(), CommandBufferState::Invalid);
}

#[test]
fn test_failed_upload_keeps_the_rest_queued() {
    let h = Harness::new();
    let memory = h.device.allocate_memory(
        128,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    );
    let first = buffer(&h.device, 64);
    let second = buffer(&h.device, 64);
    h.device.bind_buffer_memory(&first, &memory, 0).unwrap();
    h.device.bind_buffer_memory(&second, &memory, 64).unwrap();
    {
        let mut mapped = memory.lock(0, vk::WHOLE_SIZE).unwrap();
        mapped.as_mut_slice().fill(7);
    }
    // The first buffer's GL object disappears behind the device's back
    h.context
        .lock()
        .backend_mut()
        .delete_object(GlObject::Buffer(first.gl_name));

    let pipeline = graphics_pipeline(&h.device, false);
    let cmd = frame(&h.device, BeginInfo::one_time(), &pipeline, None, 1);
    let result = h.queue.submit(&cmd, &h.context);
    assert!(matches!(
        result,
        Err(ReplayError::Backend(BackendError::UnknownObject { .. }))
    ));
    assert_eq!(cmd.state(), CommandBufferState::Executable);

    let requeued = h.device.take_pending_uploads();
    assert_eq!(
        requeued,
        vec![
            PendingUpload::Buffer {
                buffer: first.gl_name,
                offset: 0,
                data: vec![7; 64],
            },
            PendingUpload::Buffer {
                buffer: second.gl_name,
                offset: 0,
                data: vec![7; 64],
            },
        ]
    );
    assert!(h.device.take_pending_uploads().is_empty());
}
