//! Integration test: record execution and stream validation in the replay engine.
//!
//! Run with: cargo test -p glvk-replay --test engine

use glvk_core::config::ReplayConfig;
use glvk_core::ResourceTable;
use glvk_protocol::gl::ClearAspects;
use glvk_protocol::records::{
    BindTexture, ClearDepthStencil, Draw, PushConstant, ResetQuery, SetEvent, SetLineWidth,
};
use glvk_protocol::{CmdBuffer, DecodeError, UniformType};
use glvk_replay::{CallLog, GlCall, GlContext, ReplayEngine, ReplayError};

fn engine() -> ReplayEngine {
    ReplayEngine::new(&ReplayConfig::default())
}

#[test]
fn test_truncated_stream_executes_nothing() {
    let mut stream = CmdBuffer::new();
    stream.push(SetLineWidth {
        width: 2.0,
        ..Default::default()
    });
    stream.push(Draw {
        mode: 4,
        vertex_count: 3,
        instance_count: 1,
        ..Default::default()
    });
    let mut words = stream.into_words();
    words.pop();
    let truncated = CmdBuffer::from_words(words);

    let context = GlContext::new(CallLog::new());
    let mut ctx = context.lock();
    let result = engine().replay(&truncated, &ResourceTable::new(), &mut ctx);

    assert!(matches!(
        result,
        Err(ReplayError::Decode(DecodeError::TruncatedRecord { .. }))
    ));
    assert_eq!(ctx.calls(), 0);
    assert!(ctx.backend().calls().is_empty());
}

#[test]
fn test_records_map_to_calls_in_order() {
    let mut stream = CmdBuffer::new();
    stream.push(SetLineWidth {
        width: 3.0,
        ..Default::default()
    });
    stream.push(BindTexture {
        unit: 2,
        target: 0x0DE1,
        texture: 7,
        sampler: 9,
    });
    stream.push(ClearDepthStencil {
        depth: 1.0,
        stencil: 0,
        aspects: ClearAspects::DEPTH.bits(),
        ..Default::default()
    });
    stream.push(ResetQuery {
        query: 4,
        ..Default::default()
    });

    let context = GlContext::new(CallLog::new());
    let mut ctx = context.lock();
    let stats = engine()
        .replay(&stream, &ResourceTable::new(), &mut ctx)
        .unwrap();

    assert_eq!(stats.records, 4);
    assert_eq!(
        ctx.backend().calls(),
        &[
            GlCall::LineWidth(3.0),
            GlCall::BindTexture {
                unit: 2,
                target: 0x0DE1,
                texture: 7
            },
            GlCall::BindSampler { unit: 2, sampler: 9 },
            GlCall::ClearDepthStencil {
                depth: 1.0,
                stencil: 0,
                aspects: ClearAspects::DEPTH
            },
        ]
    );
    assert_eq!(stats.calls, 4);
}

#[test]
fn test_push_constant_passes_used_words() {
    let mut data = [0u32; 16];
    for (i, word) in data.iter_mut().enumerate().take(9) {
        *word = (i as f32).to_bits();
    }
    let mut stream = CmdBuffer::new();
    stream.push(PushConstant {
        location: 5,
        ty: UniformType::Mat3 as u32,
        count: 9,
        data,
        ..Default::default()
    });

    let context = GlContext::new(CallLog::new());
    let mut ctx = context.lock();
    engine()
        .replay(&stream, &ResourceTable::new(), &mut ctx)
        .unwrap();

    assert_eq!(
        ctx.backend().calls(),
        &[GlCall::Uniform {
            location: 5,
            ty: UniformType::Mat3,
            data: data[..9].to_vec()
        }]
    );
}

#[test]
fn test_bad_operands_are_rejected() {
    let context = GlContext::new(CallLog::new());
    let table = ResourceTable::new();

    let mut stream = CmdBuffer::new();
    stream.push(PushConstant {
        location: 0,
        ty: 99,
        count: 1,
        ..Default::default()
    });
    let result = engine().replay(&stream, &table, &mut context.lock());
    assert!(matches!(
        result,
        Err(ReplayError::InvalidOperand { kind: "PushConstant", .. })
    ));

    let mut stream = CmdBuffer::new();
    stream.push(SetEvent { event: 7 });
    let result = engine().replay(&stream, &table, &mut context.lock());
    assert!(matches!(result, Err(ReplayError::UnknownEvent(7))));
}

#[test]
fn test_tracing_records_does_not_change_execution() {
    let mut stream = CmdBuffer::new();
    stream.push(SetLineWidth {
        width: 1.5,
        ..Default::default()
    });
    let traced = ReplayEngine::new(&ReplayConfig {
        trace_records: true,
        restore_defaults: true,
    });

    let context = GlContext::new(CallLog::new());
    let mut ctx = context.lock();
    let stats = traced
        .replay(&stream, &ResourceTable::new(), &mut ctx)
        .unwrap();
    assert_eq!(stats.records, 1);
    assert_eq!(ctx.backend().calls(), &[GlCall::LineWidth(1.5)]);
}
