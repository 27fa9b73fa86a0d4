//! Integration test: opcode stream encoding and decoding.
//!
//! Run with: cargo test -p glvk-protocol --test stream_codec

use glvk_protocol::records::*;
use glvk_protocol::{gl, CmdBuffer, CmdList, Command, DecodeError, Op, OpKind, Record, HEADER_WORDS};

fn viewport() -> SetViewport {
    SetViewport {
        index: 0,
        x: 0.0,
        y: 0.0,
        width: 800.0,
        height: 600.0,
        min_depth: 0.0,
        max_depth: 1.0,
        ..Default::default()
    }
}

fn draw() -> Draw {
    Draw {
        mode: gl::TRIANGLES,
        first_vertex: 0,
        vertex_count: 3,
        instance_count: 1,
        first_instance: 0,
        ..Default::default()
    }
}

#[test]
fn test_viewport_round_trip() {
    let mut buffer = CmdBuffer::new();
    buffer.push(viewport());

    let declared = SetViewport::WORDS as usize;
    assert_eq!(
        declared,
        HEADER_WORDS as usize + std::mem::size_of::<SetViewport>() / 4
    );
    assert_eq!(buffer.len(), declared);

    let mut decoder = buffer.decoder();
    let op = decoder.peek_header().unwrap().unwrap();
    assert_eq!(op, Op::new(OpKind::SetViewport));
    assert_eq!(op.size as usize, declared);

    let decoded = decoder.decode_record::<SetViewport>().unwrap().unwrap();
    assert_eq!(decoded.x, 0.0);
    assert_eq!(decoded.y, 0.0);
    assert_eq!(decoded.width, 800.0);
    assert_eq!(decoded.height, 600.0);
    assert_eq!(decoded.min_depth, 0.0);
    assert_eq!(decoded.max_depth, 1.0);
    assert!(decoder.decode_record::<SetViewport>().unwrap().is_none());
}

#[test]
fn test_sequential_records_consume_declared_size() {
    let mut buffer = CmdBuffer::new();
    buffer.push(draw());
    buffer.push(Dispatch {
        x: 4,
        y: 2,
        z: 1,
        ..Default::default()
    });

    let a = Draw::WORDS as usize;
    let b = Dispatch::WORDS as usize;
    assert_eq!(buffer.len(), a + b);
    assert_eq!(buffer.validate(), Ok(2));

    let mut decoder = buffer.decoder();
    let first = decoder.skip_record().unwrap().unwrap();
    assert_eq!(first.kind, OpKind::Draw);
    assert_eq!(decoder.position(), a);

    let second = decoder.peek_header().unwrap().unwrap();
    assert_eq!(second.kind, OpKind::Dispatch);
    match decoder.next_command().unwrap() {
        Some(Command::Dispatch(d)) => assert_eq!((d.x, d.y, d.z), (4, 2, 1)),
        other => panic!("expected Dispatch, got {:?}", other),
    }
    assert!(decoder.is_finished());
}

#[test]
fn test_every_kind_declares_its_footprint() {
    for kind in OpKind::ALL {
        assert_eq!(OpKind::from_raw(kind.as_raw()), Some(*kind));
        assert!(kind.words() >= HEADER_WORDS);
        // header(2 words) + 8-byte aligned payload keeps records 8-byte aligned
        assert_eq!(kind.words() % 2, 0, "{} is not 8-byte aligned", kind.name());
    }
}

#[test]
fn test_truncation_never_reads_past_end() {
    let mut buffer = CmdBuffer::new();
    buffer.push(viewport());
    buffer.push(draw());
    buffer.push(PushConstant {
        location: 3,
        ty: UniformType::Mat4 as u32,
        count: 16,
        data: [7; 16],
        ..Default::default()
    });
    let words = buffer.words();

    let boundaries = [
        0,
        SetViewport::WORDS as usize,
        (SetViewport::WORDS + Draw::WORDS) as usize,
        words.len(),
    ];

    for cut in 0..=words.len() {
        let truncated = CmdBuffer::from_words(words[..cut].to_vec());
        let decoded: Vec<_> = truncated.decoder().collect();
        let complete = boundaries.iter().filter(|&&b| b != 0 && b <= cut).count();

        let ok = decoded.iter().filter(|r| r.is_ok()).count();
        assert_eq!(ok, complete, "cut at {}", cut);

        if boundaries.contains(&cut) {
            assert!(decoded.iter().all(|r| r.is_ok()), "cut at {}", cut);
            assert_eq!(truncated.validate(), Ok(complete));
        } else {
            assert!(decoded.last().unwrap().is_err(), "cut at {}", cut);
            assert!(truncated.validate().is_err());
        }
    }
}

#[test]
fn test_empty_stream_has_no_records() {
    let buffer = CmdBuffer::new();
    let mut decoder = buffer.decoder();
    assert_eq!(decoder.peek_header(), Ok(None));
    assert_eq!(decoder.next_command(), Ok(None));
    assert_eq!(buffer.validate(), Ok(0));
}

#[test]
fn test_corrupt_headers_are_rejected() {
    let unknown = CmdBuffer::from_words(vec![0xdead, 4, 0, 0]);
    assert!(matches!(
        unknown.validate(),
        Err(DecodeError::UnknownKind { offset: 0, raw: 0xdead })
    ));

    let mut words = CmdBuffer::new();
    words.push(draw());
    let mut raw = words.into_words();
    raw[1] += 2;
    raw.extend_from_slice(&[0, 0]);
    let wrong_size = CmdBuffer::from_words(raw);
    assert!(matches!(
        wrong_size.validate(),
        Err(DecodeError::SizeMismatch { kind: OpKind::Draw, .. })
    ));

    let header_only = CmdBuffer::from_words(vec![OpKind::Draw.as_raw()]);
    assert!(matches!(
        header_only.validate(),
        Err(DecodeError::TruncatedHeader { remaining: 1, .. })
    ));
}

#[test]
fn test_decoder_fuses_after_error() {
    let mut buffer = CmdBuffer::new();
    buffer.push(draw());
    let mut raw = buffer.into_words();
    raw.extend_from_slice(&[0xffff, 2]);
    raw.extend_from_slice(&[OpKind::Draw.as_raw(), Draw::WORDS, 0, 0, 0, 0, 0, 0]);

    let stream = CmdBuffer::from_words(raw);
    let mut decoder = stream.decoder();
    assert!(matches!(decoder.next(), Some(Ok(Command::Draw(_)))));
    assert!(matches!(decoder.next(), Some(Err(DecodeError::UnknownKind { .. }))));
    assert!(decoder.next().is_none());
}

#[test]
fn test_kind_mismatch_keeps_cursor() {
    let mut buffer = CmdBuffer::new();
    buffer.push(draw());

    let mut decoder = buffer.decoder();
    let err = decoder.decode_record::<Dispatch>().unwrap_err();
    assert!(matches!(
        err,
        DecodeError::KindMismatch {
            expected: OpKind::Dispatch,
            found: OpKind::Draw,
            ..
        }
    ));
    assert_eq!(decoder.position(), 0);
    assert_eq!(decoder.decode_record::<Draw>().unwrap(), Some(draw()));
}

#[test]
fn test_flatten_preserves_order_and_size() {
    let mut list = CmdList::new();
    let mut first = CmdBuffer::new();
    first.push(viewport());
    first.push(draw());
    list.push(first.clone());
    list.push(CmdBuffer::new());
    list.push_record(MemoryBarrier {
        bits: gl::BarrierBits::SHADER_STORAGE.bits(),
        ..Default::default()
    });

    let flat = list.flatten();
    assert_eq!(list.len(), 2);
    assert_eq!(flat.len(), list.total_words());
    assert_eq!(flat.len(), first.len() + MemoryBarrier::WORDS as usize);

    let kinds: Vec<OpKind> = flat.decoder().map(|c| c.unwrap().kind()).collect();
    assert_eq!(
        kinds,
        vec![OpKind::SetViewport, OpKind::Draw, OpKind::MemoryBarrier]
    );
}

#[test]
fn test_push_command_matches_push() {
    let mut direct = CmdBuffer::new();
    direct.push(draw());

    let mut via_command = CmdBuffer::new();
    via_command.push_command(&Command::from(draw()));

    assert_eq!(direct, via_command);
}

#[test]
fn test_mat3_packing_drops_column_padding() {
    let mut block = Vec::new();
    for column in 0..3u32 {
        for row in 0..4u32 {
            block.extend_from_slice(&(column * 10 + row).to_ne_bytes());
        }
    }
    let packed = UniformType::Mat3.pack(&block).unwrap();
    assert_eq!(&packed[..9], &[0, 1, 2, 10, 11, 12, 20, 21, 22]);
    assert!(UniformType::Mat3.pack(&block[..40]).is_none());
}

#[test]
fn test_commands_serialize_with_op_tag() {
    let json = serde_json::to_value(Command::from(draw())).unwrap();
    assert_eq!(json["op"], "Draw");
    assert_eq!(json["vertex_count"], 3);
    assert!(json.get("_pad").is_none());
}
