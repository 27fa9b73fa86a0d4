//! Integration test: demo frame recording, stream dumps and replay.
//!
//! Run with: cargo test -p glvk-cli --test demo

use glvk_cli::demo::{Demo, DemoOptions, FILL_BYTES, FILL_WORD};
use glvk_cli::dump::{self, DumpFormat};
use glvk_core::GlvkConfig;
use glvk_protocol::CmdBuffer;
use glvk_replay::GlCall;

fn record(draws: u32) -> Demo {
    Demo::record(
        GlvkConfig::default(),
        DemoOptions {
            draws,
            one_time: true,
        },
    )
    .unwrap()
}

#[test]
fn test_replay_reads_back_fill_and_vertices() {
    let demo = record(2);
    let report = demo.replay().unwrap();

    assert_eq!(report.stats.vaos_created, 1);
    assert_eq!(report.stats.uploads, 1);
    assert_eq!(report.calls.iter().filter(|c| c.is_work()).count(), 2);
    assert!(report
        .calls
        .iter()
        .any(|c| matches!(c, GlCall::Uniform { location: 0, .. })));

    let fill = FILL_WORD.to_le_bytes().repeat((FILL_BYTES / 4) as usize);
    assert_eq!(&report.readback[..FILL_BYTES as usize], &fill[..]);
    assert_eq!(&report.readback[FILL_BYTES as usize..], &Demo::triangle_bytes()[..]);
}

#[test]
fn test_one_time_demo_cannot_replay_twice() {
    let demo = record(1);
    demo.replay().unwrap();
    assert!(demo.replay().is_err());
}

#[test]
fn test_text_dump_lists_records_with_offsets() {
    let demo = record(1);
    let text = dump::dump(demo.command_buffer.stream(), DumpFormat::Text).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    let records = demo.command_buffer.stream().validate().unwrap();
    assert_eq!(lines.len(), records);
    assert!(lines[0].trim_start().starts_with("0 "));
    assert!(lines[0].contains("BindFramebuffer"));
    assert!(lines.iter().any(|l| l.contains("Draw ")));
    // Padding words are not part of the dump
    assert!(!text.contains("_pad"));
}

#[test]
fn test_json_dump_tags_every_record() {
    let demo = record(1);
    let after = demo.command_buffer.after_stream();
    let json = dump::dump(after, DumpFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let ops: Vec<&str> = value
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["op"].as_str().unwrap())
        .collect();

    assert!(ops.contains(&"RestoreDefaults"));
    assert_eq!(ops.iter().filter(|op| **op == "ReadbackBuffer").count(), 2);
}

#[test]
fn test_cut_stream_fails_to_decode() {
    let demo = record(3);
    let mut words = demo.command_buffer.stream().words().to_vec();
    words.pop();
    let cut = CmdBuffer::from_words(words);

    assert!(dump::decode(&cut).is_err());
    assert!(dump::dump(&cut, DumpFormat::Json).is_err());
}
