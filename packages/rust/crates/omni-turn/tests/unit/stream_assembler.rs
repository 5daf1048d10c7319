use serde_json::json;

use super::{DeltaOutcome, ToolCallAssembler};
use crate::error::ToolFault;
use crate::invocation::InvocationStatus;

#[test]
fn split_arguments_parse_once_block_ends() {
    let mut assembler = ToolCallAssembler::new();
    assert_eq!(
        assembler.push_delta(0, Some("call_1"), Some("read_file"), None),
        DeltaOutcome::Started(0)
    );
    assembler.push_delta(0, None, None, Some(r#"{"path": "te"#));
    assembler.push_delta(0, None, None, Some(r#"st.ts"}"#));
    assembler.end_block(0);

    let invocations = assembler.finish();
    assert_eq!(invocations.len(), 1);
    assert_eq!(invocations[0].input, Some(json!({"path": "test.ts"})));
    assert_eq!(invocations[0].status, InvocationStatus::Pending);
}

#[test]
fn every_chunking_matches_unsplit_parse() {
    let raw = r#"{"path": "src/lib.rs", "content": "fn main() { println!(\"hé\"); }", "n": [1, 2]}"#;
    let expected: serde_json::Value = serde_json::from_str(raw).unwrap_or_default();
    let boundaries: Vec<usize> = raw.char_indices().map(|(i, _)| i).skip(1).collect();

    for stride in 1..=7 {
        for offset in 0..stride {
            let mut assembler = ToolCallAssembler::new();
            assembler.push_delta(3, Some("c"), Some("write_file"), None);
            let mut start = 0;
            for &cut in boundaries.iter().skip(offset).step_by(stride) {
                assembler.push_delta(3, None, None, Some(&raw[start..cut]));
                start = cut;
            }
            assembler.push_delta(3, None, None, Some(&raw[start..]));
            let invocations = assembler.finish();
            assert_eq!(
                invocations[0].input.as_ref(),
                Some(&expected),
                "stride {stride} offset {offset}"
            );
        }
    }
}

#[test]
fn interleaved_indices_keep_start_order() {
    let mut assembler = ToolCallAssembler::new();
    assembler.push_delta(1, Some("b"), Some("second"), Some("{"));
    assembler.push_delta(0, Some("a"), Some("first"), Some("{}"));
    assembler.push_delta(1, None, None, Some("}"));
    assembler.end_block(0);

    let invocations = assembler.finish();
    let ids: Vec<&str> = invocations.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a"]);
    assert!(invocations.iter().all(|i| i.input == Some(json!({}))));
}

#[test]
fn repeated_id_appends_to_owner() {
    let mut assembler = ToolCallAssembler::new();
    assembler.push_delta(0, Some("dup"), Some("read_file"), Some(r#"{"path":"#));
    assert_eq!(
        assembler.push_delta(0, Some("dup"), Some("read_file"), Some(r#""a"}"#)),
        DeltaOutcome::Appended(0)
    );
    let invocations = assembler.finish();
    assert_eq!(invocations.len(), 1);
    assert_eq!(invocations[0].input, Some(json!({"path": "a"})));
}

#[test]
fn orphan_delta_is_dropped() {
    let mut assembler = ToolCallAssembler::new();
    assert_eq!(
        assembler.push_delta(4, None, None, Some("{}")),
        DeltaOutcome::Dropped
    );
    assert!(assembler.is_empty());
}

#[test]
fn new_call_on_same_index_closes_previous() {
    let mut assembler = ToolCallAssembler::new();
    assembler.push_delta(0, Some("one"), Some("read_file"), Some(r#"{"path":"a"}"#));
    assembler.push_delta(0, Some("two"), Some("read_file"), Some(r#"{"path":"b"}"#));
    assert_eq!(assembler.len(), 2);
    let invocations = assembler.finish();
    assert_eq!(invocations[0].input, Some(json!({"path": "a"})));
    assert_eq!(invocations[1].input, Some(json!({"path": "b"})));
}

#[test]
fn malformed_arguments_become_invocation_fault() {
    let mut assembler = ToolCallAssembler::new();
    assembler.push_delta(0, Some("bad"), Some("write_file"), Some(r#"{"path": "#));
    let invocations = assembler.finish();
    assert_eq!(invocations[0].status, InvocationStatus::Error);
    assert!(matches!(
        invocations[0].fault,
        Some(ToolFault::InvalidArguments { ref tool, .. }) if tool == "write_file"
    ));
}

#[test]
fn blank_arguments_are_empty_object() {
    let mut assembler = ToolCallAssembler::new();
    assembler.push_delta(0, Some("x"), Some("list"), None);
    let invocations = assembler.finish();
    assert_eq!(invocations[0].input, Some(json!({})));
}

#[test]
fn name_only_delta_gets_generated_id() {
    let mut assembler = ToolCallAssembler::new();
    assembler.push_delta(2, None, Some("read_file"), Some("{}"));
    let invocations = assembler.finish();
    assert_eq!(invocations[0].id, "call_2_0");
}

#[test]
fn inline_calls_never_share_an_id() {
    let mut assembler = ToolCallAssembler::new();
    assembler.push_delta(0, Some("x"), Some("read_file"), Some(r#"{"path":"a"}"#));
    assembler.push_complete(Some("x"), "read_file", r#"{"path":"b"}"#);
    assembler.push_complete(Some("x"), "read_file", r#"{"path":"c"}"#);
    assembler.push_complete(Some("inline_1"), "read_file", "{}");
    let invocations = assembler.finish();

    let mut ids: Vec<&str> = invocations.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids[0], "x");
    assert_eq!(invocations[1].input, Some(json!({"path": "b"})));
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 4);
}
