use super::InlineToolFilter;

fn filter() -> InlineToolFilter {
    let matcher = InlineToolFilter::default_matcher().unwrap_or_else(|e| panic!("{e}"));
    InlineToolFilter::new(matcher)
}

#[test]
fn plain_text_passes_through() {
    let mut f = filter();
    let out = f.push("hello world");
    assert_eq!(out.visible, "hello world");
    assert!(out.calls.is_empty());
}

#[test]
fn call_split_across_deltas_is_recovered() {
    let mut f = filter();
    let mut visible = String::new();
    let mut calls = Vec::new();
    for delta in [
        "Let me look. <tool_",
        "call>{\"name\": \"read_file\", ",
        "\"arguments\": {\"path\": \"a.rs\"}}</tool",
        "_call> done",
    ] {
        let out = f.push(delta);
        visible.push_str(&out.visible);
        calls.extend(out.calls);
    }
    visible.push_str(&f.finish().visible);

    assert_eq!(visible, "Let me look.  done");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name.as_deref(), Some("read_file"));
    assert_eq!(calls[0].arguments, r#"{"path":"a.rs"}"#);
}

#[test]
fn partial_marker_is_withheld_then_released() {
    let mut f = filter();
    let first = f.push("a < b and [TOOL");
    assert_eq!(first.visible, "a < b and ");
    let second = f.push(" is not a marker");
    assert_eq!(second.visible, "[TOOL is not a marker");
}

#[test]
fn bracket_markers_with_string_arguments() {
    let mut f = filter();
    let out = f.push(r#"[TOOL_CALL]{"name":"write_file","arguments":"{\"path\":\"x\"}"}[/TOOL_CALL]"#);
    assert_eq!(out.visible, "");
    assert_eq!(out.calls[0].name.as_deref(), Some("write_file"));
    assert_eq!(out.calls[0].arguments, r#"{"path":"x"}"#);
}

#[test]
fn unparseable_body_keeps_raw_text() {
    let mut f = filter();
    let out = f.push("<tool_call>not json</tool_call>");
    assert_eq!(out.calls.len(), 1);
    assert!(out.calls[0].name.is_none());
    assert_eq!(out.calls[0].arguments, "not json");
}

#[test]
fn unterminated_call_is_flushed_as_text() {
    let mut f = filter();
    assert_eq!(f.push("x <tool_call>{\"name\"").visible, "x ");
    assert_eq!(f.finish().visible, "<tool_call>{\"name\"");
}

#[test]
fn near_miss_markers_are_reported() {
    let mut f = filter();
    f.push("oops <tool_cal>{}</tool_cal> and <b>bold</b>");
    let out = f.finish();
    let tokens: Vec<&str> = out.near_misses.iter().map(|m| m.token.as_str()).collect();
    assert_eq!(tokens, vec!["<tool_cal>", "</tool_cal>"]);
    assert_eq!(out.near_misses[0].suggestion, "<tool_call>");
    assert_eq!(out.near_misses[0].distance, 1);
}
