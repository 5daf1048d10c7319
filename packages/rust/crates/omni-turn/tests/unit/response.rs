use serde_json::json;

use super::{ContentBlock, ResponseView, is_shaky_parts};

#[test]
fn plain_text_response() {
    let view = ResponseView::new("  The build passes now.  ".to_string());
    assert_eq!(view.text(), "  The build passes now.  ");
    assert_eq!(view.trimmed_text(), "The build passes now.");
    assert_eq!(view.reasoning(), "");
    assert!(!view.has_tool_calls());
    assert!(!view.is_shaky());
}

#[test]
fn reasoning_blocks_are_blank_line_separated() {
    let view = ResponseView::new(vec![
        ContentBlock::Reasoning {
            text: "first thought".to_string(),
        },
        ContentBlock::Text {
            text: "Hello ".to_string(),
        },
        ContentBlock::Reasoning {
            text: "second thought".to_string(),
        },
        ContentBlock::Text {
            text: "world".to_string(),
        },
    ]);
    assert_eq!(view.reasoning(), "first thought\n\nsecond thought");
    assert_eq!(view.text(), "Hello world");
}

#[test]
fn tool_calls_filter_by_name() {
    let view = ResponseView::new(vec![
        ContentBlock::ToolUse {
            id: "1".to_string(),
            name: "read_file".to_string(),
            input: json!({"path": "a"}),
        },
        ContentBlock::ToolUse {
            id: "2".to_string(),
            name: "write_file".to_string(),
            input: json!({"path": "b"}),
        },
    ]);
    assert!(view.has_tool_calls());
    assert_eq!(view.tool_calls().len(), 2);
    let writes = view.tool_calls_named("write_file");
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].id, "2");
}

#[test]
fn shaky_classification() {
    assert!(ResponseView::new(String::new()).is_shaky());
    assert!(ResponseView::new("   \n".to_string()).is_shaky());
    assert!(ResponseView::new("ok".to_string()).is_shaky());
    assert!(!ResponseView::new("0123456789".to_string()).is_shaky());

    let short_both = ResponseView::new(vec![
        ContentBlock::Text {
            text: "ok".to_string(),
        },
        ContentBlock::Reasoning {
            text: "hmm".to_string(),
        },
    ]);
    assert!(short_both.is_shaky());

    let long_reasoning = ResponseView::new(vec![
        ContentBlock::Text {
            text: "ok".to_string(),
        },
        ContentBlock::Reasoning {
            text: "considered every branch".to_string(),
        },
    ]);
    assert!(!long_reasoning.is_shaky());

    let tool_only = ResponseView::new(vec![ContentBlock::ToolUse {
        id: "1".to_string(),
        name: "read_file".to_string(),
        input: json!({}),
    }]);
    assert!(!tool_only.is_shaky());
}

#[test]
fn padded_reasoning_is_measured_untrimmed() {
    let padded = ResponseView::new(vec![
        ContentBlock::Text {
            text: "ok".to_string(),
        },
        ContentBlock::Reasoning {
            text: "   hmm    ".to_string(),
        },
    ]);
    assert_eq!(padded.reasoning().chars().count(), 10);
    assert!(!padded.is_shaky());
    assert!(is_shaky_parts("ok", "   hmm   ", false));
    assert!(!is_shaky_parts("ok", "   hmm    ", false));
}

#[test]
fn multibyte_text_counts_chars() {
    // 9 chars, 27 bytes
    assert!(ResponseView::new("完成了所有的修改吧".to_string()).is_shaky());
    assert!(!ResponseView::new("完成了所有的修改工作".to_string()).is_shaky());
}
