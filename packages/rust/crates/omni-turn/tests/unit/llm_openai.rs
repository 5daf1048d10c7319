use serde_json::json;

use super::{ChunkTranslator, OpenAiCompatibleClient};
use crate::llm::{ModelRequest, SseDecoder, StreamEvent, Usage};
use crate::session::ChatMessage;
use crate::tools::ToolDefinition;

#[test]
fn sse_decoder_handles_split_frames() {
    let mut decoder = SseDecoder::new();
    assert!(decoder.push(b"data: {\"a\"").is_empty());
    assert!(decoder.push(b":1}\r").is_empty());
    let payloads = decoder.push(b"\n\r\n: keep-alive\n\ndata: [DONE]\n\n");
    assert_eq!(payloads, vec!["{\"a\":1}".to_string(), "[DONE]".to_string()]);
}

#[test]
fn sse_decoder_joins_multiline_data_and_flushes_tail() {
    let mut decoder = SseDecoder::new();
    assert!(decoder.push(b"event: message\ndata: one\ndata: two\n").is_empty());
    assert_eq!(decoder.finish(), Some("one\ntwo".to_string()));
    assert_eq!(decoder.finish(), None);
}

#[test]
fn sse_decoder_survives_split_utf8() {
    let mut decoder = SseDecoder::new();
    let bytes = "data: 你好\n\n".as_bytes();
    assert!(decoder.push(&bytes[..8]).is_empty());
    assert_eq!(decoder.push(&bytes[8..]), vec!["你好".to_string()]);
}

#[test]
fn translator_maps_content_reasoning_and_tool_calls() -> anyhow::Result<()> {
    let mut translator = ChunkTranslator::new();
    let first = translator.translate(
        &json!({
            "model": "deepseek-reasoner",
            "choices": [{"delta": {"reasoning_content": "thinking", "content": "Hi"}}]
        })
        .to_string(),
    )?;
    assert_eq!(
        first,
        vec![
            StreamEvent::RunStarted {
                model: "deepseek-reasoner".to_string()
            },
            StreamEvent::ReasoningDelta {
                text: "thinking".to_string()
            },
            StreamEvent::ContentDelta {
                text: "Hi".to_string()
            },
        ]
    );

    let call = translator.translate(
        &json!({
            "choices": [{"delta": {"tool_calls": [
                {"index": 0, "id": "call_1", "function": {"name": "read_file", "arguments": ""}}
            ]}}]
        })
        .to_string(),
    )?;
    assert_eq!(
        call,
        vec![StreamEvent::ToolCallDelta {
            index: 0,
            id: Some("call_1".to_string()),
            name: Some("read_file".to_string()),
            arguments: None,
        }]
    );

    let args = translator.translate(
        &json!({
            "choices": [{"delta": {"tool_calls": [
                {"index": 0, "function": {"arguments": "{\"path\":\"a\"}"}}
            ]}, "finish_reason": "tool_calls"}]
        })
        .to_string(),
    )?;
    assert_eq!(
        args,
        vec![
            StreamEvent::ToolCallDelta {
                index: 0,
                id: None,
                name: None,
                arguments: Some("{\"path\":\"a\"}".to_string()),
            },
            StreamEvent::ToolCallEnd { index: 0 },
        ]
    );

    let usage = translator.translate(
        &json!({"choices": [], "usage": {"prompt_tokens": 12, "completion_tokens": 7}}).to_string(),
    )?;
    let expected = Usage {
        input_tokens: 12,
        output_tokens: 7,
    };
    assert_eq!(usage, vec![StreamEvent::Usage(expected)]);

    let done = translator.translate("[DONE]")?;
    assert_eq!(
        done,
        vec![StreamEvent::RunCompleted {
            usage: Some(expected)
        }]
    );
    assert!(translator.is_completed());
    assert!(translator.finish().is_empty());
    Ok(())
}

#[test]
fn translator_closes_open_calls_when_stream_ends_early() -> anyhow::Result<()> {
    let mut translator = ChunkTranslator::new();
    translator.translate(
        &json!({"choices": [{"delta": {"tool_calls": [
            {"index": 1, "id": "c", "function": {"name": "write_file"}}
        ]}}]})
        .to_string(),
    )?;
    assert_eq!(
        translator.finish(),
        vec![
            StreamEvent::ToolCallEnd { index: 1 },
            StreamEvent::RunCompleted { usage: None },
        ]
    );
    Ok(())
}

#[test]
fn translator_rejects_garbage() {
    let mut translator = ChunkTranslator::new();
    assert!(translator.translate("{not json").is_err());
}

#[test]
fn request_body_prepends_system_and_declares_tools() -> anyhow::Result<()> {
    let request = ModelRequest {
        model: "gpt-4o-mini".to_string(),
        system: Some("be terse".to_string()),
        messages: vec![ChatMessage::user("hi")],
        tools: vec![ToolDefinition {
            name: "read_file".to_string(),
            description: "Read a file".to_string(),
            input_schema: json!({"type": "object", "required": ["path"]}),
        }],
        max_tokens: 256,
    };
    let body = serde_json::to_value(OpenAiCompatibleClient::body(&request))?;
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "hi");
    assert_eq!(body["tools"][0]["function"]["name"], "read_file");
    assert_eq!(body["tool_choice"], "auto");
    assert_eq!(body["stream"], true);
    assert_eq!(body["max_tokens"], 256);
    Ok(())
}
