use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use omni_io::MemoryFileStore;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use super::*;
use crate::invocation::InvocationStatus;
use crate::tools::Tool;

struct EditTool {
    calls: AtomicUsize,
}

#[async_trait]
impl Tool for EditTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "edit".to_string(),
            description: "edit".to_string(),
            input_schema: json!({
                "type": "object",
                "required": ["TargetFile", "CodeContent", "Overwrite"]
            }),
        }
    }

    async fn execute(&self, input: Value, _ctx: &ToolContext) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if input.get("Overwrite") == Some(&json!("boom")) {
            anyhow::bail!("disk on fire");
        }
        Ok("edited".to_string())
    }
}

struct Deny;

#[async_trait]
impl ApprovalRequester for Deny {
    async fn request(&self, _tool: &str, _input: &Value) -> bool {
        false
    }
}

fn ctx() -> ToolContext {
    ToolContext {
        run_id: 1,
        cancel: CancellationToken::new(),
        files: Arc::new(MemoryFileStore::new()),
    }
}

fn setup() -> (Arc<EditTool>, ToolDispatcher) {
    let tool = Arc::new(EditTool {
        calls: AtomicUsize::new(0),
    });
    let mut registry = ToolRegistry::new();
    registry.register(tool.clone());
    (tool, ToolDispatcher::new(Arc::new(registry)))
}

fn invocation(args: &str) -> ToolInvocation {
    let mut invocation = ToolInvocation::new("call_1", "edit", 0);
    invocation.raw_arguments = args.to_string();
    invocation.finalize_arguments();
    invocation
}

#[test]
fn validation_names_only_the_missing_field() {
    let (tool, _) = setup();
    let error = validate_arguments(
        &tool.definition(),
        &json!({"TargetFile": "a.rs", "CodeContent": "x"}),
    )
    .unwrap_err();
    assert_eq!(error.to_string(), "missing required fields: Overwrite");
}

#[test]
fn explicit_null_is_present() {
    let (tool, _) = setup();
    let input = json!({"TargetFile": "a.rs", "CodeContent": null, "Overwrite": null});
    assert!(validate_arguments(&tool.definition(), &input).is_ok());

    let error = validate_arguments(&tool.definition(), &json!({"CodeContent": null})).unwrap_err();
    assert_eq!(
        error.to_string(),
        "missing required fields: TargetFile, Overwrite"
    );
}

#[test]
fn validation_lists_every_missing_field() {
    let (tool, _) = setup();
    let error = validate_arguments(&tool.definition(), &json!({})).unwrap_err();
    assert_eq!(
        error.to_string(),
        "missing required fields: TargetFile, CodeContent, Overwrite"
    );
}

#[tokio::test]
async fn invalid_input_never_reaches_the_tool() {
    let (tool, dispatcher) = setup();
    let mut call = invocation(r#"{"TargetFile":"a.rs","CodeContent":"x"}"#);
    dispatcher.dispatch(&mut call, &ctx()).await;

    assert_eq!(call.status, InvocationStatus::Error);
    assert_eq!(
        call.output.as_deref(),
        Some("missing required fields: Overwrite")
    );
    assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_tool_is_an_error() {
    let (_, dispatcher) = setup();
    let mut call = ToolInvocation::new("call_9", "nope", 0);
    call.finalize_arguments();
    dispatcher.dispatch(&mut call, &ctx()).await;
    assert_eq!(call.fault, Some(ToolFault::UnknownTool("nope".to_string())));
}

#[tokio::test]
async fn decline_completes_without_running() {
    let (tool, dispatcher) = setup();
    let dispatcher = dispatcher.with_approval(Arc::new(Deny));
    let mut call = invocation(r#"{"TargetFile":"a","CodeContent":"b","Overwrite":true}"#);
    dispatcher.dispatch(&mut call, &ctx()).await;

    assert_eq!(call.status, InvocationStatus::Completed);
    assert!(call.declined);
    assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn fully_autonomous_bypasses_approval() {
    let (tool, dispatcher) = setup();
    let dispatcher = dispatcher
        .with_approval(Arc::new(Deny))
        .with_mode(ApprovalMode::FullyAutonomous);
    let mut call = invocation(r#"{"TargetFile":"a","CodeContent":"b","Overwrite":true}"#);
    dispatcher.dispatch(&mut call, &ctx()).await;

    assert_eq!(call.status, InvocationStatus::Completed);
    assert_eq!(call.output.as_deref(), Some("edited"));
    assert!(call.duration.is_some());
    assert_eq!(tool.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn execution_failure_is_recorded() {
    let (_, dispatcher) = setup();
    let mut call = invocation(r#"{"TargetFile":"a","CodeContent":"b","Overwrite":"boom"}"#);
    dispatcher.dispatch(&mut call, &ctx()).await;

    assert_eq!(call.status, InvocationStatus::Error);
    assert_eq!(
        call.fault,
        Some(ToolFault::Execution("disk on fire".to_string()))
    );
}

#[tokio::test]
async fn parse_failures_stay_untouched() {
    let (tool, dispatcher) = setup();
    let mut call = invocation("{not json");
    assert_eq!(call.status, InvocationStatus::Error);
    dispatcher.dispatch(&mut call, &ctx()).await;

    assert!(matches!(call.fault, Some(ToolFault::InvalidArguments { .. })));
    assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
}
