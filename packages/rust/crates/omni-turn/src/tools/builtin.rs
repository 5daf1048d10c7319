//! File tools backed by the turn's [`FileStore`](omni_io::FileStore).

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{Value, json};

use super::{Tool, ToolContext, ToolDefinition, ToolRegistry};

fn path_of(input: &Value) -> anyhow::Result<&str> {
    input
        .get("path")
        .and_then(Value::as_str)
        .context("`path` must be a string")
}

fn content_of(input: &Value) -> anyhow::Result<&str> {
    input
        .get("content")
        .and_then(Value::as_str)
        .context("`content` must be a string")
}

fn path_only(input: &Value) -> Vec<String> {
    input
        .get("path")
        .and_then(Value::as_str)
        .map(|path| vec![path.to_string()])
        .unwrap_or_default()
}

fn path_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "path": { "type": "string", "description": "Path relative to the workspace root" }
        },
        "required": ["path"]
    })
}

fn path_content_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "path": { "type": "string", "description": "Path relative to the workspace root" },
            "content": { "type": "string", "description": "UTF-8 text" }
        },
        "required": ["path", "content"]
    })
}

/// `read_file`: return a file's text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "read_file".to_string(),
            description: "Read a UTF-8 text file from the workspace.".to_string(),
            input_schema: path_schema(),
        }
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> anyhow::Result<String> {
        let path = path_of(&input)?;
        Ok(ctx.files.read_file(path, &ctx.cancel, None).await?)
    }
}

/// `write_file`: create or replace a file.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "write_file".to_string(),
            description: "Create or overwrite a text file in the workspace.".to_string(),
            input_schema: path_content_schema(),
        }
    }

    fn mutated_paths(&self, input: &Value) -> Vec<String> {
        path_only(input)
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> anyhow::Result<String> {
        let path = path_of(&input)?;
        let content = content_of(&input)?;
        ctx.files.write_file(path, content, &ctx.cancel, None).await?;
        Ok(format!("wrote {} bytes to {path}", content.len()))
    }
}

/// `append_file`: append text, creating the file if needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppendFileTool;

#[async_trait]
impl Tool for AppendFileTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "append_file".to_string(),
            description: "Append text to a file in the workspace, creating it if absent."
                .to_string(),
            input_schema: path_content_schema(),
        }
    }

    fn mutated_paths(&self, input: &Value) -> Vec<String> {
        path_only(input)
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> anyhow::Result<String> {
        let path = path_of(&input)?;
        let content = content_of(&input)?;
        ctx.files.append_file(path, content, &ctx.cancel, None).await?;
        Ok(format!("appended {} bytes to {path}", content.len()))
    }
}

/// `delete_file`: remove a file.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteFileTool;

#[async_trait]
impl Tool for DeleteFileTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "delete_file".to_string(),
            description: "Delete a file from the workspace.".to_string(),
            input_schema: path_schema(),
        }
    }

    fn mutated_paths(&self, input: &Value) -> Vec<String> {
        path_only(input)
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> anyhow::Result<String> {
        let path = path_of(&input)?;
        ctx.files.delete_file(path, &ctx.cancel, None).await?;
        Ok(format!("deleted {path}"))
    }
}

/// Register the four file tools.
pub fn register_file_tools(registry: &mut ToolRegistry) -> &mut ToolRegistry {
    registry
        .register(Arc::new(ReadFileTool))
        .register(Arc::new(WriteFileTool))
        .register(Arc::new(AppendFileTool))
        .register(Arc::new(DeleteFileTool))
}
