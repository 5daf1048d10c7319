use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin};
use tokio::sync::Mutex;

use omni_turn::ApprovalRequester;

/// Asks the operator on stderr and reads `y`/`yes` from stdin.
pub(crate) struct StdinApproval {
    reader: Mutex<BufReader<Stdin>>,
}

impl StdinApproval {
    pub(crate) fn new() -> Self {
        Self {
            reader: Mutex::new(BufReader::new(tokio::io::stdin())),
        }
    }
}

#[async_trait]
impl ApprovalRequester for StdinApproval {
    async fn request(&self, tool: &str, input: &Value) -> bool {
        let prompt = format!("\nrun {tool} {input}? [y/N] ");
        let mut stderr = tokio::io::stderr();
        if stderr.write_all(prompt.as_bytes()).await.is_err() {
            return false;
        }
        let _ = stderr.flush().await;

        let mut line = String::new();
        let mut reader = self.reader.lock().await;
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => false,
            Ok(_) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        }
    }
}
