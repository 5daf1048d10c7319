use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use super::{ApprovalMode, ApprovalRequester, ToolContext, ToolDefinition, ToolRegistry};
use crate::error::ToolFault;
use crate::invocation::ToolInvocation;
use crate::observability::SessionEvent;

/// Check `input` against the schema's `required` list.
///
/// Reports every missing field at once, in schema order. Only absent keys
/// count as missing; an explicit `null` is left for the tool to judge.
pub fn validate_arguments(definition: &ToolDefinition, input: &Value) -> Result<(), ToolFault> {
    let missing: Vec<String> = definition
        .required_fields()
        .into_iter()
        .filter(|field| input.get(*field).is_none())
        .map(str::to_string)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ToolFault::Validation {
            tool: definition.name.clone(),
            missing,
        })
    }
}

/// Validates, approves and executes one invocation at a time.
#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    approval: Option<Arc<dyn ApprovalRequester>>,
    mode: ApprovalMode,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            approval: None,
            mode: ApprovalMode::Ask,
        }
    }

    #[must_use]
    pub fn with_approval(mut self, requester: Arc<dyn ApprovalRequester>) -> Self {
        self.approval = Some(requester);
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: ApprovalMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn mode(&self) -> ApprovalMode {
        self.mode
    }

    /// Paths the named tool will mutate for `input`.
    pub fn mutated_paths(&self, invocation: &ToolInvocation) -> Vec<String> {
        match (self.registry.get(&invocation.name), &invocation.input) {
            (Some(tool), Some(input)) => tool.mutated_paths(input),
            _ => Vec::new(),
        }
    }

    /// Run `invocation` to a terminal status.
    ///
    /// Invocations already terminal (argument parse failures) are left as
    /// they are. Every failure is recorded on the invocation.
    pub async fn dispatch(&self, invocation: &mut ToolInvocation, ctx: &ToolContext) {
        if invocation.status.is_terminal() {
            return;
        }
        let started = Instant::now();

        let Some(tool) = self.registry.get(&invocation.name) else {
            let fault = ToolFault::UnknownTool(invocation.name.clone());
            Self::reject(invocation, fault, started);
            return;
        };
        let input = invocation.input.clone().unwrap_or(Value::Object(serde_json::Map::new()));
        if let Err(fault) = validate_arguments(&tool.definition(), &input) {
            Self::reject(invocation, fault, started);
            return;
        }

        if self.mode == ApprovalMode::Ask
            && let Some(approval) = &self.approval
            && !approval.request(&invocation.name, &input).await
        {
            invocation.decline(Some(started.elapsed()));
            tracing::info!(
                event = SessionEvent::ToolDispatchDeclined.as_str(),
                run_id = ctx.run_id,
                tool = %invocation.name,
                call_id = %invocation.id,
                "tool call declined by operator"
            );
            return;
        }

        invocation.mark_running();
        tracing::debug!(
            event = SessionEvent::ToolDispatchStarted.as_str(),
            run_id = ctx.run_id,
            tool = %invocation.name,
            call_id = %invocation.id,
            "dispatching tool call"
        );
        match tool.execute(input, ctx).await {
            Ok(output) => {
                invocation.complete(output, Some(started.elapsed()));
                tracing::info!(
                    event = SessionEvent::ToolDispatchCompleted.as_str(),
                    run_id = ctx.run_id,
                    tool = %invocation.name,
                    call_id = %invocation.id,
                    duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "tool call completed"
                );
            }
            Err(error) => {
                let fault = ToolFault::Execution(format!("{error:#}"));
                Self::reject(invocation, fault, started);
            }
        }
    }

    fn reject(invocation: &mut ToolInvocation, fault: ToolFault, started: Instant) {
        tracing::warn!(
            event = SessionEvent::ToolDispatchFailed.as_str(),
            tool = %invocation.name,
            call_id = %invocation.id,
            error = %fault,
            "tool call failed"
        );
        invocation.fail(fault, Some(started.elapsed()));
    }
}

#[cfg(test)]
#[path = "../../tests/unit/tools_dispatcher.rs"]
mod tests;
