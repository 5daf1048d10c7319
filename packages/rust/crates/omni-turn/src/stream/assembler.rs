//! Assembles tool invocations from interleaved tool-call deltas.

use std::collections::HashMap;

use crate::invocation::ToolInvocation;
use crate::observability::SessionEvent;

/// What a delta did to the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOutcome {
    /// A new invocation was opened (sequence number attached).
    Started(usize),
    /// Argument text was appended to an open invocation.
    Appended(usize),
    /// No invocation could own the delta.
    Dropped,
}

/// Buffers tool-call fragments per stream index.
///
/// A delta carrying an id or a name opens a new invocation for its index
/// (closing any invocation still open there); a bare delta appends argument
/// text to the open invocation at its index. Arguments are parsed only when
/// the block ends ([`end_block`](Self::end_block)) or in [`finish`](Self::finish).
#[derive(Debug, Default)]
pub struct ToolCallAssembler {
    invocations: Vec<ToolInvocation>,
    open: HashMap<usize, usize>,
}

impl ToolCallAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_delta(
        &mut self,
        index: usize,
        id: Option<&str>,
        name: Option<&str>,
        arguments: Option<&str>,
    ) -> DeltaOutcome {
        let id = id.filter(|v| !v.trim().is_empty());
        let name = name.filter(|v| !v.trim().is_empty());

        if let Some(id) = id
            && let Some(position) = self.position_of_id(id)
        {
            let owner = &mut self.invocations[position];
            if owner.input.is_some() || owner.status.is_terminal() {
                tracing::warn!(
                    event = SessionEvent::ToolCallDropped.as_str(),
                    index,
                    tool_call_id = id,
                    "delta for an already finalized tool call; dropping"
                );
                return DeltaOutcome::Dropped;
            }
            if let Some(arguments) = arguments {
                owner.raw_arguments.push_str(arguments);
            }
            return DeltaOutcome::Appended(owner.sequence);
        }

        if id.is_some() || name.is_some() {
            self.end_block(index);
            let sequence = self.invocations.len();
            let id = id.map_or_else(|| format!("call_{index}_{sequence}"), str::to_string);
            let mut invocation = ToolInvocation::new(id, name.unwrap_or_default(), sequence);
            if let Some(arguments) = arguments {
                invocation.raw_arguments.push_str(arguments);
            }
            tracing::debug!(
                event = SessionEvent::ToolCallStarted.as_str(),
                index,
                sequence,
                tool_call_id = %invocation.id,
                tool = %invocation.name,
                "tool call started"
            );
            self.invocations.push(invocation);
            self.open.insert(index, sequence);
            return DeltaOutcome::Started(sequence);
        }

        let Some(&position) = self.open.get(&index) else {
            tracing::warn!(
                event = SessionEvent::ToolCallDropped.as_str(),
                index,
                "tool-call delta without an open call at this index; dropping"
            );
            return DeltaOutcome::Dropped;
        };
        if let Some(arguments) = arguments {
            self.invocations[position].raw_arguments.push_str(arguments);
        }
        DeltaOutcome::Appended(position)
    }

    /// Add a fully formed call (inline markup). Arguments are parsed now.
    ///
    /// An id already owned by another invocation of this turn is replaced
    /// with a generated `inline_*` id.
    pub fn push_complete(&mut self, id: Option<&str>, name: &str, arguments: &str) -> usize {
        let sequence = self.invocations.len();
        let requested = id.filter(|v| !v.trim().is_empty());
        let id = match requested {
            Some(id) if self.position_of_id(id).is_none() => id.to_string(),
            Some(id) => {
                let fresh = self.generated_id(sequence);
                tracing::warn!(
                    event = SessionEvent::ToolCallRenamed.as_str(),
                    sequence,
                    tool_call_id = id,
                    replacement = %fresh,
                    tool = name,
                    "inline tool call reused an id; renamed"
                );
                fresh
            }
            None => self.generated_id(sequence),
        };
        let mut invocation = ToolInvocation::new(id, name, sequence);
        invocation.raw_arguments.push_str(arguments);
        invocation.finalize_arguments();
        self.invocations.push(invocation);
        sequence
    }

    /// Close the block at `index` and parse its arguments.
    pub fn end_block(&mut self, index: usize) {
        if let Some(position) = self.open.remove(&index) {
            self.finalize(position);
        }
    }

    /// Number of invocations started so far.
    pub fn len(&self) -> usize {
        self.invocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invocations.is_empty()
    }

    /// Close every open block and return invocations in start order.
    pub fn finish(mut self) -> Vec<ToolInvocation> {
        let mut open: Vec<usize> = self.open.drain().map(|(_, position)| position).collect();
        open.sort_unstable();
        for position in open {
            self.finalize(position);
        }
        self.invocations
    }

    fn finalize(&mut self, position: usize) {
        let invocation = &mut self.invocations[position];
        invocation.finalize_arguments();
        if let Some(fault) = &invocation.fault {
            tracing::warn!(
                event = SessionEvent::ToolArgumentsInvalid.as_str(),
                tool_call_id = %invocation.id,
                tool = %invocation.name,
                error = %fault,
                "tool call arguments failed to parse"
            );
        }
    }

    fn generated_id(&self, sequence: usize) -> String {
        let mut id = format!("inline_{sequence}");
        let mut suffix = 0usize;
        while self.position_of_id(&id).is_some() {
            suffix += 1;
            id = format!("inline_{sequence}_{suffix}");
        }
        id
    }

    fn position_of_id(&self, id: &str) -> Option<usize> {
        self.invocations.iter().position(|inv| inv.id == id)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stream_assembler.rs"]
mod tests;
