//! Incremental recovery of tool calls from a model stream.

mod assembler;
mod inline;

pub use assembler::{DeltaOutcome, ToolCallAssembler};
pub use inline::{INLINE_MARKERS, InlineCall, InlineOutput, InlineToolFilter, NearMiss};
