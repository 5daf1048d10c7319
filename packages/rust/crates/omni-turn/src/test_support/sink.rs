use std::sync::{Mutex, PoisonError};

use omni_events::{ProgressEvent, ProgressKind, ProgressSink};

/// Keeps every emitted event in order.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn kinds(&self) -> Vec<ProgressKind> {
        self.events().into_iter().map(|event| event.kind).collect()
    }

    pub fn topics(&self) -> Vec<&'static str> {
        self.events().iter().map(ProgressEvent::topic).collect()
    }

    pub fn count(&self, predicate: impl Fn(&ProgressKind) -> bool) -> usize {
        self.kinds().iter().filter(|kind| predicate(kind)).count()
    }

    /// Stage names from `StageChange` events.
    pub fn stages(&self) -> Vec<String> {
        self.kinds()
            .into_iter()
            .filter_map(|kind| match kind {
                ProgressKind::StageChange { stage } => Some(stage),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
