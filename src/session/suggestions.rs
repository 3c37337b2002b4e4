use crate::models::{Action, SuggestionBatch};

/// Holds the suggestion batch of the most recent assistant reply, if any.
#[derive(Debug, Clone, Default)]
pub struct SuggestionRegistry {
    current: Option<SuggestionBatch>,
}

impl SuggestionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any previous batch. An empty batch leaves the registry empty.
    pub fn set(&mut self, batch: SuggestionBatch) {
        self.current = (!batch.is_empty()).then_some(batch);
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&SuggestionBatch> {
        self.current.as_ref()
    }

    pub fn question(&self, index: usize) -> Option<&str> {
        self.current
            .as_ref()
            .and_then(|batch| batch.questions.get(index))
            .map(String::as_str)
    }

    pub fn action(&self, index: usize) -> Option<&Action> {
        self.current.as_ref().and_then(|batch| batch.actions.get(index))
    }
}
