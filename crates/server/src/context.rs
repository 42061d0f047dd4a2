use std::collections::VecDeque;

const CAPACITY: usize = 50;
const SNAPSHOT_LEN: usize = 5;
const TRUNCATE_CHARS: usize = 500;

/// Bounded FIFO of finalized utterance texts used as LLM prompt context.
/// Accessed only by the session controller (directly, or through the
/// per-commit pipeline's shared-state lock); never mutated concurrently
/// without that lock held.
#[derive(Default)]
pub struct ContextStore {
    entries: VecDeque<String>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self { entries: VecDeque::with_capacity(CAPACITY) }
    }

    pub fn append(&mut self, text: impl Into<String>) {
        self.entries.push_back(text.into());
        if self.entries.len() > CAPACITY {
            self.entries.pop_front();
        }
    }

    /// Up to the 5 most recent entries, oldest first, each truncated to the
    /// first 500 characters.
    pub fn snapshot_for_llm(&self) -> Vec<String> {
        let skip = self.entries.len().saturating_sub(SNAPSHOT_LEN);
        self.entries.iter().skip(skip).map(|s| truncate_chars(s, TRUNCATE_CHARS)).collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
