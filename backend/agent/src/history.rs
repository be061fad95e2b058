//! Bounded log of recent interactions, used only to enrich prompts.

use std::collections::VecDeque;

use canvaspilot_core::{Interaction, Message};

pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// FIFO of the last `capacity` interactions; the oldest entry is evicted first.
#[derive(Debug, Clone)]
pub struct RecentInteractions {
    capacity: usize,
    entries: VecDeque<Interaction>,
}

impl RecentInteractions {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, interaction: Interaction) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(interaction);
    }

    /// Oldest first.
    pub fn snapshot(&self) -> Vec<Interaction> {
        self.entries.iter().cloned().collect()
    }

    /// User/assistant message pairs, oldest first.
    pub fn to_messages(&self) -> Vec<Message> {
        self.entries.iter().flat_map(|i| i.to_messages()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for RecentInteractions {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
