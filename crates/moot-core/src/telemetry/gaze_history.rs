use std::collections::VecDeque;

use super::model::GazeObservation;

pub const DEFAULT_GAZE_HISTORY_CAPACITY: usize = 10;

/// Bounded, insertion-ordered gaze history. The oldest entry is evicted first.
#[derive(Debug, Clone)]
pub struct GazeHistory {
    entries: VecDeque<GazeObservation>,
    capacity: usize,
}

impl GazeHistory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_GAZE_HISTORY_CAPACITY)
    }

    /// A zero capacity is bumped to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, observation: GazeObservation) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(observation);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&GazeObservation> {
        self.entries.back()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &GazeObservation> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<GazeObservation> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for GazeHistory {
    fn default() -> Self {
        Self::new()
    }
}
