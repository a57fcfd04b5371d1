//! Rolling window of past overall scores

use std::collections::VecDeque;

/// Maximum number of scores kept
pub const HISTORY_CAPACITY: usize = 10;

/// Capped, append-only sequence of overall scores, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreHistory {
    scores: VecDeque<u8>,
}

impl ScoreHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a score, evicting the oldest once over capacity
    pub fn push(&mut self, score: u8) {
        self.scores.push_back(score);
        if self.scores.len() > HISTORY_CAPACITY {
            self.scores.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn latest(&self) -> Option<u8> {
        self.scores.back().copied()
    }

    /// Change between the two most recent scores
    pub fn delta(&self) -> Option<i16> {
        let n = self.scores.len();
        if n < 2 {
            return None;
        }
        Some(i16::from(self.scores[n - 1]) - i16::from(self.scores[n - 2]))
    }

    /// Scores oldest first
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.scores.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.iter().collect()
    }
}
