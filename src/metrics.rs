//! Metrics describing the evolution of the training process.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::merges::Pair;

/// Reason a training run terminated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// The configured target vocabulary size was reached.
    TargetVocabReached,
    /// The configured maximum merge iterations was reached.
    MaxIterationsReached,
    /// The sequence ran out of adjacent pairs before the target was met.
    NoEligiblePairs,
    /// The target vocabulary left no room for merges (256 or less); the
    /// input was returned unchanged.
    NothingRequested,
    /// The token ID space was exhausted before the target was met.
    IdSpaceExhausted,
}

/// Metrics captured for each merge iteration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IterationMetrics {
    /// Sequential iteration number (1-indexed).
    pub iteration: usize,
    /// The pair selected for merging.
    pub best_pair: Pair,
    /// Frequency of the selected pair at selection time.
    pub best_frequency: usize,
    /// Number of occurrences rewritten in the sequence.
    pub occurrences_merged: usize,
    /// Count of distinct adjacent pairs observed during the iteration.
    pub distinct_pairs: usize,
    /// Execution time for the iteration.
    pub elapsed_iteration: Duration,
    /// Total time elapsed since training started.
    pub elapsed_total: Duration,
}

/// Aggregate metrics produced by a training session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrainingMetrics {
    /// Per-iteration snapshots accrued during training.
    pub iterations: Vec<IterationMetrics>,
    /// Total duration of the training session.
    pub total_duration: Duration,
    /// Reason training terminated.
    pub stop_reason: StopReason,
}

impl TrainingMetrics {
    /// Creates an empty metrics container with pre-allocated capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            iterations: Vec::with_capacity(capacity),
            total_duration: Duration::ZERO,
            stop_reason: StopReason::TargetVocabReached,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_serialize_round_trip() {
        let metrics = TrainingMetrics {
            iterations: vec![IterationMetrics {
                iteration: 1,
                best_pair: (97, 97),
                best_frequency: 4,
                occurrences_merged: 4,
                distinct_pairs: 7,
                elapsed_iteration: Duration::from_micros(12),
                elapsed_total: Duration::from_micros(12),
            }],
            total_duration: Duration::from_micros(15),
            stop_reason: StopReason::NoEligiblePairs,
        };
        let json = serde_json::to_string(&metrics).expect("serialize");
        let restored: TrainingMetrics = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, metrics);
    }
}
