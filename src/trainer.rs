//! Core training loop that learns the merge table from a token sequence.

use std::cmp::Ordering;
use std::path::Path;
use std::time::Instant;

use log::info;
use rustc_hash::FxHashMap;

use crate::config::{IngestConfig, TrainerBuilder, TrainerConfig};
use crate::corpus::load_corpus;
use crate::error::Result;
use crate::merges::{merge_pair_in_place, MergeTable, Pair, TokenId, BASE_TOKENS};
use crate::metrics::{IterationMetrics, StopReason, TrainingMetrics};
use crate::model::BpeTokenizer;

/// High-level façade configuring and executing BPE training runs.
///
/// Training is the sole mutation point in the crate: it consumes a token
/// sequence, populates a fresh [`MergeTable`], and hands back an immutable
/// [`BpeTokenizer`] that can be shared across threads.
#[derive(Debug, Clone)]
pub struct Trainer {
    cfg: TrainerConfig,
}

/// Artifacts returned after a training session completes.
#[must_use]
#[derive(Debug, Clone)]
pub struct TrainerArtifacts {
    /// The trained, immutable tokenizer.
    pub tokenizer: BpeTokenizer,
    /// The fully merged training sequence. Only the tokenizer matters
    /// downstream; this is returned for inspection and may be discarded.
    pub merged: Vec<TokenId>,
    /// Detailed metrics captured during training.
    pub metrics: TrainingMetrics,
}

impl Trainer {
    /// Creates a new trainer for the supplied configuration.
    #[must_use]
    pub fn new(cfg: TrainerConfig) -> Self {
        Self { cfg }
    }

    /// Returns a [`TrainerBuilder`] with default settings.
    #[must_use]
    pub fn builder() -> TrainerBuilder {
        TrainerConfig::builder()
    }

    /// Returns an immutable reference to the underlying configuration.
    #[must_use]
    pub fn config(&self) -> &TrainerConfig {
        &self.cfg
    }

    /// Trains from files or directories discovered according to
    /// [`IngestConfig`]. File contents are byte-decomposed into the base
    /// alphabet before training.
    pub fn train_from_paths<P: AsRef<Path>>(
        &self,
        inputs: &[P],
        ingest: &IngestConfig,
    ) -> Result<TrainerArtifacts> {
        let corpus = load_corpus(inputs, ingest)?;
        self.train_from_tokens(corpus.into_iter().map(TokenId::from).collect())
    }

    /// Trains from a text string, treated as its raw UTF-8 bytes.
    pub fn train_from_text(&self, text: &str) -> Result<TrainerArtifacts> {
        self.train_from_tokens(text.bytes().map(TokenId::from).collect())
    }

    /// Trains from an already byte-decomposed token sequence.
    ///
    /// Performs up to `target_vocab_size - 256` iterations of: recount all
    /// adjacent pairs, pick the most frequent one (ties resolved toward
    /// the lexicographically smallest pair), mint the next consecutive ID
    /// for it, and rewrite the sequence. Targets of 256 or less are a
    /// no-op, and running out of pairs ends training early; neither is an
    /// error.
    ///
    /// Frequencies are recomputed from scratch on every iteration. The
    /// incremental bookkeeping that would avoid this is deliberately out
    /// of scope; training cost is dominated by corpus size, not merge
    /// count, at the intended scales.
    pub fn train_from_tokens(&self, tokens: Vec<TokenId>) -> Result<TrainerArtifacts> {
        self.cfg.validate()?;
        let specials = self.cfg.registry()?;
        let mut table = MergeTable::starting_after(&specials);
        let mut tokens = tokens;

        let requested = self.cfg.target_vocab_size.saturating_sub(BASE_TOKENS as usize);
        let mut metrics = TrainingMetrics::new(requested.min(16_384));
        if requested == 0 {
            metrics.stop_reason = StopReason::NothingRequested;
            return Ok(TrainerArtifacts {
                tokenizer: BpeTokenizer::new(table, specials),
                merged: tokens,
                metrics,
            });
        }

        let training_start = Instant::now();
        for iteration in 0..requested {
            if let Some(max_iters) = self.cfg.max_merge_iterations {
                if iteration >= max_iters {
                    metrics.stop_reason = StopReason::MaxIterationsReached;
                    break;
                }
            }
            if table.next_id() == TokenId::MAX {
                metrics.stop_reason = StopReason::IdSpaceExhausted;
                break;
            }

            let iteration_start = Instant::now();
            let counts = pair_frequencies(&tokens);
            let Some(best) = counts
                .iter()
                .map(|(&pair, &frequency)| PairScore::new(pair, frequency))
                .max()
            else {
                metrics.stop_reason = StopReason::NoEligiblePairs;
                break;
            };
            let distinct_pairs = counts.len();

            let record = table.assign(best.pair);
            let occurrences = merge_pair_in_place(&mut tokens, best.pair, record.new_id);

            if self.cfg.show_progress {
                info!(
                    "iter {:>6} pair ({:>6}, {:>6}) -> {:>6} freq {:>8} vocab {:>8}",
                    iteration + 1,
                    best.pair.0,
                    best.pair.1,
                    record.new_id,
                    best.frequency,
                    BASE_TOKENS as usize + specials.len() + table.len()
                );
            }

            metrics.iterations.push(IterationMetrics {
                iteration: iteration + 1,
                best_pair: best.pair,
                best_frequency: best.frequency,
                occurrences_merged: occurrences,
                distinct_pairs,
                elapsed_iteration: iteration_start.elapsed(),
                elapsed_total: training_start.elapsed(),
            });
        }

        if metrics.iterations.len() == requested {
            metrics.stop_reason = StopReason::TargetVocabReached;
        }
        metrics.total_duration = training_start.elapsed();

        if self.cfg.show_progress {
            info!(
                "learned {} merges in {:.2?}; vocab size {}",
                table.len(),
                metrics.total_duration,
                BASE_TOKENS as usize + specials.len() + table.len()
            );
        }

        Ok(TrainerArtifacts {
            tokenizer: BpeTokenizer::new(table, specials),
            merged: tokens,
            metrics,
        })
    }
}

/// Counts adjacent-pair frequencies over a token sequence.
///
/// Pure and stateless; sequences shorter than two tokens yield an empty
/// map. Recomputed from scratch on every training iteration.
#[must_use]
pub fn pair_frequencies(tokens: &[TokenId]) -> FxHashMap<Pair, usize> {
    let mut counts = FxHashMap::default();
    if tokens.len() < 2 {
        return counts;
    }
    for window in tokens.windows(2) {
        *counts.entry((window[0], window[1])).or_insert(0) += 1;
    }
    counts
}

/// Orders merge candidates by frequency, breaking ties toward the
/// lexicographically smallest pair so selection is deterministic
/// regardless of hash-map iteration order.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct PairScore {
    frequency: usize,
    pair: Pair,
}

impl PairScore {
    fn new(pair: Pair, frequency: usize) -> Self {
        Self { frequency, pair }
    }
}

impl Ord for PairScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.frequency
            .cmp(&other.frequency)
            .then_with(|| other.pair.cmp(&self.pair))
    }
}

impl PartialOrd for PairScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
