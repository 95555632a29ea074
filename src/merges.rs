//! Merge bookkeeping: the learned pair table and its identifier arithmetic.

use rustc_hash::FxHashMap;

use crate::special::SpecialTokenRegistry;

/// Token identifier used throughout the crate.
pub type TokenId = u32;

/// Merge lookup key: an adjacent `(first, second)` token pair.
pub type Pair = (TokenId, TokenId);

/// Number of reserved base-byte tokens. IDs `0..256` always decode to the
/// single byte of their value; this mapping is not configurable.
pub const BASE_TOKENS: TokenId = 256;

/// A learned merge: the ID minted for a pair and the training iteration
/// that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeRecord {
    /// Identifier assigned to the merged pair.
    pub new_id: TokenId,
    /// Creation order, 0 = learned first. Lower rank wins during encoding.
    pub rank: usize,
}

/// Mapping from token pairs to the IDs minted for them during training.
///
/// IDs are handed out consecutively starting at `max(256, max special + 1)`
/// and strictly increase with rank, so the table doubles as the record of
/// training order. Built once by the trainer and read-only afterwards; a
/// trained table can be shared freely across concurrent encoders and
/// decoders.
#[derive(Debug, Clone)]
pub struct MergeTable {
    records: FxHashMap<Pair, MergeRecord>,
    by_rank: Vec<Pair>,
    next_id: TokenId,
}

impl MergeTable {
    /// Creates an empty table whose first assigned ID is
    /// `max(256, start)`.
    #[must_use]
    pub fn with_start(start: TokenId) -> Self {
        Self {
            records: FxHashMap::default(),
            by_rank: Vec::new(),
            next_id: start.max(BASE_TOKENS),
        }
    }

    /// Creates an empty table whose first assigned ID sits above every
    /// registered special-token ID, so learned merges can never collide
    /// with the registry.
    #[must_use]
    pub fn starting_after(specials: &SpecialTokenRegistry) -> Self {
        let start = specials
            .max_id()
            .map_or(BASE_TOKENS, |id| id.saturating_add(1));
        Self::with_start(start)
    }

    /// Mints the next consecutive ID for `pair` and records it at the next
    /// rank. Callers must not assign the same pair twice.
    pub(crate) fn assign(&mut self, pair: Pair) -> MergeRecord {
        debug_assert!(!self.records.contains_key(&pair), "pair assigned twice");
        let record = MergeRecord {
            new_id: self.next_id,
            rank: self.by_rank.len(),
        };
        self.records.insert(pair, record);
        self.by_rank.push(pair);
        self.next_id += 1;
        record
    }

    /// Looks up the merge record for a pair.
    #[must_use]
    pub fn record(&self, pair: Pair) -> Option<MergeRecord> {
        self.records.get(&pair).copied()
    }

    /// Returns `true` when the pair has a learned merge.
    #[must_use]
    pub fn contains(&self, pair: Pair) -> bool {
        self.records.contains_key(&pair)
    }

    /// Number of learned merges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_rank.len()
    }

    /// Returns `true` when no merges have been learned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_rank.is_empty()
    }

    /// The ID the next assignment would mint.
    #[must_use]
    pub fn next_id(&self) -> TokenId {
        self.next_id
    }

    /// Learned pairs in rank order (index == rank).
    #[must_use]
    pub fn pairs_by_rank(&self) -> &[Pair] {
        &self.by_rank
    }

    /// Builds the reverse mapping `new_id -> pair` used by decoding.
    #[must_use]
    pub fn reverse(&self) -> FxHashMap<TokenId, Pair> {
        self.records
            .iter()
            .map(|(&pair, record)| (record.new_id, pair))
            .collect()
    }
}

/// Replaces every non-overlapping, left-to-right occurrence of `pair` in
/// `tokens` with `new_id`, compacting in place. Once two tokens merge the
/// cursor advances past both before testing again. Returns the number of
/// occurrences rewritten.
pub(crate) fn merge_pair_in_place(tokens: &mut Vec<TokenId>, pair: Pair, new_id: TokenId) -> usize {
    let mut read = 0usize;
    let mut write = 0usize;
    let original_len = tokens.len();
    let mut merged = 0usize;

    while read < original_len {
        if read + 1 < original_len && tokens[read] == pair.0 && tokens[read + 1] == pair.1 {
            tokens[write] = new_id;
            read += 2;
            merged += 1;
        } else {
            if write != read {
                tokens[write] = tokens[read];
            }
            read += 1;
        }
        write += 1;
    }

    tokens.truncate(write);
    merged
}
