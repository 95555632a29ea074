//! Applies the learned merge table to turn raw input into token IDs.

use crate::merges::{merge_pair_in_place, MergeRecord, MergeTable, Pair, TokenId};
use crate::special::SpecialTokenRegistry;

/// Encoder over an immutable merge table and special-token registry.
///
/// Borrows the trained state, so any number of encoders can run
/// concurrently against the same tokenizer.
#[derive(Debug, Clone, Copy)]
pub struct Encoder<'a> {
    merges: &'a MergeTable,
    specials: &'a SpecialTokenRegistry,
}

impl<'a> Encoder<'a> {
    /// Creates an encoder over the given trained state.
    #[must_use]
    pub fn new(merges: &'a MergeTable, specials: &'a SpecialTokenRegistry) -> Self {
        Self { merges, specials }
    }

    /// Applies learned merges to a numeric token sequence.
    ///
    /// Repeatedly scans all adjacent pairs, applies the one with the
    /// lowest rank anywhere in the sequence (earliest-learned merges are
    /// the most foundational and must land before finer ones), and
    /// repeats until no adjacent pair remains in the table. Sequences
    /// shorter than two tokens are returned unchanged.
    ///
    /// Each scan is O(n) and up to O(n) merges can apply, so a single
    /// call is O(n²) worst case. That matches the intended input sizes;
    /// replacing the scan with a priority structure is out of scope until
    /// profiling demands it.
    #[must_use]
    pub fn encode_ids(&self, tokens: Vec<TokenId>) -> Vec<TokenId> {
        let mut tokens = tokens;
        if tokens.len() < 2 {
            return tokens;
        }

        loop {
            let mut best: Option<(Pair, MergeRecord)> = None;
            for window in tokens.windows(2) {
                let pair = (window[0], window[1]);
                if let Some(record) = self.merges.record(pair) {
                    if best.map_or(true, |(_, held)| record.rank < held.rank) {
                        best = Some((pair, record));
                    }
                }
            }
            let Some((pair, record)) = best else {
                break;
            };
            merge_pair_in_place(&mut tokens, pair, record.new_id);
        }

        tokens
    }

    /// Encodes raw bytes by lifting each byte into the base alphabet and
    /// applying merges.
    #[must_use]
    pub fn encode_bytes(&self, data: &[u8]) -> Vec<TokenId> {
        self.encode_ids(data.iter().copied().map(TokenId::from).collect())
    }

    /// Encodes pre-split segments into token IDs.
    ///
    /// A segment exactly matching a registered special token is emitted as
    /// its single reserved ID; every other segment is decomposed into its
    /// raw bytes. The flattened sequence then goes through
    /// [`Encoder::encode_ids`]. Special IDs sit in the scan like any other
    /// token, but no merge pair ever references one, so they act as hard
    /// boundaries that merges cannot cross.
    #[must_use]
    pub fn encode_segments<S: AsRef<str>>(&self, segments: &[S]) -> Vec<TokenId> {
        let mut numeric = Vec::with_capacity(segments.len() * 4);
        for segment in segments {
            let segment = segment.as_ref();
            if let Some(id) = self.specials.id_of(segment) {
                numeric.push(id);
            } else {
                numeric.extend(segment.bytes().map(TokenId::from));
            }
        }
        self.encode_ids(numeric)
    }

    /// Encodes a raw text string, splitting out special-token literals.
    ///
    /// The text is scanned for literal occurrences of registered special
    /// tokens (longest match wins when two literals start at the same
    /// position); matched spans become atomic IDs and everything between
    /// them is byte-decomposed, then the whole sequence is merged.
    #[must_use]
    pub fn encode_text(&self, text: &str) -> Vec<TokenId> {
        if self.specials.is_empty() {
            return self.encode_ids(text.bytes().map(TokenId::from).collect());
        }

        let mut numeric = Vec::with_capacity(text.len());
        let mut rest = text;
        while !rest.is_empty() {
            match self.earliest_special(rest) {
                Some((start, literal, id)) => {
                    numeric.extend(rest[..start].bytes().map(TokenId::from));
                    numeric.push(id);
                    rest = &rest[start + literal.len()..];
                }
                None => {
                    numeric.extend(rest.bytes().map(TokenId::from));
                    break;
                }
            }
        }
        self.encode_ids(numeric)
    }

    /// Finds the first special-token occurrence in `text`, preferring the
    /// longest literal when several start at the same position.
    fn earliest_special(&self, text: &str) -> Option<(usize, &'a str, TokenId)> {
        let mut found: Option<(usize, &'a str, TokenId)> = None;
        for (literal, id) in self.specials.iter() {
            let Some(position) = text.find(literal) else {
                continue;
            };
            let better = match found {
                None => true,
                Some((best_position, best_literal, _)) => {
                    position < best_position
                        || (position == best_position && literal.len() > best_literal.len())
                }
            };
            if better {
                found = Some((position, literal, id));
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[Pair]) -> MergeTable {
        let mut table = MergeTable::with_start(256);
        for &pair in pairs {
            table.assign(pair);
        }
        table
    }

    fn registry() -> SpecialTokenRegistry {
        SpecialTokenRegistry::from_pairs([("<|endoftext|>", 50_256)]).expect("valid registry")
    }

    #[test]
    fn short_sequences_pass_through_unchanged() {
        let table = table(&[(97, 98)]);
        let specials = SpecialTokenRegistry::default();
        let encoder = Encoder::new(&table, &specials);
        assert_eq!(encoder.encode_ids(vec![]), Vec::<TokenId>::new());
        assert_eq!(encoder.encode_ids(vec![97]), vec![97]);
    }

    #[test]
    fn chained_merges_apply_in_rank_order() {
        // rank 0: (97,98) -> 256, rank 1: (256,99) -> 257
        let table = table(&[(97, 98), (256, 99)]);
        let specials = SpecialTokenRegistry::default();
        let encoder = Encoder::new(&table, &specials);
        assert_eq!(encoder.encode_ids(vec![97, 98, 99]), vec![257]);
    }

    #[test]
    fn lowest_rank_wins_when_both_pairs_present() {
        // (98,99) was learned first; applying (97,98) first would destroy
        // its occurrence, so rank order matters here.
        let table = table(&[(98, 99), (97, 256)]);
        let specials = SpecialTokenRegistry::default();
        let encoder = Encoder::new(&table, &specials);
        assert_eq!(encoder.encode_ids(vec![97, 98, 99]), vec![257]);
    }

    #[test]
    fn encode_bytes_round_trips_through_the_base_alphabet() {
        let table = table(&[(0xC3, 0xA9)]);
        let specials = SpecialTokenRegistry::default();
        let encoder = Encoder::new(&table, &specials);
        assert_eq!(encoder.encode_bytes("é".as_bytes()), vec![256]);
        assert_eq!(encoder.encode_bytes(b"xy"), vec![120, 121]);
    }

    #[test]
    fn unknown_pairs_are_left_alone() {
        let table = table(&[(97, 98)]);
        let specials = SpecialTokenRegistry::default();
        let encoder = Encoder::new(&table, &specials);
        assert_eq!(encoder.encode_ids(vec![99, 100, 99]), vec![99, 100, 99]);
    }

    #[test]
    fn special_segment_is_one_atomic_id() {
        let table = table(&[(97, 98)]);
        let specials = registry();
        let encoder = Encoder::new(&table, &specials);
        assert_eq!(encoder.encode_segments(&["<|endoftext|>"]), vec![50_256]);
        assert_eq!(
            encoder.encode_segments(&["ab", "<|endoftext|>", "ab"]),
            vec![256, 50_256, 256]
        );
    }

    #[test]
    fn special_ids_block_merges_across_them() {
        let table = table(&[(98, 99)]);
        let specials = registry();
        let encoder = Encoder::new(&table, &specials);
        // "b" and "c" are adjacent to the special ID, never to each other.
        assert_eq!(
            encoder.encode_segments(&["b", "<|endoftext|>", "c"]),
            vec![98, 50_256, 99]
        );
    }

    #[test]
    fn encode_text_splits_out_special_literals() {
        let table = table(&[]);
        let specials = registry();
        let encoder = Encoder::new(&table, &specials);
        assert_eq!(
            encoder.encode_text("ab<|endoftext|>cd"),
            vec![97, 98, 50_256, 99, 100]
        );
        assert_eq!(encoder.encode_text("<|endoftext|>"), vec![50_256]);
        assert_eq!(
            encoder.encode_text("<|endoftext|><|endoftext|>"),
            vec![50_256, 50_256]
        );
    }

    #[test]
    fn encode_text_prefers_longest_literal_at_same_position() {
        let table = table(&[]);
        let specials = SpecialTokenRegistry::from_pairs([("<|e|>", 300), ("<|e|>x", 301)])
            .expect("valid registry");
        let encoder = Encoder::new(&table, &specials);
        assert_eq!(encoder.encode_text("<|e|>x"), vec![301]);
        assert_eq!(encoder.encode_text("<|e|>y"), vec![300, 121]);
    }

    #[test]
    fn partial_special_text_stays_plain_bytes() {
        let table = table(&[]);
        let specials = registry();
        let encoder = Encoder::new(&table, &specials);
        let encoded = encoder.encode_text("<|endof");
        assert_eq!(encoded, "<|endof".bytes().map(TokenId::from).collect::<Vec<_>>());
    }
}
