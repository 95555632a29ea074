//! The trained tokenizer value shared by encoding and decoding.

use std::path::Path;

use ahash::AHashMap;
use rayon::prelude::*;

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::Result;
use crate::merges::{MergeTable, Pair, TokenId, BASE_TOKENS};
use crate::serialization::{load_tokenizer, save_tokenizer, tokenizer_json};
use crate::special::SpecialTokenRegistry;

/// A trained BPE tokenizer: the merge table plus the special-token
/// registry, immutable after training.
///
/// Because nothing mutates after construction, a `BpeTokenizer` can be
/// shared freely across threads; the batch helpers below lean on exactly
/// that. The only way to obtain a non-empty merge table is through
/// [`Trainer`] or by reloading a persisted tokenizer.
///
/// [`Trainer`]: crate::trainer::Trainer
#[must_use]
#[derive(Debug, Clone)]
pub struct BpeTokenizer {
    merges: MergeTable,
    specials: SpecialTokenRegistry,
}

impl BpeTokenizer {
    /// Assembles a tokenizer from trained state.
    pub(crate) fn new(merges: MergeTable, specials: SpecialTokenRegistry) -> Self {
        Self { merges, specials }
    }

    /// Reconstructs a tokenizer from a rank-ordered merge list.
    ///
    /// Ranks follow list order and IDs are reassigned consecutively from
    /// `max(256, max special + 1)`, so a list captured from
    /// [`MergeTable::pairs_by_rank`] reproduces the original table
    /// exactly.
    pub fn from_merges(pairs: &[Pair], specials: SpecialTokenRegistry) -> Self {
        let mut merges = MergeTable::starting_after(&specials);
        for &pair in pairs {
            merges.assign(pair);
        }
        Self { merges, specials }
    }

    /// The learned merge table.
    #[must_use]
    pub fn merges(&self) -> &MergeTable {
        &self.merges
    }

    /// The special-token registry supplied at training time.
    #[must_use]
    pub fn special_tokens(&self) -> &SpecialTokenRegistry {
        &self.specials
    }

    /// Total vocabulary size: base bytes, special tokens, and merges.
    #[must_use]
    pub fn vocab_size(&self) -> usize {
        BASE_TOKENS as usize + self.specials.len() + self.merges.len()
    }

    /// Returns an encoder borrowing this tokenizer's state.
    #[must_use]
    pub fn encoder(&self) -> Encoder<'_> {
        Encoder::new(&self.merges, &self.specials)
    }

    /// Returns a decoder borrowing this tokenizer's state.
    ///
    /// Building a decoder precomputes the reverse merge mapping; reuse it
    /// when decoding many sequences.
    #[must_use]
    pub fn decoder(&self) -> Decoder<'_> {
        Decoder::new(&self.merges, &self.specials)
    }

    /// Encodes a numeric token sequence. See [`Encoder::encode_ids`].
    #[must_use]
    pub fn encode_ids(&self, tokens: Vec<TokenId>) -> Vec<TokenId> {
        self.encoder().encode_ids(tokens)
    }

    /// Encodes raw bytes. See [`Encoder::encode_bytes`].
    #[must_use]
    pub fn encode_bytes(&self, data: &[u8]) -> Vec<TokenId> {
        self.encoder().encode_bytes(data)
    }

    /// Encodes pre-split segments. See [`Encoder::encode_segments`].
    #[must_use]
    pub fn encode_segments<S: AsRef<str>>(&self, segments: &[S]) -> Vec<TokenId> {
        self.encoder().encode_segments(segments)
    }

    /// Encodes a text string. See [`Encoder::encode_text`].
    #[must_use]
    pub fn encode_text(&self, text: &str) -> Vec<TokenId> {
        self.encoder().encode_text(text)
    }

    /// Decodes token IDs into a string. See [`Decoder::decode`].
    #[must_use]
    pub fn decode(&self, ids: &[TokenId]) -> String {
        self.decoder().decode(ids)
    }

    /// Decodes token IDs into raw bytes. See [`Decoder::decode_bytes`].
    #[must_use]
    pub fn decode_to_bytes(&self, ids: &[TokenId]) -> Vec<u8> {
        self.decoder().decode_bytes(ids)
    }

    /// Encodes many texts in parallel.
    ///
    /// Safe because the trained state is read-only; each rayon worker gets
    /// its own borrowing encoder. Output order matches input order.
    #[must_use]
    pub fn encode_batch<S: AsRef<str> + Sync>(&self, texts: &[S]) -> Vec<Vec<TokenId>> {
        texts
            .par_iter()
            .map(|text| self.encode_text(text.as_ref()))
            .collect()
    }

    /// Decodes many ID sequences in parallel, sharing one precomputed
    /// decoder across workers. Output order matches input order.
    #[must_use]
    pub fn decode_batch(&self, sequences: &[Vec<TokenId>]) -> Vec<String> {
        let decoder = self.decoder();
        sequences
            .par_iter()
            .map(|ids| decoder.decode(ids))
            .collect()
    }

    /// Reconstructs the full vocabulary as an ID → byte-string map.
    ///
    /// The vocabulary has no stored form of its own; it is the union of
    /// the 256 base bytes, the special-token literals, and every merge
    /// expanded to the bytes it stands for.
    #[must_use]
    pub fn vocabulary(&self) -> AHashMap<TokenId, Vec<u8>> {
        let mut vocab = AHashMap::with_capacity(self.vocab_size());
        for byte in 0..BASE_TOKENS {
            vocab.insert(byte, vec![byte as u8]);
        }
        for (literal, id) in self.specials.iter() {
            vocab.insert(id, literal.as_bytes().to_vec());
        }
        let decoder = self.decoder();
        for &pair in self.merges.pairs_by_rank() {
            if let Some(record) = self.merges.record(pair) {
                vocab.insert(record.new_id, decoder.decode_bytes(&[record.new_id]));
            }
        }
        vocab
    }

    /// Serialises the tokenizer to a JSON manifest string.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        tokenizer_json(self, pretty)
    }

    /// Persists the tokenizer as a JSON manifest on disk.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_tokenizer(self, path)
    }

    /// Loads a tokenizer previously written by [`BpeTokenizer::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_tokenizer(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainerConfig;
    use crate::trainer::Trainer;

    fn trained(text: &str, vocab_size: usize) -> BpeTokenizer {
        let cfg = TrainerConfig::builder()
            .target_vocab_size(vocab_size)
            .special_token("<|endoftext|>", 50_256)
            .show_progress(false)
            .build()
            .expect("valid config");
        Trainer::new(cfg)
            .train_from_text(text)
            .expect("training succeeds")
            .tokenizer
    }

    #[test]
    fn round_trip_identity() {
        let tokenizer = trained("the quick brown fox jumps over the lazy dog", 300);
        for text in ["the fox", "lazy dogs doze", "", "a"] {
            let encoded = tokenizer.encode_text(text);
            assert_eq!(tokenizer.decode(&encoded), text);
        }
    }

    #[test]
    fn re_encoding_is_idempotent() {
        let tokenizer = trained("abc abc abc abracadabra", 280);
        let text = "abc abracadabra abc";
        let first = tokenizer.encode_text(text);
        let second = tokenizer.encode_text(&tokenizer.decode(&first));
        assert_eq!(first, second);
    }

    #[test]
    fn special_atomicity_survives_training_scale() {
        for vocab_size in [256, 270, 400] {
            let tokenizer = trained("some training text, repeated text", vocab_size);
            assert_eq!(tokenizer.encode_segments(&["<|endoftext|>"]), vec![50_256]);
            assert_eq!(tokenizer.decode(&[50_256]), "<|endoftext|>");
        }
    }

    #[test]
    fn batch_helpers_match_single_calls() {
        let tokenizer = trained("mississippi riverbank mississippi", 280);
        let texts = ["mississippi", "river", "<|endoftext|>bank"];
        let batch = tokenizer.encode_batch(&texts);
        assert_eq!(batch.len(), texts.len());
        for (text, encoded) in texts.iter().zip(&batch) {
            assert_eq!(&tokenizer.encode_text(text), encoded);
        }
        let decoded = tokenizer.decode_batch(&batch);
        assert_eq!(decoded, texts);
    }

    #[test]
    fn vocabulary_covers_every_id_class() {
        let tokenizer = trained("banana bandana banana", 260);
        let vocab = tokenizer.vocabulary();
        assert_eq!(vocab.len(), tokenizer.vocab_size());
        assert_eq!(vocab.get(&97), Some(&b"a".to_vec()));
        assert_eq!(vocab.get(&50_256), Some(&b"<|endoftext|>".to_vec()));
        for &pair in tokenizer.merges().pairs_by_rank() {
            let record = tokenizer.merges().record(pair).expect("record exists");
            let bytes = vocab.get(&record.new_id).expect("merge id in vocabulary");
            assert!(bytes.len() >= 2);
        }
    }

    #[test]
    fn from_merges_reproduces_encodings() {
        let tokenizer = trained("deterministic reconstruction test text", 290);
        let rebuilt = BpeTokenizer::from_merges(
            tokenizer.merges().pairs_by_rank(),
            tokenizer.special_tokens().clone(),
        );
        let text = "deterministic test";
        assert_eq!(rebuilt.encode_text(text), tokenizer.encode_text(text));
        assert_eq!(rebuilt.vocab_size(), tokenizer.vocab_size());
    }
}
