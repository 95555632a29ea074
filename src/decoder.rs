//! Reverses the merge table and special-token registry back into text.

use rustc_hash::FxHashMap;

use crate::merges::{MergeTable, Pair, TokenId, BASE_TOKENS};
use crate::special::SpecialTokenRegistry;

/// UTF-8 encoding of U+FFFD, appended for IDs nothing can explain.
const REPLACEMENT: &[u8] = "\u{FFFD}".as_bytes();

/// Decoder over an immutable merge table and special-token registry.
///
/// Construction precomputes the reverse merge mapping (`new_id -> pair`),
/// so callers decoding many sequences should build one decoder and reuse
/// it. Decoding never fails: IDs outside the base alphabet, the merge
/// table, and the registry degrade to replacement characters.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    reverse_merges: FxHashMap<TokenId, Pair>,
    specials: &'a SpecialTokenRegistry,
}

impl<'a> Decoder<'a> {
    /// Creates a decoder over the given trained state.
    #[must_use]
    pub fn new(merges: &MergeTable, specials: &'a SpecialTokenRegistry) -> Self {
        Self {
            reverse_merges: merges.reverse(),
            specials,
        }
    }

    /// Decodes token IDs into the raw bytes they stand for.
    ///
    /// Special IDs contribute their literal's bytes atomically. Every
    /// other ID is expanded with an explicit work stack rather than
    /// recursion, so arbitrarily deep merge chains cannot exhaust the call
    /// stack: a merged ID pushes its second component, then its first, so
    /// the first is processed first.
    #[must_use]
    pub fn decode_bytes(&self, ids: &[TokenId]) -> Vec<u8> {
        let mut out = Vec::with_capacity(ids.len() * 2);
        let mut stack: Vec<TokenId> = Vec::new();

        for &id in ids {
            if let Some(literal) = self.specials.literal_of(id) {
                out.extend_from_slice(literal.as_bytes());
                continue;
            }

            stack.push(id);
            while let Some(current) = stack.pop() {
                if current < BASE_TOKENS {
                    out.push(current as u8);
                    continue;
                }
                if let Some(&(first, second)) = self.reverse_merges.get(&current) {
                    stack.push(second);
                    stack.push(first);
                    continue;
                }
                out.extend_from_slice(REPLACEMENT);
            }
        }

        out
    }

    /// Decodes token IDs into a string.
    ///
    /// Bytes are concatenated in decoded order, so multi-byte UTF-8
    /// sequences survive intact as long as their bytes all arrive; torn
    /// sequences degrade to replacement characters instead of failing.
    #[must_use]
    pub fn decode(&self, ids: &[TokenId]) -> String {
        String::from_utf8_lossy(&self.decode_bytes(ids)).into_owned()
    }
}
