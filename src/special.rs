//! Registry of literal special tokens and their reserved identifiers.

use log::warn;
use rustc_hash::FxHashMap;

use crate::error::{BpeError, Result};
use crate::merges::TokenId;

/// End-of-document marker conventionally used by GPT-style vocabularies.
pub const END_OF_TEXT: &str = "<|endoftext|>";
/// Fill-in-the-middle prefix marker.
pub const FIM_PREFIX: &str = "<|fim_prefix|>";
/// Fill-in-the-middle middle marker.
pub const FIM_MIDDLE: &str = "<|fim_middle|>";
/// Fill-in-the-middle suffix marker.
pub const FIM_SUFFIX: &str = "<|fim_suffix|>";

/// Conventional reserved ID for [`END_OF_TEXT`].
pub const END_OF_TEXT_ID: TokenId = 50_256;
/// Conventional reserved ID for [`FIM_PREFIX`].
pub const FIM_PREFIX_ID: TokenId = 50_257;
/// Conventional reserved ID for [`FIM_MIDDLE`].
pub const FIM_MIDDLE_ID: TokenId = 50_258;
/// Conventional reserved ID for [`FIM_SUFFIX`].
pub const FIM_SUFFIX_ID: TokenId = 50_259;

/// Bidirectional mapping between literal special-token strings and their
/// reserved, non-learnable IDs.
///
/// The registry is supplied at construction and immutable for the lifetime
/// of a tokenizer. Special tokens are matched as exact literals during
/// encoding and emitted atomically during decoding; they are never split
/// into bytes and never participate in merges. Merge IDs cannot collide
/// with registry IDs because training assigns new IDs starting above the
/// highest registered ID (see [`MergeTable::starting_after`]).
///
/// [`MergeTable::starting_after`]: crate::merges::MergeTable::starting_after
#[derive(Debug, Clone, Default)]
pub struct SpecialTokenRegistry {
    by_literal: FxHashMap<String, TokenId>,
    by_id: FxHashMap<TokenId, String>,
}

impl SpecialTokenRegistry {
    /// Builds a registry from `(literal, id)` pairs.
    ///
    /// Duplicate literals, duplicate IDs, and the sentinel `u32::MAX` are
    /// rejected. IDs below 256 are accepted but logged: they shadow base
    /// byte tokens during decoding.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, TokenId)>,
        S: Into<String>,
    {
        let mut registry = Self::default();
        for (literal, id) in pairs {
            let literal = literal.into();
            if id == TokenId::MAX {
                return Err(BpeError::InvalidConfig(format!(
                    "special token {literal:?} uses the reserved sentinel id {id}"
                )));
            }
            if id < 256 {
                warn!("special token {literal:?} id {id} shadows a base byte token");
            }
            if let Some(existing) = registry.by_id.get(&id) {
                return Err(BpeError::InvalidConfig(format!(
                    "special token id {id} assigned to both {existing:?} and {literal:?}"
                )));
            }
            if registry.by_literal.contains_key(&literal) {
                return Err(BpeError::InvalidConfig(format!(
                    "special token {literal:?} registered twice"
                )));
            }
            registry.by_id.insert(id, literal.clone());
            registry.by_literal.insert(literal, id);
        }
        Ok(registry)
    }

    /// Returns the conventional GPT-style inventory: [`END_OF_TEXT`] and the
    /// three fill-in-the-middle markers at IDs 50256..=50259.
    #[must_use]
    pub fn reserved() -> Self {
        let mut registry = Self::default();
        let inventory = [
            (END_OF_TEXT, END_OF_TEXT_ID),
            (FIM_PREFIX, FIM_PREFIX_ID),
            (FIM_MIDDLE, FIM_MIDDLE_ID),
            (FIM_SUFFIX, FIM_SUFFIX_ID),
        ];
        for (literal, id) in inventory {
            registry.by_id.insert(id, literal.to_string());
            registry.by_literal.insert(literal.to_string(), id);
        }
        registry
    }

    /// Looks up the reserved ID for an exact literal match.
    #[must_use]
    pub fn id_of(&self, literal: &str) -> Option<TokenId> {
        self.by_literal.get(literal).copied()
    }

    /// Looks up the literal string for a reserved ID.
    #[must_use]
    pub fn literal_of(&self, id: TokenId) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    /// Returns the highest registered ID, if any tokens are registered.
    #[must_use]
    pub fn max_id(&self) -> Option<TokenId> {
        self.by_id.keys().copied().max()
    }

    /// Returns the number of registered special tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_literal.len()
    }

    /// Returns `true` when no special tokens are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_literal.is_empty()
    }

    /// Iterates over `(literal, id)` entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, TokenId)> + '_ {
        self.by_literal.iter().map(|(literal, &id)| (literal.as_str(), id))
    }

    /// Returns all entries sorted by ID, for stable output surfaces.
    #[must_use]
    pub fn sorted_by_id(&self) -> Vec<(&str, TokenId)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by_key(|&(_, id)| id);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_inventory_matches_convention() {
        let registry = SpecialTokenRegistry::reserved();
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.id_of(END_OF_TEXT), Some(50_256));
        assert_eq!(registry.literal_of(50_259), Some(FIM_SUFFIX));
        assert_eq!(registry.max_id(), Some(50_259));
    }

    #[test]
    fn from_pairs_rejects_duplicate_literal() {
        let err = SpecialTokenRegistry::from_pairs([("<|a|>", 300), ("<|a|>", 301)])
            .expect_err("duplicate literal should fail");
        assert!(matches!(err, BpeError::InvalidConfig(_)));
    }

    #[test]
    fn from_pairs_rejects_duplicate_id() {
        let err = SpecialTokenRegistry::from_pairs([("<|a|>", 300), ("<|b|>", 300)])
            .expect_err("duplicate id should fail");
        assert!(matches!(err, BpeError::InvalidConfig(_)));
    }

    #[test]
    fn from_pairs_rejects_sentinel_id() {
        let err = SpecialTokenRegistry::from_pairs([("<|a|>", TokenId::MAX)])
            .expect_err("sentinel id should fail");
        assert!(matches!(err, BpeError::InvalidConfig(_)));
    }

    #[test]
    fn sub_byte_ids_are_accepted() {
        let registry = SpecialTokenRegistry::from_pairs([("<|nul|>", 0)])
            .expect("sub-byte ids are legal, only discouraged");
        assert_eq!(registry.id_of("<|nul|>"), Some(0));
    }

    #[test]
    fn sorted_by_id_is_stable() {
        let registry =
            SpecialTokenRegistry::from_pairs([("<|b|>", 400), ("<|a|>", 300)]).expect("valid");
        let entries = registry.sorted_by_id();
        assert_eq!(entries, vec![("<|a|>", 300), ("<|b|>", 400)]);
    }
}
