//! Configuration builders controlling training and corpus ingestion.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{BpeError, Result};
use crate::merges::TokenId;
use crate::special::{
    SpecialTokenRegistry, END_OF_TEXT, END_OF_TEXT_ID, FIM_MIDDLE, FIM_MIDDLE_ID, FIM_PREFIX,
    FIM_PREFIX_ID, FIM_SUFFIX, FIM_SUFFIX_ID,
};

/// Configuration for BPE merge training.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrainerConfig {
    /// Target total alphabet size including the 256 base byte tokens.
    /// Values of 256 or less request zero merges; training then returns
    /// its input unchanged rather than failing.
    pub target_vocab_size: usize,
    /// Literal special tokens and their reserved IDs, registered before
    /// training so learned merge IDs start above all of them.
    pub special_tokens: Vec<(String, TokenId)>,
    /// Enables per-iteration logging through the `log` facade.
    pub show_progress: bool,
    /// Hard cap on merge iterations; `None` lets the vocabulary target
    /// decide.
    pub max_merge_iterations: Option<usize>,
}

impl TrainerConfig {
    /// Returns a builder initialised with [`TrainerConfig::default`].
    #[must_use]
    pub fn builder() -> TrainerBuilder {
        TrainerBuilder::default()
    }

    /// Validates the invariants required for training.
    pub fn validate(&self) -> Result<()> {
        let max_vocab = usize::try_from(TokenId::MAX).unwrap_or(usize::MAX);
        if self.target_vocab_size > max_vocab {
            return Err(BpeError::InvalidConfig(format!(
                "target_vocab_size ({}) exceeds {max_vocab}, the maximum representable TokenId",
                self.target_vocab_size
            )));
        }
        let mut literals = HashSet::with_capacity(self.special_tokens.len());
        let mut ids = HashSet::with_capacity(self.special_tokens.len());
        for (literal, id) in &self.special_tokens {
            if *id == TokenId::MAX {
                return Err(BpeError::InvalidConfig(format!(
                    "special token {literal:?} uses the reserved sentinel id {id}"
                )));
            }
            if !literals.insert(literal.as_str()) {
                return Err(BpeError::InvalidConfig(format!(
                    "special token {literal:?} registered twice"
                )));
            }
            if !ids.insert(*id) {
                return Err(BpeError::InvalidConfig(format!(
                    "special token id {id} assigned twice"
                )));
            }
        }
        Ok(())
    }

    /// Builds the immutable special-token registry described by this
    /// configuration.
    pub fn registry(&self) -> Result<SpecialTokenRegistry> {
        SpecialTokenRegistry::from_pairs(
            self.special_tokens
                .iter()
                .map(|(literal, id)| (literal.clone(), *id)),
        )
    }
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            target_vocab_size: 4_096,
            special_tokens: Vec::new(),
            show_progress: true,
            max_merge_iterations: None,
        }
    }
}

/// Builder for [`TrainerConfig`].
#[derive(Debug, Default, Clone)]
pub struct TrainerBuilder {
    cfg: TrainerConfig,
}

impl TrainerBuilder {
    /// Creates a builder with [`TrainerConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the desired vocabulary size (including base byte tokens).
    #[must_use]
    pub fn target_vocab_size(mut self, value: usize) -> Self {
        self.cfg.target_vocab_size = value;
        self
    }

    /// Registers a single special token.
    #[must_use]
    pub fn special_token(mut self, literal: impl Into<String>, id: TokenId) -> Self {
        self.cfg.special_tokens.push((literal.into(), id));
        self
    }

    /// Replaces the set of special tokens.
    #[must_use]
    pub fn special_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = (S, TokenId)>,
        S: Into<String>,
    {
        self.cfg.special_tokens = tokens
            .into_iter()
            .map(|(literal, id)| (literal.into(), id))
            .collect();
        self
    }

    /// Appends the conventional reserved inventory: `<|endoftext|>` and the
    /// fill-in-the-middle markers at IDs 50256..=50259.
    #[must_use]
    pub fn reserved_special_tokens(mut self) -> Self {
        let inventory = [
            (END_OF_TEXT, END_OF_TEXT_ID),
            (FIM_PREFIX, FIM_PREFIX_ID),
            (FIM_MIDDLE, FIM_MIDDLE_ID),
            (FIM_SUFFIX, FIM_SUFFIX_ID),
        ];
        for (literal, id) in inventory {
            self.cfg.special_tokens.push((literal.to_string(), id));
        }
        self
    }

    /// Enables or disables per-iteration logging.
    #[must_use]
    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.cfg.show_progress = enabled;
        self
    }

    /// Sets a hard merge iteration limit.
    #[must_use]
    pub fn max_merge_iterations(mut self, value: Option<usize>) -> Self {
        self.cfg.max_merge_iterations = value;
        self
    }

    /// Finalises the builder, returning a validated [`TrainerConfig`].
    pub fn build(self) -> Result<TrainerConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

/// Configuration controlling how corpora are read from disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestConfig {
    /// Enables recursive directory traversal.
    pub recursive: bool,
    /// Follows symlinks encountered during traversal.
    pub follow_symlinks: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            follow_symlinks: false,
        }
    }
}

impl IngestConfig {
    /// Returns a builder initialised with [`IngestConfig::default`].
    #[must_use]
    pub fn builder() -> IngestBuilder {
        IngestBuilder::default()
    }
}

/// Builder for [`IngestConfig`].
#[derive(Debug, Default, Clone)]
pub struct IngestBuilder {
    cfg: IngestConfig,
}

impl IngestBuilder {
    /// Creates a new builder with [`IngestConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables recursive directory traversal.
    #[must_use]
    pub fn recursive(mut self, enabled: bool) -> Self {
        self.cfg.recursive = enabled;
        self
    }

    /// Enables or disables following of symlinks when traversing directories.
    #[must_use]
    pub fn follow_symlinks(mut self, enabled: bool) -> Self {
        self.cfg.follow_symlinks = enabled;
        self
    }

    /// Finalises the builder, returning the [`IngestConfig`].
    #[must_use]
    pub fn build(self) -> IngestConfig {
        self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_vocab_targets_are_valid() {
        let cfg = TrainerConfig::builder()
            .target_vocab_size(10)
            .show_progress(false)
            .build()
            .expect("small targets are a documented no-op, not an error");
        assert_eq!(cfg.target_vocab_size, 10);
    }

    #[test]
    fn validate_rejects_duplicate_special_literal() {
        let err = TrainerConfig::builder()
            .special_token("<|a|>", 300)
            .special_token("<|a|>", 301)
            .build()
            .expect_err("duplicate literal should fail");
        assert!(matches!(
            err,
            BpeError::InvalidConfig(message) if message.contains("registered twice")
        ));
    }

    #[test]
    fn validate_rejects_duplicate_special_id() {
        let err = TrainerConfig::builder()
            .special_token("<|a|>", 300)
            .special_token("<|b|>", 300)
            .build()
            .expect_err("duplicate id should fail");
        assert!(matches!(
            err,
            BpeError::InvalidConfig(message) if message.contains("assigned twice")
        ));
    }

    #[test]
    fn validate_rejects_sentinel_special_id() {
        let err = TrainerConfig::builder()
            .special_token("<|a|>", TokenId::MAX)
            .build()
            .expect_err("sentinel id should fail");
        assert!(matches!(err, BpeError::InvalidConfig(_)));
    }

    #[test]
    fn reserved_inventory_round_trips_through_registry() {
        let cfg = TrainerConfig::builder()
            .reserved_special_tokens()
            .show_progress(false)
            .build()
            .expect("reserved inventory is valid");
        let registry = cfg.registry().expect("registry builds");
        assert_eq!(registry.id_of(END_OF_TEXT), Some(END_OF_TEXT_ID));
        assert_eq!(registry.max_id(), Some(FIM_SUFFIX_ID));
    }

    #[test]
    fn ingest_builder_overrides_defaults() {
        let cfg = IngestConfig::builder()
            .recursive(false)
            .follow_symlinks(true)
            .build();
        assert!(!cfg.recursive);
        assert!(cfg.follow_symlinks);
    }
}
