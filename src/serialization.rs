//! Persistence: a versioned JSON manifest for trained tokenizers.
//!
//! The manifest stores the special-token inventory and the merge list in
//! rank order. That is the entire trained state: ranks follow list order
//! and merge IDs are reassigned consecutively above the special IDs on
//! load, so a reloaded tokenizer reproduces the original encodings
//! exactly.

use std::fs;
use std::path::Path;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::{BpeError, Result};
use crate::merges::{Pair, TokenId};
use crate::model::BpeTokenizer;
use crate::special::SpecialTokenRegistry;

/// Current manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct TokenizerManifest {
    version: u32,
    special_tokens: Vec<SpecialTokenEntry>,
    merges: Vec<Pair>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SpecialTokenEntry {
    literal: String,
    id: TokenId,
}

fn manifest_of(tokenizer: &BpeTokenizer) -> TokenizerManifest {
    let special_tokens = tokenizer
        .special_tokens()
        .sorted_by_id()
        .into_iter()
        .map(|(literal, id)| SpecialTokenEntry {
            literal: literal.to_string(),
            id,
        })
        .collect();
    TokenizerManifest {
        version: MANIFEST_VERSION,
        special_tokens,
        merges: tokenizer.merges().pairs_by_rank().to_vec(),
    }
}

fn tokenizer_of(manifest: TokenizerManifest) -> Result<BpeTokenizer> {
    if manifest.version != MANIFEST_VERSION {
        return Err(BpeError::Serialization(format!(
            "unsupported manifest version {} (expected {MANIFEST_VERSION})",
            manifest.version
        )));
    }
    let mut seen: FxHashSet<Pair> = FxHashSet::default();
    for &pair in &manifest.merges {
        if !seen.insert(pair) {
            return Err(BpeError::Serialization(format!(
                "merge pair ({}, {}) listed twice",
                pair.0, pair.1
            )));
        }
    }
    let specials = SpecialTokenRegistry::from_pairs(
        manifest
            .special_tokens
            .into_iter()
            .map(|entry| (entry.literal, entry.id)),
    )?;
    Ok(BpeTokenizer::from_merges(&manifest.merges, specials))
}

/// Serialises the trained tokenizer to a JSON manifest string.
pub fn tokenizer_json(tokenizer: &BpeTokenizer, pretty: bool) -> Result<String> {
    let manifest = manifest_of(tokenizer);
    let json = if pretty {
        serde_json::to_string_pretty(&manifest)?
    } else {
        serde_json::to_string(&manifest)?
    };
    Ok(json)
}

/// Persists the trained tokenizer as a JSON manifest on disk.
pub fn save_tokenizer<P: AsRef<Path>>(tokenizer: &BpeTokenizer, path: P) -> Result<()> {
    let json = tokenizer_json(tokenizer, true)?;
    fs::write(path.as_ref(), json)
        .map_err(|err| BpeError::io(err, Some(path.as_ref().to_path_buf())))
}

/// Loads a tokenizer from a JSON manifest written by [`save_tokenizer`].
pub fn load_tokenizer<P: AsRef<Path>>(path: P) -> Result<BpeTokenizer> {
    let json = fs::read_to_string(path.as_ref())
        .map_err(|err| BpeError::io(err, Some(path.as_ref().to_path_buf())))?;
    let manifest: TokenizerManifest = serde_json::from_str(&json)?;
    tokenizer_of(manifest)
}
