//! Byte-level byte pair encoding (BPE) tokenizer library and CLI.
//!
//! The crate learns a merge vocabulary from raw byte sequences, encodes
//! text (including atomic special tokens) into integer token IDs, and
//! decodes IDs back into text. Training produces an immutable
//! [`BpeTokenizer`] that can be shared freely across threads and persisted
//! as a JSON manifest.
//!
//! ```no_run
//! use bytepair::{Trainer, TrainerConfig};
//!
//! # fn main() -> bytepair::Result<()> {
//! let cfg = TrainerConfig::builder()
//!     .target_vocab_size(512)
//!     .special_token("<|endoftext|>", 50_256)
//!     .show_progress(false)
//!     .build()?;
//! let artifacts = Trainer::new(cfg).train_from_text("the quick brown fox")?;
//! let tokenizer = artifacts.tokenizer;
//! let ids = tokenizer.encode_text("the fox<|endoftext|>");
//! assert_eq!(tokenizer.decode(&ids), "the fox<|endoftext|>");
//! tokenizer.save("tokenizer.json")?;
//! # Ok(())
//! # }
//! ```
//!
//! The `bytepair` CLI is enabled by default through the `cli` feature.
//! Users targeting the library portion only can disable default features
//! to avoid the CLI dependencies:
//! `bytepair = { version = "...", default-features = false }`.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    clippy::all,
    rust_2018_idioms,
    future_incompatible,
    unused_lifetimes,
    unreachable_pub
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

pub mod config;
pub mod corpus;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod merges;
pub mod metrics;
pub mod model;
pub mod serialization;
pub mod special;
pub mod trainer;

pub use config::{IngestBuilder, IngestConfig, TrainerBuilder, TrainerConfig};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::{BpeError, Result};
pub use merges::{MergeRecord, MergeTable, Pair, TokenId};
pub use metrics::{IterationMetrics, StopReason, TrainingMetrics};
pub use model::BpeTokenizer;
pub use special::SpecialTokenRegistry;
pub use trainer::{Trainer, TrainerArtifacts};
