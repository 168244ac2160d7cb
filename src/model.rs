//! Data model for hash-linked blocks and the in-memory ledger.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use tracing::debug;

use crate::error::{LedgerError, ValidationError};

/// `previous_hash` of the genesis block, which has no real predecessor.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Payload carried by the genesis block.
pub const GENESIS_DATA: &str = "Genesis Block";

/// Ledger handle shared between request handlers and the consensus task.
pub type SharedLedger = Arc<RwLock<Ledger>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain; genesis is 0.
    pub index: u64,
    /// Unix seconds (fractional) at creation.
    pub timestamp: f64,
    /// Opaque JSON payload.
    pub data: Value,
    /// SHA-256 hex of the predecessor, or [`GENESIS_PREVIOUS_HASH`].
    pub previous_hash: String,
    /// SHA-256 hex over (index, timestamp, data, previous_hash).
    pub hash: String,
}

impl Block {
    /// Build a block and seal it with its digest.
    pub fn new(index: u64, timestamp: f64, data: Value, previous_hash: impl Into<String>) -> Self {
        let mut block = Block {
            index,
            timestamp,
            data,
            previous_hash: previous_hash.into(),
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Recompute the digest from the current field values.
    ///
    /// Material, in order: decimal `index`, shortest text form of `timestamp`,
    /// `data` as compact JSON (strings quoted, object keys sorted), `previous_hash`.
    ///
    /// Parts are concatenated without separators, so an edit spanning two
    /// adjacent fields can collide (index 1 with timestamp 23.5 and index 12
    /// with timestamp 3.5 both yield "123.5"). Single-field edits always
    /// change the material.
    pub fn compute_hash(&self) -> String {
        let index = self.index.to_string();
        let timestamp = self.timestamp.to_string();
        let data = self.data.to_string();
        hash_concat(&[
            index.as_bytes(),
            timestamp.as_bytes(),
            data.as_bytes(),
            self.previous_hash.as_bytes(),
        ])
    }

    /// True when the stored hash still matches the fields.
    pub fn is_sealed(&self) -> bool {
        self.hash == self.compute_hash()
    }
}

/// Hash inputs (concatenate as bytes, SHA-256) and return lowercase hex.
pub fn hash_concat(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for p in parts {
        hasher.update(p);
    }
    hex::encode(hasher.finalize())
}

/// Current wall-clock time as fractional Unix seconds.
pub fn unix_now() -> f64 {
    OffsetDateTime::now_utc().unix_timestamp_nanos() as f64 / 1_000_000_000.0
}

/// Which structural rules a chain must satisfy to be accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Self-hash and linkage of every block after genesis.
    #[default]
    Linkage,
    /// `Linkage`, plus contiguous indices and a well-formed genesis block.
    Strict,
}

/// Materialized read-only view of a ledger, also the peer wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub chain: Vec<Block>,
    pub length: usize,
}

/// Ordered, hash-linked sequence of blocks.
#[derive(Debug, Clone)]
pub struct Ledger {
    blocks: Vec<Block>,
}

impl Ledger {
    /// A fresh ledger holding only the genesis block, stamped now.
    pub fn genesis() -> Self {
        Self::genesis_at(unix_now())
    }

    pub fn genesis_at(timestamp: f64) -> Self {
        let genesis = Block::new(
            0,
            timestamp,
            Value::String(GENESIS_DATA.to_string()),
            GENESIS_PREVIOUS_HASH,
        );
        Ledger {
            blocks: vec![genesis],
        }
    }

    /// Wrap blocks received from elsewhere. Nothing is checked; call
    /// [`Ledger::validate`] before trusting the result.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Ledger { blocks }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn latest(&self) -> Result<&Block, LedgerError> {
        self.blocks.last().ok_or(LedgerError::Empty)
    }

    /// Append a caller-built block.
    ///
    /// The ledger owns linkage: the candidate's `index`, `previous_hash` and
    /// `hash` are replaced; its `timestamp` and `data` are kept.
    pub fn append(&mut self, candidate: Block) -> Result<&Block, LedgerError> {
        let latest = self.latest()?;
        let index = latest.index + 1;
        let previous_hash = latest.hash.clone();
        if candidate.index != index || candidate.previous_hash != previous_hash {
            debug!(
                submitted_index = candidate.index,
                submitted_previous = %candidate.previous_hash,
                index,
                "overriding submitted linkage"
            );
        }
        let block = Block::new(index, candidate.timestamp, candidate.data, previous_hash);
        self.blocks.push(block);
        self.latest()
    }

    /// First structural violation, if any.
    pub fn validate(&self, mode: ValidationMode) -> Result<(), ValidationError> {
        match self.violations_iter(mode).next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn is_valid(&self, mode: ValidationMode) -> bool {
        self.validate(mode).is_ok()
    }

    /// Every structural violation, in chain order.
    pub fn violations(&self, mode: ValidationMode) -> Vec<ValidationError> {
        self.violations_iter(mode).collect()
    }

    fn violations_iter(
        &self,
        mode: ValidationMode,
    ) -> impl Iterator<Item = ValidationError> + '_ {
        let empty = self.blocks.is_empty().then_some(ValidationError::Empty);
        let genesis = match mode {
            ValidationMode::Strict => self.blocks.first().and_then(check_genesis),
            ValidationMode::Linkage => None,
        };
        let links = self
            .blocks
            .windows(2)
            .enumerate()
            .flat_map(move |(i, pair)| check_link(i + 1, &pair[0], &pair[1], mode));
        empty.into_iter().chain(genesis).chain(links)
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            chain: self.blocks.clone(),
            length: self.blocks.len(),
        }
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }
}

fn check_genesis(block: &Block) -> Option<ValidationError> {
    if block.index != 0 {
        return Some(ValidationError::Genesis("index must be 0"));
    }
    if block.previous_hash != GENESIS_PREVIOUS_HASH {
        return Some(ValidationError::Genesis("previous_hash must be the sentinel"));
    }
    if !block.is_sealed() {
        return Some(ValidationError::Genesis("hash mismatch"));
    }
    None
}

fn check_link(
    position: usize,
    prev: &Block,
    block: &Block,
    mode: ValidationMode,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if !block.is_sealed() {
        errors.push(ValidationError::HashMismatch { position });
    }
    if block.previous_hash != prev.hash {
        errors.push(ValidationError::BrokenLink { position });
    }
    if mode == ValidationMode::Strict && Some(block.index) != prev.index.checked_add(1) {
        errors.push(ValidationError::IndexGap {
            position,
            expected: prev.index.saturating_add(1),
            found: block.index,
        });
    }
    errors
}
