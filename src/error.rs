//! Error taxonomy for the ledger, peer fetches and node bootstrap.

use std::io;

use thiserror::Error;

/// Defensive ledger access failure. Unreachable while the genesis invariant holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("ledger is empty")]
    Empty,
}

/// A structural violation found while validating a chain.
///
/// `position` is the offset of the offending block inside the chain, which
/// for a well-formed chain equals its `index`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("chain is empty")]
    Empty,
    #[error("block at position {position} hash mismatch")]
    HashMismatch { position: usize },
    #[error("block at position {position} previous_hash does not match its predecessor")]
    BrokenLink { position: usize },
    #[error("block at position {position} has index {found}, expected {expected}")]
    IndexGap {
        position: usize,
        expected: u64,
        found: u64,
    },
    #[error("malformed genesis block: {0}")]
    Genesis(&'static str),
}

/// Failure to obtain a usable chain from a peer during a consensus pass.
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("peer answered with status {0}")]
    Status(u16),
    #[error("peer reported length {reported} but sent {actual} blocks")]
    LengthMismatch { reported: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),
}

pub type NodeResult<T> = Result<T, NodeError>;
