//! Longest-valid-chain reconciliation against registered peers.

use std::time::Duration;

use futures::future::join_all;
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{NodeResult, PeerError};
use crate::model::{ChainSnapshot, Ledger, SharedLedger, ValidationMode};
use crate::peers::{chain_url, PeerRegistry};

/// Result of one consensus pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Replaced {
        peer: String,
        previous_length: usize,
        new_length: usize,
    },
    Unchanged,
}

impl Outcome {
    pub fn replaced(&self) -> bool {
        matches!(self, Outcome::Replaced { .. })
    }
}

/// Polls peers for their chains and adopts the longest valid one.
pub struct Coordinator {
    client: Client,
    mode: ValidationMode,
    pass: Mutex<()>,
}

impl Coordinator {
    /// `timeout` bounds each individual peer fetch.
    pub fn new(timeout: Duration, mode: ValidationMode) -> NodeResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            mode,
            pass: Mutex::new(()),
        })
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// GET a peer's chain and check the envelope is self-consistent.
    pub async fn fetch_chain(&self, addr: &str) -> Result<ChainSnapshot, PeerError> {
        let response = self.client.get(chain_url(addr)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PeerError::Status(status.as_u16()));
        }
        let snapshot: ChainSnapshot = response.json().await?;
        if snapshot.length != snapshot.chain.len() {
            return Err(PeerError::LengthMismatch {
                reported: snapshot.length,
                actual: snapshot.chain.len(),
            });
        }
        Ok(snapshot)
    }

    /// Run one pass. Only one pass runs at a time; a second caller waits for
    /// the first to finish and then polls afresh.
    ///
    /// Peer failures are logged and skipped. The ledger lock is held only
    /// for the final compare-and-replace.
    pub async fn run(&self, ledger: &SharedLedger, peers: &PeerRegistry) -> Outcome {
        let _pass = self.pass.lock().await;

        let current_length = ledger.read().len();
        let addrs = peers.addresses();
        if addrs.is_empty() {
            debug!("no peers registered");
            return Outcome::Unchanged;
        }

        let fetches = addrs.iter().map(|addr| self.fetch_chain(addr));
        let results = join_all(fetches).await;

        let mut best_length = current_length;
        let mut best: Option<(&str, Ledger)> = None;
        for (addr, result) in addrs.iter().zip(results) {
            let snapshot = match result {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    warn!(peer = %addr, %err, "skipping peer");
                    continue;
                }
            };
            if snapshot.length <= best_length {
                debug!(peer = %addr, length = snapshot.length, best_length, "peer chain not longer");
                continue;
            }
            let candidate = Ledger::from_blocks(snapshot.chain);
            if let Err(err) = candidate.validate(self.mode) {
                warn!(peer = %addr, length = candidate.len(), %err, "rejecting invalid chain");
                continue;
            }
            best_length = candidate.len();
            best = Some((addr.as_str(), candidate));
        }

        let Some((peer, candidate)) = best else {
            return Outcome::Unchanged;
        };

        let mut guard = ledger.write();
        let previous_length = guard.len();
        if candidate.len() <= previous_length {
            info!(
                peer,
                candidate = candidate.len(),
                local = previous_length,
                "local ledger caught up during pass"
            );
            return Outcome::Unchanged;
        }
        let new_length = candidate.len();
        *guard = candidate;
        drop(guard);

        info!(peer, previous_length, new_length, "ledger replaced");
        Outcome::Replaced {
            peer: peer.to_string(),
            previous_length,
            new_length,
        }
    }
}
