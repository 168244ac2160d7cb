//! Registry of known peer node addresses.

use indexmap::IndexSet;
use parking_lot::RwLock;

/// Insertion-ordered set of peer addresses. Consensus consults peers in
/// registration order.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    nodes: RwLock<IndexSet<String>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add addresses, skipping blanks and duplicates. Returns how many were new.
    pub fn register<I, S>(&self, addrs: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut nodes = self.nodes.write();
        addrs
            .into_iter()
            .filter_map(|a| normalize(a.as_ref()))
            .filter(|a| nodes.insert(a.clone()))
            .count()
    }

    /// Snapshot of all addresses in registration order.
    pub fn addresses(&self) -> Vec<String> {
        self.nodes.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }
}

fn normalize(addr: &str) -> Option<String> {
    let addr = addr.trim().trim_end_matches('/');
    (!addr.is_empty()).then(|| addr.to_string())
}

/// URL of a peer's fetch-chain endpoint. Bare `host:port` addresses are
/// reached over plain http.
pub fn chain_url(addr: &str) -> String {
    if addr.starts_with("http://") || addr.starts_with("https://") {
        format!("{addr}/get_chain")
    } else {
        format!("http://{addr}/get_chain")
    }
}
