use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of row-level change reported by the feed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Which change kinds a subscriber wants. `All` is the `*` mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventMask {
    All,
    Only(Vec<ChangeKind>),
}

impl EventMask {
    pub fn matches(&self, kind: ChangeKind) -> bool {
        match self {
            EventMask::All => true,
            EventMask::Only(kinds) => kinds.contains(&kind),
        }
    }
}

/// Opaque change notification. The payload is informational only; consumers
/// must not rely on it being complete or ordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeEvent {
    pub collection: String,
    pub kind: ChangeKind,
    pub record_id: Option<String>,
}

/// Handle identifying one live subscription on a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}
