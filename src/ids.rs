//! Opaque identifiers shared across the identity store, engine and gateway.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type AgentId = uuid::Uuid;
pub type HandId = uuid::Uuid;

/// Tables are numbered from a monotonic counter (see DESIGN.md Open
/// Question #2: ids are never reused).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableId(pub u64);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
