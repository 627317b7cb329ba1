use serde::Serialize;

/// A stored counter that disagrees with the facts it summarizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterMismatch {
    /// User or recipe id.
    pub id: String,
    /// Column name, e.g. `follower_count`.
    pub counter: String,
    pub stored: i64,
    pub actual: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CounterAudit {
    pub users: Vec<CounterMismatch>,
    pub recipes: Vec<CounterMismatch>,
}

impl CounterAudit {
    pub fn is_consistent(&self) -> bool {
        self.users.is_empty() && self.recipes.is_empty()
    }

    pub fn mismatch_count(&self) -> usize {
        self.users.len() + self.recipes.len()
    }
}

/// Row counts per table, for operators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub users: u64,
    pub recipes: u64,
    pub follow_edges: u64,
    pub likes: u64,
    pub favorites: u64,
}
