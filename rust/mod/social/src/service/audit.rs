//! Offline consistency checks for the denormalized counters.
//!
//! Counters are kept in step with their facts by the write paths; these
//! operations exist for operators and are never run on a request path.

use socialrecipe_sql::SQLExecutor;
use tracing::{info, warn};

use crate::model::{CounterAudit, CounterMismatch, StoreStats};
use crate::service::{SocialError, SocialService};

/// `(table, counter column, fact count expression correlated on t.id)`
const COUNTERS: &[(&str, &str, &str)] = &[
    (
        "users",
        "follower_count",
        "SELECT COUNT(*) FROM follow_edges e WHERE e.followee_id = t.id",
    ),
    (
        "users",
        "following_count",
        "SELECT COUNT(*) FROM follow_edges e WHERE e.follower_id = t.id",
    ),
    (
        "recipes",
        "like_count",
        "SELECT COUNT(*) FROM like_facts l WHERE l.recipe_id = t.id",
    ),
];

impl SocialService {
    /// Compare every stored counter with a fresh count of its facts.
    pub fn audit_counters(&self) -> Result<CounterAudit, SocialError> {
        let tx = self.sql.begin()?;
        let mut audit = CounterAudit::default();
        for (table, column, actual_sql) in COUNTERS {
            let mismatches = find_mismatches(&*tx, table, column, actual_sql)?;
            if *table == "users" {
                audit.users.extend(mismatches);
            } else {
                audit.recipes.extend(mismatches);
            }
        }
        tx.commit()?;

        if audit.is_consistent() {
            info!("counter audit: consistent");
        } else {
            warn!("counter audit: {} mismatched counter(s)", audit.mismatch_count());
        }
        Ok(audit)
    }

    /// Recompute every counter from its facts in one transaction.
    /// Returns how many counters were corrected.
    pub fn repair_counters(&self) -> Result<usize, SocialError> {
        let tx = self.sql.begin()?;
        let mut corrected = 0u64;
        for (table, column, actual_sql) in COUNTERS {
            let sql = format!(
                "UPDATE {table} AS t SET {column} = ({actual_sql}) WHERE {column} <> ({actual_sql})"
            );
            corrected += tx.exec(&sql, &[])?;
        }
        tx.commit()?;

        info!("counter repair: {} counter(s) corrected", corrected);
        Ok(corrected as usize)
    }

    pub fn stats(&self) -> Result<StoreStats, SocialError> {
        let tx = self.sql.begin()?;
        let stats = StoreStats {
            users: count_rows(&*tx, "users")?,
            recipes: count_rows(&*tx, "recipes")?,
            follow_edges: count_rows(&*tx, "follow_edges")?,
            likes: count_rows(&*tx, "like_facts")?,
            favorites: count_rows(&*tx, "favorite_facts")?,
        };
        tx.commit()?;
        Ok(stats)
    }
}

fn find_mismatches<E: SQLExecutor + ?Sized>(
    db: &E,
    table: &str,
    column: &str,
    actual_sql: &str,
) -> Result<Vec<CounterMismatch>, SocialError> {
    let sql = format!(
        "SELECT id, stored, actual FROM (\
            SELECT t.id AS id, t.{column} AS stored, ({actual_sql}) AS actual FROM {table} t\
         ) WHERE stored <> actual ORDER BY id"
    );
    let rows = db.query(&sql, &[])?;
    Ok(rows
        .iter()
        .map(|r| CounterMismatch {
            id: r.get_str("id").unwrap_or_default().to_string(),
            counter: column.to_string(),
            stored: r.get_i64("stored").unwrap_or(0),
            actual: r.get_i64("actual").unwrap_or(0),
        })
        .collect())
}

fn count_rows<E: SQLExecutor + ?Sized>(db: &E, table: &str) -> Result<u64, SocialError> {
    let rows = db.query(&format!("SELECT COUNT(*) AS cnt FROM {table}"), &[])?;
    Ok(rows
        .first()
        .and_then(|r| r.get_i64("cnt"))
        .unwrap_or(0)
        .max(0) as u64)
}
