pub mod audit;
pub mod favorite;
pub mod feed;
pub mod follow;
pub mod like;
pub mod recipe;
pub mod schema;
pub mod user;

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use socialrecipe_core::{Page, PageRequest};
use socialrecipe_sql::{Row, SQLError, SQLExecutor, SQLStore, Value};

use crate::model::{Recipe, User};
use crate::password::PasswordHasher;

/// Social service error type.
#[derive(Debug, Error)]
pub enum SocialError {
    #[error("not found: {0}")]
    NotFound(String),

    /// The relationship being created already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The user already liked the recipe. An expected outcome, not a fault.
    #[error("already liked: {0}")]
    AlreadyLiked(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("storage: {0}")]
    Storage(String),

    #[error("internal: {0}")]
    Internal(String),
}

impl From<SQLError> for SocialError {
    fn from(e: SQLError) -> Self {
        SocialError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for SocialError {
    fn from(e: serde_json::Error) -> Self {
        SocialError::Internal(e.to_string())
    }
}

impl From<SocialError> for socialrecipe_core::ServiceError {
    fn from(e: SocialError) -> Self {
        use socialrecipe_core::ServiceError;
        match e {
            SocialError::NotFound(m) => ServiceError::NotFound(m),
            SocialError::AlreadyExists(m) | SocialError::AlreadyLiked(m) => {
                ServiceError::Conflict(m)
            }
            SocialError::InvalidArgument(m) => ServiceError::Validation(m),
            SocialError::Forbidden(m) => ServiceError::PermissionDenied(m),
            SocialError::Storage(m) => ServiceError::Storage(m),
            SocialError::Internal(m) => ServiceError::Internal(m),
        }
    }
}

/// Configuration for the social service.
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SocialConfig {
    /// Shortest accepted password, in characters.
    pub password_min_len: usize,
    /// Longest accepted password, in characters.
    pub password_max_len: usize,
    /// Profile picture given to users who register without one.
    pub default_profile_image_url: Option<String>,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            password_min_len: 6,
            password_max_len: 60,
            default_profile_image_url: None,
        }
    }
}

/// The social service. Holds the store, the password capability and
/// configuration. Every operation is a short unit of work against the store.
pub struct SocialService {
    pub(crate) sql: Arc<dyn SQLStore>,
    pub(crate) hasher: Arc<dyn PasswordHasher>,
    pub(crate) config: SocialConfig,
}

impl SocialService {
    /// Create a new SocialService, initializing the DB schema.
    pub fn new(
        sql: Arc<dyn SQLStore>,
        hasher: Arc<dyn PasswordHasher>,
        config: SocialConfig,
    ) -> Result<Arc<Self>, SocialError> {
        schema::init_schema(sql.as_ref())?;
        Ok(Arc::new(Self {
            sql,
            hasher,
            config,
        }))
    }
}

// ── Record storage ──
//
// Each record lives in one row: the serialized body in `data`, plus indexed
// columns. Counter columns are authoritative and are overlaid on the body
// when a row is decoded; they are never written through `data`.

/// A record type persisted as a JSON body plus columns.
pub(crate) trait Stored: Serialize + DeserializeOwned {
    const TABLE: &'static str;
    /// Integer columns merged over the body on read.
    const COUNTERS: &'static [&'static str];
}

impl Stored for User {
    const TABLE: &'static str = "users";
    const COUNTERS: &'static [&'static str] = &["follower_count", "following_count"];
}

impl Stored for Recipe {
    const TABLE: &'static str = "recipes";
    const COUNTERS: &'static [&'static str] = &["like_count"];
}

/// Column list needed to decode `T`, qualified by `alias`.
pub(crate) fn select_columns<T: Stored>(alias: &str) -> String {
    let mut cols = vec![format!("{alias}.data AS data")];
    for c in T::COUNTERS {
        cols.push(format!("{alias}.{c} AS {c}"));
    }
    cols.join(", ")
}

pub(crate) fn decode_row<T: Stored>(row: &Row) -> Result<T, SocialError> {
    let data = row
        .get_str("data")
        .ok_or_else(|| SocialError::Internal("missing data column".into()))?;
    let mut value: serde_json::Value = serde_json::from_str(data)?;
    if let Some(obj) = value.as_object_mut() {
        for c in T::COUNTERS {
            let n = row.get_i64(c).unwrap_or(0).max(0);
            obj.insert((*c).to_string(), serde_json::json!(n));
        }
    }
    Ok(serde_json::from_value(value)?)
}

fn encode_record<T: Stored>(record: &T) -> Result<String, SocialError> {
    let mut value = serde_json::to_value(record)?;
    if let Some(obj) = value.as_object_mut() {
        for c in T::COUNTERS {
            obj.remove(*c);
        }
    }
    Ok(serde_json::to_string(&value)?)
}

/// Insert a record with indexed columns. A uniqueness violation is
/// reported as [`SocialError::AlreadyExists`].
pub(crate) fn insert_record<T: Stored, E: SQLExecutor + ?Sized>(
    db: &E,
    id: &str,
    record: &T,
    indexes: &[(&str, Value)],
) -> Result<(), SocialError> {
    let mut cols = vec!["id", "data"];
    let mut placeholders = vec!["?1".to_string(), "?2".to_string()];
    let mut params = vec![Value::Text(id.to_string()), Value::Text(encode_record(record)?)];

    for (i, (col, val)) in indexes.iter().enumerate() {
        cols.push(col);
        placeholders.push(format!("?{}", i + 3));
        params.push(val.clone());
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        T::TABLE,
        cols.join(", "),
        placeholders.join(", "),
    );

    db.exec(&sql, &params).map_err(|e| match e {
        SQLError::UniqueViolation(msg) => SocialError::AlreadyExists(msg),
        other => other.into(),
    })?;
    Ok(())
}

/// Get a record by id.
pub(crate) fn fetch_record<T: Stored, E: SQLExecutor + ?Sized>(
    db: &E,
    id: &str,
) -> Result<T, SocialError> {
    let sql = format!(
        "SELECT {} FROM {} t WHERE t.id = ?1",
        select_columns::<T>("t"),
        T::TABLE
    );
    let rows = db.query(&sql, &[Value::Text(id.to_string())])?;
    let row = rows
        .first()
        .ok_or_else(|| SocialError::NotFound(format!("{}/{}", T::TABLE, id)))?;
    decode_row(row)
}

/// Find the first record matching a `WHERE` clause on alias `t`.
pub(crate) fn find_record<T: Stored, E: SQLExecutor + ?Sized>(
    db: &E,
    where_sql: &str,
    params: &[Value],
) -> Result<Option<T>, SocialError> {
    let sql = format!(
        "SELECT {} FROM {} t WHERE {} LIMIT 1",
        select_columns::<T>("t"),
        T::TABLE,
        where_sql
    );
    let rows = db.query(&sql, params)?;
    rows.first().map(decode_row).transpose()
}

/// Rewrite a record's body and indexed columns. Counters are untouched.
pub(crate) fn update_record<T: Stored, E: SQLExecutor + ?Sized>(
    db: &E,
    id: &str,
    record: &T,
    indexes: &[(&str, Value)],
) -> Result<(), SocialError> {
    let mut sets = vec!["data = ?1".to_string()];
    let mut params: Vec<Value> = vec![Value::Text(encode_record(record)?)];

    for (i, (col, val)) in indexes.iter().enumerate() {
        sets.push(format!("{} = ?{}", col, i + 2));
        params.push(val.clone());
    }

    let id_idx = params.len() + 1;
    params.push(Value::Text(id.to_string()));

    let sql = format!(
        "UPDATE {} SET {} WHERE id = ?{}",
        T::TABLE,
        sets.join(", "),
        id_idx,
    );

    let affected = db.exec(&sql, &params).map_err(|e| match e {
        SQLError::UniqueViolation(msg) => SocialError::AlreadyExists(msg),
        other => other.into(),
    })?;
    if affected == 0 {
        return Err(SocialError::NotFound(format!("{}/{}", T::TABLE, id)));
    }
    Ok(())
}

pub(crate) fn row_exists<E: SQLExecutor + ?Sized>(
    db: &E,
    sql: &str,
    params: &[Value],
) -> Result<bool, SocialError> {
    Ok(!db.query(sql, params)?.is_empty())
}

pub(crate) fn ensure_user<E: SQLExecutor + ?Sized>(db: &E, id: &str) -> Result<(), SocialError> {
    if row_exists(db, "SELECT 1 FROM users WHERE id = ?1", &[Value::from(id)])? {
        Ok(())
    } else {
        Err(SocialError::NotFound(format!("users/{id}")))
    }
}

pub(crate) fn ensure_recipe<E: SQLExecutor + ?Sized>(db: &E, id: &str) -> Result<(), SocialError> {
    if row_exists(db, "SELECT 1 FROM recipes WHERE id = ?1", &[Value::from(id)])? {
        Ok(())
    } else {
        Err(SocialError::NotFound(format!("recipes/{id}")))
    }
}

/// One page of `T` rows.
///
/// `from_sql` is everything from `FROM` through `WHERE`, with `alias`
/// naming the `T` table. `order_sql` must end in a unique key so the
/// ordering is total. Count and slice should run on the same transaction.
pub(crate) fn paginate<T: Stored, E: SQLExecutor + ?Sized>(
    db: &E,
    request: PageRequest,
    alias: &str,
    from_sql: &str,
    order_sql: &str,
    mut params: Vec<Value>,
) -> Result<Page<T>, SocialError> {
    let count_sql = format!("SELECT COUNT(*) AS cnt {from_sql}");
    let total = db
        .query(&count_sql, &params)?
        .first()
        .and_then(|r| r.get_i64("cnt"))
        .unwrap_or(0)
        .max(0) as usize;

    if request.offset() >= total {
        return Ok(Page::new(Vec::new(), request, total));
    }

    let limit_idx = params.len() + 1;
    let offset_idx = params.len() + 2;
    params.push(Value::Integer(request.limit() as i64));
    params.push(Value::Integer(
        i64::try_from(request.offset()).unwrap_or(i64::MAX),
    ));

    let sql = format!(
        "SELECT {} {} ORDER BY {} LIMIT ?{} OFFSET ?{}",
        select_columns::<T>(alias),
        from_sql,
        order_sql,
        limit_idx,
        offset_idx,
    );
    let rows = db.query(&sql, &params)?;
    let records = rows.iter().map(decode_row).collect::<Result<Vec<T>, _>>()?;
    Ok(Page::new(records, request, total))
}

/// Reject ids that could never name a record.
pub(crate) fn validate_id(kind: &str, id: &str) -> Result<(), SocialError> {
    let well_formed = !id.is_empty()
        && id.len() <= 64
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if well_formed {
        Ok(())
    } else {
        Err(SocialError::InvalidArgument(format!("malformed {kind} id: {id:?}")))
    }
}

/// Case-folded form stored in `*_folded` columns. SQLite's `lower()` only
/// folds ASCII, so folding happens here on write and on query.
pub(crate) fn search_key(text: &str) -> String {
    text.to_lowercase()
}

/// Folded search needle; blank queries are rejected.
pub(crate) fn normalize_query(query: &str) -> Result<String, SocialError> {
    let q = query.trim();
    if q.is_empty() {
        return Err(SocialError::InvalidArgument("search query is empty".into()));
    }
    Ok(search_key(q))
}
