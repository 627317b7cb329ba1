use chrono::SecondsFormat;

/// Generate a new random ID (UUIDv4, no dashes).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string().replace('-', "")
}

/// Get the current time as an RFC 3339 string.
///
/// Always microsecond precision in UTC (`2024-05-01T12:00:00.123456Z`), so
/// the strings sort lexicographically in chronological order and can be
/// used directly in `ORDER BY`.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
