//! Helpers shared by the PostgreSQL repositories.

use std::str::FromStr;
use stratus_core::CoreError;
use tracing::error;

/// Anything the database reports that the domain has no name for.
pub(crate) fn dependency(e: sqlx::Error) -> CoreError {
    error!("Database error: {}", e);
    CoreError::DependencyFailure(e.to_string())
}

/// Name of the violated unique constraint, if `e` is a unique violation.
pub(crate) fn unique_violation(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            Some(db_err.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}

/// Decodes a text column into one of the domain's string-backed enums.
pub(crate) fn parse_column<T>(column: &str, raw: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = String>,
{
    raw.parse::<T>().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: e.into(),
    })
}

pub(crate) fn parse_char(column: &str, raw: &str) -> Result<char, sqlx::Error> {
    raw.chars().next().ok_or_else(|| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: "empty column".into(),
    })
}
