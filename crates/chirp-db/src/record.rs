//! Generic typed persistence over the fixed relational schema.
//!
//! Each entity declares its table, ordered column schema and primary key
//! as associated consts; the operations here derive their SQL from that.
//! All of them take the open transaction, so store access cannot happen
//! outside a [`crate::Database::exclusive`] scope.

use rusqlite::types::ToSql;
use rusqlite::{Row, Transaction, params_from_iter};

use crate::error::StoreError;

pub trait Record: Sized {
    const TABLE: &'static str;
    const PRIMARY_KEY: &'static str;
    /// Ordered (column, sql type) pairs; row layout follows this order.
    const SCHEMA: &'static [(&'static str, &'static str)];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
    fn values(&self) -> Vec<Box<dyn ToSql>>;
    fn primary_key_value(&self) -> &str;
}

/// Insert a full row. Ids are assigned by the entity constructor, never
/// by the store.
pub fn create<R: Record>(tx: &Transaction<'_>, record: &R) -> Result<(), StoreError> {
    let placeholders = vec!["?"; R::SCHEMA.len()].join(", ");
    let sql = format!("INSERT INTO {} VALUES ({})", R::TABLE, placeholders);
    tx.execute(&sql, params_from_iter(record.values()))?;
    Ok(())
}

pub fn read_by_pk<R: Record>(tx: &Transaction<'_>, id: &str) -> Result<R, StoreError> {
    read_by_column(tx, R::PRIMARY_KEY, id)
}

/// Single-row lookup on any schema column (username, etc).
pub fn read_by_column<R: Record>(
    tx: &Transaction<'_>,
    column: &str,
    value: &str,
) -> Result<R, StoreError> {
    let sql = format!("SELECT * FROM {} WHERE {} = ?1", R::TABLE, column);
    tx.query_row(&sql, [value], R::from_row).map_err(not_found)
}

/// Full-row overwrite keyed by primary key.
pub fn update<R: Record>(tx: &Transaction<'_>, record: &R) -> Result<(), StoreError> {
    let assignments = R::SCHEMA
        .iter()
        .map(|(column, _)| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        R::TABLE,
        assignments,
        R::PRIMARY_KEY
    );

    let mut values = record.values();
    values.push(Box::new(record.primary_key_value().to_string()));

    let changed = tx.execute(&sql, params_from_iter(values))?;
    if changed == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

pub fn delete<R: Record>(tx: &Transaction<'_>, record: &R) -> Result<(), StoreError> {
    let sql = format!("DELETE FROM {} WHERE {} = ?1", R::TABLE, R::PRIMARY_KEY);
    let changed = tx.execute(&sql, [record.primary_key_value()])?;
    if changed == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

/// Unordered full scan. Only the admin dump wants this.
pub fn list_all<R: Record>(tx: &Transaction<'_>) -> Result<Vec<R>, StoreError> {
    let sql = format!("SELECT * FROM {}", R::TABLE);
    let mut stmt = tx.prepare(&sql)?;
    let rows = stmt
        .query_map([], R::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Create the backing table; with `force`, drop any existing one first.
/// Bootstrap-only, not part of the request path.
pub fn init_schema<R: Record>(tx: &Transaction<'_>, force: bool) -> Result<(), StoreError> {
    if force {
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {}", R::TABLE))?;
    }

    let columns = R::SCHEMA
        .iter()
        .map(|(column, sql_type)| format!("{column} {sql_type}"))
        .collect::<Vec<_>>()
        .join(", ");
    tx.execute_batch(&format!("CREATE TABLE {} ({})", R::TABLE, columns))?;
    Ok(())
}

fn not_found(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => other.into(),
    }
}
