use rusqlite::Transaction;

use crate::error::StoreError;
use crate::models::{Follow, Post, User};
use crate::record;

/// Create the three backing tables. With `force`, existing tables are
/// dropped first; without it, an existing table is an error.
pub fn init(tx: &Transaction<'_>, force: bool) -> Result<(), StoreError> {
    record::init_schema::<User>(tx, force)?;
    record::init_schema::<Post>(tx, force)?;
    record::init_schema::<Follow>(tx, force)?;
    Ok(())
}
