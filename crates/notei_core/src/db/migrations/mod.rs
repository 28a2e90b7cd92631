//! Schema steps for the `documents` table.
//!
//! # Invariants
//! - Steps are numbered 1, 2, ... without gaps; step `n` is applied on top
//!   of step `n - 1`.
//! - All pending steps and their `user_version` bumps commit together.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "documents",
        sql: include_str!("0001_init.sql"),
    },
    SchemaStep {
        version: 2,
        name: "document_revisions",
        sql: include_str!("0002_document_revisions.sql"),
    },
];

/// Highest schema step this build can apply.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.len() as u32
}

/// Brings the document schema up to `latest_version`.
///
/// Returns the number of steps applied.
pub fn upgrade_schema(conn: &mut Connection) -> DbResult<usize> {
    let found: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let supported = latest_version();
    if found > supported {
        return Err(DbError::SchemaTooNew { found, supported });
    }

    let pending = &SCHEMA_STEPS[found as usize..];
    if pending.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    for step in pending {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", &step.version)?;
        info!(
            "event=schema_upgrade module=db status=ok step={} version={}",
            step.name, step.version
        );
    }
    tx.commit()?;
    Ok(pending.len())
}
