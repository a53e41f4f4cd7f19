//! Schema manager.
//!
//! Runs on every connection startup: connection pragmas, then the
//! `CREATE TABLE IF NOT EXISTS` statement for each table, then additive
//! column migrations. Every step is idempotent. Columns are never dropped or
//! renamed.

use rusqlite::Connection;

use crate::{QueryRegistry, Result};

/// Connection-level settings applied before any DDL.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;
";

/// DDL query names, in dependency order.
pub const TABLES: &[&str] = &[
  "create_categories_table",
  "create_medications_table",
  "create_movements_table",
  "create_sales_table",
  "create_sale_items_table",
];

/// A column added to an existing table if it is not already present.
#[derive(Debug, Clone, Copy)]
pub struct ColumnMigration {
  pub table:  &'static str,
  pub column: &'static str,
  /// Type and default, as written after the column name in `ADD COLUMN`.
  pub decl:   &'static str,
}

pub const COLUMN_MIGRATIONS: &[ColumnMigration] = &[
  ColumnMigration { table: "medications", column: "price", decl: "REAL DEFAULT 0.0" },
  ColumnMigration { table: "medications", column: "category_id", decl: "TEXT" },
];

/// Resolve the DDL text for every table up front so a missing statement fails
/// before the connection thread is involved.
pub fn table_ddl(queries: &QueryRegistry) -> Result<Vec<String>> {
  TABLES
    .iter()
    .map(|name| queries.get(name).map(str::to_owned))
    .collect()
}

/// Apply pragmas, tables and migrations. Returns the `table.column` names that
/// were added by this run.
pub fn initialize(conn: &Connection, ddl: &[String]) -> rusqlite::Result<Vec<String>> {
  conn.execute_batch(PRAGMAS)?;
  for statement in ddl {
    conn.execute_batch(statement)?;
  }

  let mut added = Vec::new();
  for migration in COLUMN_MIGRATIONS {
    if add_column_if_missing(conn, migration)? {
      added.push(format!("{}.{}", migration.table, migration.column));
    }
  }
  Ok(added)
}

/// Column names of `table`, in declaration order.
pub fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
  let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
  let columns = stmt
    .query_map([], |row| row.get::<_, String>(1))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(columns)
}

fn add_column_if_missing(
  conn: &Connection,
  migration: &ColumnMigration,
) -> rusqlite::Result<bool> {
  let exists = table_columns(conn, migration.table)?
    .iter()
    .any(|c| c.eq_ignore_ascii_case(migration.column));
  if exists {
    return Ok(false);
  }

  conn.execute_batch(&format!(
    "ALTER TABLE {} ADD COLUMN {} {}",
    migration.table, migration.column, migration.decl
  ))?;
  Ok(true)
}
