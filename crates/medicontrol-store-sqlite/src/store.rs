//! [`SqliteStore`]: the SQLite implementation of [`InventoryStore`].

use std::{path::Path, sync::Arc};

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use medicontrol_core::{
  category::{Category, normalize_name},
  medication::{LowStockEntry, Medication, MedicationUpdate, NewMedication},
  movement::{Movement, MovementKind, MovementWithMedication, NewMovement},
  sale::{NewSale, SaleItem, SaleSummary},
  store::InventoryStore,
};

use crate::{
  CRITICAL_QUERIES, Error, QueryRegistry, Result,
  encode::{
    RawMedication, RawMovement, RawSaleSummary, category_from_row, encode_date,
    encode_dt, encode_kind, low_stock_from_row, sale_item_from_row,
  },
  schema,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A MediControl inventory backed by a single SQLite file.
///
/// Cloning is cheap: the connection handle and the query registry are both
/// reference-counted. All calls are serialised onto one connection thread,
/// and the two write engines additionally run in `BEGIN IMMEDIATE`
/// transactions so a read-validate-write sequence cannot interleave with
/// another writer, even one in a different process.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  queries: Arc<QueryRegistry>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  ///
  /// Fails with [`Error::MissingCriticalQueries`] if `queries` lacks any
  /// statement in [`CRITICAL_QUERIES`].
  pub async fn open(path: impl AsRef<Path>, queries: Arc<QueryRegistry>) -> Result<Self> {
    queries.require(CRITICAL_QUERIES)?;
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, queries };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open a fresh in-memory database.
  pub async fn open_in_memory(queries: Arc<QueryRegistry>) -> Result<Self> {
    queries.require(CRITICAL_QUERIES)?;
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, queries };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let ddl = schema::table_ddl(&self.queries)?;
    let added = self
      .conn
      .call(move |conn| Ok(schema::initialize(conn, &ddl)?))
      .await?;
    for column in added {
      tracing::info!(%column, "added missing column");
    }
    Ok(())
  }

  /// Owned copy of a statement, ready to move into a connection closure.
  fn sql(&self, name: &str) -> Result<String> {
    self.queries.get(name).map(str::to_owned)
  }

  /// Column names of `table`, used to verify migrations.
  pub async fn table_columns(&self, table: &'static str) -> Result<Vec<String>> {
    Ok(
      self
        .conn
        .call(move |conn| Ok(schema::table_columns(conn, table)?))
        .await?,
    )
  }

  /// Set `price` on every medication with `registry_code` whose price is
  /// unset or zero. Returns the number of rows changed.
  pub async fn backfill_prices(&self, prices: Vec<(String, f64)>) -> Result<usize> {
    let sql = self.sql("backfill_medication_price")?;

    let changed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut changed = 0;
        {
          let mut stmt = tx.prepare_cached(&sql)?;
          for (code, price) in &prices {
            if code.is_empty() || !price.is_finite() || *price <= 0.0 {
              continue;
            }
            changed += stmt.execute(rusqlite::params![price, code])?;
          }
        }
        tx.commit()?;
        Ok(changed)
      })
      .await?;

    Ok(changed)
  }

  async fn ensure_category(&self, id: Option<&str>) -> Result<()> {
    let Some(id) = id else { return Ok(()) };
    let sql = self.sql("select_category_by_id")?;
    let id = id.to_owned();

    let found = self
      .conn
      .call({
        let id = id.clone();
        move |conn| {
          Ok(
            conn
              .query_row(&sql, rusqlite::params![id], category_from_row)
              .optional()?,
          )
        }
      })
      .await?;

    match found {
      Some(_) => Ok(()),
      None => Err(Error::CategoryNotFound(id)),
    }
  }

  async fn query_medication(&self, query: &str, key: String) -> Result<Option<Medication>> {
    let sql = self.sql(query)?;

    let raw: Option<RawMedication> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![key], RawMedication::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMedication::into_medication).transpose()
  }
}

// ─── InventoryStore impl ─────────────────────────────────────────────────────

impl InventoryStore for SqliteStore {
  type Error = Error;

  // ── Categories ────────────────────────────────────────────────────────────

  async fn add_category(&self, name: String) -> Result<Category> {
    let name       = normalize_name(&name)?;
    let select_sql = self.sql("select_category_by_name")?;
    let insert_sql = self.sql("insert_category")?;

    let (category, created) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let existing = tx
          .query_row(&select_sql, rusqlite::params![name], category_from_row)
          .optional()?;
        if let Some(existing) = existing {
          return Ok((existing, false));
        }

        let category = Category { id: Uuid::new_v4().to_string(), name };
        tx.execute(&insert_sql, rusqlite::params![category.id, category.name])?;
        tx.commit()?;
        Ok((category, true))
      })
      .await?;

    if created {
      tracing::info!(id = %category.id, name = %category.name, "created category");
    }
    Ok(category)
  }

  async fn get_category_by_name(&self, name: String) -> Result<Option<Category>> {
    let sql = self.sql("select_category_by_name")?;

    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(&sql, rusqlite::params![name], category_from_row)
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn list_categories(&self) -> Result<Vec<Category>> {
    let sql = self.sql("select_all_categories")?;

    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&sql)?;
          let rows = stmt
            .query_map([], category_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  // ── Medications ───────────────────────────────────────────────────────────

  async fn add_medication(&self, input: NewMedication) -> Result<Medication> {
    input.validate()?;
    self.ensure_category(input.category_id.as_deref()).await?;
    let sql = self.sql("insert_medication")?;

    let id = input
      .id
      .filter(|id| !id.trim().is_empty())
      .unwrap_or_else(|| Uuid::new_v4().to_string());
    let created_at = encode_dt(input.created_at.unwrap_or_else(Utc::now));
    let expiry     = input.expiry.map(encode_date);

    let id_for_insert = id.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          &sql,
          rusqlite::params![
            id_for_insert,
            input.name.trim(),
            input.manufacturer,
            input.form,
            input.registry_code,
            input.quantity,
            expiry,
            input.price,
            created_at,
            input.category_id,
          ],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(%id, "inserted medication");
    self
      .get_medication(id.clone())
      .await?
      .ok_or(Error::MedicationNotFound(id))
  }

  async fn update_medication(
    &self,
    id:     String,
    update: MedicationUpdate,
  ) -> Result<Option<Medication>> {
    update.validate()?;
    self.ensure_category(update.category_id.as_deref()).await?;
    let sql    = self.sql("update_medication")?;
    let expiry = update.expiry.map(encode_date);

    let key = id.clone();
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          &sql,
          rusqlite::params![
            key,
            update.name.trim(),
            update.manufacturer,
            update.form,
            update.registry_code,
            expiry,
            update.price,
            update.category_id,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_medication(id).await
  }

  async fn delete_medication(&self, id: String) -> Result<bool> {
    let count_sql  = self.sql("count_medication_references")?;
    let delete_sql = self.sql("delete_medication")?;

    let outcome: Result<bool> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let references: i64 =
          tx.query_row(&count_sql, rusqlite::params![id], |r| r.get(0))?;
        if references > 0 {
          return Ok(Err(Error::MedicationReferenced { id, references }));
        }
        let deleted = tx.execute(&delete_sql, rusqlite::params![id])?;
        tx.commit()?;
        Ok(Ok(deleted > 0))
      })
      .await?;

    outcome
  }

  async fn get_medication(&self, id: String) -> Result<Option<Medication>> {
    self.query_medication("select_medication_by_id", id).await
  }

  async fn get_medication_by_registry_code(
    &self,
    code: String,
  ) -> Result<Option<Medication>> {
    self
      .query_medication("select_medication_by_registry_code", code)
      .await
  }

  async fn search_medications(&self, term: String) -> Result<Vec<Medication>> {
    let sql = self.sql("select_all_medications")?;

    let raws: Vec<RawMedication> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawMedication::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    // SQL LIKE folds ASCII case only and treats `%`/`_` as wildcards, so the
    // match itself happens here.
    let mut found = Vec::new();
    for raw in raws {
      let medication = raw.into_medication()?;
      if medication.matches(&term) {
        found.push(medication);
      }
    }
    Ok(found)
  }

  async fn count_medications(&self) -> Result<u64> {
    let sql = self.sql("count_medications")?;

    let count: i64 = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql, [], |r| r.get(0))?))
      .await?;

    Ok(count.max(0) as u64)
  }

  // ── Movements ─────────────────────────────────────────────────────────────

  async fn record_movement(&self, input: NewMovement) -> Result<Movement> {
    input.validate()?;
    let select_sql = self.sql("select_medication_stock")?;
    let update_sql = self.sql("update_medication_stock")?;
    let insert_sql = self.sql("insert_movement")?;

    let id  = Uuid::new_v4().to_string();
    let row = input.clone();
    let mv_id = id.clone();

    let outcome: Result<(DateTime<Utc>, i64)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let stock: Option<(String, i64)> = tx
          .query_row(&select_sql, rusqlite::params![row.medication_id], |r| {
            Ok((r.get(0)?, r.get::<_, Option<i64>>(1)?.unwrap_or_default()))
          })
          .optional()?;
        let Some((name, current)) = stock else {
          return Ok(Err(Error::MedicationNotFound(row.medication_id)));
        };
        let next = match row.kind.apply(current, row.quantity) {
          Ok(Some(next)) => next,
          Ok(None) => {
            return Ok(Err(Error::InsufficientStock {
              name,
              requested: row.quantity,
              available: current,
            }));
          }
          Err(e) => return Ok(Err(e.into())),
        };

        tx.execute(&update_sql, rusqlite::params![row.medication_id, next])?;

        let timestamp = Utc::now();
        tx.execute(
          &insert_sql,
          rusqlite::params![
            mv_id,
            row.medication_id,
            encode_kind(row.kind),
            row.quantity,
            encode_dt(timestamp),
            row.note,
          ],
        )?;
        tx.commit()?;
        Ok(Ok((timestamp, next)))
      })
      .await?;

    let (timestamp, stock) = outcome?;
    tracing::info!(
      medication = %input.medication_id,
      kind = %input.kind,
      quantity = input.quantity,
      stock,
      "recorded movement"
    );

    Ok(Movement {
      id,
      medication_id: input.medication_id,
      kind: input.kind,
      quantity: input.quantity,
      timestamp,
      note: input.note,
    })
  }

  async fn list_movements(&self) -> Result<Vec<MovementWithMedication>> {
    let sql = self.sql("select_all_movements")?;

    let raws: Vec<RawMovement> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawMovement::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMovement::into_history).collect()
  }

  // ── Sales ─────────────────────────────────────────────────────────────────

  async fn record_sale(&self, input: NewSale) -> Result<i64> {
    input.validate()?;
    let header_sql = self.sql("insert_sale")?;
    let stock_sql  = self.sql("select_medication_stock")?;
    let item_sql   = self.sql("insert_sale_item")?;
    let update_sql = self.sql("update_medication_stock")?;

    let user_id = input.effective_user().to_owned();
    let lines   = input.lines;
    let count   = lines.len();

    let outcome: Result<i64> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(&header_sql, rusqlite::params![encode_dt(Utc::now()), user_id])?;
        let sale_id = tx.last_insert_rowid();

        // Returning early drops `tx`, which rolls back the header and any
        // lines already applied.
        for line in &lines {
          let stock: Option<(String, i64, f64)> = tx
            .query_row(&stock_sql, rusqlite::params![line.medication_id], |r| {
              Ok((
                r.get(0)?,
                r.get::<_, Option<i64>>(1)?.unwrap_or_default(),
                r.get::<_, Option<f64>>(2)?.unwrap_or_default(),
              ))
            })
            .optional()?;
          let Some((name, available, unit_price)) = stock else {
            return Ok(Err(Error::MedicationNotFound(line.medication_id.clone())));
          };
          let remaining = match MovementKind::Exit.apply(available, line.quantity) {
            Ok(Some(remaining)) => remaining,
            Ok(None) => {
              return Ok(Err(Error::InsufficientStock {
                name,
                requested: line.quantity,
                available,
              }));
            }
            Err(e) => return Ok(Err(e.into())),
          };

          tx.execute(
            &item_sql,
            rusqlite::params![sale_id, line.medication_id, line.quantity, unit_price],
          )?;
          tx.execute(
            &update_sql,
            rusqlite::params![line.medication_id, remaining],
          )?;
        }

        tx.commit()?;
        Ok(Ok(sale_id))
      })
      .await?;

    let sale_id = outcome?;
    tracing::info!(sale_id, lines = count, "recorded sale");
    Ok(sale_id)
  }

  async fn get_sale_items(&self, sale_id: i64) -> Result<Option<Vec<SaleItem>>> {
    let header_sql = self.sql("select_sale_by_id")?;
    let items_sql  = self.sql("select_sale_items")?;

    Ok(
      self
        .conn
        .call(move |conn| {
          let exists = conn
            .query_row(&header_sql, rusqlite::params![sale_id], |r| r.get::<_, i64>(0))
            .optional()?
            .is_some();
          if !exists {
            return Ok(None);
          }

          let mut stmt = conn.prepare(&items_sql)?;
          let items = stmt
            .query_map(rusqlite::params![sale_id], sale_item_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(Some(items))
        })
        .await?,
    )
  }

  // ── Reports ───────────────────────────────────────────────────────────────

  async fn list_low_stock(&self, limit: i64) -> Result<Vec<LowStockEntry>> {
    let sql = self.sql("select_low_stock_medications")?;

    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&sql)?;
          let rows = stmt
            .query_map(rusqlite::params![limit], low_stock_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn total_units_sold(&self) -> Result<i64> {
    let sql = self.sql("sum_units_sold")?;

    Ok(
      self
        .conn
        .call(move |conn| Ok(conn.query_row(&sql, [], |r| r.get(0))?))
        .await?,
    )
  }

  async fn list_sales_summary(&self) -> Result<Vec<SaleSummary>> {
    let sql = self.sql("select_sales_summary")?;

    let raws: Vec<RawSaleSummary> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawSaleSummary::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSaleSummary::into_summary).collect()
  }
}
