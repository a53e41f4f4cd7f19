//! Integration tests for `SqliteStore` against an in-memory database.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use medicontrol_core::{
  ErrorKind, StoreError,
  medication::{Medication, MedicationUpdate, NewMedication},
  movement::{MovementKind, NewMovement},
  sale::{DEFAULT_USER_ID, NewSale, SaleLine},
  store::InventoryStore,
};

use crate::{CRITICAL_QUERIES, Error, QueryRegistry, SqliteStore, seed};

fn sql_dir() -> PathBuf { Path::new(env!("CARGO_MANIFEST_DIR")).join("../../sql") }

fn queries() -> QueryRegistry { QueryRegistry::load(sql_dir()).expect("sql directory") }

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory(Arc::new(queries()))
    .await
    .expect("in-memory store")
}

async fn add(s: &SqliteStore, name: &str, quantity: i64, price: f64) -> Medication {
  s.add_medication(NewMedication::new(name).with_quantity(quantity).with_price(price))
    .await
    .unwrap()
}

async fn quantity(s: &SqliteStore, id: &str) -> i64 {
  s.get_medication(id.to_owned()).await.unwrap().unwrap().quantity
}

// ─── Query registry ──────────────────────────────────────────────────────────

#[test]
fn registry_loads_nested_sql_files_by_stem() {
  let q = queries();
  q.require(CRITICAL_QUERIES).unwrap();
  assert!(q.contains("select_all_medications"));
  assert!(q.contains("backfill_medication_price"));
  assert!(q.get("insert_sale").unwrap().contains("INSERT INTO sales"));
}

#[test]
fn registry_ignores_other_files_and_rejects_duplicates() {
  let dir = tempfile::tempdir().unwrap();
  std::fs::create_dir(dir.path().join("a")).unwrap();
  std::fs::create_dir(dir.path().join("b")).unwrap();
  std::fs::write(dir.path().join("a/one.sql"), "SELECT 1;").unwrap();
  std::fs::write(dir.path().join("a/README.md"), "notes").unwrap();

  let q = QueryRegistry::load(dir.path()).unwrap();
  assert_eq!(q.len(), 1);
  assert_eq!(q.get("one").unwrap(), "SELECT 1;");
  assert!(matches!(q.get("README"), Err(Error::MissingQuery(_))));

  std::fs::write(dir.path().join("b/one.sql"), "SELECT 2;").unwrap();
  let err = QueryRegistry::load(dir.path()).unwrap_err();
  assert!(matches!(err, Error::DuplicateQuery { ref name, .. } if name == "one"));
  assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn registry_load_fails_for_missing_directory() {
  let err = QueryRegistry::load("/definitely/not/here").unwrap_err();
  assert!(matches!(err, Error::Io { .. }));
}

#[tokio::test]
async fn missing_critical_query_is_fatal() {
  let q = queries().without_query("insert_sale");
  let err = SqliteStore::open_in_memory(Arc::new(q)).await.err().unwrap();
  assert!(matches!(err, Error::MissingCriticalQueries(ref m) if m == &["insert_sale"]));
  assert_eq!(err.kind(), ErrorKind::Config);
}

#[tokio::test]
async fn missing_optional_query_is_recoverable() {
  let q = queries().without_query("sum_units_sold");
  let s = SqliteStore::open_in_memory(Arc::new(q)).await.unwrap();

  let err = s.total_units_sold().await.unwrap_err();
  assert!(matches!(err, Error::MissingQuery(ref n) if n == "sum_units_sold"));

  // The rest of the store keeps working.
  add(&s, "Dipirona", 1, 1.0).await;
  assert_eq!(s.count_medications().await.unwrap(), 1);
}

// ─── Schema ──────────────────────────────────────────────────────────────────

fn schema_snapshot(path: &Path) -> Vec<(String, String)> {
  let conn = rusqlite::Connection::open(path).unwrap();
  let mut stmt = conn
    .prepare("SELECT name, COALESCE(sql, '') FROM sqlite_master ORDER BY name")
    .unwrap();
  stmt
    .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
    .unwrap()
    .collect::<rusqlite::Result<Vec<_>>>()
    .unwrap()
}

#[tokio::test]
async fn migrations_add_price_and_category_columns() {
  let s = store().await;
  let columns = s.table_columns("medications").await.unwrap();
  assert!(columns.iter().any(|c| c == "price"));
  assert!(columns.iter().any(|c| c == "category_id"));
}

#[tokio::test]
async fn schema_init_is_idempotent_across_reopen() {
  let dir  = tempfile::tempdir().unwrap();
  let path = dir.path().join("medicontrol.db");
  let q    = Arc::new(queries());

  let first = SqliteStore::open(&path, q.clone()).await.unwrap();
  let m = add(&first, "Dipirona", 10, 5.0).await;
  let before = schema_snapshot(&path);
  drop(first);

  let second = SqliteStore::open(&path, q).await.unwrap();
  assert_eq!(schema_snapshot(&path), before);
  assert_eq!(second.count_medications().await.unwrap(), 1);
  assert_eq!(quantity(&second, &m.id).await, 10);
}

#[tokio::test]
async fn legacy_rows_decode_nulls_to_empty_values() {
  let dir  = tempfile::tempdir().unwrap();
  let path = dir.path().join("legacy.db");
  {
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn
      .execute_batch(
        "CREATE TABLE medications (
           id TEXT PRIMARY KEY, name TEXT NOT NULL, manufacturer TEXT,
           form TEXT, registry_code TEXT, quantity INTEGER, expiry TEXT,
           created_at TEXT NOT NULL
         );
         INSERT INTO medications (id, name, quantity, created_at)
         VALUES ('old-1', 'Legado', NULL, '2023-06-01 08:30:00');",
      )
      .unwrap();
  }

  let s = SqliteStore::open(&path, Arc::new(queries())).await.unwrap();
  let m = s.get_medication("old-1".into()).await.unwrap().unwrap();
  assert_eq!(m.name, "Legado");
  assert_eq!(m.manufacturer, "");
  assert_eq!(m.form, "");
  assert_eq!(m.registry_code, "");
  assert_eq!(m.quantity, 0);
  assert_eq!(m.price, 0.0);
  assert_eq!(m.expiry, None);
  assert_eq!(m.category, None);
  assert_eq!(m.created_at.to_rfc3339(), "2023-06-01T08:30:00+00:00");
}

// ─── Categories ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_category_is_idempotent() {
  let s = store().await;
  let mut ids = Vec::new();
  for _ in 0..4 {
    ids.push(s.add_category("Analgésico".into()).await.unwrap().id);
  }
  assert!(ids.windows(2).all(|w| w[0] == w[1]));
  assert_eq!(s.list_categories().await.unwrap().len(), 1);
}

#[tokio::test]
async fn category_names_are_case_sensitive() {
  let s = store().await;
  let upper = s.add_category("Analgésico".into()).await.unwrap();
  let lower = s.add_category("analgésico".into()).await.unwrap();
  assert_ne!(upper.id, lower.id);
  assert_eq!(s.list_categories().await.unwrap().len(), 2);
}

#[tokio::test]
async fn get_category_by_name() {
  let s = store().await;
  assert!(s.get_category_by_name("Antibiótico".into()).await.unwrap().is_none());
  let created = s.add_category("Antibiótico".into()).await.unwrap();
  let fetched = s.get_category_by_name("Antibiótico".into()).await.unwrap();
  assert_eq!(fetched, Some(created));
}

#[tokio::test]
async fn blank_category_is_rejected() {
  let s = store().await;
  let err = s.add_category("   ".into()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
  assert!(s.list_categories().await.unwrap().is_empty());
}

// ─── Medications ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_medication() {
  let s = store().await;
  let m = s
    .add_medication(
      NewMedication::new("Dipirona")
        .with_registry_code("1.0047.0118")
        .with_quantity(10)
        .with_price(5.0),
    )
    .await
    .unwrap();
  assert!(!m.id.is_empty());

  let all = s.search_medications(String::new()).await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].quantity, 10);
  assert_eq!(all[0].registry_code, "1.0047.0118");

  let by_code = s
    .get_medication_by_registry_code("1.0047.0118".into())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(by_code.id, m.id);
}

#[tokio::test]
async fn get_missing_medication_returns_none() {
  let s = store().await;
  assert!(s.get_medication("nope".into()).await.unwrap().is_none());
  assert!(s.get_medication_by_registry_code("0".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn caller_supplied_id_is_kept_and_unique() {
  let s = store().await;
  let mut input = NewMedication::new("Amoxicilina");
  input.id = Some("amox-500".into());
  let m = s.add_medication(input.clone()).await.unwrap();
  assert_eq!(m.id, "amox-500");

  let err = s.add_medication(input).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn invalid_medication_is_rejected() {
  let s = store().await;
  let err = s
    .add_medication(NewMedication::new("A").with_quantity(-3))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
  assert_eq!(s.count_medications().await.unwrap(), 0);
}

#[tokio::test]
async fn category_is_joined_on_read() {
  let s   = store().await;
  let cat = s.add_category("Analgésico".into()).await.unwrap();
  let mut input = NewMedication::new("Paracetamol");
  input.category_id = Some(cat.id.clone());

  let m = s.add_medication(input).await.unwrap();
  assert_eq!(m.category_id.as_deref(), Some(cat.id.as_str()));
  assert_eq!(m.category, Some(cat));
}

#[tokio::test]
async fn unknown_category_is_not_found() {
  let s = store().await;
  let mut input = NewMedication::new("Paracetamol");
  input.category_id = Some("missing".into());
  let err = s.add_medication(input).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn update_replaces_fields_but_not_quantity() {
  let s = store().await;
  let m = add(&s, "Losartana", 7, 10.0).await;

  let mut update = MedicationUpdate::from(&m);
  update.name = "Losartana Potássica".into();
  update.manufacturer = "Medley".into();
  update.price = 12.5;
  update.expiry = chrono::NaiveDate::from_ymd_opt(2027, 1, 31);

  let updated = s.update_medication(m.id.clone(), update).await.unwrap().unwrap();
  assert_eq!(updated.name, "Losartana Potássica");
  assert_eq!(updated.manufacturer, "Medley");
  assert_eq!(updated.price, 12.5);
  assert_eq!(updated.expiry, chrono::NaiveDate::from_ymd_opt(2027, 1, 31));
  assert_eq!(updated.quantity, 7);
  assert_eq!(updated.created_at, m.created_at);
}

#[tokio::test]
async fn update_missing_returns_none() {
  let s = store().await;
  let update = MedicationUpdate { name: "X".into(), ..MedicationUpdate::default() };
  assert!(s.update_medication("nope".into(), update).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_unreferenced_medication() {
  let s = store().await;
  let m = add(&s, "Ibuprofeno", 3, 4.0).await;
  assert!(s.delete_medication(m.id.clone()).await.unwrap());
  assert!(s.get_medication(m.id.clone()).await.unwrap().is_none());
  assert!(!s.delete_medication(m.id).await.unwrap());
}

#[tokio::test]
async fn delete_referenced_medication_is_a_conflict() {
  let s = store().await;
  let m = add(&s, "Ibuprofeno", 3, 4.0).await;
  s.record_sale(NewSale::new(vec![SaleLine::new(m.id.clone(), 1)]))
    .await
    .unwrap();

  let err = s.delete_medication(m.id.clone()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);
  assert!(s.get_medication(m.id).await.unwrap().is_some());
  assert_eq!(s.total_units_sold().await.unwrap(), 1);
}

#[tokio::test]
async fn search_is_case_insensitive_over_name_manufacturer_and_code() {
  let s = store().await;
  s.add_medication(
    NewMedication::new("Ácido Acetilsalicílico")
      .with_manufacturer("Bayer")
      .with_registry_code("1.7056.0021"),
  )
  .await
  .unwrap();
  s.add_medication(
    NewMedication::new("Dipirona")
      .with_manufacturer("EMS")
      .with_registry_code("1.0047.0118"),
  )
  .await
  .unwrap();
  s.add_medication(NewMedication::new("100% Vitamina C").with_manufacturer("Cimed"))
    .await
    .unwrap();

  let names = |found: Vec<Medication>| {
    let mut n: Vec<String> = found.into_iter().map(|m| m.name).collect();
    n.sort();
    n
  };

  assert_eq!(names(s.search_medications("ácido".into()).await.unwrap()), ["Ácido Acetilsalicílico"]);
  assert_eq!(names(s.search_medications("BAYER".into()).await.unwrap()), ["Ácido Acetilsalicílico"]);
  assert_eq!(names(s.search_medications("0047".into()).await.unwrap()), ["Dipirona"]);
  assert_eq!(names(s.search_medications("%".into()).await.unwrap()), ["100% Vitamina C"]);
  assert!(s.search_medications("_".into()).await.unwrap().is_empty());
  assert_eq!(s.search_medications(String::new()).await.unwrap().len(), 3);
}

#[tokio::test]
async fn search_term_whitespace_is_not_trimmed() {
  let s = store().await;
  add(&s, "Dipirona", 1, 1.0).await;
  add(&s, "Acido Folico", 1, 1.0).await;

  assert!(s.search_medications("a ".into()).await.unwrap().is_empty());
  assert!(s.search_medications(" ".into()).await.unwrap().is_empty());
  assert_eq!(s.search_medications("o f".into()).await.unwrap().len(), 1);
  assert_eq!(s.search_medications(String::new()).await.unwrap().len(), 2);
}

// ─── Movements ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn entry_movement_increases_stock() {
  let s = store().await;
  let m = add(&s, "Dipirona", 10, 5.0).await;

  let mv = s
    .record_movement(NewMovement::new(m.id.clone(), MovementKind::Entry, 5))
    .await
    .unwrap();
  assert_eq!(mv.quantity, 5);
  assert_eq!(quantity(&s, &m.id).await, 15);

  let history = s.list_movements().await.unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].movement.kind, MovementKind::Entry);
  assert_eq!(history[0].movement.quantity, 5);
  assert_eq!(history[0].medication_name, "Dipirona");
}

#[tokio::test]
async fn insufficient_exit_changes_nothing() {
  let s = store().await;
  let m = add(&s, "Dipirona", 15, 5.0).await;

  let err = s
    .record_movement(NewMovement::new(m.id.clone(), MovementKind::Exit, 1000))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InsufficientStock);
  assert!(err.to_string().contains("Dipirona"));
  assert_eq!(quantity(&s, &m.id).await, 15);
  assert!(s.list_movements().await.unwrap().is_empty());
}

#[tokio::test]
async fn entry_overflowing_stock_changes_nothing() {
  let s = store().await;
  let m = add(&s, "Dipirona", i64::MAX - 1, 5.0).await;

  let err = s
    .record_movement(NewMovement::new(m.id.clone(), MovementKind::Entry, 10))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
  assert!(matches!(
    err,
    Error::Core(medicontrol_core::Error::QuantityOverflow { quantity: 10, .. })
  ));
  assert_eq!(quantity(&s, &m.id).await, i64::MAX - 1);
  assert!(s.list_movements().await.unwrap().is_empty());

  s.record_movement(NewMovement::new(m.id.clone(), MovementKind::Entry, 1))
    .await
    .unwrap();
  assert_eq!(quantity(&s, &m.id).await, i64::MAX);
}

#[tokio::test]
async fn exit_down_to_zero_is_allowed() {
  let s = store().await;
  let m = add(&s, "Dipirona", 4, 5.0).await;
  s.record_movement(NewMovement::new(m.id.clone(), MovementKind::Exit, 4))
    .await
    .unwrap();
  assert_eq!(quantity(&s, &m.id).await, 0);
}

#[tokio::test]
async fn movement_for_missing_medication_is_not_found() {
  let s = store().await;
  let err = s
    .record_movement(NewMovement::new("ghost", MovementKind::Entry, 1))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn non_positive_movement_is_rejected() {
  let s = store().await;
  let m = add(&s, "Dipirona", 4, 5.0).await;
  let err = s
    .record_movement(NewMovement::new(m.id.clone(), MovementKind::Entry, 0))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
  assert_eq!(quantity(&s, &m.id).await, 4);
}

#[tokio::test]
async fn movements_are_listed_newest_first() {
  let s = store().await;
  let m = add(&s, "Dipirona", 10, 5.0).await;
  for qty in 1..=3 {
    s.record_movement(NewMovement::new(m.id.clone(), MovementKind::Entry, qty))
      .await
      .unwrap();
  }
  let quantities: Vec<i64> = s
    .list_movements()
    .await
    .unwrap()
    .into_iter()
    .map(|h| h.movement.quantity)
    .collect();
  assert_eq!(quantities, [3, 2, 1]);
}

// ─── Sales ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn multi_line_sale() {
  let s = store().await;
  let a = add(&s, "A", 10, 2.00).await;
  let b = add(&s, "B", 4, 7.50).await;

  let sale_id = s
    .record_sale(NewSale::new(vec![
      SaleLine::new(a.id.clone(), 3),
      SaleLine::new(b.id.clone(), 2),
    ]))
    .await
    .unwrap();

  assert_eq!(quantity(&s, &a.id).await, 7);
  assert_eq!(quantity(&s, &b.id).await, 2);

  let items = s.get_sale_items(sale_id).await.unwrap().unwrap();
  assert_eq!(items.len(), 2);
  assert_eq!(items[0].medication_id, a.id);
  assert_eq!(items[1].unit_price, 7.50);
  assert_eq!(s.total_units_sold().await.unwrap(), 5);

  let summary = s.list_sales_summary().await.unwrap();
  assert_eq!(summary.len(), 1);
  assert_eq!(summary[0].id, sale_id);
  assert_eq!(summary[0].item_count, 2);
  assert!((summary[0].total_amount - 21.00).abs() < 1e-9);
  assert_eq!(summary[0].user_id, DEFAULT_USER_ID);
}

#[tokio::test]
async fn failed_line_rolls_back_whole_sale() {
  let s = store().await;
  let a = add(&s, "A", 1, 2.00).await;
  let b = add(&s, "B", 10, 3.00).await;

  let err = s
    .record_sale(NewSale::new(vec![
      SaleLine::new(a.id.clone(), 1),
      SaleLine::new(b.id.clone(), 1000),
    ]))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InsufficientStock);
  assert!(err.to_string().contains('B'));

  assert_eq!(quantity(&s, &a.id).await, 1);
  assert_eq!(quantity(&s, &b.id).await, 10);
  assert!(s.list_sales_summary().await.unwrap().is_empty());
  assert_eq!(s.total_units_sold().await.unwrap(), 0);
}

#[tokio::test]
async fn sale_with_missing_medication_rolls_back() {
  let s = store().await;
  let a = add(&s, "A", 5, 2.00).await;
  let err = s
    .record_sale(NewSale::new(vec![
      SaleLine::new(a.id.clone(), 1),
      SaleLine::new("ghost", 1),
    ]))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
  assert_eq!(quantity(&s, &a.id).await, 5);
  assert!(s.list_sales_summary().await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_lines_apply_sequentially() {
  let s = store().await;
  let a = add(&s, "A", 5, 1.00).await;

  let err = s
    .record_sale(NewSale::new(vec![
      SaleLine::new(a.id.clone(), 3),
      SaleLine::new(a.id.clone(), 3),
    ]))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InsufficientStock);
  assert_eq!(quantity(&s, &a.id).await, 5);

  let sale_id = s
    .record_sale(NewSale::new(vec![
      SaleLine::new(a.id.clone(), 2),
      SaleLine::new(a.id.clone(), 3),
    ]))
    .await
    .unwrap();
  assert_eq!(quantity(&s, &a.id).await, 0);
  assert_eq!(s.get_sale_items(sale_id).await.unwrap().unwrap().len(), 2);
}

#[tokio::test]
async fn empty_sale_is_rejected() {
  let s = store().await;
  let err = s.record_sale(NewSale::default()).await.unwrap_err();
  assert!(matches!(err, Error::Core(medicontrol_core::Error::EmptySale)));
  assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn unit_price_is_frozen_at_sale_time() {
  let s = store().await;
  let a = add(&s, "A", 10, 2.00).await;
  let sale_id = s
    .record_sale(NewSale::new(vec![SaleLine::new(a.id.clone(), 2)]))
    .await
    .unwrap();

  let mut update = MedicationUpdate::from(&a);
  update.price = 99.0;
  s.update_medication(a.id.clone(), update).await.unwrap();

  let items = s.get_sale_items(sale_id).await.unwrap().unwrap();
  assert_eq!(items[0].unit_price, 2.00);
  let summary = s.list_sales_summary().await.unwrap();
  assert!((summary[0].total_amount - 4.00).abs() < 1e-9);
}

#[tokio::test]
async fn supplied_user_is_recorded() {
  let s = store().await;
  let a = add(&s, "A", 10, 1.00).await;
  let mut sale = NewSale::new(vec![SaleLine::new(a.id.clone(), 1)]);
  sale.user_id = Some("admin".into());
  s.record_sale(sale).await.unwrap();
  assert_eq!(s.list_sales_summary().await.unwrap()[0].user_id, "admin");
}

#[tokio::test]
async fn missing_sale_items_is_none() {
  let s = store().await;
  assert!(s.get_sale_items(42).await.unwrap().is_none());
}

#[tokio::test]
async fn reports_are_empty_on_empty_store() {
  let s = store().await;
  assert_eq!(s.total_units_sold().await.unwrap(), 0);
  assert!(s.list_sales_summary().await.unwrap().is_empty());
  assert!(s.list_movements().await.unwrap().is_empty());
  assert!(s.list_low_stock(50).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sales_never_oversell() {
  let s = store().await;
  let m = add(&s, "M", 1, 3.00).await;

  let sale = || NewSale::new(vec![SaleLine::new(m.id.clone(), 1)]);
  let (first, second) = tokio::join!(s.record_sale(sale()), s.record_sale(sale()));
  let outcomes = [first, second];

  assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
  let failure = outcomes.iter().find_map(|r| r.as_ref().err()).unwrap();
  assert_eq!(failure.kind(), ErrorKind::InsufficientStock);
  assert_eq!(quantity(&s, &m.id).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_exits_and_sales_from_many_tasks() {
  let s = store().await;
  let m = add(&s, "M", 5, 1.00).await;

  let mut handles = Vec::new();
  for i in 0..12 {
    let s  = s.clone();
    let id = m.id.clone();
    handles.push(tokio::spawn(async move {
      if i % 2 == 0 {
        s.record_sale(NewSale::new(vec![SaleLine::new(id, 1)])).await.map(|_| ())
      } else {
        s.record_movement(NewMovement::new(id, MovementKind::Exit, 1)).await.map(|_| ())
      }
    }));
  }

  let mut succeeded = 0;
  for handle in handles {
    match handle.await.unwrap() {
      Ok(()) => succeeded += 1,
      Err(e) => assert_eq!(e.kind(), ErrorKind::InsufficientStock),
    }
  }
  assert_eq!(succeeded, 5);
  assert_eq!(quantity(&s, &m.id).await, 0);
}

// ─── Reports ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn low_stock_uses_strict_threshold() {
  let s = store().await;
  let m = add(&s, "M", 3, 1.00).await;
  add(&s, "Plenty", 100, 1.00).await;

  let below_five = s.list_low_stock(5).await.unwrap();
  assert_eq!(below_five.len(), 1);
  assert_eq!(below_five[0].id, m.id);
  assert_eq!(below_five[0].quantity, 3);

  assert!(s.list_low_stock(3).await.unwrap().is_empty());
}

// ─── Seed ────────────────────────────────────────────────────────────────────

fn write_seed(dir: &Path, body: &str) -> PathBuf {
  let path = dir.join("seed.json");
  std::fs::write(&path, body).unwrap();
  path
}

const SEED: &str = r#"[
  {"id": 1, "nome": "Dipirona 500mg", "codigo_anvisa": "1.0047.0118",
   "quantidade_estoque": 40, "preco_venda": 6.9, "fabricante": "EMS",
   "data_validade": "2026-08-31", "data_entrada": "2024-01-15", "bula": "..."},
  {"name": "Amoxicilina 500mg", "registry_code": "1004307270013", "stock": 12,
   "price": 24.5, "manufacturer": "EMS", "expiry": "2025-12-31",
   "entry_date": "2024-02-01T10:00:00Z", "leaflet": "..."},
  {"nome": 5},
  {"nome": "Estoque Negativo", "quantidade_estoque": -1}
]"#;

#[tokio::test]
async fn seed_imports_into_empty_catalog() {
  let dir  = tempfile::tempdir().unwrap();
  let path = write_seed(dir.path(), SEED);
  let s    = store().await;

  let report = seed::bootstrap(&s, &path).await;
  assert_eq!(report.imported, 2);
  assert_eq!(report.skipped, 1);
  assert!(!report.populated);

  let dipirona = s
    .get_medication_by_registry_code("1.0047.0118".into())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(dipirona.quantity, 40);
  assert_eq!(dipirona.price, 6.9);
  assert_eq!(dipirona.expiry, chrono::NaiveDate::from_ymd_opt(2026, 8, 31));
  assert_eq!(dipirona.created_at.to_rfc3339(), "2024-01-15T00:00:00+00:00");

  let amox = s
    .get_medication_by_registry_code("1004307270013".into())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(amox.quantity, 12);
  assert_eq!(amox.created_at.to_rfc3339(), "2024-02-01T10:00:00+00:00");

  let again = seed::bootstrap(&s, &path).await;
  assert!(again.populated);
  assert_eq!(again.imported, 0);
  assert_eq!(s.count_medications().await.unwrap(), 2);
}

#[tokio::test]
async fn seed_backfills_only_zero_prices() {
  let dir  = tempfile::tempdir().unwrap();
  let path = write_seed(
    dir.path(),
    r#"[{"nome": "X", "codigo_anvisa": "X1", "preco_venda": 9.9},
        {"nome": "Y", "codigo_anvisa": "Y1", "preco_venda": 1.0}]"#,
  );
  let s = store().await;
  let x = s
    .add_medication(NewMedication::new("X").with_registry_code("X1"))
    .await
    .unwrap();
  let y = s
    .add_medication(NewMedication::new("Y").with_registry_code("Y1").with_price(3.0))
    .await
    .unwrap();

  let report = seed::bootstrap(&s, &path).await;
  assert_eq!(report.backfilled, 1);
  assert!(report.populated);
  assert_eq!(s.get_medication(x.id).await.unwrap().unwrap().price, 9.9);
  assert_eq!(s.get_medication(y.id).await.unwrap().unwrap().price, 3.0);

  assert_eq!(seed::bootstrap(&s, &path).await.backfilled, 0);
}

#[tokio::test]
async fn missing_or_broken_seed_never_fails() {
  let dir = tempfile::tempdir().unwrap();
  let s   = store().await;

  let report = seed::bootstrap(&s, &dir.path().join("absent.json")).await;
  assert_eq!(report, seed::SeedReport::default());

  let broken = write_seed(dir.path(), "{ not json");
  let report = seed::bootstrap(&s, &broken).await;
  assert_eq!(report, seed::SeedReport::default());
  assert_eq!(s.count_medications().await.unwrap(), 0);
}

// ─── Properties ──────────────────────────────────────────────────────────────

mod properties {
  use std::collections::HashMap;

  use proptest::prelude::*;

  use super::*;

  #[derive(Debug, Clone)]
  enum Op {
    Entry { med: usize, qty: i64 },
    Exit { med: usize, qty: i64 },
    Sale { lines: Vec<(usize, i64)> },
    Reprice { med: usize, cents: u32 },
  }

  fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
      (0usize..3, 1i64..15).prop_map(|(med, qty)| Op::Entry { med, qty }),
      (0usize..3, 1i64..15).prop_map(|(med, qty)| Op::Exit { med, qty }),
      prop::collection::vec((0usize..3, 1i64..8), 1..4)
        .prop_map(|lines| Op::Sale { lines }),
      (0usize..3, 0u32..2000).prop_map(|(med, cents)| Op::Reprice { med, cents }),
    ]
  }

  fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .unwrap()
  }

  proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// quantity = initial + entries − exits − sold, and never below zero.
    #[test]
    fn stock_identity_and_no_negative_stock(
      initial in prop::collection::vec(0i64..20, 3),
      ops in prop::collection::vec(op(), 0..25),
    ) {
      runtime().block_on(async move {
        let s = store().await;
        let mut ids = Vec::new();
        for (i, qty) in initial.iter().enumerate() {
          ids.push(add(&s, &format!("M{i}"), *qty, 1.0).await.id);
        }

        let mut model: Vec<i64> = initial.clone();
        let mut prices: Vec<f64> = vec![1.0; 3];
        let mut expected_totals: HashMap<i64, f64> = HashMap::new();

        for op in &ops {
          match op {
            Op::Entry { med, qty } => {
              s.record_movement(NewMovement::new(ids[*med].clone(), MovementKind::Entry, *qty))
                .await
                .unwrap();
              model[*med] += qty;
            }
            Op::Exit { med, qty } => {
              let result = s
                .record_movement(NewMovement::new(ids[*med].clone(), MovementKind::Exit, *qty))
                .await;
              prop_assert_eq!(result.is_ok(), model[*med] >= *qty);
              if result.is_ok() {
                model[*med] -= qty;
              }
            }
            Op::Sale { lines } => {
              let mut after = model.clone();
              let mut total = 0.0;
              let feasible = lines.iter().all(|(med, qty)| {
                after[*med] -= qty;
                total += *qty as f64 * prices[*med];
                after[*med] >= 0
              });
              let sale = NewSale::new(
                lines.iter().map(|(med, qty)| SaleLine::new(ids[*med].clone(), *qty)).collect(),
              );
              let result = s.record_sale(sale).await;
              prop_assert_eq!(result.is_ok(), feasible);
              if let Ok(sale_id) = result {
                model = after;
                expected_totals.insert(sale_id, total);
              }
            }
            Op::Reprice { med, cents } => {
              let current = s.get_medication(ids[*med].clone()).await.unwrap().unwrap();
              let mut update = MedicationUpdate::from(&current);
              update.price = f64::from(*cents) / 100.0;
              s.update_medication(ids[*med].clone(), update).await.unwrap();
              prices[*med] = f64::from(*cents) / 100.0;
            }
          }

          for (i, id) in ids.iter().enumerate() {
            let q = quantity(&s, id).await;
            prop_assert!(q >= 0);
            prop_assert_eq!(q, model[i]);
          }
        }

        for summary in s.list_sales_summary().await.unwrap() {
          let items = s.get_sale_items(summary.id).await.unwrap().unwrap();
          let from_items: f64 = items.iter().map(|i| i.subtotal()).sum();
          prop_assert!((summary.total_amount - from_items).abs() < 1e-6);
          prop_assert!((summary.total_amount - expected_totals[&summary.id]).abs() < 1e-6);
        }
        Ok(())
      })?;
    }
  }
}
