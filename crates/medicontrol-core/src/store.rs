//! The `InventoryStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `medicontrol-store-sqlite`). The HTTP layer depends on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use crate::{
  StoreError,
  category::Category,
  medication::{LowStockEntry, Medication, MedicationUpdate, NewMedication},
  movement::{Movement, MovementWithMedication, NewMovement},
  sale::{NewSale, SaleItem, SaleSummary},
};

/// Abstraction over a MediControl inventory backend.
///
/// Reads report absence as `None` (or `false`), never as an error. The two
/// write engines, [`record_movement`](Self::record_movement) and
/// [`record_sale`](Self::record_sale), are atomic: on error nothing they
/// touched is visible afterwards.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait InventoryStore: Send + Sync {
  type Error: StoreError;

  // ── Categories ────────────────────────────────────────────────────────

  /// Create a category, or return the existing one with the same name.
  fn add_category(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Category, Self::Error>> + Send + '_;

  fn get_category_by_name(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Option<Category>, Self::Error>> + Send + '_;

  /// All categories, unordered.
  fn list_categories(
    &self,
  ) -> impl Future<Output = Result<Vec<Category>, Self::Error>> + Send + '_;

  // ── Medications ───────────────────────────────────────────────────────

  /// Insert a medication. Assigns an id when none is given and stamps
  /// `created_at` unless the input carries one.
  fn add_medication(
    &self,
    input: NewMedication,
  ) -> impl Future<Output = Result<Medication, Self::Error>> + Send + '_;

  /// Replace the mutable fields of a medication. Returns `None` if `id` does
  /// not exist.
  fn update_medication(
    &self,
    id: String,
    update: MedicationUpdate,
  ) -> impl Future<Output = Result<Option<Medication>, Self::Error>> + Send + '_;

  /// Delete a medication. Returns `false` if it did not exist; fails with a
  /// conflict if movements or sale items still reference it.
  fn delete_medication(
    &self,
    id: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn get_medication(
    &self,
    id: String,
  ) -> impl Future<Output = Result<Option<Medication>, Self::Error>> + Send + '_;

  /// First medication carrying `code`. Registry codes are not unique.
  fn get_medication_by_registry_code(
    &self,
    code: String,
  ) -> impl Future<Output = Result<Option<Medication>, Self::Error>> + Send + '_;

  /// Medications whose name, manufacturer or registry code contains `term`
  /// case-insensitively. An empty term returns the whole catalog.
  fn search_medications(
    &self,
    term: String,
  ) -> impl Future<Output = Result<Vec<Medication>, Self::Error>> + Send + '_;

  fn count_medications(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Movements ─────────────────────────────────────────────────────────

  /// Record a stock entry or exit and adjust the medication's quantity in the
  /// same transaction.
  fn record_movement(
    &self,
    input: NewMovement,
  ) -> impl Future<Output = Result<Movement, Self::Error>> + Send + '_;

  /// Every movement joined to its medication, newest first.
  fn list_movements(
    &self,
  ) -> impl Future<Output = Result<Vec<MovementWithMedication>, Self::Error>>
  + Send
  + '_;

  // ── Sales ─────────────────────────────────────────────────────────────

  /// Record a multi-line sale atomically and return its id.
  fn record_sale(
    &self,
    input: NewSale,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  /// Items of one sale in insertion order. `None` if the sale does not exist.
  fn get_sale_items(
    &self,
    sale_id: i64,
  ) -> impl Future<Output = Result<Option<Vec<SaleItem>>, Self::Error>> + Send + '_;

  // ── Reports ───────────────────────────────────────────────────────────

  /// Medications with `quantity < limit`.
  fn list_low_stock(
    &self,
    limit: i64,
  ) -> impl Future<Output = Result<Vec<LowStockEntry>, Self::Error>> + Send + '_;

  /// Sum of every sale item's quantity; `0` when nothing was sold.
  fn total_units_sold(
    &self,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  /// One row per sale with its item count and monetary total, newest first.
  fn list_sales_summary(
    &self,
  ) -> impl Future<Output = Result<Vec<SaleSummary>, Self::Error>> + Send + '_;
}
