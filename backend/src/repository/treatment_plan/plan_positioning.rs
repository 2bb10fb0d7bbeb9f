//! Treatment Plan Positioning Operations
//!
//! Sort orders are handed out from a per-patient counter. The counter only
//! moves forward, so deleted items never give their value back.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::DomainResult;
use super::plan_repo::not_initialized;

/// Trait for sort order inspection
#[async_trait]
pub trait PlanPositioningOperations {
    /// Highest sort order handed out for a patient (0 when none)
    async fn last_sort_order(&self, patient_id: &str) -> DomainResult<i64>;
}

#[async_trait]
impl PlanPositioningOperations for super::plan_repo::TreatmentPlanRepository {
    async fn last_sort_order(&self, patient_id: &str) -> DomainResult<i64> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;
        current_high_water(conn, patient_id)
    }
}

/// Counter value, or the highest stored sort order if rows predate the counter
fn current_high_water(conn: &Connection, patient_id: &str) -> DomainResult<i64> {
    let counter: Option<i64> = conn
        .query_row(
            "SELECT last_sort_order FROM patient_sort_counters WHERE patient_id = ?",
            params![patient_id],
            |row| row.get(0),
        )
        .optional()?;
    let stored: i64 = conn.query_row(
        "SELECT COALESCE(MAX(sort_order), 0) FROM treatment_plans WHERE patient_id = ?",
        params![patient_id],
        |row| row.get(0),
    )?;
    Ok(counter.unwrap_or(0).max(stored))
}

/// Reserve `count` consecutive sort orders and return the first one.
///
/// Must run inside the caller's transaction.
pub(super) fn reserve_sort_orders(conn: &Connection, patient_id: &str, count: usize) -> DomainResult<i64> {
    let first = current_high_water(conn, patient_id)? + 1;
    let last = first + count as i64 - 1;
    conn.execute(
        "INSERT INTO patient_sort_counters (patient_id, last_sort_order) VALUES (?, ?)
         ON CONFLICT(patient_id) DO UPDATE SET last_sort_order = excluded.last_sort_order",
        params![patient_id, last],
    )?;
    Ok(first)
}
