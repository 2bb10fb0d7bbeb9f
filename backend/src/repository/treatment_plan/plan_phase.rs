//! Treatment Plan Workflow Operations
//!
//! The writes the periodontal workflow issues. Multi-row writes run in a
//! single transaction; on any error nothing is committed.

use async_trait::async_trait;
use rusqlite::{params, Connection};

use crate::domain::{DomainError, DomainResult, NewTreatmentPlan, StatusChange, TreatmentPlanItem};
use super::super::traits::PlanStore;
use super::plan_positioning::reserve_sort_orders;
use super::plan_repo::{fetch_plan, insert_plan, not_initialized, row_to_plan, TreatmentPlanRepository, SELECT_PLAN};

#[async_trait]
impl PlanStore for TreatmentPlanRepository {
    async fn list_by_patient(&self, patient_id: &str) -> DomainResult<Vec<TreatmentPlanItem>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;
        plans_of_patient(conn, patient_id)
    }

    async fn append_plans(&self, patient_id: &str, plans: &[NewTreatmentPlan]) -> DomainResult<Vec<TreatmentPlanItem>> {
        if plans.is_empty() {
            return Ok(Vec::new());
        }

        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(not_initialized)?;

        let tx = conn.transaction()?;
        let first = reserve_sort_orders(&tx, patient_id, plans.len())?;
        let now = chrono::Utc::now().timestamp_millis();

        let mut created = Vec::with_capacity(plans.len());
        for (offset, plan) in plans.iter().enumerate() {
            let id = insert_plan(&tx, patient_id, plan, first + offset as i64, now)?;
            let item = fetch_plan(&tx, id)?.ok_or_else(|| DomainError::NotFound(format!("plan {}", id)))?;
            created.push(item);
        }
        tx.commit()?;
        Ok(created)
    }

    async fn apply_status_changes(&self, changes: &[StatusChange]) -> DomainResult<Vec<TreatmentPlanItem>> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(not_initialized)?;

        let tx = conn.transaction()?;
        let updated = write_status_changes(&tx, changes)?;
        tx.commit()?;
        Ok(updated)
    }

    async fn rewrite_statuses<F>(&self, patient_id: &str, plan: F) -> DomainResult<Vec<TreatmentPlanItem>>
    where
        F: FnOnce(&[TreatmentPlanItem]) -> DomainResult<Vec<StatusChange>> + Send,
    {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(not_initialized)?;

        let tx = conn.transaction()?;
        let current = plans_of_patient(&tx, patient_id)?;
        let changes = plan(&current)?;
        let updated = write_status_changes(&tx, &changes)?;
        tx.commit()?;
        Ok(updated)
    }

    async fn update_memo(&self, id: u32, memo: Option<String>) -> DomainResult<TreatmentPlanItem> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let memo = memo.filter(|m| !m.trim().is_empty());
        let changed = conn.execute(
            "UPDATE treatment_plans SET memo = ?, updated_at = ? WHERE id = ?",
            params![memo, chrono::Utc::now().timestamp_millis(), id],
        )?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("plan {}", id)));
        }
        fetch_plan(conn, id)?.ok_or_else(|| DomainError::NotFound(format!("plan {}", id)))
    }
}

fn plans_of_patient(conn: &Connection, patient_id: &str) -> DomainResult<Vec<TreatmentPlanItem>> {
    let mut stmt = conn.prepare(&format!("{} WHERE patient_id = ? ORDER BY sort_order, id", SELECT_PLAN))?;
    let mut rows = stmt.query(params![patient_id])?;

    let mut plans = Vec::new();
    while let Some(row) = rows.next()? {
        plans.push(row_to_plan(row)?);
    }
    Ok(plans)
}

/// Write each change and re-read the row; the caller owns the transaction
fn write_status_changes(conn: &Connection, changes: &[StatusChange]) -> DomainResult<Vec<TreatmentPlanItem>> {
    let now = chrono::Utc::now().timestamp_millis();
    let mut updated = Vec::with_capacity(changes.len());
    for change in changes {
        let changed = conn.execute(
            "UPDATE treatment_plans SET status = ?, completed_at = ?, updated_at = ? WHERE id = ?",
            params![change.status.as_str(), change.completed_at, now, change.id],
        )?;
        if changed == 0 {
            // Dropping the transaction rolls back the rows already written
            return Err(DomainError::NotFound(format!("plan {}", change.id)));
        }
        let item = fetch_plan(conn, change.id)?.ok_or_else(|| DomainError::NotFound(format!("plan {}", change.id)))?;
        updated.push(item);
    }
    Ok(updated)
}
