//! Treatment Plan Repository - Core CRUD Operations
//!
//! SQLite-backed implementation for TreatmentPlanItem CRUD operations.

use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::{
    parse_tooth_list, DomainError, DomainResult, NewTreatmentPlan, PhaseId, PlanStatus, StaffType, ToothNumber,
    TreatmentPlanItem,
};
use super::super::traits::Repository;
use super::plan_positioning::reserve_sort_orders;

pub(super) const SELECT_PLAN: &str = "SELECT id, patient_id, staff_type, periodontal_phase, tooth_numbers, content, \
     priority, sort_order, status, completed_at, memo, created_at, updated_at FROM treatment_plans";

/// SQLite implementation of the treatment plan repository
#[derive(Debug)]
pub struct TreatmentPlanRepository {
    pub(super) conn: Arc<Mutex<Option<Connection>>>,
}

impl TreatmentPlanRepository {
    pub fn new(conn: Arc<Mutex<Option<Connection>>>) -> Self {
        Self { conn }
    }
}

pub(super) fn not_initialized() -> DomainError {
    DomainError::Persistence("Database not initialized".to_string())
}

#[async_trait]
impl Repository<TreatmentPlanItem> for TreatmentPlanRepository {
    async fn create(&self, entity: &TreatmentPlanItem) -> DomainResult<TreatmentPlanItem> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(not_initialized)?;

        let tx = conn.transaction()?;
        let sort_order = reserve_sort_orders(&tx, &entity.patient_id, 1)?;
        let fields = NewTreatmentPlan {
            staff_type: entity.staff_type,
            periodontal_phase: entity.periodontal_phase,
            tooth_numbers: entity.tooth_numbers.clone(),
            content: entity.content.clone(),
            priority: entity.priority,
            memo: entity.memo.clone(),
        };
        let id = insert_plan(&tx, &entity.patient_id, &fields, sort_order, chrono::Utc::now().timestamp_millis())?;
        if entity.status == PlanStatus::Completed {
            tx.execute(
                "UPDATE treatment_plans SET status = ?, completed_at = ? WHERE id = ?",
                params![entity.status.as_str(), entity.completed_at, id],
            )?;
        }
        let created = fetch_plan(&tx, id)?.ok_or_else(|| DomainError::NotFound(format!("plan {}", id)))?;
        tx.commit()?;
        Ok(created)
    }

    async fn find_by_id(&self, id: u32) -> DomainResult<Option<TreatmentPlanItem>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;
        fetch_plan(conn, id)
    }

    async fn list(&self) -> DomainResult<Vec<TreatmentPlanItem>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let mut stmt = conn.prepare(&format!("{} ORDER BY patient_id, sort_order", SELECT_PLAN))?;
        let mut rows = stmt.query([])?;

        let mut plans = Vec::new();
        while let Some(row) = rows.next()? {
            plans.push(row_to_plan(row)?);
        }
        Ok(plans)
    }

    async fn update(&self, entity: &TreatmentPlanItem) -> DomainResult<TreatmentPlanItem> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let changed = conn.execute(
            "UPDATE treatment_plans SET staff_type = ?, periodontal_phase = ?, tooth_numbers = ?, content = ?, \
             priority = ?, status = ?, completed_at = ?, memo = ?, updated_at = ? WHERE id = ?",
            params![
                entity.staff_type.as_str(),
                entity.periodontal_phase.map(|p| p.as_str()),
                encode_teeth(&entity.tooth_numbers),
                entity.content,
                entity.priority,
                entity.status.as_str(),
                entity.completed_at,
                entity.memo,
                chrono::Utc::now().timestamp_millis(),
                entity.id
            ],
        )?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("plan {}", entity.id)));
        }

        fetch_plan(conn, entity.id)?.ok_or_else(|| DomainError::NotFound(format!("plan {}", entity.id)))
    }

    async fn delete(&self, id: u32) -> DomainResult<()> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        // The sort order counter is left untouched so the value is never handed out again
        let changed = conn.execute("DELETE FROM treatment_plans WHERE id = ?", params![id])?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("plan {}", id)));
        }
        Ok(())
    }
}

/// Insert one row and return its id
pub(super) fn insert_plan(
    conn: &Connection,
    patient_id: &str,
    plan: &NewTreatmentPlan,
    sort_order: i64,
    now_ms: i64,
) -> DomainResult<u32> {
    conn.execute(
        "INSERT INTO treatment_plans (patient_id, staff_type, periodontal_phase, tooth_numbers, content, \
         priority, sort_order, status, memo, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            patient_id,
            plan.staff_type.as_str(),
            plan.periodontal_phase.map(|p| p.as_str()),
            encode_teeth(&plan.tooth_numbers),
            plan.content,
            plan.priority,
            sort_order,
            PlanStatus::Planned.as_str(),
            plan.memo,
            now_ms,
            now_ms
        ],
    )?;
    Ok(conn.last_insert_rowid() as u32)
}

pub(super) fn fetch_plan(conn: &Connection, id: u32) -> DomainResult<Option<TreatmentPlanItem>> {
    let mut stmt = conn.prepare(&format!("{} WHERE id = ?", SELECT_PLAN))?;
    let mut rows = stmt.query(params![id])?;

    match rows.next()? {
        Some(row) => Ok(Some(row_to_plan(row)?)),
        None => Ok(None),
    }
}

/// Stored as `11,12`
fn encode_teeth(teeth: &[ToothNumber]) -> String {
    teeth.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(",")
}

/// Convert a database row to TreatmentPlanItem
pub(super) fn row_to_plan(row: &rusqlite::Row) -> DomainResult<TreatmentPlanItem> {
    let id: u32 = row.get(0)?;
    let phase: Option<String> = row.get(3)?;
    let periodontal_phase = match phase.as_deref() {
        Some(raw) => {
            let parsed = PhaseId::parse(raw);
            if parsed.is_none() {
                log::warn!("Plan {} has unknown phase {:?}; treating it as a plain todo", id, raw);
            }
            parsed
        }
        None => None,
    };

    Ok(TreatmentPlanItem {
        id,
        patient_id: row.get(1)?,
        staff_type: StaffType::from_str(&row.get::<_, String>(2)?),
        periodontal_phase,
        tooth_numbers: parse_tooth_list(&row.get::<_, String>(4).unwrap_or_default()),
        content: row.get(5)?,
        priority: row.get::<_, i32>(6).unwrap_or(2),
        sort_order: row.get(7)?,
        status: PlanStatus::from_str(&row.get::<_, String>(8)?),
        completed_at: row.get::<_, Option<i64>>(9).unwrap_or(None),
        memo: row.get::<_, Option<String>>(10).unwrap_or(None),
        created_at: row.get::<_, Option<i64>>(11).unwrap_or(None),
        updated_at: row.get::<_, Option<i64>>(12).unwrap_or(None),
    })
}
