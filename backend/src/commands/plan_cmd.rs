//! Commands for plain treatment-plan access

use crate::domain::TreatmentPlanItem;
use crate::repository::{PlanStore, Repository};
use crate::AppState;

/// List a patient's plans in sort order
pub async fn list_plans(state: &AppState, patient_id: String) -> Result<Vec<TreatmentPlanItem>, String> {
    state.plan_repo.list_by_patient(&patient_id).await.map_err(|e| e.to_string())
}

/// Get plan by ID
pub async fn get_plan(state: &AppState, id: u32) -> Result<Option<TreatmentPlanItem>, String> {
    state.plan_repo.find_by_id(id).await.map_err(|e| e.to_string())
}

/// Set or clear the memo; blank text clears it
pub async fn update_memo(state: &AppState, id: u32, memo: Option<String>) -> Result<TreatmentPlanItem, String> {
    state.workflow.update_memo(id, memo).await.map_err(|e| e.to_string())
}

/// Explicit delete; the workflow itself never deletes
pub async fn delete_plan(state: &AppState, id: u32) -> Result<(), String> {
    state.plan_repo.delete(id).await.map_err(|e| {
        log::error!("Failed to delete plan {}: {}", id, e);
        e.to_string()
    })?;
    log::info!("Deleted plan {}", id);
    Ok(())
}
