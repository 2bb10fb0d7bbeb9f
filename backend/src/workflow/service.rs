//! Periodontal Workflow Service
//!
//! Drives a [`PlanStore`]. Every read re-fetches the patient's items and
//! recomputes the snapshot and flow; every write returns the items it touched
//! and leaves the caller to re-read.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::domain::{
    DomainError, DomainResult, MissingTeeth, PhaseId, ToothNumber, ToothProbing, TreatmentPlanItem,
    DEEP_POCKET_THRESHOLD_MM,
};
use crate::repository::{PlanStore, Repository};

use super::aggregator::{aggregate, PhaseSnapshots};
use super::branch::plan_branch;
use super::resolver::{resolve, FlowView};
use super::selection::{existing_teeth, SelectionContext, SelectionItem};
use super::toggle::{plan_item_toggle, plan_phase_toggle};

#[derive(Debug)]
pub struct PeriodontalWorkflow<R> {
    repo: Arc<R>,
    deep_pocket_threshold_mm: u8,
}

impl<R> Clone for PeriodontalWorkflow<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            deep_pocket_threshold_mm: self.deep_pocket_threshold_mm,
        }
    }
}

impl<R: PlanStore> PeriodontalWorkflow<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            deep_pocket_threshold_mm: DEEP_POCKET_THRESHOLD_MM,
        }
    }

    pub fn with_threshold(mut self, threshold_mm: u8) -> Self {
        self.deep_pocket_threshold_mm = threshold_mm;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Items carrying a periodontal phase
    pub async fn phase_items(&self, patient_id: &str) -> DomainResult<Vec<TreatmentPlanItem>> {
        let mut items = self.repo.list_by_patient(patient_id).await?;
        items.retain(|i| i.periodontal_phase.is_some());
        Ok(items)
    }

    pub async fn snapshots(&self, patient_id: &str) -> DomainResult<PhaseSnapshots> {
        Ok(aggregate(&self.phase_items(patient_id).await?))
    }

    pub async fn flow(&self, patient_id: &str) -> DomainResult<FlowView> {
        Ok(resolve(&self.snapshots(patient_id).await?))
    }

    /// Activate a phase, appending its items
    pub async fn select_branch(
        &self,
        patient_id: &str,
        phase: PhaseId,
        selections: &[SelectionItem],
        missing: &MissingTeeth,
    ) -> DomainResult<Vec<TreatmentPlanItem>> {
        let plans = plan_branch(phase, selections, missing)?;
        let created = self.repo.append_plans(patient_id, &plans).await.map_err(|e| {
            log::error!("Failed to create {} items for {}: {}", phase, patient_id, e);
            e
        })?;
        log::info!("Selected {} for {} ({} item(s))", phase, patient_id, created.len());
        Ok(created)
    }

    /// "Add more" on a phase that already has items
    pub async fn add_teeth(
        &self,
        patient_id: &str,
        phase: PhaseId,
        selections: &[SelectionItem],
        missing: &MissingTeeth,
    ) -> DomainResult<Vec<TreatmentPlanItem>> {
        let snapshots = self.snapshots(patient_id).await?;
        if !snapshots.get(phase).has_items {
            return Err(DomainError::Validation(format!("{} has not been started", phase)));
        }
        self.select_branch(patient_id, phase, selections, missing).await
    }

    pub async fn toggle_item(&self, id: u32) -> DomainResult<TreatmentPlanItem> {
        let item = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("plan {}", id)))?;

        let change = plan_item_toggle(&item, now_ms());
        let mut updated = self.repo.apply_status_changes(&[change]).await.map_err(|e| {
            log::error!("Failed to toggle plan {}: {}", id, e);
            e
        })?;
        log::info!("Plan {} -> {}", id, change.status.as_str());
        updated.pop().ok_or_else(|| DomainError::NotFound(format!("plan {}", id)))
    }

    /// Flip every item of `phase` at once.
    ///
    /// The items are read and rewritten in one store transaction, so an item
    /// appended concurrently is either flipped with the rest or not seen.
    pub async fn toggle_phase(&self, patient_id: &str, phase: PhaseId) -> DomainResult<Vec<TreatmentPlanItem>> {
        let now = now_ms();
        let updated = self
            .repo
            .rewrite_statuses(patient_id, move |items| plan_phase_toggle(items, phase, now))
            .await
            .map_err(|e| {
                if !e.is_validation() {
                    log::error!("Failed to toggle {} for {}: {}", phase, patient_id, e);
                }
                e
            })?;
        if let Some(first) = updated.first() {
            log::info!(
                "Toggled {} for {} -> {} ({} item(s))",
                phase,
                patient_id,
                first.status.as_str(),
                updated.len()
            );
        }
        Ok(updated)
    }

    pub async fn update_memo(&self, id: u32, memo: Option<String>) -> DomainResult<TreatmentPlanItem> {
        self.repo.update_memo(id, memo).await
    }

    pub async fn existing_teeth(
        &self,
        patient_id: &str,
        exclude_phase: Option<PhaseId>,
    ) -> DomainResult<BTreeSet<ToothNumber>> {
        Ok(existing_teeth(&self.phase_items(patient_id).await?, exclude_phase))
    }

    pub async fn selection_context(
        &self,
        patient_id: &str,
        phase: PhaseId,
        chart: &[ToothProbing],
        missing: MissingTeeth,
    ) -> DomainResult<SelectionContext> {
        let items = self.phase_items(patient_id).await?;
        Ok(SelectionContext::build(phase, chart, missing, &items, self.deep_pocket_threshold_mm))
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
