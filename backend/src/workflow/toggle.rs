//! Item and phase toggles
//!
//! Pure planners producing the status writes; the store reads the phase and
//! applies its toggle in one transaction so a phase is never left half-flipped.

use crate::domain::{DomainError, DomainResult, PhaseId, PlanStatus, StatusChange, TreatmentPlanItem};

/// Flip one item between planned and completed
pub fn plan_item_toggle(item: &TreatmentPlanItem, now_ms: i64) -> StatusChange {
    StatusChange::new(item.id, item.status.toggled(), now_ms)
}

/// Flip a whole phase.
///
/// A fully complete phase goes back to planned; otherwise every item becomes
/// completed with the same `completed_at`.
pub fn plan_phase_toggle(
    items: &[TreatmentPlanItem],
    phase: PhaseId,
    now_ms: i64,
) -> DomainResult<Vec<StatusChange>> {
    let in_phase: Vec<&TreatmentPlanItem> = items
        .iter()
        .filter(|i| i.periodontal_phase == Some(phase))
        .collect();
    if in_phase.is_empty() {
        return Err(DomainError::Validation(format!("{} has no items to toggle", phase)));
    }

    let target = if in_phase.iter().all(|i| i.is_completed()) {
        PlanStatus::Planned
    } else {
        PlanStatus::Completed
    };
    Ok(in_phase
        .into_iter()
        .map(|i| StatusChange::new(i.id, target, now_ms))
        .collect())
}
