//! Commands for the periodontal phase workflow
//!
//! After any write the frontend re-fetches the flow instead of patching its
//! local copy.

use std::collections::BTreeSet;

use crate::domain::{MissingTeeth, PhaseId, ToothNumber, ToothProbing, TreatmentPlanItem};
use crate::workflow::{FlowView, PhaseSnapshot, SelectionContext, SelectionItem};
use crate::AppState;

fn parse_phase(phase: &str) -> Result<PhaseId, String> {
    phase.parse::<PhaseId>().map_err(|e| e.to_string())
}

/// Active and preview units plus the completed summary
pub async fn get_periodontal_flow(state: &AppState, patient_id: String) -> Result<FlowView, String> {
    state.workflow.flow(&patient_id).await.map_err(|e| e.to_string())
}

/// Snapshot of every phase in catalog order
pub async fn get_phase_snapshots(state: &AppState, patient_id: String) -> Result<Vec<PhaseSnapshot>, String> {
    let snapshots = state.workflow.snapshots(&patient_id).await.map_err(|e| e.to_string())?;
    Ok(snapshots.iter().cloned().collect())
}

/// Activate a phase (or branch option)
pub async fn select_branch(
    state: &AppState,
    patient_id: String,
    phase: String,
    selections: Option<Vec<SelectionItem>>,
    missing_teeth: Option<Vec<u8>>,
) -> Result<Vec<TreatmentPlanItem>, String> {
    let phase = parse_phase(&phase)?;
    let missing = MissingTeeth::from_raw(&missing_teeth.unwrap_or_default());
    state
        .workflow
        .select_branch(&patient_id, phase, &selections.unwrap_or_default(), &missing)
        .await
        .map_err(|e| e.to_string())
}

/// Append more tooth groups to a phase that is already underway
pub async fn add_teeth(
    state: &AppState,
    patient_id: String,
    phase: String,
    selections: Vec<SelectionItem>,
    missing_teeth: Option<Vec<u8>>,
) -> Result<Vec<TreatmentPlanItem>, String> {
    let phase = parse_phase(&phase)?;
    let missing = MissingTeeth::from_raw(&missing_teeth.unwrap_or_default());
    state
        .workflow
        .add_teeth(&patient_id, phase, &selections, &missing)
        .await
        .map_err(|e| e.to_string())
}

/// Toggle one plan item
pub async fn toggle_plan(state: &AppState, id: u32) -> Result<TreatmentPlanItem, String> {
    state.workflow.toggle_item(id).await.map_err(|e| e.to_string())
}

/// Toggle every item of a phase at once
pub async fn toggle_phase(state: &AppState, patient_id: String, phase: String) -> Result<Vec<TreatmentPlanItem>, String> {
    let phase = parse_phase(&phase)?;
    state.workflow.toggle_phase(&patient_id, phase).await.map_err(|e| e.to_string())
}

/// Teeth committed to SRP/surgery phases other than `exclude_phase`
pub async fn get_existing_teeth(
    state: &AppState,
    patient_id: String,
    exclude_phase: Option<String>,
) -> Result<BTreeSet<ToothNumber>, String> {
    let exclude = exclude_phase.as_deref().map(parse_phase).transpose()?;
    state.workflow.existing_teeth(&patient_id, exclude).await.map_err(|e| e.to_string())
}

/// Inputs for the tooth-selection modal
pub async fn get_selection_context(
    state: &AppState,
    patient_id: String,
    phase: String,
    chart: Vec<ToothProbing>,
    missing_teeth: Vec<u8>,
) -> Result<SelectionContext, String> {
    let phase = parse_phase(&phase)?;
    state
        .workflow
        .selection_context(&patient_id, phase, &chart, MissingTeeth::from_raw(&missing_teeth))
        .await
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATIENT: &str = "patient-7";

    #[tokio::test]
    async fn test_unknown_phase_is_rejected() {
        let state = AppState::in_memory().await.unwrap();
        let err = select_branch(&state, PATIENT.to_string(), "P_EXAM_9".to_string(), None, None)
            .await
            .unwrap_err();
        assert_eq!(err, "Invalid input: Unknown phase: P_EXAM_9");
    }

    #[tokio::test]
    async fn test_flow_through_commands() {
        let state = AppState::in_memory().await.unwrap();
        let flow = get_periodontal_flow(&state, PATIENT.to_string()).await.unwrap();
        assert_eq!(flow.items[0].phase(), Some(PhaseId::PExam1));

        select_branch(&state, PATIENT.to_string(), "P_EXAM_1".to_string(), None, None)
            .await
            .unwrap();
        toggle_phase(&state, PATIENT.to_string(), "P_EXAM_1".to_string()).await.unwrap();

        let snapshots = get_phase_snapshots(&state, PATIENT.to_string()).await.unwrap();
        assert_eq!(snapshots.len(), PhaseId::ALL.len());
        assert!(snapshots[0].is_complete);

        let flow = get_periodontal_flow(&state, PATIENT.to_string()).await.unwrap();
        assert_eq!(flow.items[0].phase(), Some(PhaseId::Initial));
        assert_eq!(flow.completed.len(), 1);
    }

    #[tokio::test]
    async fn test_srp_selection_and_existing_teeth() {
        let state = AppState::in_memory().await.unwrap();
        let selections = vec![SelectionItem::new(vec![11, 12], "11, 12番（2本）")];

        let err = select_branch(&state, PATIENT.to_string(), "SRP".to_string(), Some(selections.clone()), Some(vec![12]))
            .await
            .unwrap_err();
        assert!(err.starts_with("Invalid input"));

        let created = select_branch(&state, PATIENT.to_string(), "SRP".to_string(), Some(selections), None)
            .await
            .unwrap();
        toggle_plan(&state, created[0].id).await.unwrap();

        let teeth = get_existing_teeth(&state, PATIENT.to_string(), Some("SRP_2".to_string())).await.unwrap();
        assert_eq!(teeth.len(), 2);

        let more = add_teeth(
            &state,
            PATIENT.to_string(),
            "SRP".to_string(),
            vec![SelectionItem::new(vec![21], "21番")],
            None,
        )
        .await
        .unwrap();
        assert_eq!(more[0].content, "SRP（21番）");
    }

    #[tokio::test]
    async fn test_selection_context_command() {
        let state = AppState::in_memory().await.unwrap();
        let chart = vec![ToothProbing { tooth_number: 46, is_missing: false, depths: [Some(4); 6] }];
        let ctx = get_selection_context(&state, PATIENT.to_string(), "SURGERY".to_string(), chart, vec![])
            .await
            .unwrap();
        assert_eq!(ctx.selectable.len(), 1);
    }
}
