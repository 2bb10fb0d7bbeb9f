//! Branch Selector
//!
//! Turns a phase activation (plus the modal's tooth selections) into the plan
//! items to append. Nothing is written here; the store assigns ids and sort
//! orders, and existing items are never replaced or removed.

use crate::domain::{
    join_teeth, normalize_teeth, DomainError, DomainResult, MissingTeeth, NewTreatmentPlan, PhaseId,
    ToothNumber,
};

use super::selection::{SelectionItem, SelectionKind};

/// Items to create when `phase` is chosen.
///
/// SRP and surgery phases need at least one non-empty selection and produce
/// one item per selection. Every other phase produces a single whole-mouth
/// item; selections passed for those are ignored.
pub fn plan_branch(
    phase: PhaseId,
    selections: &[SelectionItem],
    missing: &MissingTeeth,
) -> DomainResult<Vec<NewTreatmentPlan>> {
    let family = phase.family();

    if !family.requires_teeth() {
        if !selections.is_empty() {
            log::info!("Ignoring {} tooth selection(s) for whole-mouth phase {}", selections.len(), phase);
        }
        return Ok(vec![NewTreatmentPlan {
            staff_type: family.staff_type(),
            periodontal_phase: Some(phase),
            tooth_numbers: Vec::new(),
            content: phase.whole_mouth_content(),
            priority: family.priority(),
            memo: None,
        }]);
    }

    if selections.is_empty() {
        return Err(DomainError::Validation(format!("{} requires a tooth selection", phase)));
    }

    selections
        .iter()
        .map(|selection| {
            let teeth = validate_selection(phase, selection, missing)?;
            Ok(NewTreatmentPlan {
                staff_type: family.staff_type(),
                periodontal_phase: Some(phase),
                content: scoped_content(phase, selection, &teeth),
                tooth_numbers: teeth,
                priority: family.priority(),
                memo: None,
            })
        })
        .collect()
}

fn validate_selection(
    phase: PhaseId,
    selection: &SelectionItem,
    missing: &MissingTeeth,
) -> DomainResult<Vec<ToothNumber>> {
    let teeth = normalize_teeth(&selection.teeth)?;
    if teeth.is_empty() {
        return Err(DomainError::Validation(format!(
            "Empty tooth selection for {} ({})",
            phase, selection.label
        )));
    }

    let overlap: Vec<ToothNumber> = teeth.iter().copied().filter(|t| missing.contains(*t)).collect();
    if !overlap.is_empty() {
        return Err(DomainError::Validation(format!(
            "Selection for {} includes missing teeth: {}",
            phase,
            join_teeth(&overlap)
        )));
    }
    Ok(teeth)
}

/// `SRP（11, 12番）`, or `SRP（右上ブロック）` for a quadrant pick
fn scoped_content(phase: PhaseId, selection: &SelectionItem, teeth: &[ToothNumber]) -> String {
    let prefix = phase.item_prefix();
    match selection.kind {
        SelectionKind::Block => {
            let head = selection.label.split_whitespace().next().unwrap_or_default();
            format!("{}（{}）", prefix, head)
        }
        SelectionKind::Tooth => format!("{}（{}番）", prefix, join_teeth(teeth)),
    }
}
