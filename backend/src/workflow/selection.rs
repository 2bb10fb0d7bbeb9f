//! Tooth selection helpers
//!
//! Inputs for the tooth-selection modal: which teeth have deep pockets, which
//! are missing, and which are already committed to another SRP/surgery phase.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::{
    deep_pocket_teeth, join_teeth, DeepPocketTooth, MissingTeeth, PhaseId, ToothBlock, ToothNumber,
    ToothProbing, TreatmentPlanItem,
};

/// How a selection was made in the modal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionKind {
    #[default]
    Tooth,
    Block,
}

/// One group of teeth returned by the selection modal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionItem {
    pub teeth: Vec<u8>,
    pub label: String,
    #[serde(default)]
    pub kind: SelectionKind,
}

impl SelectionItem {
    pub fn new(teeth: Vec<u8>, label: impl Into<String>) -> Self {
        Self {
            teeth,
            label: label.into(),
            kind: SelectionKind::Tooth,
        }
    }
}

/// Teeth already scoped to an SRP/surgery phase other than `exclude_phase`
pub fn existing_teeth(items: &[TreatmentPlanItem], exclude_phase: Option<PhaseId>) -> BTreeSet<ToothNumber> {
    items
        .iter()
        .filter(|item| match item.periodontal_phase {
            Some(phase) => phase.is_srp_or_surgery() && Some(phase) != exclude_phase,
            None => false,
        })
        .flat_map(|item| item.tooth_numbers.iter().copied())
        .collect()
}

/// Everything the selection modal needs for one phase
#[derive(Debug, Clone, Serialize)]
pub struct SelectionContext {
    pub phase: PhaseId,
    pub deep_pocket_teeth: Vec<DeepPocketTooth>,
    pub missing_teeth: MissingTeeth,
    pub existing_teeth: BTreeSet<ToothNumber>,
    /// Deep-pocket teeth that are neither missing nor committed elsewhere
    pub selectable: Vec<ToothNumber>,
}

impl SelectionContext {
    pub fn build(
        phase: PhaseId,
        chart: &[ToothProbing],
        missing_teeth: MissingTeeth,
        items: &[TreatmentPlanItem],
        threshold_mm: u8,
    ) -> Self {
        let deep = deep_pocket_teeth(chart, threshold_mm);
        let existing = existing_teeth(items, Some(phase));
        let selectable = deep
            .iter()
            .map(|t| t.tooth_number)
            .filter(|t| !missing_teeth.contains(*t) && !existing.contains(t))
            .collect();

        Self {
            phase,
            deep_pocket_teeth: deep,
            missing_teeth,
            existing_teeth: existing,
            selectable,
        }
    }

    /// Missing and already-committed teeth
    pub fn disabled(&self) -> BTreeSet<ToothNumber> {
        self.missing_teeth.0.union(&self.existing_teeth).copied().collect()
    }
}

/// Collapse individually picked teeth into one selection (`11番`, `11, 12番（2本）`)
pub fn selection_from_teeth(teeth: &[ToothNumber]) -> Option<SelectionItem> {
    let sorted: Vec<ToothNumber> = teeth.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    let label = match sorted.as_slice() {
        [] => return None,
        [single] => format!("{}番", single),
        many => format!("{}番（{}本）", join_teeth(many), many.len()),
    };
    Some(SelectionItem {
        teeth: sorted.iter().map(|t| t.value()).collect(),
        label,
        kind: SelectionKind::Tooth,
    })
}

/// Whole quadrant minus disabled teeth; `None` when nothing is left
pub fn block_selection(block: ToothBlock, disabled: &BTreeSet<ToothNumber>) -> Option<SelectionItem> {
    let teeth: Vec<ToothNumber> = block.teeth().into_iter().filter(|t| !disabled.contains(t)).collect();
    if teeth.is_empty() {
        return None;
    }
    Some(SelectionItem {
        label: format!("{}ブロック {}本", block.label(), teeth.len()),
        teeth: teeth.iter().map(|t| t.value()).collect(),
        kind: SelectionKind::Block,
    })
}
