//! Item builders shared by the workflow tests

use crate::domain::{
    BranchGroupId, FlowUnit, PhaseId, PlanStatus, TreatmentPlanItem, FLOW,
};

pub const PATIENT: &str = "patient-1";

/// A single whole-mouth item for `phase`
pub fn plan(id: u32, phase: PhaseId, completed: bool) -> TreatmentPlanItem {
    let family = phase.family();
    TreatmentPlanItem {
        id,
        patient_id: PATIENT.to_string(),
        staff_type: family.staff_type(),
        periodontal_phase: Some(phase),
        tooth_numbers: Vec::new(),
        content: phase.whole_mouth_content(),
        priority: family.priority(),
        sort_order: id as i64,
        status: if completed { PlanStatus::Completed } else { PlanStatus::Planned },
        completed_at: completed.then_some(1_700_000_000_000 + id as i64),
        memo: None,
        created_at: None,
        updated_at: None,
    }
}

/// Completed items along the SRP path up to and including `through`.
///
/// Branch groups on the way are resolved with their SRP option.
pub fn completed_through(through: PhaseId) -> Vec<TreatmentPlanItem> {
    let mut items = Vec::new();
    for unit in FLOW.iter() {
        let phase = match unit {
            FlowUnit::Phase(phase) => *phase,
            FlowUnit::Branch(group) => match group.id {
                BranchGroupId::A => PhaseId::Srp,
                BranchGroupId::B => PhaseId::Srp2,
                BranchGroupId::C => PhaseId::Srp3,
                BranchGroupId::D => break,
            },
        };
        items.push(plan(items.len() as u32 + 1, phase, true));
        if phase == through {
            break;
        }
    }
    items
}
