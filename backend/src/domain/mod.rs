//! Domain Layer
//!
//! Contains all domain entities and core abstractions.
//! This layer has NO storage dependencies.

mod entity;
mod phase;
mod tooth;
mod treatment_plan;

pub use entity::{Entity, DomainError, DomainResult};
pub use phase::{
    BranchGroup, BranchGroupId, FlowUnit, PhaseFamily, PhaseId, BRANCH_A, BRANCH_B,
    BRANCH_C, BRANCH_D, FLOW, RECALL_EXAMS,
};
pub use tooth::{
    deep_pocket_teeth, join_teeth, normalize_teeth, parse_tooth_list, DeepPocketTooth, MissingTeeth,
    Surface, ToothBlock, ToothNumber, ToothProbing, DEEP_POCKET_THRESHOLD_MM,
};
pub use treatment_plan::{NewTreatmentPlan, PlanStatus, StaffType, StatusChange, TreatmentPlanItem};
