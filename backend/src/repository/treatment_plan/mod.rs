//! Treatment Plan Repository Module
//!
//! Split into specialized sub-modules:
//! - plan_repo: Core CRUD operations
//! - plan_phase: Workflow writes (append, bulk status changes, memo)
//! - plan_positioning: Per-patient sort order counter

mod plan_repo;
mod plan_phase;
mod plan_positioning;

pub use plan_repo::TreatmentPlanRepository;
pub use plan_positioning::PlanPositioningOperations;
