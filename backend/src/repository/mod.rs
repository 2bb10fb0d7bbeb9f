//! Repository Layer
//!
//! Data access abstractions and implementations.

mod traits;
mod db;
mod treatment_plan;


pub use traits::{PlanStore, Repository};
pub use db::{init_db, DbState};
pub use treatment_plan::{PlanPositioningOperations, TreatmentPlanRepository};
