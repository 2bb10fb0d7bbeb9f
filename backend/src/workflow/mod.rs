//! Workflow Layer
//!
//! The periodontal phase engine:
//! - aggregator: per-phase counts from raw items
//! - resolver: what to do next, as a pure function of the counts
//! - branch / toggle: planners for the writes
//! - selection: tooth-selection helpers
//! - service: drives a repository

mod aggregator;
mod branch;
mod resolver;
mod selection;
mod service;
mod toggle;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregator::{aggregate, PhaseSnapshot, PhaseSnapshots, PhaseState};
pub use branch::plan_branch;
pub use resolver::{resolve, BranchOption, FlowItem, FlowView, OptionState};
pub use selection::{block_selection, existing_teeth, selection_from_teeth, SelectionContext, SelectionItem, SelectionKind};
pub use service::PeriodontalWorkflow;
pub use toggle::{plan_item_toggle, plan_phase_toggle};
