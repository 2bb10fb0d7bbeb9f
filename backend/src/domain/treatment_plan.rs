//! Treatment Plan Entity
//!
//! A persisted to-do of planned or completed clinical work for one patient,
//! optionally tagged with a periodontal phase and scoped to specific teeth.

use serde::{Deserialize, Serialize};

use super::entity::Entity;
use super::phase::PhaseId;
use super::tooth::ToothNumber;

/// Who carries out the work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StaffType {
    Doctor,
    #[default]
    Hygienist,
}

impl StaffType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffType::Doctor => "doctor",
            StaffType::Hygienist => "hygienist",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "doctor" => StaffType::Doctor,
            _ => StaffType::Hygienist,
        }
    }
}

/// Completion status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    #[default]
    Planned,
    Completed,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Planned => "planned",
            PlanStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "completed" => PlanStatus::Completed,
            _ => PlanStatus::Planned,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            PlanStatus::Planned => PlanStatus::Completed,
            PlanStatus::Completed => PlanStatus::Planned,
        }
    }
}

/// A treatment-plan line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentPlanItem {
    /// Unique identifier
    pub id: u32,
    pub patient_id: String,
    pub staff_type: StaffType,
    /// Absent for todos outside the periodontal workflow
    pub periodontal_phase: Option<PhaseId>,
    /// Ascending FDI numbers; empty for whole-mouth items
    pub tooth_numbers: Vec<ToothNumber>,
    /// Display label
    pub content: String,
    pub priority: i32,
    /// Per-patient, strictly increasing, never reused
    pub sort_order: i64,
    pub status: PlanStatus,
    /// Epoch milliseconds, set while completed
    pub completed_at: Option<i64>,
    pub memo: Option<String>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

impl TreatmentPlanItem {
    pub fn is_completed(&self) -> bool {
        self.status == PlanStatus::Completed
    }
}

impl Entity for TreatmentPlanItem {
    type Id = u32;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// A status write for one item, produced by the toggle planners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub id: u32,
    pub status: PlanStatus,
    pub completed_at: Option<i64>,
}

impl StatusChange {
    pub fn new(id: u32, status: PlanStatus, now_ms: i64) -> Self {
        let completed_at = match status {
            PlanStatus::Completed => Some(now_ms),
            PlanStatus::Planned => None,
        };
        Self { id, status, completed_at }
    }
}

/// Fields of an item to be created; the store assigns id and sort order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTreatmentPlan {
    pub staff_type: StaffType,
    pub periodontal_phase: Option<PhaseId>,
    #[serde(default)]
    pub tooth_numbers: Vec<ToothNumber>,
    pub content: String,
    pub priority: i32,
    #[serde(default)]
    pub memo: Option<String>,
}

impl NewTreatmentPlan {
    pub fn new(content: impl Into<String>, staff_type: StaffType) -> Self {
        Self {
            staff_type,
            periodontal_phase: None,
            tooth_numbers: Vec::new(),
            content: content.into(),
            priority: 2,
            memo: None,
        }
    }
}
