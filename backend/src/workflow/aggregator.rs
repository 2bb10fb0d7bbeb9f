//! Phase Aggregator
//!
//! Per-phase completion counts derived from a patient's plan items in one pass.
//! Nothing here is cached: the snapshot is recomputed from the raw items on
//! every read, so there is no stored "current phase" to drift out of sync.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{PhaseId, TreatmentPlanItem};

/// Completion state of one phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSnapshot {
    pub phase: PhaseId,
    pub item_count: usize,
    pub completed_count: usize,
    pub pending_count: usize,
    pub is_complete: bool,
    pub is_in_progress: bool,
    pub has_items: bool,
    /// Ids of the phase's items, in input order
    #[serde(default)]
    pub item_ids: Vec<u32>,
}

/// Coarse classification used by the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseState {
    Untouched,
    InProgress,
    Complete,
}

impl PhaseSnapshot {
    pub fn untouched(phase: PhaseId) -> Self {
        Self::from_counts(phase, 0, 0, Vec::new())
    }

    pub fn from_counts(phase: PhaseId, item_count: usize, completed_count: usize, item_ids: Vec<u32>) -> Self {
        let completed_count = completed_count.min(item_count);
        let pending_count = item_count - completed_count;
        Self {
            phase,
            item_count,
            completed_count,
            pending_count,
            is_complete: item_count > 0 && pending_count == 0,
            is_in_progress: pending_count > 0,
            has_items: item_count > 0,
            item_ids,
        }
    }

    pub fn state(&self) -> PhaseState {
        if self.item_count == 0 {
            PhaseState::Untouched
        } else if self.pending_count == 0 {
            PhaseState::Complete
        } else {
            PhaseState::InProgress
        }
    }

    /// Recompute the flags from the counts.
    ///
    /// A snapshot claiming completion with zero items becomes untouched.
    pub fn repaired(self) -> Self {
        let consistent = self.has_items == (self.item_count > 0)
            && self.is_complete == (self.item_count > 0 && self.pending_count == 0)
            && self.completed_count + self.pending_count == self.item_count;
        if consistent {
            return self;
        }
        log::warn!(
            "Inconsistent snapshot for {} (items={}, completed={}, complete={}); recomputing",
            self.phase,
            self.item_count,
            self.completed_count,
            self.is_complete
        );
        Self::from_counts(self.phase, self.item_count, self.completed_count, self.item_ids)
    }
}

/// Snapshot of every catalog phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseSnapshots(BTreeMap<PhaseId, PhaseSnapshot>);

impl PhaseSnapshots {
    /// Build from externally supplied snapshots; missing phases are untouched
    pub fn from_snapshots(snapshots: impl IntoIterator<Item = PhaseSnapshot>) -> Self {
        let mut map: BTreeMap<PhaseId, PhaseSnapshot> =
            PhaseId::ALL.iter().map(|&p| (p, PhaseSnapshot::untouched(p))).collect();
        for snapshot in snapshots {
            map.insert(snapshot.phase, snapshot.repaired());
        }
        Self(map)
    }

    pub fn get(&self, phase: PhaseId) -> &PhaseSnapshot {
        // Every catalog phase is inserted on construction
        &self.0[&phase]
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhaseSnapshot> {
        self.0.values()
    }

    /// Complete phases in catalog order
    pub fn completed(&self) -> Vec<PhaseSnapshot> {
        self.iter().filter(|s| s.state() == PhaseState::Complete).cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().all(|s| !s.has_items)
    }
}

/// Aggregate items into per-phase snapshots. Items without a phase are ignored.
pub fn aggregate(items: &[TreatmentPlanItem]) -> PhaseSnapshots {
    let mut totals = [0usize; PhaseId::ALL.len()];
    let mut completed = [0usize; PhaseId::ALL.len()];
    let mut ids: Vec<Vec<u32>> = vec![Vec::new(); PhaseId::ALL.len()];

    for item in items {
        let Some(phase) = item.periodontal_phase else { continue };
        let idx = phase.stage_index();
        totals[idx] += 1;
        if item.is_completed() {
            completed[idx] += 1;
        }
        ids[idx].push(item.id);
    }

    PhaseSnapshots(
        PhaseId::ALL
            .iter()
            .zip(ids)
            .map(|(&phase, item_ids)| {
                let idx = phase.stage_index();
                (phase, PhaseSnapshot::from_counts(phase, totals[idx], completed[idx], item_ids))
            })
            .collect(),
    )
}
