//! Flow Resolver
//!
//! Reconstructs "what to do next" from phase snapshots. There is no stored
//! workflow position: a single forward walk over [`FLOW`] stops at the first
//! unresolved unit and emits it, followed by a preview of the unit after it.
//!
//! Rules per unit:
//! - phase in progress: active, then preview of the next unit, stop
//! - phase complete: advance
//! - phase untouched: preview, stop (unless later work shows it was bypassed)
//! - branch group: see [`resolve_branch`]
//!
//! The only way two units are active at once is SPT (maintenance) running
//! alongside an SRP/surgery sibling, or SPT alongside its re-examination.

use serde::Serialize;

use crate::domain::{BranchGroup, BranchGroupId, FlowUnit, PhaseId, FLOW, RECALL_EXAMS};

use super::aggregator::{PhaseSnapshot, PhaseSnapshots, PhaseState};

/// Display state of one option inside a branch choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionState {
    /// No items, can be chosen
    Open,
    /// Drives the branch (or SPT running alongside)
    Active,
    Completed,
    /// Has pending items while another sibling drives the branch
    Sidelined,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchOption {
    pub snapshot: PhaseSnapshot,
    pub state: OptionState,
}

/// One unit of the resolved flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowItem {
    Phase {
        snapshot: PhaseSnapshot,
        is_preview: bool,
    },
    BranchChoice {
        group: BranchGroupId,
        options: Vec<BranchOption>,
        is_preview: bool,
    },
}

impl FlowItem {
    pub fn is_preview(&self) -> bool {
        match self {
            FlowItem::Phase { is_preview, .. } | FlowItem::BranchChoice { is_preview, .. } => *is_preview,
        }
    }

    /// Phase id for a phase item
    pub fn phase(&self) -> Option<PhaseId> {
        match self {
            FlowItem::Phase { snapshot, .. } => Some(snapshot.phase),
            FlowItem::BranchChoice { .. } => None,
        }
    }

    pub fn group(&self) -> Option<BranchGroupId> {
        match self {
            FlowItem::BranchChoice { group, .. } => Some(*group),
            FlowItem::Phase { .. } => None,
        }
    }

    /// Options marked active, in declared order
    pub fn active_options(&self) -> Vec<PhaseId> {
        match self {
            FlowItem::BranchChoice { options, .. } => options
                .iter()
                .filter(|o| o.state == OptionState::Active)
                .map(|o| o.snapshot.phase)
                .collect(),
            FlowItem::Phase { .. } => Vec::new(),
        }
    }

    pub fn option_state(&self, phase: PhaseId) -> Option<OptionState> {
        match self {
            FlowItem::BranchChoice { options, .. } => {
                options.iter().find(|o| o.snapshot.phase == phase).map(|o| o.state)
            }
            FlowItem::Phase { .. } => None,
        }
    }
}

/// Ordered active/preview units plus the completed-phase summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowView {
    pub items: Vec<FlowItem>,
    /// Complete phases in catalog order
    pub completed: Vec<PhaseSnapshot>,
}

impl FlowView {
    pub fn active_items(&self) -> impl Iterator<Item = &FlowItem> {
        self.items.iter().filter(|i| !i.is_preview())
    }

    /// Nothing to show at all (no work, no history)
    pub fn is_empty(&self) -> bool {
        self.completed.is_empty() && self.active_items().next().is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Advance,
    Stop,
}

/// Resolve the flow view for a snapshot
pub fn resolve(snapshots: &PhaseSnapshots) -> FlowView {
    let mut items = Vec::new();
    let walked_off = FLOW.iter().enumerate().all(|(idx, unit)| {
        let step = match unit {
            FlowUnit::Phase(phase) => resolve_phase(snapshots, *phase, idx, &mut items),
            FlowUnit::Branch(group) => resolve_branch(snapshots, group, idx, &mut items),
        };
        step == Step::Advance
    });

    if walked_off {
        recall_fallback(snapshots, &mut items);
    }

    FlowView {
        items,
        completed: snapshots.completed(),
    }
}

fn resolve_phase(snapshots: &PhaseSnapshots, phase: PhaseId, idx: usize, out: &mut Vec<FlowItem>) -> Step {
    let snapshot = snapshots.get(phase);
    match snapshot.state() {
        PhaseState::Complete => Step::Advance,
        PhaseState::InProgress => {
            out.push(phase_item(snapshot, false));
            push_preview(snapshots, idx + 1, out);
            Step::Stop
        }
        PhaseState::Untouched if bypassed(snapshots, idx) => Step::Advance,
        PhaseState::Untouched => {
            out.push(phase_item(snapshot, true));
            Step::Stop
        }
    }
}

/// Resolve one branch group.
///
/// - SPT-carrying group whose following exam is complete: advance
/// - nothing selected: open choice, stop
/// - an SRP/surgery/P重防 option pending, or SPT running alongside SRP/surgery:
///   choice active; once the SRP/surgery side is done the following exam
///   decides (preview when untouched, active when pending, advance when done)
/// - only SPT pending: choice active plus the following exam (preview or
///   active); advance when that exam is already done
/// - every selected option complete: advance
fn resolve_branch(snapshots: &PhaseSnapshots, group: &BranchGroup, idx: usize, out: &mut Vec<FlowItem>) -> Step {
    // Groups sharing SPT with later groups are behind us once their exam is done
    if group.has_maintenance() {
        if let Some(next) = group.next {
            if snapshots.get(next).state() == PhaseState::Complete {
                return Step::Advance;
            }
        }
    }

    let options: Vec<&PhaseSnapshot> = group.options.iter().map(|&p| snapshots.get(p)).collect();

    if options.iter().all(|o| o.state() == PhaseState::Untouched) {
        if bypassed(snapshots, idx) {
            return Step::Advance;
        }
        out.push(branch_item(snapshots, group, false));
        return Step::Stop;
    }

    let maintenance = group
        .has_maintenance()
        .then(|| snapshots.get(PhaseId::Maintenance));
    let maintenance_pending = maintenance.map_or(false, |m| m.state() == PhaseState::InProgress);
    let treating: Vec<&PhaseSnapshot> = options
        .iter()
        .copied()
        .filter(|o| o.phase.is_srp_or_surgery() && o.state() != PhaseState::Untouched)
        .collect();
    let treating_pending = treating.iter().any(|o| o.state() == PhaseState::InProgress);
    let non_maintenance_pending = options
        .iter()
        .any(|o| !o.phase.is_maintenance() && o.state() == PhaseState::InProgress);
    let concurrent = maintenance.map_or(false, |m| m.has_items)
        && !treating.is_empty()
        && (maintenance_pending || treating_pending);

    if non_maintenance_pending || concurrent {
        let treatment_done = !non_maintenance_pending
            && !treating.is_empty()
            && treating.iter().all(|o| o.state() == PhaseState::Complete);

        let Some(next) = group.next else {
            out.push(branch_item(snapshots, group, false));
            return Step::Stop;
        };
        if !treatment_done {
            out.push(branch_item(snapshots, group, false));
            out.push(phase_item(snapshots.get(next), true));
            return Step::Stop;
        }

        let next_snapshot = snapshots.get(next);
        return match next_snapshot.state() {
            PhaseState::Untouched => {
                out.push(branch_item(snapshots, group, false));
                out.push(phase_item(next_snapshot, true));
                Step::Stop
            }
            PhaseState::InProgress => {
                out.push(branch_item(snapshots, group, false));
                out.push(phase_item(next_snapshot, false));
                push_preview(snapshots, idx + 2, out);
                Step::Stop
            }
            PhaseState::Complete => Step::Advance,
        };
    }

    if maintenance_pending {
        let Some(next) = group.next else {
            out.push(branch_item(snapshots, group, false));
            return Step::Stop;
        };
        let next_snapshot = snapshots.get(next);
        return match next_snapshot.state() {
            PhaseState::Untouched => {
                out.push(branch_item(snapshots, group, false));
                out.push(phase_item(next_snapshot, true));
                Step::Stop
            }
            PhaseState::InProgress => {
                out.push(branch_item(snapshots, group, false));
                out.push(phase_item(next_snapshot, false));
                Step::Stop
            }
            PhaseState::Complete => Step::Advance,
        };
    }

    Step::Advance
}

/// After the terminal group: a completed SPT returns to the first
/// re-examination that has not been started.
fn recall_fallback(snapshots: &PhaseSnapshots, out: &mut Vec<FlowItem>) {
    if snapshots.get(PhaseId::Maintenance).state() != PhaseState::Complete {
        return;
    }
    if let Some(exam) = RECALL_EXAMS
        .iter()
        .map(|&p| snapshots.get(p))
        .find(|s| s.state() == PhaseState::Untouched)
    {
        out.push(phase_item(exam, true));
    }
}

/// An untouched unit was skipped if it sits in the leading run of empty units
/// and a phase first offered later in the flow already has items.
fn bypassed(snapshots: &PhaseSnapshots, idx: usize) -> bool {
    let leading_empty = FLOW[..idx]
        .iter()
        .flat_map(|u| u.phases().iter())
        .all(|&p| !snapshots.get(p).has_items);
    if !leading_empty {
        return false;
    }

    let (earlier, later) = FLOW.split_at(idx + 1);
    let seen: Vec<PhaseId> = earlier.iter().flat_map(|u| u.phases().to_vec()).collect();
    later
        .iter()
        .flat_map(|u| u.phases().to_vec())
        .filter(|p| !seen.contains(p))
        .any(|p| snapshots.get(p).has_items)
}

fn push_preview(snapshots: &PhaseSnapshots, idx: usize, out: &mut Vec<FlowItem>) {
    match FLOW.get(idx) {
        Some(FlowUnit::Phase(phase)) => out.push(phase_item(snapshots.get(*phase), true)),
        Some(FlowUnit::Branch(group)) => out.push(branch_item(snapshots, group, true)),
        None => {}
    }
}

fn phase_item(snapshot: &PhaseSnapshot, is_preview: bool) -> FlowItem {
    FlowItem::Phase {
        snapshot: snapshot.clone(),
        is_preview,
    }
}

/// Build the choice with per-option states. At most one non-SPT option is
/// active: the first pending one in declared order.
fn branch_item(snapshots: &PhaseSnapshots, group: &BranchGroup, is_preview: bool) -> FlowItem {
    let mut driver_taken = false;
    let options = group
        .options
        .iter()
        .map(|&phase| {
            let snapshot = snapshots.get(phase).clone();
            let state = match snapshot.state() {
                PhaseState::Untouched => OptionState::Open,
                PhaseState::Complete => OptionState::Completed,
                PhaseState::InProgress if phase.is_maintenance() => OptionState::Active,
                PhaseState::InProgress if !driver_taken => {
                    driver_taken = true;
                    OptionState::Active
                }
                PhaseState::InProgress => OptionState::Sidelined,
            };
            BranchOption { snapshot, state }
        })
        .collect();

    FlowItem::BranchChoice {
        group: group.id,
        options,
        is_preview,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BRANCH_B, BRANCH_C};
    use crate::workflow::aggregator::aggregate;
    use crate::workflow::testing::{completed_through, plan};

    fn view(items: &[crate::domain::TreatmentPlanItem]) -> FlowView {
        resolve(&aggregate(items))
    }

    fn assert_phase(item: &FlowItem, phase: PhaseId, preview: bool) {
        assert_eq!(item.phase(), Some(phase), "unexpected item {:?}", item);
        assert_eq!(item.is_preview(), preview, "preview flag of {:?}", phase);
    }

    fn assert_branch(item: &FlowItem, group: BranchGroupId, preview: bool) {
        assert_eq!(item.group(), Some(group), "unexpected item {:?}", item);
        assert_eq!(item.is_preview(), preview);
    }

    #[test]
    fn test_no_items_previews_first_exam() {
        let view = view(&[]);
        assert_eq!(view.items.len(), 1);
        assert_phase(&view.items[0], PhaseId::PExam1, true);
        assert!(view.completed.is_empty());
        assert!(view.is_empty());
    }

    #[test]
    fn test_initial_in_progress() {
        let items = vec![plan(1, PhaseId::PExam1, true), plan(2, PhaseId::Initial, false)];
        let view = view(&items);

        assert_eq!(view.items.len(), 2);
        assert_phase(&view.items[0], PhaseId::Initial, false);
        assert_phase(&view.items[1], PhaseId::PExam2, true);
        assert_eq!(view.completed.len(), 1);
        assert_eq!(view.completed[0].phase, PhaseId::PExam1);
    }

    #[test]
    fn test_completed_phase_without_successor_previews_it() {
        let items = vec![plan(1, PhaseId::PExam1, true)];
        let view = view(&items);
        assert_eq!(view.items.len(), 1);
        assert_phase(&view.items[0], PhaseId::Initial, true);
    }

    #[test]
    fn test_exam_in_progress_previews_branch() {
        let mut items = completed_through(PhaseId::Initial);
        items.push(plan(10, PhaseId::PExam2, false));
        let view = view(&items);

        assert_eq!(view.items.len(), 2);
        assert_phase(&view.items[0], PhaseId::PExam2, false);
        assert_branch(&view.items[1], BranchGroupId::A, true);
    }

    #[test]
    fn test_unselected_branch_is_open_choice() {
        let items = completed_through(PhaseId::PExam2);
        let view = view(&items);

        assert_eq!(view.items.len(), 1);
        assert_branch(&view.items[0], BranchGroupId::A, false);
        assert_eq!(view.items[0].option_state(PhaseId::Srp), Some(OptionState::Open));
        assert_eq!(view.items[0].option_state(PhaseId::PHeavyPrevention), Some(OptionState::Open));
    }

    #[test]
    fn test_srp_selected_shows_branch_and_exam_preview() {
        let mut items = completed_through(PhaseId::PExam2);
        items.push(plan(10, PhaseId::Srp, false));
        let view = view(&items);

        assert_eq!(view.items.len(), 2);
        assert_branch(&view.items[0], BranchGroupId::A, false);
        assert_eq!(view.items[0].option_state(PhaseId::Srp), Some(OptionState::Active));
        assert_eq!(view.items[0].option_state(PhaseId::PHeavyPrevention), Some(OptionState::Open));
        assert_phase(&view.items[1], PhaseId::PExam3, true);
    }

    #[test]
    fn test_branch_without_earlier_phases_is_reached() {
        // Patient entered the protocol at the second exam
        let items = vec![plan(1, PhaseId::PExam2, true), plan(2, PhaseId::Srp, false)];
        let view = view(&items);

        assert_eq!(view.items.len(), 2);
        assert_branch(&view.items[0], BranchGroupId::A, false);
        assert_phase(&view.items[1], PhaseId::PExam3, true);
    }

    #[test]
    fn test_skipped_phase_after_started_work_halts_walk() {
        let items = vec![plan(1, PhaseId::PExam1, true), plan(2, PhaseId::PExam2, false)];
        let view = view(&items);

        assert_eq!(view.items.len(), 1);
        assert_phase(&view.items[0], PhaseId::Initial, true);
    }

    #[test]
    fn test_untouched_exam_before_later_work_is_previewed() {
        let mut items = completed_through(PhaseId::PExam2);
        items.push(plan(10, PhaseId::Srp, true));
        items.push(plan(11, PhaseId::PExam4, false));
        let view = view(&items);

        assert_eq!(view.items.len(), 1);
        assert_phase(&view.items[0], PhaseId::PExam3, true);
    }

    #[test]
    fn test_completed_srp_advances_to_next_exam() {
        let mut items = completed_through(PhaseId::PExam2);
        items.push(plan(10, PhaseId::Srp, true));
        let view = view(&items);

        assert_eq!(view.items.len(), 1);
        assert_phase(&view.items[0], PhaseId::PExam3, true);
        assert!(view.completed.iter().any(|s| s.phase == PhaseId::Srp));
    }

    #[test]
    fn test_options_keep_declared_order() {
        let items = completed_through(PhaseId::PExam3);
        let view = view(&items);
        let FlowItem::BranchChoice { options, .. } = &view.items[0] else {
            panic!("expected branch choice");
        };
        let order: Vec<PhaseId> = options.iter().map(|o| o.snapshot.phase).collect();
        assert_eq!(order, BRANCH_B.options.to_vec());
    }

    #[test]
    fn test_maintenance_concurrent_with_srp() {
        let mut items = completed_through(PhaseId::PExam3);
        items.push(plan(20, PhaseId::Maintenance, false));
        items.push(plan(21, PhaseId::Srp2, false));
        let view = view(&items);

        assert_eq!(view.items.len(), 2);
        assert_branch(&view.items[0], BranchGroupId::B, false);
        assert_eq!(view.items[0].active_options(), vec![PhaseId::Srp2, PhaseId::Maintenance]);
        assert_phase(&view.items[1], PhaseId::PExam4, true);
        assert!(!view.completed.iter().any(|s| s.phase == PhaseId::Maintenance));
    }

    #[test]
    fn test_concurrent_srp_done_stops_on_next_exam() {
        let mut items = completed_through(PhaseId::PExam3);
        items.push(plan(20, PhaseId::Maintenance, false));
        items.push(plan(21, PhaseId::Srp2, true));

        let view_untouched = view(&items);
        assert_eq!(view_untouched.items.len(), 2);
        assert_branch(&view_untouched.items[0], BranchGroupId::B, false);
        assert_phase(&view_untouched.items[1], PhaseId::PExam4, true);

        items.push(plan(22, PhaseId::PExam4, false));
        let view_pending = view(&items);
        assert_eq!(view_pending.items.len(), 3);
        assert_branch(&view_pending.items[0], BranchGroupId::B, false);
        assert_phase(&view_pending.items[1], PhaseId::PExam4, false);
        assert_branch(&view_pending.items[2], BranchGroupId::C, true);
    }

    #[test]
    fn test_maintenance_alone_previews_next_exam() {
        let mut items = completed_through(PhaseId::PExam3);
        items.push(plan(20, PhaseId::Maintenance, false));
        let view = view(&items);

        assert_eq!(view.items.len(), 2);
        assert_branch(&view.items[0], BranchGroupId::B, false);
        assert_eq!(view.items[0].active_options(), vec![PhaseId::Maintenance]);
        assert_phase(&view.items[1], PhaseId::PExam4, true);
    }

    #[test]
    fn test_maintenance_alone_runs_alongside_pending_exam() {
        let mut items = completed_through(PhaseId::PExam3);
        items.push(plan(20, PhaseId::Maintenance, false));
        items.push(plan(21, PhaseId::PExam4, false));
        let view = view(&items);

        assert_eq!(view.items.len(), 2);
        assert_branch(&view.items[0], BranchGroupId::B, false);
        assert_phase(&view.items[1], PhaseId::PExam4, false);
    }

    #[test]
    fn test_maintenance_carried_to_later_group_once_exam_done() {
        let mut items = completed_through(PhaseId::PExam3);
        items.push(plan(20, PhaseId::Maintenance, false));
        items.push(plan(21, PhaseId::PExam4, true));
        let view = view(&items);

        assert_eq!(view.items.len(), 2);
        assert_branch(&view.items[0], BranchGroupId::C, false);
        assert_phase(&view.items[1], PhaseId::PExam5, true);
    }

    #[test]
    fn test_uncompleting_earlier_phase_hides_downstream() {
        let mut items = completed_through(PhaseId::PExam3);
        items.push(plan(20, PhaseId::Srp2, false));
        let before = view(&items);
        assert_branch(&before.items[0], BranchGroupId::B, false);

        // SRP (branch A) toggled back to planned
        let srp = items.iter_mut().find(|i| i.periodontal_phase == Some(PhaseId::Srp)).unwrap();
        srp.status = crate::domain::PlanStatus::Planned;
        srp.completed_at = None;

        let after = view(&items);
        assert_eq!(after.items.len(), 2);
        assert_branch(&after.items[0], BranchGroupId::A, false);
        assert_phase(&after.items[1], PhaseId::PExam3, true);
        assert_eq!(items.len(), 6);
    }

    #[test]
    fn test_terminal_branch() {
        // Nothing chosen after the third exam, so the terminal options are fresh
        let mut items = completed_through(PhaseId::PExam5);
        items.retain(|i| i.periodontal_phase != Some(PhaseId::Srp2));
        let open = view(&items);
        assert_eq!(open.items.len(), 1);
        assert_branch(&open.items[0], BranchGroupId::D, false);

        items.push(plan(40, PhaseId::Surgery, false));
        let pending = view(&items);
        assert_eq!(pending.items.len(), 1);
        assert_branch(&pending.items[0], BranchGroupId::D, false);
        assert_eq!(pending.items[0].active_options(), vec![PhaseId::Surgery]);
    }

    #[test]
    fn test_recall_fallback_after_terminal_maintenance() {
        let mut items = completed_through(PhaseId::PExam5);
        items.retain(|i| i.periodontal_phase != Some(PhaseId::Srp2));
        items.push(plan(40, PhaseId::Maintenance, true));
        let view = view(&items);

        // Every recall exam has been started, so nothing is previewed
        assert!(view.items.is_empty());
        assert!(view.completed.iter().any(|s| s.phase == PhaseId::Maintenance));
    }

    #[test]
    fn test_recall_fallback_previews_unstarted_exam() {
        let snapshots = PhaseSnapshots::from_snapshots(vec![PhaseSnapshot::from_counts(
            PhaseId::Maintenance,
            1,
            1,
            vec![1],
        )]);
        let mut out = Vec::new();
        recall_fallback(&snapshots, &mut out);
        assert_eq!(out.len(), 1);
        assert_phase(&out[0], PhaseId::PExam3, true);
    }

    #[test]
    fn test_at_most_one_non_maintenance_option_active() {
        // Every combination of untouched/pending/complete over branch C
        let states = [None, Some(false), Some(true)];
        let mut base = completed_through(PhaseId::PExam4);
        base.retain(|i| !BRANCH_C.contains(i.periodontal_phase.unwrap()));

        for a in states {
            for b in states {
                for c in states {
                    for d in states {
                        let mut items = base.clone();
                        for (phase, state) in BRANCH_C.options.iter().zip([a, b, c, d]) {
                            if let Some(done) = state {
                                items.push(plan(100 + phase.stage_index() as u32, *phase, done));
                            }
                        }
                        for item in view(&items).items {
                            let active = item
                                .active_options()
                                .into_iter()
                                .filter(|p| !p.is_maintenance())
                                .count();
                            assert!(active <= 1, "{:?}", item);
                        }
                    }
                }
            }
        }
    }
}
