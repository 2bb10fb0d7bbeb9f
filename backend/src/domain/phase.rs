//! Phase Catalog
//!
//! Static description of every periodontal treatment phase and the fixed
//! protocol graph:
//!
//! ```text
//! P_EXAM_1 -> INITIAL -> P_EXAM_2
//!   A (after P_EXAM_2): {SRP, P_HEAVY_PREVENTION}                       -> P_EXAM_3
//!   B (after P_EXAM_3): {SURGERY, SRP_2, P_HEAVY_PREVENTION, MAINTENANCE} -> P_EXAM_4
//!   C (after P_EXAM_4): {SURGERY_2, SRP_3, P_HEAVY_PREVENTION, MAINTENANCE} -> P_EXAM_5
//!   D (after P_EXAM_5): {SURGERY, SRP_2, P_HEAVY_PREVENTION, MAINTENANCE}   (terminal)
//! ```

use serde::{Deserialize, Serialize};

use super::treatment_plan::StaffType;

/// Identifier of a treatment phase. Declaration order is the catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseId {
    #[serde(rename = "P_EXAM_1")]
    PExam1,
    Initial,
    #[serde(rename = "P_EXAM_2")]
    PExam2,
    Srp,
    #[serde(rename = "P_EXAM_3")]
    PExam3,
    Surgery,
    #[serde(rename = "SRP_2")]
    Srp2,
    #[serde(rename = "P_EXAM_4")]
    PExam4,
    #[serde(rename = "SURGERY_2")]
    Surgery2,
    #[serde(rename = "SRP_3")]
    Srp3,
    #[serde(rename = "P_EXAM_5")]
    PExam5,
    PHeavyPrevention,
    Maintenance,
}

/// Behavioural grouping of phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseFamily {
    Exam,
    Initial,
    Srp,
    Surgery,
    HeavyPrevention,
    Maintenance,
}

impl PhaseFamily {
    /// Staff type of items created for this family
    pub fn staff_type(&self) -> StaffType {
        match self {
            PhaseFamily::Surgery => StaffType::Doctor,
            _ => StaffType::Hygienist,
        }
    }

    /// Fixed priority of created items (1 = high, 3 = low)
    pub fn priority(&self) -> i32 {
        match self {
            PhaseFamily::Surgery => 1,
            PhaseFamily::Srp | PhaseFamily::Exam | PhaseFamily::Initial => 2,
            PhaseFamily::HeavyPrevention | PhaseFamily::Maintenance => 3,
        }
    }

    /// SRP and surgery items are scoped to selected teeth
    pub fn requires_teeth(&self) -> bool {
        matches!(self, PhaseFamily::Srp | PhaseFamily::Surgery)
    }
}

impl PhaseId {
    /// Every phase in catalog order
    pub const ALL: [PhaseId; 13] = [
        PhaseId::PExam1,
        PhaseId::Initial,
        PhaseId::PExam2,
        PhaseId::Srp,
        PhaseId::PExam3,
        PhaseId::Surgery,
        PhaseId::Srp2,
        PhaseId::PExam4,
        PhaseId::Surgery2,
        PhaseId::Srp3,
        PhaseId::PExam5,
        PhaseId::PHeavyPrevention,
        PhaseId::Maintenance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseId::PExam1 => "P_EXAM_1",
            PhaseId::Initial => "INITIAL",
            PhaseId::PExam2 => "P_EXAM_2",
            PhaseId::Srp => "SRP",
            PhaseId::PExam3 => "P_EXAM_3",
            PhaseId::Surgery => "SURGERY",
            PhaseId::Srp2 => "SRP_2",
            PhaseId::PExam4 => "P_EXAM_4",
            PhaseId::Surgery2 => "SURGERY_2",
            PhaseId::Srp3 => "SRP_3",
            PhaseId::PExam5 => "P_EXAM_5",
            PhaseId::PHeavyPrevention => "P_HEAVY_PREVENTION",
            PhaseId::Maintenance => "MAINTENANCE",
        }
    }

    /// Parse a stored identifier; unknown strings yield `None`
    pub fn parse(s: &str) -> Option<Self> {
        PhaseId::ALL.iter().copied().find(|p| p.as_str() == s)
    }

    /// Position in the catalog
    pub fn stage_index(&self) -> usize {
        *self as usize
    }

    pub fn short_label(&self) -> &'static str {
        match self {
            PhaseId::PExam1 => "P検①",
            PhaseId::Initial => "初期治療",
            PhaseId::PExam2 => "P検②",
            PhaseId::Srp => "SRP",
            PhaseId::PExam3 => "P検③",
            PhaseId::Surgery => "Fop",
            PhaseId::Srp2 => "再SRP",
            PhaseId::PExam4 => "P検④",
            PhaseId::Surgery2 => "再Fop",
            PhaseId::Srp3 => "再々SRP",
            PhaseId::PExam5 => "P検⑤",
            PhaseId::PHeavyPrevention => "P重防",
            PhaseId::Maintenance => "SPT",
        }
    }

    pub fn full_label(&self) -> &'static str {
        match self {
            PhaseId::PExam1 => "歯周基本検査①",
            PhaseId::Initial => "Sc/Poli/TBI",
            PhaseId::PExam2 => "歯周基本検査②",
            PhaseId::Srp => "スケーリング・ルートプレーニング",
            PhaseId::PExam3 => "歯周基本検査③",
            PhaseId::Surgery => "歯周外科",
            PhaseId::Srp2 => "再スケーリング・ルートプレーニング",
            PhaseId::PExam4 => "歯周基本検査④",
            PhaseId::Surgery2 => "再歯周外科",
            PhaseId::Srp3 => "再々スケーリング・ルートプレーニング",
            PhaseId::PExam5 => "歯周基本検査⑤",
            PhaseId::PHeavyPrevention => "歯周病重症化予防治療",
            PhaseId::Maintenance => "サポーティブペリオドンタルセラピー",
        }
    }

    pub fn family(&self) -> PhaseFamily {
        match self {
            PhaseId::PExam1 | PhaseId::PExam2 | PhaseId::PExam3 | PhaseId::PExam4 | PhaseId::PExam5 => {
                PhaseFamily::Exam
            }
            PhaseId::Initial => PhaseFamily::Initial,
            PhaseId::Srp | PhaseId::Srp2 | PhaseId::Srp3 => PhaseFamily::Srp,
            PhaseId::Surgery | PhaseId::Surgery2 => PhaseFamily::Surgery,
            PhaseId::PHeavyPrevention => PhaseFamily::HeavyPrevention,
            PhaseId::Maintenance => PhaseFamily::Maintenance,
        }
    }

    /// SRP or surgery phase (tooth-scoped re-treatment)
    pub fn is_srp_or_surgery(&self) -> bool {
        self.family().requires_teeth()
    }

    pub fn is_maintenance(&self) -> bool {
        *self == PhaseId::Maintenance
    }

    /// Prefix used in the content text of tooth-scoped items
    pub fn item_prefix(&self) -> &'static str {
        match self {
            PhaseId::Srp => "SRP",
            PhaseId::Srp2 => "再SRP",
            PhaseId::Srp3 => "再々SRP",
            PhaseId::Surgery => "歯周外科",
            PhaseId::Surgery2 => "再歯周外科",
            other => other.short_label(),
        }
    }

    /// Content text of the single item created for a whole-mouth phase
    pub fn whole_mouth_content(&self) -> String {
        match self.family() {
            PhaseFamily::Exam => format!("{}（歯周基本検査）", self.short_label()),
            PhaseFamily::Initial => format!("{}（{}）", self.short_label(), self.full_label()),
            PhaseFamily::HeavyPrevention => "P重防（歯周病重症化予防治療）".to_string(),
            PhaseFamily::Maintenance => "SPT（歯周病安定期治療）".to_string(),
            PhaseFamily::Srp | PhaseFamily::Surgery => self.full_label().to_string(),
        }
    }
}

impl std::fmt::Display for PhaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PhaseId {
    type Err = super::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PhaseId::parse(s).ok_or_else(|| super::DomainError::Validation(format!("Unknown phase: {}", s)))
    }
}

/// Branch point identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BranchGroupId {
    A,
    B,
    C,
    D,
}

/// A set of mutually alternative phases offered after an examination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchGroup {
    pub id: BranchGroupId,
    /// Examination that must be complete before the choice is offered
    pub after: PhaseId,
    /// Options in display order
    pub options: &'static [PhaseId],
    /// Re-examination following the branch; `None` for the terminal group
    pub next: Option<PhaseId>,
}

impl BranchGroup {
    pub fn contains(&self, phase: PhaseId) -> bool {
        self.options.contains(&phase)
    }

    pub fn has_maintenance(&self) -> bool {
        self.contains(PhaseId::Maintenance)
    }
}

pub const BRANCH_A: BranchGroup = BranchGroup {
    id: BranchGroupId::A,
    after: PhaseId::PExam2,
    options: &[PhaseId::Srp, PhaseId::PHeavyPrevention],
    next: Some(PhaseId::PExam3),
};

pub const BRANCH_B: BranchGroup = BranchGroup {
    id: BranchGroupId::B,
    after: PhaseId::PExam3,
    options: &[PhaseId::Surgery, PhaseId::Srp2, PhaseId::PHeavyPrevention, PhaseId::Maintenance],
    next: Some(PhaseId::PExam4),
};

pub const BRANCH_C: BranchGroup = BranchGroup {
    id: BranchGroupId::C,
    after: PhaseId::PExam4,
    options: &[PhaseId::Surgery2, PhaseId::Srp3, PhaseId::PHeavyPrevention, PhaseId::Maintenance],
    next: Some(PhaseId::PExam5),
};

pub const BRANCH_D: BranchGroup = BranchGroup {
    id: BranchGroupId::D,
    after: PhaseId::PExam5,
    options: &[PhaseId::Surgery, PhaseId::Srp2, PhaseId::PHeavyPrevention, PhaseId::Maintenance],
    next: None,
};

/// One step of the protocol walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowUnit {
    Phase(PhaseId),
    Branch(&'static BranchGroup),
}

/// The protocol as a linear walk of phases and branch points
pub static FLOW: [FlowUnit; 10] = [
    FlowUnit::Phase(PhaseId::PExam1),
    FlowUnit::Phase(PhaseId::Initial),
    FlowUnit::Phase(PhaseId::PExam2),
    FlowUnit::Branch(&BRANCH_A),
    FlowUnit::Phase(PhaseId::PExam3),
    FlowUnit::Branch(&BRANCH_B),
    FlowUnit::Phase(PhaseId::PExam4),
    FlowUnit::Branch(&BRANCH_C),
    FlowUnit::Phase(PhaseId::PExam5),
    FlowUnit::Branch(&BRANCH_D),
];

/// Re-examinations the terminal SPT fallback may return to
pub const RECALL_EXAMS: [PhaseId; 3] = [PhaseId::PExam3, PhaseId::PExam4, PhaseId::PExam5];

impl FlowUnit {
    pub fn phases(&self) -> &[PhaseId] {
        match self {
            FlowUnit::Phase(p) => std::slice::from_ref(p),
            FlowUnit::Branch(group) => group.options,
        }
    }
}
