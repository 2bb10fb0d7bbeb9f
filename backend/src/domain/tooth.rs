//! Tooth Model
//!
//! FDI tooth numbers, quadrant blocks and the deep-pocket input derived from
//! probing charts.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::entity::{DomainError, DomainResult};

/// Probing depth (mm) from which a pocket counts as deep
pub const DEEP_POCKET_THRESHOLD_MM: u8 = 4;

/// Permanent tooth in FDI notation (quadrant 1-4, position 1-8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ToothNumber(u8);

impl ToothNumber {
    pub fn new(value: u8) -> DomainResult<Self> {
        let quadrant = value / 10;
        let position = value % 10;
        if (1..=4).contains(&quadrant) && (1..=8).contains(&position) {
            Ok(Self(value))
        } else {
            Err(DomainError::Validation(format!("Invalid FDI tooth number: {}", value)))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn quadrant(&self) -> u8 {
        self.0 / 10
    }

    pub fn position(&self) -> u8 {
        self.0 % 10
    }

    /// Palmer notation using the quadrant corner glyphs (`11` -> `1⏌`)
    pub fn palmer(&self) -> String {
        let pos = self.position();
        match self.quadrant() {
            1 => format!("{}⏌", pos),
            2 => format!("⎿{}", pos),
            3 => format!("⎾{}", pos),
            _ => format!("{}⏋", pos),
        }
    }

    /// Every permanent tooth, quadrant by quadrant
    pub fn all_permanent() -> impl Iterator<Item = ToothNumber> {
        (1..=4u8).flat_map(|q| (1..=8u8).map(move |p| ToothNumber(q * 10 + p)))
    }
}

impl TryFrom<u8> for ToothNumber {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        ToothNumber::new(value)
    }
}

impl From<ToothNumber> for u8 {
    fn from(tooth: ToothNumber) -> Self {
        tooth.0
    }
}

impl std::fmt::Display for ToothNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate raw numbers into an ascending, de-duplicated tooth list
pub fn normalize_teeth(raw: &[u8]) -> DomainResult<Vec<ToothNumber>> {
    let set = raw
        .iter()
        .map(|&n| ToothNumber::new(n))
        .collect::<DomainResult<BTreeSet<_>>>()?;
    Ok(set.into_iter().collect())
}

/// Join tooth numbers the way stored plans display them (`11, 12`)
pub fn join_teeth(teeth: &[ToothNumber]) -> String {
    teeth.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
}

/// Parse a free-form tooth list ("11, 12", "11、12", "11 12").
///
/// Tokens that are not valid FDI numbers are skipped.
pub fn parse_tooth_list(text: &str) -> Vec<ToothNumber> {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    let re = SEPARATORS.get_or_init(|| Regex::new(r"[,、\s]+").expect("separator pattern is valid"));

    let set: BTreeSet<ToothNumber> = re
        .split(text)
        .filter_map(|token| token.trim().parse::<u8>().ok())
        .filter_map(|n| ToothNumber::new(n).ok())
        .collect();
    set.into_iter().collect()
}

/// Quadrant block offered by the selection modal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToothBlock {
    UpperRight,
    UpperLeft,
    LowerRight,
    LowerLeft,
}

impl ToothBlock {
    pub const ALL: [ToothBlock; 4] = [
        ToothBlock::UpperRight,
        ToothBlock::UpperLeft,
        ToothBlock::LowerRight,
        ToothBlock::LowerLeft,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ToothBlock::UpperRight => "右上",
            ToothBlock::UpperLeft => "左上",
            ToothBlock::LowerRight => "右下",
            ToothBlock::LowerLeft => "左下",
        }
    }

    pub fn quadrant(&self) -> u8 {
        match self {
            ToothBlock::UpperRight => 1,
            ToothBlock::UpperLeft => 2,
            ToothBlock::LowerLeft => 3,
            ToothBlock::LowerRight => 4,
        }
    }

    /// Teeth of the block, ascending
    pub fn teeth(&self) -> Vec<ToothNumber> {
        let q = self.quadrant();
        (1..=8u8).map(|p| ToothNumber(q * 10 + p)).collect()
    }
}

/// Probing site on a tooth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Mb,
    B,
    Db,
    Ml,
    L,
    Dl,
}

impl Surface {
    pub const ALL: [Surface; 6] = [Surface::Mb, Surface::B, Surface::Db, Surface::Ml, Surface::L, Surface::Dl];
}

/// Six-site probing record for one tooth, as supplied by the charting side
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToothProbing {
    pub tooth_number: u8,
    #[serde(default)]
    pub is_missing: bool,
    /// Depths in `Surface::ALL` order
    #[serde(default)]
    pub depths: [Option<u8>; 6],
}

/// Tooth with at least one deep pocket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepPocketTooth {
    pub tooth_number: ToothNumber,
    pub max_depth: u8,
    pub affected_surfaces: Vec<Surface>,
}

/// Teeth excluded from selection (missing, unerupted, impacted)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingTeeth(pub BTreeSet<ToothNumber>);

impl MissingTeeth {
    pub fn new(teeth: impl IntoIterator<Item = ToothNumber>) -> Self {
        Self(teeth.into_iter().collect())
    }

    /// Build from raw numbers, ignoring invalid ones
    pub fn from_raw(raw: &[u8]) -> Self {
        Self(raw.iter().filter_map(|&n| ToothNumber::new(n).ok()).collect())
    }

    pub fn contains(&self, tooth: ToothNumber) -> bool {
        self.0.contains(&tooth)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Extract teeth whose probing depth reaches `threshold` on any site.
///
/// Missing teeth and invalid numbers are skipped.
pub fn deep_pocket_teeth(chart: &[ToothProbing], threshold: u8) -> Vec<DeepPocketTooth> {
    let mut result: Vec<DeepPocketTooth> = chart
        .iter()
        .filter(|t| !t.is_missing)
        .filter_map(|t| {
            let tooth_number = ToothNumber::new(t.tooth_number).ok()?;
            let mut max_depth = 0;
            let mut affected_surfaces = Vec::new();
            for (surface, depth) in Surface::ALL.iter().zip(t.depths.iter()) {
                if let Some(d) = depth {
                    if *d >= threshold {
                        affected_surfaces.push(*surface);
                        max_depth = max_depth.max(*d);
                    }
                }
            }
            if affected_surfaces.is_empty() {
                None
            } else {
                Some(DeepPocketTooth { tooth_number, max_depth, affected_surfaces })
            }
        })
        .collect();
    result.sort_by_key(|t| t.tooth_number);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tooth(n: u8) -> ToothNumber {
        ToothNumber::new(n).unwrap()
    }

    #[test]
    fn test_fdi_validation() {
        assert!(ToothNumber::new(11).is_ok());
        assert!(ToothNumber::new(48).is_ok());
        assert!(ToothNumber::new(10).is_err());
        assert!(ToothNumber::new(19).is_err());
        assert!(ToothNumber::new(51).is_err());
        assert_eq!(ToothNumber::all_permanent().count(), 32);
    }

    #[test]
    fn test_palmer_notation() {
        assert_eq!(tooth(11).palmer(), "1⏌");
        assert_eq!(tooth(26).palmer(), "⎿6");
        assert_eq!(tooth(37).palmer(), "⎾7");
        assert_eq!(tooth(48).palmer(), "8⏋");
    }

    #[test]
    fn test_normalize_sorts_and_dedupes() {
        let teeth = normalize_teeth(&[12, 11, 12]).unwrap();
        assert_eq!(teeth, vec![tooth(11), tooth(12)]);
        assert!(normalize_teeth(&[11, 99]).is_err());
        assert_eq!(join_teeth(&teeth), "11, 12");
    }

    #[test]
    fn test_parse_tooth_list_accepts_mixed_separators() {
        let teeth = parse_tooth_list("16、17, 15  99 abc");
        assert_eq!(teeth, vec![tooth(15), tooth(16), tooth(17)]);
        assert!(parse_tooth_list("").is_empty());
    }

    #[test]
    fn test_block_teeth() {
        let block = ToothBlock::LowerRight.teeth();
        assert_eq!(block.len(), 8);
        assert_eq!(block[0], tooth(41));
        assert_eq!(ToothBlock::UpperLeft.label(), "左上");
    }

    #[test]
    fn test_deep_pocket_extraction() {
        let chart = vec![
            ToothProbing { tooth_number: 16, is_missing: false, depths: [Some(3), Some(5), None, Some(4), Some(2), Some(3)] },
            ToothProbing { tooth_number: 11, is_missing: false, depths: [Some(2); 6] },
            ToothProbing { tooth_number: 36, is_missing: true, depths: [Some(7); 6] },
            ToothProbing { tooth_number: 14, is_missing: false, depths: [None, None, None, None, None, Some(6)] },
        ];

        let deep = deep_pocket_teeth(&chart, DEEP_POCKET_THRESHOLD_MM);
        assert_eq!(deep.len(), 2);
        assert_eq!(deep[0].tooth_number, tooth(14));
        assert_eq!(deep[0].max_depth, 6);
        assert_eq!(deep[1].tooth_number, tooth(16));
        assert_eq!(deep[1].max_depth, 5);
        assert_eq!(deep[1].affected_surfaces, vec![Surface::B, Surface::Ml]);
    }

    #[test]
    fn test_tooth_number_serde_validates() {
        let ok: ToothNumber = serde_json::from_str("21").unwrap();
        assert_eq!(ok, tooth(21));
        assert!(serde_json::from_str::<ToothNumber>("9").is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), "21");
    }
}
