use std::fmt;

use serde::Serialize;

use super::types::{EntityId, Money};

/// Non-fatal conditions found while computing a statement. They are returned to
/// the caller alongside the figures; none of them stops the calculation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EngineWarning {
    #[serde(rename_all = "camelCase")]
    SurplusDivergence {
        section_id: EntityId,
        entered: Money,
        derived: Money,
    },
    #[serde(rename_all = "camelCase")]
    AmbiguousCreditorMatch {
        section_id: EntityId,
        claim_name: String,
        candidates: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    MoratoriumSubtypeMissing { creditor_id: EntityId, name: String },
    #[serde(rename_all = "camelCase")]
    UnknownAccountCode { asset_id: EntityId, code: String },
}

impl fmt::Display for EngineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineWarning::SurplusDivergence {
                section_id,
                entered,
                derived,
            } => write!(
                f,
                "section {section_id}: entered fixed charge surplus {entered} differs from realisations less claims {derived}"
            ),
            EngineWarning::AmbiguousCreditorMatch {
                section_id,
                claim_name,
                candidates,
            } => write!(
                f,
                "section {section_id}: chargeholder '{claim_name}' matches {} creditors; using the first",
                candidates.len()
            ),
            EngineWarning::MoratoriumSubtypeMissing { name, .. } => write!(
                f,
                "moratorium creditor '{name}' has no subtype; counted as pre-moratorium"
            ),
            EngineWarning::UnknownAccountCode { asset_id, code } => {
                write!(f, "asset {asset_id}: account code '{code}' not in chart; left uncoded")
            }
        }
    }
}
