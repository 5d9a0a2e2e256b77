use std::collections::HashSet;

use serde::Serialize;

use super::model::{Creditor, CreditorType, MoratoriumSubtype, SoADocument};
use super::types::{EntityId, Money};
use super::warning::EngineWarning;

const TRADE_EXPENSE: &str = "trade_expense";

/// Case-folded, trimmed form used for every creditor/chargeholder comparison.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq)]
pub enum NameMatch<'a> {
    None,
    One(&'a Creditor),
    Many(Vec<&'a Creditor>),
}

impl<'a> NameMatch<'a> {
    pub fn first(&self) -> Option<&'a Creditor> {
        match self {
            NameMatch::None => None,
            NameMatch::One(creditor) => Some(*creditor),
            NameMatch::Many(all) => all.first().copied(),
        }
    }
}

/// Looks a chargeholder up in the creditor ledger by normalised name. A blank
/// name never matches.
pub fn match_creditor<'a, I>(name: &str, creditors: I) -> NameMatch<'a>
where
    I: IntoIterator<Item = &'a Creditor>,
{
    let wanted = normalize_name(name);
    if wanted.is_empty() {
        return NameMatch::None;
    }
    let mut found: Vec<&'a Creditor> = creditors
        .into_iter()
        .filter(|creditor| normalize_name(&creditor.name) == wanted)
        .collect();
    match found.len() {
        0 => NameMatch::None,
        1 => NameMatch::One(found.remove(0)),
        _ => NameMatch::Many(found),
    }
}

fn security_text(creditor: &Creditor) -> String {
    creditor.security_type.trim().to_lowercase()
}

pub fn holds_floating_charge(creditor: &Creditor) -> bool {
    if creditor.creditor_type != CreditorType::Secured {
        return false;
    }
    let security = security_text(creditor);
    security.contains("floating") || security.contains("fixed & floating")
}

pub fn holds_charge(creditor: &Creditor) -> bool {
    if creditor.creditor_type != CreditorType::Secured {
        return false;
    }
    let security = security_text(creditor);
    security.contains("fixed") || security.contains("floating")
}

fn is_trade_expense(creditor: &Creditor) -> bool {
    creditor
        .unsecured_creditor_type
        .as_deref()
        .map(|kind| kind.trim().to_lowercase().replace([' ', '-'], "_") == TRADE_EXPENSE)
        .unwrap_or(false)
}

/// A fixed-section chargeholder whose ledger entry is not itself secured. Its
/// claim is shown again among the unsecured creditors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecharacterisedClaim {
    pub section_id: EntityId,
    pub creditor_id: EntityId,
    pub name: String,
    pub amount: Money,
}

impl RecharacterisedClaim {
    pub fn label(&self) -> String {
        format!("Deficiency due to {}", self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditorBuckets {
    pub post_moratorium: Money,
    pub pre_moratorium: Money,
    pub employee_preferential: Money,
    pub secondary_preferential: Money,
    pub floating_charge_secured: Money,
    pub unsecured_employees: Money,
    pub trade_creditors: Money,
    pub other_unsecured: Money,
    pub recharacterised: Vec<RecharacterisedClaim>,
}

impl CreditorBuckets {
    pub fn moratorium_total(&self) -> Money {
        self.post_moratorium + self.pre_moratorium
    }

    pub fn recharacterised_total(&self) -> Money {
        self.recharacterised.iter().map(|line| line.amount).sum()
    }

    pub fn unsecured_total(&self) -> Money {
        self.unsecured_employees
            + self.trade_creditors
            + self.other_unsecured
            + self.recharacterised_total()
    }
}

/// Splits Schedule C into ranked buckets. Chargeholders already carried in a
/// fixed-charge section are never counted again as floating-charge creditors,
/// and an unsecured creditor shown as a recharacterised claim is left out of
/// its by-type bucket.
pub fn classify(document: &SoADocument) -> (CreditorBuckets, Vec<EngineWarning>) {
    let mut buckets = CreditorBuckets::default();
    let mut warnings = Vec::new();
    let schedule_c = &document.schedule_c;
    let sections = &document.schedule_a.charge_holder_sections;

    let chargeholders: HashSet<String> = sections
        .iter()
        .flat_map(|section| section.claims.iter())
        .map(|claim| normalize_name(&claim.name))
        .filter(|name| !name.is_empty())
        .collect();
    let (recharacterised, represented, match_warnings) = recharacterise(document);

    for creditor in schedule_c.creditors() {
        match creditor.creditor_type {
            CreditorType::Moratorium => match creditor.moratorium_subtype {
                Some(MoratoriumSubtype::PostMoratorium) => {
                    buckets.post_moratorium += creditor.balance_owed;
                }
                Some(MoratoriumSubtype::PreMoratorium) => {
                    buckets.pre_moratorium += creditor.balance_owed;
                }
                Some(MoratoriumSubtype::Unspecified) | None => {
                    warnings.push(EngineWarning::MoratoriumSubtypeMissing {
                        creditor_id: creditor.id.clone(),
                        name: creditor.name.clone(),
                    });
                    buckets.pre_moratorium += creditor.balance_owed;
                }
            },
            CreditorType::SecondaryPreferential => {
                buckets.secondary_preferential += creditor.balance_owed;
            }
            CreditorType::Secured => {
                if holds_floating_charge(creditor)
                    && !chargeholders.contains(&normalize_name(&creditor.name))
                {
                    buckets.floating_charge_secured += creditor.balance_owed;
                }
            }
            CreditorType::Unsecured => {
                if represented.iter().any(|seen| std::ptr::eq(*seen, creditor)) {
                    continue;
                }
                if is_trade_expense(creditor) {
                    buckets.trade_creditors += creditor.balance_owed;
                } else {
                    buckets.other_unsecured += creditor.balance_owed;
                }
            }
            CreditorType::Other => {}
        }
    }

    for employee in &schedule_c.employee_creditors {
        buckets.employee_preferential += employee.total_preferential_claim;
        buckets.unsecured_employees += employee.total_unsecured_claim;
    }

    buckets.recharacterised = recharacterised;
    warnings.extend(match_warnings);
    (buckets, warnings)
}

/// Fixed-section claims whose named creditor holds no charge, with the ledger
/// entries they stand for.
fn recharacterise(
    document: &SoADocument,
) -> (Vec<RecharacterisedClaim>, Vec<&Creditor>, Vec<EngineWarning>) {
    let mut claims = Vec::new();
    let mut represented = Vec::new();
    let mut warnings = Vec::new();
    let schedule_c = &document.schedule_c;

    for section in &document.schedule_a.charge_holder_sections {
        for claim in &section.claims {
            if claim.name.trim().is_empty() || claim.amount.is_zero() {
                continue;
            }
            let found = match_creditor(&claim.name, schedule_c.creditors());
            if let NameMatch::Many(candidates) = &found {
                warnings.push(EngineWarning::AmbiguousCreditorMatch {
                    section_id: section.id.clone(),
                    claim_name: claim.name.clone(),
                    candidates: candidates.iter().map(|c| c.id.to_string()).collect(),
                });
            }
            let Some(creditor) = found.first() else {
                continue;
            };
            if !holds_charge(creditor) {
                claims.push(RecharacterisedClaim {
                    section_id: section.id.clone(),
                    creditor_id: creditor.id.clone(),
                    name: claim.name.trim().to_string(),
                    amount: claim.magnitude(),
                });
                represented.push(creditor);
            }
        }
    }
    (claims, represented, warnings)
}
