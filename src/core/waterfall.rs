use std::collections::BTreeMap;

use rust_decimal_macros::dec;
use serde::Serialize;

use super::classifier::{CreditorBuckets, classify};
use super::model::{Shareholder, SoADocument};
use super::sections::{PoolTotals, SectionTotals, code_assets, pool_totals, section_totals, surplus_warnings};
use super::types::Money;
use super::warning::EngineWarning;

const PRESCRIBED_PART_THRESHOLD: Money = Money::new(dec!(10000));
const PRESCRIBED_PART_BASE: Money = Money::new(dec!(5000));
const PRESCRIBED_PART_CAP: Money = Money::new(dec!(800000));
const PRESCRIBED_PART_RATE: rust_decimal::Decimal = dec!(0.20);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "amount", rename_all = "camelCase")]
pub enum PrescribedPart {
    Amount(Money),
    NotApplicable,
}

impl PrescribedPart {
    pub fn to_arithmetic(self) -> Money {
        match self {
            PrescribedPart::Amount(amount) => amount,
            PrescribedPart::NotApplicable => Money::ZERO,
        }
    }
}

/// Ring-fenced share of net property: nothing when there is no net property,
/// not applicable below the threshold, otherwise the flat base plus a fifth of
/// the excess, capped.
pub fn prescribed_part(net_property: Money) -> PrescribedPart {
    if net_property <= Money::ZERO {
        return PrescribedPart::Amount(Money::ZERO);
    }
    if net_property < PRESCRIBED_PART_THRESHOLD {
        return PrescribedPart::NotApplicable;
    }
    let banded = PRESCRIBED_PART_BASE
        + (net_property - PRESCRIBED_PART_THRESHOLD).scale(PRESCRIBED_PART_RATE);
    PrescribedPart::Amount(banded.min(PRESCRIBED_PART_CAP))
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "amount", rename_all = "camelCase")]
pub enum CalledUpCapital {
    Amount(Money),
    NotDeterminable,
}

impl CalledUpCapital {
    pub fn to_arithmetic(self) -> Money {
        match self {
            CalledUpCapital::Amount(amount) => amount,
            CalledUpCapital::NotDeterminable => Money::ZERO,
        }
    }
}

pub fn called_up_capital(shareholders: &[Shareholder]) -> CalledUpCapital {
    if shareholders.is_empty() {
        return CalledUpCapital::NotDeterminable;
    }
    let has_paid_figures = shareholders
        .iter()
        .any(|s| !s.amount_paid.is_zero() || !s.amount_unpaid.is_zero());
    let total: Money = if has_paid_figures {
        shareholders
            .iter()
            .map(|s| s.amount_paid + s.amount_unpaid)
            .sum()
    } else {
        shareholders
            .iter()
            .map(|s| s.nominal_value_per_share.times(s.shares_held))
            .sum()
    };
    CalledUpCapital::Amount(total)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterfallResult {
    pub sections: Vec<SectionTotals>,
    pub floating_pool: PoolTotals,
    pub uncharged_pool: PoolTotals,
    pub buckets: CreditorBuckets,
    pub fixed_charge_surplus_total: Money,
    pub assets_for_preferential: Money,
    pub after_moratorium: Money,
    pub after_preferential: Money,
    pub after_secondary_preferential: Money,
    pub prescribed_part: PrescribedPart,
    pub assets_for_floating: Money,
    pub after_floating: Money,
    pub assets_for_unsecured: Money,
    pub unsecured_claims: Money,
    pub after_unsecured: Money,
    pub called_up_capital: CalledUpCapital,
    pub after_members: Money,
    pub warnings: Vec<EngineWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub key: &'static str,
    pub label: &'static str,
    pub amount: Money,
}

impl WaterfallResult {
    /// Every running total in rank order. The prescribed part and capital are
    /// reported through their own fields because they may be sentinels.
    pub fn milestones(&self) -> Vec<Milestone> {
        let row = |key, label, amount| Milestone { key, label, amount };
        vec![
            row(
                "assetsForPreferential",
                "Estimated total assets available for preferential creditors",
                self.assets_for_preferential,
            ),
            row(
                "afterMoratorium",
                "Estimated surplus/(deficiency) after moratorium debts",
                self.after_moratorium,
            ),
            row(
                "afterPreferential",
                "Estimated surplus/(deficiency) as regards preferential creditors",
                self.after_preferential,
            ),
            row(
                "afterSecondaryPreferential",
                "Estimated surplus/(deficiency) as regards secondary preferential creditors",
                self.after_secondary_preferential,
            ),
            row(
                "assetsForFloating",
                "Estimated total assets available for floating charge holders",
                self.assets_for_floating,
            ),
            row(
                "afterFloating",
                "Estimated surplus/(deficiency) of assets after floating charges",
                self.after_floating,
            ),
            row(
                "assetsForUnsecured",
                "Estimated total assets available to unsecured creditors",
                self.assets_for_unsecured,
            ),
            row(
                "unsecuredClaims",
                "Total unsecured non-preferential claims",
                self.unsecured_claims,
            ),
            row(
                "afterUnsecured",
                "Estimated surplus/(deficiency) as regards unsecured creditors",
                self.after_unsecured,
            ),
            row(
                "afterMembers",
                "Estimated surplus/(deficiency) as regards members",
                self.after_members,
            ),
        ]
    }
}

/// Recomputes every derived figure from the document snapshot. Deterministic
/// and side-effect free.
pub fn compute(document: &SoADocument) -> WaterfallResult {
    let schedule_a = &document.schedule_a;
    let sections: Vec<SectionTotals> = schedule_a
        .charge_holder_sections
        .iter()
        .map(section_totals)
        .collect();
    let floating_pool = pool_totals(&schedule_a.global_assets.floating);
    let uncharged_pool = pool_totals(&schedule_a.global_assets.uncharged);

    let mut warnings = surplus_warnings(&sections);
    let (buckets, classifier_warnings) = classify(document);
    warnings.extend(classifier_warnings);

    let fixed_charge_surplus_total: Money =
        sections.iter().map(|s| s.fixed_charge_surplus).sum();

    let assets_for_preferential =
        fixed_charge_surplus_total + floating_pool.total_etr + uncharged_pool.total_etr;
    let after_moratorium = assets_for_preferential - buckets.moratorium_total();
    let after_preferential = after_moratorium - buckets.employee_preferential;
    let after_secondary_preferential = after_preferential - buckets.secondary_preferential;

    let prescribed_part = prescribed_part(after_secondary_preferential);
    let ring_fenced = prescribed_part.to_arithmetic();

    let assets_for_floating = after_secondary_preferential - ring_fenced;
    let after_floating = assets_for_floating - buckets.floating_charge_secured;
    let assets_for_unsecured = after_floating + ring_fenced;
    let unsecured_claims = buckets.unsecured_total();
    let after_unsecured = assets_for_unsecured - unsecured_claims;

    let called_up_capital = called_up_capital(&document.schedule_d.shareholders);
    let after_members = after_unsecured - called_up_capital.to_arithmetic();

    WaterfallResult {
        sections,
        floating_pool,
        uncharged_pool,
        buckets,
        fixed_charge_surplus_total,
        assets_for_preferential,
        after_moratorium,
        after_preferential,
        after_secondary_preferential,
        prescribed_part,
        assets_for_floating,
        after_floating,
        assets_for_unsecured,
        unsecured_claims,
        after_unsecured,
        called_up_capital,
        after_members,
        warnings,
    }
}

/// Codes assets against the chart of accounts, then computes. Unknown codes are
/// reported with the other warnings.
pub fn compute_with_chart(
    document: &SoADocument,
    chart: &BTreeMap<String, String>,
) -> (SoADocument, WaterfallResult) {
    let (coded, mut warnings) = code_assets(document, chart);
    let mut result = compute(&coded);
    warnings.append(&mut result.warnings);
    result.warnings = warnings;
    (coded, result)
}
