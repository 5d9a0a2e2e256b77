use std::collections::BTreeMap;

use rust_decimal_macros::dec;
use serde::Serialize;

use super::model::{Asset, ChargeSection, SoADocument};
use super::types::{EntityId, Money};
use super::warning::EngineWarning;

/// Allowed gap between the entered surplus and the one implied by the section's
/// rows before a divergence is reported. One whole display unit.
pub const SURPLUS_TOLERANCE: Money = Money::new(dec!(1.00));

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolTotals {
    pub total_book: Money,
    pub total_etr: Money,
    pub uncertain_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionTotals {
    pub section_id: EntityId,
    pub total_book: Money,
    pub total_etr: Money,
    pub total_claims: Money,
    pub fixed_charge_surplus: Money,
    pub derived_surplus: Money,
}

impl SectionTotals {
    pub fn diverges(&self) -> bool {
        (self.fixed_charge_surplus - self.derived_surplus).abs() > SURPLUS_TOLERANCE
    }
}

pub fn pool_totals(assets: &[Asset]) -> PoolTotals {
    assets.iter().fold(PoolTotals::default(), |mut acc, asset| {
        acc.total_book += asset.book_value;
        acc.total_etr += asset.estimated_to_realise.to_arithmetic();
        if asset.estimated_to_realise.is_uncertain() {
            acc.uncertain_count += 1;
        }
        acc
    })
}

/// Nets one fixed-charge section. The entered surplus is reported as-is; the
/// derived figure is only used to flag disagreement.
pub fn section_totals(section: &ChargeSection) -> SectionTotals {
    let pool = pool_totals(&section.assets);
    let total_claims: Money = section.claims.iter().map(|c| c.magnitude()).sum();
    SectionTotals {
        section_id: section.id.clone(),
        total_book: pool.total_book,
        total_etr: pool.total_etr,
        total_claims,
        fixed_charge_surplus: section.fixed_charge_surplus,
        derived_surplus: pool.total_etr - total_claims,
    }
}

pub fn surplus_warnings(sections: &[SectionTotals]) -> Vec<EngineWarning> {
    sections
        .iter()
        .filter(|totals| totals.diverges())
        .map(|totals| EngineWarning::SurplusDivergence {
            section_id: totals.section_id.clone(),
            entered: totals.fixed_charge_surplus,
            derived: totals.derived_surplus,
        })
        .collect()
}

/// Clears account codes the chart does not know. The returned document is
/// otherwise identical to the input.
pub fn code_assets(
    document: &SoADocument,
    chart: &BTreeMap<String, String>,
) -> (SoADocument, Vec<EngineWarning>) {
    let mut coded = document.clone();
    let mut warnings = Vec::new();

    let mut check = |asset: &mut Asset| {
        let Some(code) = asset.account_code.as_deref().map(str::trim) else {
            return;
        };
        if code.is_empty() {
            asset.account_code = None;
        } else if !chart.contains_key(code) {
            warnings.push(EngineWarning::UnknownAccountCode {
                asset_id: asset.id.clone(),
                code: code.to_string(),
            });
            asset.account_code = None;
        }
    };

    for section in &mut coded.schedule_a.charge_holder_sections {
        section.assets.iter_mut().for_each(&mut check);
    }
    coded
        .schedule_a
        .global_assets
        .floating
        .iter_mut()
        .for_each(&mut check);
    coded
        .schedule_a
        .global_assets
        .uncharged
        .iter_mut()
        .for_each(&mut check);

    (coded, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::ChargeHolderClaim;
    use crate::core::types::EtrValue;
    use proptest::prelude::{prop_assert_eq, proptest};
    use proptest::collection::vec;
    use rust_decimal::Decimal;

    fn asset(book: i64, etr: EtrValue) -> Asset {
        Asset {
            id: EntityId::generate(),
            description: "Plant".into(),
            account_code: None,
            book_value: Money::from_units(book),
            estimated_to_realise: etr,
        }
    }

    fn claim(name: &str, amount: i64) -> ChargeHolderClaim {
        ChargeHolderClaim {
            id: EntityId::generate(),
            name: name.into(),
            amount: Money::from_units(amount),
        }
    }

    #[test]
    fn section_totals_net_assets_against_claims() {
        let section = ChargeSection {
            id: EntityId::new("s1"),
            assets: vec![
                asset(20_000, EtrValue::Known(Money::from_units(15_000))),
                asset(5_000, EtrValue::Uncertain),
            ],
            claims: vec![claim("Bank plc", 5_000)],
            fixed_charge_surplus: Money::from_units(10_000),
        };
        let totals = section_totals(&section);
        assert_eq!(totals.total_book, Money::from_units(25_000));
        assert_eq!(totals.total_etr, Money::from_units(15_000));
        assert_eq!(totals.total_claims, Money::from_units(5_000));
        assert_eq!(totals.derived_surplus, Money::from_units(10_000));
        assert!(!totals.diverges());
    }

    #[test]
    fn negative_claims_are_read_as_magnitudes() {
        let section = ChargeSection {
            claims: vec![claim("Bank plc", -3_000), claim("Lender", 2_000)],
            ..ChargeSection::default()
        };
        assert_eq!(section_totals(&section).total_claims, Money::from_units(5_000));
    }

    #[test]
    fn entered_surplus_is_kept_and_divergence_reported() {
        let section = ChargeSection {
            id: EntityId::new("s2"),
            assets: vec![asset(0, EtrValue::Known(Money::from_units(8_000)))],
            claims: vec![claim("Bank plc", 6_000)],
            fixed_charge_surplus: Money::from_units(9_000),
        };
        let totals = section_totals(&section);
        assert_eq!(totals.fixed_charge_surplus, Money::from_units(9_000));
        let warnings = surplus_warnings(&[totals]);
        assert_eq!(
            warnings,
            vec![EngineWarning::SurplusDivergence {
                section_id: EntityId::new("s2"),
                entered: Money::from_units(9_000),
                derived: Money::from_units(2_000),
            }]
        );
    }

    #[test]
    fn divergence_within_tolerance_is_silent() {
        let section = ChargeSection {
            assets: vec![asset(0, EtrValue::Known(Money::new(dec!(1000.40))))],
            fixed_charge_surplus: Money::from_units(1_000),
            ..ChargeSection::default()
        };
        assert!(surplus_warnings(&[section_totals(&section)]).is_empty());
    }

    #[test]
    fn code_assets_clears_unknown_codes() {
        let mut document = SoADocument::empty("c");
        let mut known = asset(1, EtrValue::default());
        known.account_code = Some("0010".into());
        let mut unknown = asset(1, EtrValue::default());
        unknown.account_code = Some("9999".into());
        document.schedule_a.global_assets.floating = vec![known, unknown.clone()];

        let chart = BTreeMap::from([("0010".to_string(), "Freehold property".to_string())]);
        let (coded, warnings) = code_assets(&document, &chart);

        let floating = &coded.schedule_a.global_assets.floating;
        assert_eq!(floating[0].account_code.as_deref(), Some("0010"));
        assert_eq!(floating[1].account_code, None);
        assert_eq!(
            warnings,
            vec![EngineWarning::UnknownAccountCode {
                asset_id: unknown.id,
                code: "9999".into(),
            }]
        );
        assert_eq!(
            document.schedule_a.global_assets.floating[1].account_code.as_deref(),
            Some("9999")
        );
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_pool_totals_equal_row_sums(
            rows in vec((-5_000_000i64..5_000_000, -5_000_000i64..5_000_000, proptest::bool::ANY), 0..40)
        ) {
            let assets: Vec<Asset> = rows
                .iter()
                .map(|(book, etr, uncertain)| Asset {
                    book_value: Money::new(Decimal::new(*book, 2)),
                    estimated_to_realise: if *uncertain {
                        EtrValue::Uncertain
                    } else {
                        EtrValue::Known(Money::new(Decimal::new(*etr, 2)))
                    },
                    ..Asset::default()
                })
                .collect();

            let totals = pool_totals(&assets);
            let book: Money = assets.iter().map(|a| a.book_value).sum();
            let etr: Money = assets.iter().map(|a| a.estimated_to_realise.to_arithmetic()).sum();
            prop_assert_eq!(totals.total_book, book);
            prop_assert_eq!(totals.total_etr, etr);
            prop_assert_eq!(
                totals.uncertain_count,
                rows.iter().filter(|(_, _, uncertain)| *uncertain).count()
            );
        }
    }
}
