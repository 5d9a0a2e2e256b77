use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::core::{
    ChargeSection, EntityId, GlobalAssets, ScheduleA, ScheduleC, ScheduleD, SoADocument,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealReport {
    pub backfilled_ids: usize,
    /// Paths of parts that could not be read, such as `scheduleC` or
    /// `scheduleD.shareholders[2]`. Containers are reset to empty; rows are
    /// dropped.
    pub reset: Vec<String>,
}

impl HealReport {
    pub fn is_clean(&self) -> bool {
        self.backfilled_ids == 0 && self.reset.is_empty()
    }

    fn reset(&mut self, path: &str) {
        self.reset.push(path.to_string());
    }
}

/// Rebuilds a typed statement from a stored record of unknown quality. Each
/// row is merged over its default entity, so a field of the wrong type falls
/// back to that field's default without losing the rest of the row; entities
/// without ids are given fresh ones.
pub fn heal_document(case_id: &str, raw: Value) -> (SoADocument, HealReport) {
    let mut report = HealReport::default();
    let mut root = match strip_nulls(raw) {
        Value::Object(fields) => fields,
        _ => {
            report.reset("document");
            Map::new()
        }
    };
    let mut schedule_a = object(root.remove("scheduleA"), "scheduleA", &mut report);
    let mut global = object(
        schedule_a.remove("globalAssets"),
        "scheduleA.globalAssets",
        &mut report,
    );
    let mut schedule_c = object(root.remove("scheduleC"), "scheduleC", &mut report);
    let mut schedule_d = object(root.remove("scheduleD"), "scheduleD", &mut report);

    let mut document = SoADocument {
        case_id: case_id.to_string(),
        version: version(root.remove("version"), &mut report),
        as_at_date: root
            .remove("asAtDate")
            .and_then(|value| read(value, "asAtDate", &mut report)),
        schedule_a: ScheduleA {
            charge_holder_sections: rows_with(
                schedule_a.remove("chargeHolderSections"),
                "scheduleA.chargeHolderSections",
                &mut report,
                section,
            ),
            global_assets: GlobalAssets {
                floating: rows(
                    global.remove("floating"),
                    "scheduleA.globalAssets.floating",
                    &mut report,
                ),
                uncharged: rows(
                    global.remove("uncharged"),
                    "scheduleA.globalAssets.uncharged",
                    &mut report,
                ),
            },
        },
        schedule_c: ScheduleC {
            company_creditors: rows(
                schedule_c.remove("companyCreditors"),
                "scheduleC.companyCreditors",
                &mut report,
            ),
            consumer_creditors: rows(
                schedule_c.remove("consumerCreditors"),
                "scheduleC.consumerCreditors",
                &mut report,
            ),
            employee_creditors: rows(
                schedule_c.remove("employeeCreditors"),
                "scheduleC.employeeCreditors",
                &mut report,
            ),
        },
        schedule_d: ScheduleD {
            shareholders: rows(
                schedule_d.remove("shareholders"),
                "scheduleD.shareholders",
                &mut report,
            ),
        },
    };
    report.backfilled_ids = backfill_ids(&mut document);
    (document, report)
}

fn object(raw: Option<Value>, path: &str, report: &mut HealReport) -> Map<String, Value> {
    match raw {
        None => Map::new(),
        Some(Value::Object(fields)) => fields,
        Some(_) => {
            report.reset(path);
            Map::new()
        }
    }
}

fn read<T: DeserializeOwned>(value: Value, path: &str, report: &mut HealReport) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            report.reset(path);
            None
        }
    }
}

fn version(raw: Option<Value>, report: &mut HealReport) -> u32 {
    let Some(raw) = raw else {
        return 1;
    };
    match count(&raw).and_then(|version| u32::try_from(version).ok()) {
        Some(version) => version.max(1),
        None => {
            report.reset("version");
            1
        }
    }
}

fn rows_with<T>(
    raw: Option<Value>,
    path: &str,
    report: &mut HealReport,
    mut heal_row: impl FnMut(Value, &str, &mut HealReport) -> Option<T>,
) -> Vec<T> {
    let items = match raw {
        None => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(_) => {
            report.reset(path);
            return Vec::new();
        }
    };
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| heal_row(item, &format!("{path}[{index}]"), report))
        .collect()
}

fn rows<T>(raw: Option<Value>, path: &str, report: &mut HealReport) -> Vec<T>
where
    T: Default + Serialize + DeserializeOwned,
{
    rows_with(raw, path, report, entity::<T>)
}

fn entity<T>(raw: Value, path: &str, report: &mut HealReport) -> Option<T>
where
    T: Default + Serialize + DeserializeOwned,
{
    if !raw.is_object() {
        report.reset(path);
        return None;
    }
    let template = serde_json::to_value(T::default()).unwrap_or(Value::Null);
    read(merge(template, raw), path, report)
}

fn section(raw: Value, path: &str, report: &mut HealReport) -> Option<ChargeSection> {
    let Value::Object(mut fields) = raw else {
        report.reset(path);
        return None;
    };
    Some(ChargeSection {
        id: fields
            .remove("id")
            .and_then(|id| text(&id))
            .map(EntityId::new)
            .unwrap_or_default(),
        assets: rows(fields.remove("assets"), &format!("{path}.assets"), report),
        claims: rows(fields.remove("claims"), &format!("{path}.claims"), report),
        fixed_charge_surplus: fields
            .remove("fixedChargeSurplus")
            .and_then(|value| read(value, &format!("{path}.fixedChargeSurplus"), report))
            .unwrap_or_default(),
    })
}

fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}

/// Overlays one stored row on its default entity. Leaves are coerced to the
/// default's shape where the meaning is clear ("yes" for a flag, "1,200" for a
/// count, 5000 for an amount held as text); anything else keeps the default.
fn merge(base: Value, raw: Value) -> Value {
    match (base, raw) {
        (base, Value::Null) => base,
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.remove(&key) {
                    Some(existing) => merge(existing, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        (base @ Value::Object(_), _) => base,
        (Value::Array(_), raw @ Value::Array(_)) => raw,
        (base @ Value::Array(_), _) => base,
        (base @ Value::Bool(_), raw) => flag(&raw).map(Value::Bool).unwrap_or(base),
        (base @ Value::Number(_), raw) => count(&raw).map(Value::from).unwrap_or(base),
        (base @ (Value::String(_) | Value::Null), raw) => {
            text(&raw).map(Value::String).unwrap_or(base)
        }
    }
}

fn flag(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => number.as_f64().map(|n| n != 0.0),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn count(raw: &Value) -> Option<u64> {
    let digits = match raw {
        Value::Number(number) => return number.as_u64().or_else(|| whole(number.as_f64()?)),
        Value::String(text) => text.trim().replace(',', ""),
        _ => return None,
    };
    digits
        .parse::<u64>()
        .ok()
        .or_else(|| whole(digits.parse::<f64>().ok()?))
}

fn whole(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0 && value <= u64::MAX as f64).then(|| value.trunc() as u64)
}

fn text(raw: &Value) -> Option<String> {
    match raw {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn backfill(id: &mut EntityId, count: &mut usize) {
    if id.is_blank() {
        *id = EntityId::generate();
        *count += 1;
    }
}

fn backfill_ids(document: &mut SoADocument) -> usize {
    let mut count = 0;
    let schedule_a = &mut document.schedule_a;
    for section in &mut schedule_a.charge_holder_sections {
        backfill(&mut section.id, &mut count);
        for asset in &mut section.assets {
            backfill(&mut asset.id, &mut count);
        }
        for claim in &mut section.claims {
            backfill(&mut claim.id, &mut count);
        }
    }
    for asset in schedule_a
        .global_assets
        .floating
        .iter_mut()
        .chain(schedule_a.global_assets.uncharged.iter_mut())
    {
        backfill(&mut asset.id, &mut count);
    }
    let schedule_c = &mut document.schedule_c;
    for creditor in schedule_c
        .company_creditors
        .iter_mut()
        .chain(schedule_c.consumer_creditors.iter_mut())
    {
        backfill(&mut creditor.id, &mut count);
    }
    for employee in &mut schedule_c.employee_creditors {
        backfill(&mut employee.id, &mut count);
    }
    for shareholder in &mut document.schedule_d.shareholders {
        backfill(&mut shareholder.id, &mut count);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CalledUpCapital, EtrValue, Money, compute};
    use serde_json::json;

    #[test]
    fn clean_document_heals_to_itself() {
        let mut document = SoADocument::empty("case-1");
        document.version = 4;
        document.schedule_a.global_assets.floating.push(crate::core::Asset {
            id: EntityId::new("a1"),
            estimated_to_realise: EtrValue::Uncertain,
            ..Default::default()
        });
        let raw = serde_json::to_value(&document).expect("serialize");
        let (healed, report) = heal_document("case-1", raw);
        assert!(report.is_clean());
        assert_eq!(healed, document);
        assert_eq!(compute(&healed), compute(&document));
    }

    #[test]
    fn missing_structure_is_filled_and_ids_backfilled() {
        let raw = json!({
            "version": null,
            "scheduleA": {
                "globalAssets": {
                    "uncharged": [
                        { "description": "Cash at bank", "estimatedToRealise": 2000, "bookValue": null }
                    ]
                }
            },
            "scheduleC": { "employeeCreditors": [ { "name": "A Worker", "totalPreferentialClaim": "1500" } ] }
        });
        let (healed, report) = heal_document("case-7", raw);
        assert_eq!(healed.case_id, "case-7");
        assert_eq!(healed.version, 1);
        assert!(healed.schedule_a.charge_holder_sections.is_empty());
        let asset = &healed.schedule_a.global_assets.uncharged[0];
        assert!(!asset.id.is_blank());
        assert_eq!(asset.book_value, Money::ZERO);
        assert_eq!(asset.estimated_to_realise, EtrValue::Known(Money::from_units(2_000)));
        assert_eq!(
            healed.schedule_c.employee_creditors[0].total_preferential_claim,
            Money::from_units(1_500)
        );
        assert_eq!(report.backfilled_ids, 2);
        assert!(report.reset.is_empty());
    }

    #[test]
    fn mistyped_parts_fall_back_to_defaults() {
        let raw = json!({
            "version": "3",
            "scheduleA": { "globalAssets": "broken", "chargeHolderSections": [ { "id": "s1", "fixedChargeSurplus": 10 } ] },
            "scheduleC": [],
            "scheduleD": { "shareholders": [ { "id": "sh", "sharesHeld": "lots", "amountPaid": 40 } ] }
        });
        let (healed, report) = heal_document("case-2", raw);
        assert_eq!(healed.version, 3);
        assert_eq!(healed.schedule_a.charge_holder_sections.len(), 1);
        assert_eq!(
            healed.schedule_a.charge_holder_sections[0].fixed_charge_surplus,
            Money::from_units(10)
        );
        assert!(healed.schedule_a.global_assets.floating.is_empty());
        assert!(healed.schedule_c.company_creditors.is_empty());
        let shareholder = &healed.schedule_d.shareholders[0];
        assert_eq!(shareholder.shares_held, 0);
        assert_eq!(shareholder.amount_paid, Money::from_units(40));
        assert_eq!(
            report.reset,
            vec!["scheduleA.globalAssets".to_string(), "scheduleC".to_string()]
        );
    }

    #[test]
    fn one_bad_field_keeps_the_rest_of_the_schedule() {
        let raw = json!({
            "scheduleC": {
                "companyCreditors": [
                    { "id": "c1", "name": "Bank", "creditorType": "unsecured", "balanceOwed": "5000", "retentionOfTitle": "yes" },
                    { "id": "c2", "name": "Landlord", "balanceOwed": 300, "retentionOfTitle": "maybe", "unsecuredCreditorType": 7 }
                ]
            },
            "scheduleD": {
                "shareholders": [
                    { "id": "sh1", "sharesHeld": "1,000", "nominalValuePerShare": 1 },
                    { "id": "sh2", "sharesHeld": 250.0, "nominalValuePerShare": "2" }
                ]
            }
        });
        let (healed, report) = heal_document("case-4", raw);
        assert!(report.is_clean());

        let creditors = &healed.schedule_c.company_creditors;
        assert_eq!(creditors.len(), 2);
        assert!(creditors[0].retention_of_title);
        assert_eq!(creditors[0].balance_owed, Money::from_units(5_000));
        assert!(!creditors[1].retention_of_title);
        assert_eq!(creditors[1].unsecured_creditor_type.as_deref(), Some("7"));

        let shares: Vec<u64> = healed
            .schedule_d
            .shareholders
            .iter()
            .map(|s| s.shares_held)
            .collect();
        assert_eq!(shares, vec![1_000, 250]);
        assert_eq!(
            compute(&healed).called_up_capital,
            CalledUpCapital::Amount(Money::from_units(1_500))
        );
    }

    #[test]
    fn unreadable_rows_are_dropped_individually() {
        let raw = json!({
            "scheduleA": { "globalAssets": { "floating": [ "junk", { "id": "a1", "estimatedToRealise": 900 } ] } }
        });
        let (healed, report) = heal_document("case-5", raw);
        let floating = &healed.schedule_a.global_assets.floating;
        assert_eq!(floating.len(), 1);
        assert_eq!(floating[0].id, EntityId::new("a1"));
        assert_eq!(
            report.reset,
            vec!["scheduleA.globalAssets.floating[0]".to_string()]
        );
    }

    #[test]
    fn non_object_record_yields_empty_document() {
        let (healed, report) = heal_document("case-3", json!("garbage"));
        assert_eq!(healed, SoADocument::empty("case-3"));
        assert_eq!(report.reset, vec!["document".to_string()]);
    }
}
