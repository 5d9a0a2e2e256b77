use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::types::{EntityId, EtrValue, Money};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Asset {
    pub id: EntityId,
    pub description: String,
    pub account_code: Option<String>,
    pub book_value: Money,
    pub estimated_to_realise: EtrValue,
}

/// Amount due to a named chargeholder within one fixed-charge section. Held as a
/// magnitude; legacy negative entries are read through `magnitude`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChargeHolderClaim {
    pub id: EntityId,
    pub name: String,
    pub amount: Money,
}

impl ChargeHolderClaim {
    pub fn magnitude(&self) -> Money {
        self.amount.abs()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChargeSection {
    pub id: EntityId,
    pub assets: Vec<Asset>,
    pub claims: Vec<ChargeHolderClaim>,
    /// Entered by the practitioner; never derived from the section's rows.
    pub fixed_charge_surplus: Money,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditorType {
    Moratorium,
    Secured,
    Unsecured,
    SecondaryPreferential,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoratoriumSubtype {
    #[serde(alias = "post")]
    PostMoratorium,
    #[serde(alias = "pre", alias = "priority", alias = "pre_moratorium_priority")]
    PreMoratorium,
    #[serde(other)]
    Unspecified,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Creditor {
    pub id: EntityId,
    pub name: String,
    pub address: String,
    pub creditor_type: CreditorType,
    pub moratorium_subtype: Option<MoratoriumSubtype>,
    /// Free text such as "Fixed & Floating" or "Floating charge".
    pub security_type: String,
    pub unsecured_creditor_type: Option<String>,
    pub balance_owed: Money,
    pub retention_of_title: bool,
    #[serde(deserialize_with = "lenient_date")]
    pub security_date: Option<NaiveDate>,
    pub security_value: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Employee {
    pub id: EntityId,
    pub name: String,
    pub address: String,
    pub total_preferential_claim: Money,
    pub total_unsecured_claim: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Shareholder {
    pub id: EntityId,
    pub name: String,
    pub address: String,
    pub share_class: String,
    pub shares_held: u64,
    pub nominal_value_per_share: Money,
    pub amount_paid: Money,
    pub amount_unpaid: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GlobalAssets {
    pub floating: Vec<Asset>,
    pub uncharged: Vec<Asset>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScheduleA {
    pub charge_holder_sections: Vec<ChargeSection>,
    pub global_assets: GlobalAssets,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScheduleC {
    pub company_creditors: Vec<Creditor>,
    pub consumer_creditors: Vec<Creditor>,
    pub employee_creditors: Vec<Employee>,
}

impl ScheduleC {
    pub fn creditors(&self) -> impl Iterator<Item = &Creditor> {
        self.company_creditors
            .iter()
            .chain(self.consumer_creditors.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScheduleD {
    pub shareholders: Vec<Shareholder>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SoADocument {
    pub case_id: String,
    pub version: u32,
    pub as_at_date: Option<DateTime<Utc>>,
    #[serde(rename = "scheduleA")]
    pub schedule_a: ScheduleA,
    #[serde(rename = "scheduleC")]
    pub schedule_c: ScheduleC,
    #[serde(rename = "scheduleD")]
    pub schedule_d: ScheduleD,
}

impl SoADocument {
    pub fn empty(case_id: impl Into<String>) -> Self {
        Self {
            case_id: case_id.into(),
            version: 1,
            ..Self::default()
        }
    }

    /// A first draft for a case with no saved version: Schedules C and D copied
    /// from the live ledgers, Schedule A empty.
    pub fn seeded(case_id: impl Into<String>, ledgers: &CaseLedgers) -> Self {
        let mut document = Self::empty(case_id);
        document.schedule_c = ledgers.schedule_c();
        document.schedule_d = ledgers.schedule_d();
        document
    }

    pub fn all_assets(&self) -> impl Iterator<Item = &Asset> {
        self.schedule_a
            .charge_holder_sections
            .iter()
            .flat_map(|section| section.assets.iter())
            .chain(self.schedule_a.global_assets.floating.iter())
            .chain(self.schedule_a.global_assets.uncharged.iter())
    }
}

fn lenient_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(raw
        .as_str()
        .and_then(|s| s.get(..10).or(Some(s)))
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()))
}

/// Live case data held outside the statement: the creditor, employee and
/// shareholder ledgers plus the chart of accounts used to code assets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaseLedgers {
    pub creditors: Vec<Creditor>,
    pub consumer_creditors: Vec<Creditor>,
    pub employees: Vec<Employee>,
    pub shareholders: Vec<Shareholder>,
    pub chart_of_accounts: BTreeMap<String, String>,
}

impl CaseLedgers {
    pub fn schedule_c(&self) -> ScheduleC {
        ScheduleC {
            company_creditors: self.creditors.clone(),
            consumer_creditors: self.consumer_creditors.clone(),
            employee_creditors: self.employees.clone(),
        }
    }

    pub fn schedule_d(&self) -> ScheduleD {
        ScheduleD {
            shareholders: self.shareholders.clone(),
        }
    }
}
