use serde::Deserialize;
use thiserror::Error;

use super::model::{
    Asset, ChargeHolderClaim, ChargeSection, Creditor, Employee, Shareholder, SoADocument,
};
use super::types::{EntityId, Money};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "pool", content = "sectionId", rename_all = "camelCase")]
pub enum AssetLocation {
    Section(EntityId),
    Floating,
    Uncharged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CreditorLedger {
    Company,
    Consumer,
}

/// A single change to a statement. Entities are addressed by id, never by
/// position.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Edit {
    AddSection {
        #[serde(default)]
        section_id: Option<EntityId>,
    },
    RemoveSection {
        section_id: EntityId,
    },
    SetFixedChargeSurplus {
        section_id: EntityId,
        amount: Money,
    },
    UpsertAsset {
        location: AssetLocation,
        asset: Asset,
    },
    RemoveAsset {
        location: AssetLocation,
        asset_id: EntityId,
    },
    UpsertClaim {
        section_id: EntityId,
        claim: ChargeHolderClaim,
    },
    RemoveClaim {
        section_id: EntityId,
        claim_id: EntityId,
    },
    UpsertCreditor {
        ledger: CreditorLedger,
        creditor: Creditor,
    },
    RemoveCreditor {
        ledger: CreditorLedger,
        creditor_id: EntityId,
    },
    UpsertEmployee {
        employee: Employee,
    },
    RemoveEmployee {
        employee_id: EntityId,
    },
    UpsertShareholder {
        shareholder: Shareholder,
    },
    RemoveShareholder {
        shareholder_id: EntityId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("unknown charge section {0}")]
    UnknownSection(EntityId),
    #[error("charge section {0} already exists")]
    DuplicateSection(EntityId),
    #[error("unknown {kind} {id}")]
    UnknownEntity { kind: &'static str, id: EntityId },
}

trait Identified {
    fn id_mut(&mut self) -> &mut EntityId;
    fn id(&self) -> &EntityId;
}

macro_rules! identified {
    ($($ty:ty),*) => {
        $(impl Identified for $ty {
            fn id_mut(&mut self) -> &mut EntityId {
                &mut self.id
            }

            fn id(&self) -> &EntityId {
                &self.id
            }
        })*
    };
}

identified!(Asset, ChargeHolderClaim, ChargeSection, Creditor, Employee, Shareholder);

fn upsert<T: Identified>(rows: &mut Vec<T>, mut row: T) {
    if row.id().is_blank() {
        *row.id_mut() = EntityId::generate();
    }
    match rows.iter_mut().find(|existing| existing.id() == row.id()) {
        Some(existing) => *existing = row,
        None => rows.push(row),
    }
}

fn remove<T: Identified>(rows: &mut Vec<T>, id: &EntityId, kind: &'static str) -> Result<(), EditError> {
    let before = rows.len();
    rows.retain(|row| row.id() != id);
    if rows.len() == before {
        return Err(EditError::UnknownEntity {
            kind,
            id: id.clone(),
        });
    }
    Ok(())
}

fn section_mut<'a>(
    document: &'a mut SoADocument,
    section_id: &EntityId,
) -> Result<&'a mut ChargeSection, EditError> {
    document
        .schedule_a
        .charge_holder_sections
        .iter_mut()
        .find(|section| &section.id == section_id)
        .ok_or_else(|| EditError::UnknownSection(section_id.clone()))
}

fn assets_mut<'a>(
    document: &'a mut SoADocument,
    location: &AssetLocation,
) -> Result<&'a mut Vec<Asset>, EditError> {
    match location {
        AssetLocation::Section(section_id) => Ok(&mut section_mut(document, section_id)?.assets),
        AssetLocation::Floating => Ok(&mut document.schedule_a.global_assets.floating),
        AssetLocation::Uncharged => Ok(&mut document.schedule_a.global_assets.uncharged),
    }
}

fn creditors_mut(document: &mut SoADocument, ledger: CreditorLedger) -> &mut Vec<Creditor> {
    match ledger {
        CreditorLedger::Company => &mut document.schedule_c.company_creditors,
        CreditorLedger::Consumer => &mut document.schedule_c.consumer_creditors,
    }
}

/// Returns the edited copy; the input snapshot is left untouched.
pub fn apply(document: &SoADocument, edit: Edit) -> Result<SoADocument, EditError> {
    let mut next = document.clone();
    match edit {
        Edit::AddSection { section_id } => {
            let id = section_id
                .filter(|id| !id.is_blank())
                .unwrap_or_else(EntityId::generate);
            let sections = &mut next.schedule_a.charge_holder_sections;
            if sections.iter().any(|section| section.id == id) {
                return Err(EditError::DuplicateSection(id));
            }
            sections.push(ChargeSection {
                id,
                ..ChargeSection::default()
            });
        }
        Edit::RemoveSection { section_id } => {
            let sections = &mut next.schedule_a.charge_holder_sections;
            let before = sections.len();
            sections.retain(|section| section.id != section_id);
            if sections.len() == before {
                return Err(EditError::UnknownSection(section_id));
            }
        }
        Edit::SetFixedChargeSurplus { section_id, amount } => {
            section_mut(&mut next, &section_id)?.fixed_charge_surplus = amount;
        }
        Edit::UpsertAsset { location, asset } => {
            upsert(assets_mut(&mut next, &location)?, asset);
        }
        Edit::RemoveAsset { location, asset_id } => {
            remove(assets_mut(&mut next, &location)?, &asset_id, "asset")?;
        }
        Edit::UpsertClaim { section_id, claim } => {
            upsert(&mut section_mut(&mut next, &section_id)?.claims, claim);
        }
        Edit::RemoveClaim {
            section_id,
            claim_id,
        } => {
            remove(
                &mut section_mut(&mut next, &section_id)?.claims,
                &claim_id,
                "claim",
            )?;
        }
        Edit::UpsertCreditor { ledger, creditor } => {
            upsert(creditors_mut(&mut next, ledger), creditor);
        }
        Edit::RemoveCreditor {
            ledger,
            creditor_id,
        } => {
            remove(creditors_mut(&mut next, ledger), &creditor_id, "creditor")?;
        }
        Edit::UpsertEmployee { employee } => {
            upsert(&mut next.schedule_c.employee_creditors, employee);
        }
        Edit::RemoveEmployee { employee_id } => {
            remove(
                &mut next.schedule_c.employee_creditors,
                &employee_id,
                "employee",
            )?;
        }
        Edit::UpsertShareholder { shareholder } => {
            upsert(&mut next.schedule_d.shareholders, shareholder);
        }
        Edit::RemoveShareholder { shareholder_id } => {
            remove(
                &mut next.schedule_d.shareholders,
                &shareholder_id,
                "shareholder",
            )?;
        }
    }
    Ok(next)
}

/// Applies edits in order; the first failure discards the whole batch.
pub fn apply_all<I>(document: &SoADocument, edits: I) -> Result<SoADocument, EditError>
where
    I: IntoIterator<Item = Edit>,
{
    edits
        .into_iter()
        .try_fold(document.clone(), |current, edit| apply(&current, edit))
}
