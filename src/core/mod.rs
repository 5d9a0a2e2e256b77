mod classifier;
mod edit;
mod format;
mod model;
mod sections;
mod types;
mod warning;
mod waterfall;

pub use classifier::{
    CreditorBuckets, NameMatch, RecharacterisedClaim, classify, holds_charge,
    holds_floating_charge, match_creditor, normalize_name,
};
pub use edit::{AssetLocation, CreditorLedger, Edit, EditError, apply, apply_all};
pub use format::{
    NIL, NOT_APPLICABLE, TO_BE_CONFIRMED, format_capital, format_etr, format_liability,
    format_money, format_prescribed_part,
};
pub use model::{
    Asset, CaseLedgers, ChargeHolderClaim, ChargeSection, Creditor, CreditorType, Employee,
    GlobalAssets, MoratoriumSubtype, ScheduleA, ScheduleC, ScheduleD, Shareholder, SoADocument,
};
pub use sections::{
    PoolTotals, SURPLUS_TOLERANCE, SectionTotals, code_assets, pool_totals, section_totals,
};
pub use types::{EntityId, EtrValue, Money, UNCERTAIN_MARKER};
pub use warning::EngineWarning;
pub use waterfall::{
    CalledUpCapital, Milestone, PrescribedPart, WaterfallResult, called_up_capital, compute,
    compute_with_chart, prescribed_part,
};
