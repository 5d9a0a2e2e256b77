use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

pub const UNCERTAIN_MARKER: &str = "uncertain";

/// Fixed-point currency amount. Every total in the waterfall is carried at full
/// precision; rounding only happens at display time. Arithmetic saturates at the
/// bounds of `Decimal` instead of panicking.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Largest magnitude read from input. Larger entries are treated as
    /// unparseable and read as zero.
    pub const MAX_INPUT: Money = Money(dec!(1000000000000000));

    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn from_units(units: i64) -> Self {
        Self(Decimal::from(units))
    }

    /// Parses user-entered text. Thousands separators and a leading pound sign are
    /// tolerated; empty or unparseable input is zero.
    pub fn parse_lenient(raw: &str) -> Self {
        let cleaned: String = raw
            .trim()
            .chars()
            .filter(|c| *c != ',' && *c != '£' && !c.is_whitespace())
            .collect();
        if cleaned.is_empty() {
            return Self::ZERO;
        }
        Decimal::from_str(&cleaned)
            .map(Self::bounded)
            .unwrap_or(Self::ZERO)
    }

    fn bounded(value: Decimal) -> Self {
        if value.abs() <= Self::MAX_INPUT.0 {
            Self(value)
        } else {
            Self::ZERO
        }
    }

    pub fn amount(self) -> Decimal {
        self.0
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn times(self, quantity: u64) -> Self {
        Self(self.0.saturating_mul(Decimal::from(quantity)))
    }

    pub fn scale(self, rate: Decimal) -> Self {
        Self(self.0.saturating_mul(rate))
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.normalize(), f)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        *self = *self - rhs;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal amount")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        Ok(Money::bounded(Decimal::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        Ok(Money::bounded(Decimal::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        Ok(Decimal::try_from(v)
            .map(Money::bounded)
            .unwrap_or_default())
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        Ok(Money::parse_lenient(v))
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Money, E> {
        Ok(Money::ZERO)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Money, E> {
        Ok(Money::ZERO)
    }

    fn visit_none<E: de::Error>(self) -> Result<Money, E> {
        Ok(Money::ZERO)
    }
}

/// Estimated-to-realise value of an asset. `Uncertain` takes part in every sum
/// as zero but keeps its identity through storage.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EtrValue {
    Known(Money),
    Uncertain,
}

impl Default for EtrValue {
    fn default() -> Self {
        EtrValue::Known(Money::ZERO)
    }
}

impl EtrValue {
    /// Any alphabetic character marks the value as uncertain; everything else is
    /// read as an amount.
    pub fn parse(raw: &str) -> Self {
        if raw.chars().any(char::is_alphabetic) {
            EtrValue::Uncertain
        } else {
            EtrValue::Known(Money::parse_lenient(raw))
        }
    }

    pub fn to_arithmetic(self) -> Money {
        match self {
            EtrValue::Known(amount) => amount,
            EtrValue::Uncertain => Money::ZERO,
        }
    }

    pub fn is_uncertain(self) -> bool {
        matches!(self, EtrValue::Uncertain)
    }
}

impl From<Money> for EtrValue {
    fn from(value: Money) -> Self {
        EtrValue::Known(value)
    }
}

impl Serialize for EtrValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EtrValue::Known(amount) => amount.serialize(serializer),
            EtrValue::Uncertain => serializer.serialize_str(UNCERTAIN_MARKER),
        }
    }
}

impl<'de> Deserialize<'de> for EtrValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(EtrVisitor)
    }
}

struct EtrVisitor;

impl<'de> Visitor<'de> for EtrVisitor {
    type Value = EtrValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal amount or \"uncertain\"")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<EtrValue, E> {
        MoneyVisitor.visit_i64(v).map(EtrValue::Known)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<EtrValue, E> {
        MoneyVisitor.visit_u64(v).map(EtrValue::Known)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<EtrValue, E> {
        MoneyVisitor.visit_f64(v).map(EtrValue::Known)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<EtrValue, E> {
        Ok(EtrValue::parse(v))
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<EtrValue, E> {
        Ok(EtrValue::default())
    }

    fn visit_unit<E: de::Error>(self) -> Result<EtrValue, E> {
        Ok(EtrValue::default())
    }

    fn visit_none<E: de::Error>(self) -> Result<EtrValue, E> {
        Ok(EtrValue::default())
    }
}

/// Stable identifier for an entity inside a document. Blank ids are backfilled
/// when a stored document is healed.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
