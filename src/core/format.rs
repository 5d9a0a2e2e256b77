use super::types::{EtrValue, Money, UNCERTAIN_MARKER};
use super::waterfall::{CalledUpCapital, PrescribedPart};

pub const NIL: &str = "NIL";
pub const NOT_APPLICABLE: &str = "N/A";
pub const TO_BE_CONFIRMED: &str = "TBC";

/// Whole units, rounded up on the absolute value, comma grouped; negatives in
/// parentheses.
pub fn format_money(amount: Money) -> String {
    let whole = amount.amount().abs().ceil().normalize().to_string();
    let digits = whole.split('.').next().unwrap_or("0");
    let grouped = group_thousands(digits);
    if amount.is_negative() {
        format!("({grouped})")
    } else {
        grouped
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn format_liability(amount: Money) -> String {
    if amount.is_zero() {
        NIL.to_string()
    } else {
        format_money(amount)
    }
}

pub fn format_etr(value: EtrValue) -> String {
    match value {
        EtrValue::Known(amount) => format_money(amount),
        EtrValue::Uncertain => UNCERTAIN_MARKER.to_string(),
    }
}

pub fn format_prescribed_part(value: PrescribedPart) -> String {
    match value {
        PrescribedPart::Amount(amount) => format_liability(amount),
        PrescribedPart::NotApplicable => NOT_APPLICABLE.to_string(),
    }
}

pub fn format_capital(value: CalledUpCapital) -> String {
    match value {
        CalledUpCapital::Amount(amount) => format_liability(amount),
        CalledUpCapital::NotDeterminable => TO_BE_CONFIRMED.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn money_rounds_up_and_groups() {
        assert_eq!(format_money(Money::new(dec!(1234567.01))), "1,234,568");
        assert_eq!(format_money(Money::new(dec!(999.00))), "999");
        assert_eq!(format_money(Money::from_units(1_000)), "1,000");
        assert_eq!(format_money(Money::ZERO), "0");
    }

    #[test]
    fn negatives_use_parentheses_and_round_away_from_zero() {
        assert_eq!(format_money(Money::new(dec!(-1234.20))), "(1,235)");
        assert_eq!(format_money(Money::new(dec!(-0.01))), "(1)");
    }

    #[test]
    fn sentinels_render_as_words() {
        assert_eq!(format_liability(Money::ZERO), "NIL");
        assert_eq!(format_liability(Money::from_units(12)), "12");
        assert_eq!(format_etr(EtrValue::Uncertain), "uncertain");
        assert_eq!(format_etr(EtrValue::Known(Money::from_units(5_000))), "5,000");
        assert_eq!(format_prescribed_part(PrescribedPart::NotApplicable), "N/A");
        assert_eq!(
            format_prescribed_part(PrescribedPart::Amount(Money::from_units(5_800))),
            "5,800"
        );
        assert_eq!(format_capital(CalledUpCapital::NotDeterminable), "TBC");
        assert_eq!(format_capital(CalledUpCapital::Amount(Money::ZERO)), "NIL");
    }
}
