//! Fixed-point formatting for currency, quantities and percentages.

use rust_decimal::{Decimal, RoundingStrategy};

/// Formats an amount as US dollars: two decimals, comma thousands separators,
/// leading minus for negatives. `1234.5` becomes `$1,234.50`.
pub fn format_currency(amount: Decimal) -> String {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    rounded.set_sign_positive(true);
    rounded.rescale(2);

    let text = rounded.to_string();
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    let sign = if negative { "-" } else { "" };
    format!("{sign}${}.{frac_part}", group_thousands(int_part))
}

/// Quantities drop trailing zeros: `2.00` renders as `2`, `1.50` as `1.5`.
pub fn format_quantity(quantity: Decimal) -> String {
    let normalized = quantity.normalize();
    let text = normalized.to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };
    match frac_part {
        Some(f) => format!("{sign}{}.{f}", group_thousands(digits)),
        None => format!("{sign}{}", group_thousands(digits)),
    }
}

pub fn format_percent(percent: Decimal) -> String {
    format!("{}%", format_quantity(percent))
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
