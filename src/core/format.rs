//! Labels shown by the overlay and the settings page.

use chrono::Duration;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::core::rates::{CacheSummary, RatePair};
use crate::shared::types::CurrencyCode;

/// `RM1,234.5 MYR` style label: symbol, grouped amount, code.
pub fn format_amount(amount: Decimal, currency: CurrencyCode) -> String {
    format!(
        "{}{} {}",
        currency.symbol().unwrap_or(""),
        group_thousands(amount),
        currency
    )
}

/// `1 USD = 4.4800 MYR`
pub fn rate_label(pair: RatePair, rate: Decimal) -> String {
    format!("1 {} = {:.4} {}", pair.from, rate, pair.to)
}

/// Coarse age of a cached rate: seconds, minutes, hours, then days.
pub fn age_label(age: Duration) -> String {
    let seconds = age.num_seconds().max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;

    if minutes < 1 {
        format!("{}s ago", seconds)
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else {
        format!("{}d ago", hours / 24)
    }
}

/// Short age without seconds, used in the cache summary.
fn short_age(age: Duration) -> String {
    let minutes = age.num_minutes().max(0);
    let hours = minutes / 60;
    if minutes < 60 {
        format!("{}m", minutes)
    } else if hours < 24 {
        format!("{}h", hours)
    } else {
        format!("{}d", hours / 24)
    }
}

pub fn summary_label(summary: Option<&CacheSummary>) -> String {
    match summary {
        Some(s) => format!(
            "Cached rates: {} pairs, oldest {} ago, newest {} ago",
            s.pairs,
            short_age(s.oldest),
            short_age(s.newest)
        ),
        None => "No cached rates found".to_string(),
    }
}

/// Group the integer part with commas and keep at most three fraction digits.
fn group_thousands(amount: Decimal) -> String {
    let rounded = amount
        .round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    let text = rounded.abs().to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    match frac_part {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}
