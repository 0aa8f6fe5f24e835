//! Ordered currency pattern table
//!
//! Scan order is check priority and the first rule that yields a positive
//! amount wins. Symbol rules come before code-word rules, and the lettered
//! dollar prefixes (`HK$`, `S$`, `A$`) come before the bare `$`.

use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;

use crate::shared::types::CurrencyCode;

/// Numeric token: digit groups with optional thousands commas and an
/// optional fractional part.
pub const AMOUNT_PATTERN: &str = r"[0-9,]+\.?[0-9]*";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Symbol,
    CodeWord,
}

#[derive(Debug, Clone)]
pub struct PatternRule {
    pub label: &'static str,
    pub kind: RuleKind,
    pub pattern: Regex,
    pub currency: CurrencyCode,
    pub divider: Decimal,
}

// (label, regex with `{amount}` placeholder, currency, divider)
const SYMBOL_RULES: &[(&str, &str, CurrencyCode, i64)] = &[
    ("HK$", r"\bHK\$\s*{amount}", CurrencyCode::Hkd, 1),
    ("S$", r"\bS\$\s*{amount}", CurrencyCode::Sgd, 1),
    ("A$", r"\bA\$\s*{amount}", CurrencyCode::Aud, 1),
    ("$", r"\$\s*{amount}", CurrencyCode::Usd, 1),
    ("€", r"€\s*{amount}", CurrencyCode::Eur, 1),
    ("£", r"£\s*{amount}", CurrencyCode::Gbp, 1),
    ("¥", r"¥\s*{amount}", CurrencyCode::Jpy, 1),
    ("₹", r"₹\s*{amount}", CurrencyCode::Inr, 1),
    ("₩", r"₩\s*{amount}", CurrencyCode::Krw, 1),
    ("RM", r"\bRM\s*{amount}", CurrencyCode::Myr, 1),
    ("¢", r"{amount}\s*¢", CurrencyCode::Usd, 100),
];

// (label, alternation of words following the amount, currency)
const CODE_WORD_RULES: &[(&str, &str, CurrencyCode)] = &[
    ("USD", "usd|dollars?", CurrencyCode::Usd),
    ("EUR", "eur|euros?", CurrencyCode::Eur),
    ("GBP", "gbp|pounds?", CurrencyCode::Gbp),
    ("JPY", "jpy|yen", CurrencyCode::Jpy),
    ("SGD", "sgd", CurrencyCode::Sgd),
    ("AUD", "aud", CurrencyCode::Aud),
    ("CNY", "cny|yuan|rmb", CurrencyCode::Cny),
    ("THB", "thb|baht", CurrencyCode::Thb),
    ("IDR", "idr|rupiah", CurrencyCode::Idr),
    ("KRW", "krw|won", CurrencyCode::Krw),
    ("HKD", "hkd", CurrencyCode::Hkd),
    ("INR", "inr|rupees?", CurrencyCode::Inr),
    ("MYR", "myr|ringgit", CurrencyCode::Myr),
];

#[derive(Debug, Clone)]
pub struct PatternCatalog {
    rules: Vec<PatternRule>,
}

impl PatternCatalog {
    pub fn new() -> Self {
        let symbols = SYMBOL_RULES.iter().map(|&(label, template, currency, divider)| PatternRule {
            label,
            kind: RuleKind::Symbol,
            pattern: Regex::new(&template.replace("{amount}", AMOUNT_PATTERN))
                .expect("valid currency symbol regex"),
            currency,
            divider: Decimal::from(divider),
        });

        let code_words = CODE_WORD_RULES.iter().map(|&(label, words, currency)| PatternRule {
            label,
            kind: RuleKind::CodeWord,
            pattern: Regex::new(&format!(r"(?i){}\s*(?:{})", AMOUNT_PATTERN, words))
                .expect("valid currency code regex"),
            currency,
            divider: Decimal::ONE,
        });

        Self {
            rules: symbols.chain(code_words).collect(),
        }
    }

    /// Process-wide catalog; the regexes are compiled once.
    pub fn global() -> &'static PatternCatalog {
        static CATALOG: OnceLock<PatternCatalog> = OnceLock::new();
        CATALOG.get_or_init(PatternCatalog::new)
    }

    /// Rules in scan order.
    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }
}

impl Default for PatternCatalog {
    fn default() -> Self {
        Self::new()
    }
}
