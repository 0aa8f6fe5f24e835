use rust_decimal::Decimal;

use crate::shared::types::CurrencyCode;

/// Hand-maintained approximate value of one unit in MYR.
///
/// Last-resort basis for conversions when the provider is unusable. A code
/// missing from the table (MYR itself) counts as 1.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackTable;

impl FallbackTable {
    pub fn to_myr(&self, code: CurrencyCode) -> Option<Decimal> {
        let value = match code {
            CurrencyCode::Usd => Decimal::new(448, 2),
            CurrencyCode::Eur => Decimal::new(489, 2),
            CurrencyCode::Gbp => Decimal::new(568, 2),
            CurrencyCode::Jpy => Decimal::new(308, 4),
            CurrencyCode::Sgd => Decimal::new(331, 2),
            CurrencyCode::Aud => Decimal::new(298, 2),
            CurrencyCode::Cny => Decimal::new(618, 3),
            CurrencyCode::Thb => Decimal::new(129, 3),
            CurrencyCode::Idr => Decimal::new(291, 6),
            CurrencyCode::Krw => Decimal::new(337, 5),
            CurrencyCode::Hkd => Decimal::new(574, 3),
            CurrencyCode::Inr => Decimal::new(537, 4),
            CurrencyCode::Myr => return None,
        };
        Some(value)
    }

    /// `to_myr(from) / to_myr(to)`, each defaulting to 1.
    pub fn rate(&self, from: CurrencyCode, to: CurrencyCode) -> Decimal {
        let source = self.to_myr(from).unwrap_or(Decimal::ONE);
        let target = self.to_myr(to).unwrap_or(Decimal::ONE);
        source.checked_div(target).unwrap_or(Decimal::ONE)
    }
}
