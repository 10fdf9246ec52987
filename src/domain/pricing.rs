use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Pricing - Delivery fee tiers and order totals
// ============================================================================
//
// Shared by the client-side cart and the server-side order core so both
// compute the same subtotal / fee / total for the same lines.
//
// ============================================================================

/// Largest amount a money column (`NUMERIC(10, 2)`) can hold.
pub fn max_amount() -> Decimal {
    Decimal::new(9_999_999_999, 2)
}

/// Tiered delivery fee: a flat fee below the threshold, free at or above it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPolicy {
    pub fee: Decimal,
    pub free_threshold: Decimal,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            fee: Decimal::new(299, 2),
            free_threshold: Decimal::new(25, 0),
        }
    }
}

impl DeliveryPolicy {
    pub fn new(fee: Decimal, free_threshold: Decimal) -> Self {
        Self { fee, free_threshold }
    }

    pub fn fee_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal >= self.free_threshold {
            Decimal::ZERO
        } else {
            self.fee
        }
    }
}

/// Money amounts of an order, always rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
}

impl Totals {
    /// Compute totals from `(unit_price, quantity)` pairs. `None` when the
    /// amounts do not fit in a `Decimal`.
    pub fn compute<I>(lines: I, policy: &DeliveryPolicy) -> Option<Self>
    where
        I: IntoIterator<Item = (Decimal, i32)>,
    {
        let subtotal = lines.into_iter().try_fold(Decimal::ZERO, |sum, (price, quantity)| {
            price.checked_mul(Decimal::from(quantity)).and_then(|line| sum.checked_add(line))
        })?;
        let totals = Self::from_subtotal(subtotal, policy);
        let total = totals.subtotal.checked_add(totals.delivery_fee)?;
        Some(Self { total, ..totals })
    }

    /// Totals for an already summed subtotal. Saturates at `Decimal::MAX`.
    pub fn from_subtotal(subtotal: Decimal, policy: &DeliveryPolicy) -> Self {
        let subtotal = subtotal.round_dp(2);
        let delivery_fee = policy.fee_for(subtotal).round_dp(2);

        Self {
            subtotal,
            delivery_fee,
            total: subtotal.saturating_add(delivery_fee),
        }
    }

    /// Whether every amount fits the money columns.
    pub fn within_limits(&self) -> bool {
        self.total <= max_amount()
    }

    /// True when client-quoted amounts agree with these to the cent.
    pub fn matches(&self, other: &Totals) -> bool {
        self.subtotal == other.subtotal.round_dp(2)
            && self.delivery_fee == other.delivery_fee.round_dp(2)
            && self.total == other.total.round_dp(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_below_threshold_charges_fee() {
        let totals = Totals::compute(
            vec![(dec("8.99"), 2), (dec("3.99"), 1)],
            &DeliveryPolicy::default(),
        )
        .unwrap();

        assert_eq!(totals.subtotal, dec("21.97"));
        assert_eq!(totals.delivery_fee, dec("2.99"));
        assert_eq!(totals.total, dec("24.96"));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let totals = Totals::compute(vec![(dec("12.50"), 2)], &DeliveryPolicy::default()).unwrap();

        assert_eq!(totals.subtotal, dec("25.00"));
        assert_eq!(totals.delivery_fee, Decimal::ZERO);
        assert_eq!(totals.total, dec("25.00"));
    }

    #[test]
    fn test_just_below_threshold() {
        let policy = DeliveryPolicy::default();
        assert_eq!(policy.fee_for(dec("24.99")), dec("2.99"));
        assert_eq!(policy.fee_for(dec("25.01")), Decimal::ZERO);
    }

    #[test]
    fn test_custom_policy() {
        let policy = DeliveryPolicy::new(dec("4.50"), dec("40"));
        let totals = Totals::compute(vec![(dec("30.00"), 1)], &policy).unwrap();
        assert_eq!(totals.total, dec("34.50"));
    }

    #[test]
    fn test_empty_lines_still_charge_fee() {
        let totals = Totals::compute(Vec::new(), &DeliveryPolicy::default()).unwrap();
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.total, dec("2.99"));
    }

    #[test]
    fn test_matches_ignores_trailing_precision() {
        let totals = Totals::compute(vec![(dec("8.99"), 2)], &DeliveryPolicy::default()).unwrap();
        let quoted = Totals {
            subtotal: dec("17.980"),
            delivery_fee: dec("2.99"),
            total: dec("20.97"),
        };
        assert!(totals.matches(&quoted));

        let wrong = Totals { total: dec("19.99"), ..quoted };
        assert!(!totals.matches(&wrong));
    }

    #[test]
    fn test_overflowing_amounts_yield_none() {
        let policy = DeliveryPolicy::default();
        assert!(Totals::compute(vec![(Decimal::MAX, 2)], &policy).is_none());
        assert!(Totals::compute(vec![(Decimal::MAX, 1), (Decimal::MAX, 1)], &policy).is_none());
    }

    #[test]
    fn test_limits_follow_money_columns() {
        let policy = DeliveryPolicy::default();
        let at_limit = Totals::compute(vec![(max_amount(), 1)], &policy).unwrap();
        assert!(at_limit.within_limits());

        let over = Totals::compute(vec![(max_amount(), 2)], &policy).unwrap();
        assert!(!over.within_limits());
    }
}
