use super::domain::{DiscountOutcome, Transaction};
use super::rules;

/// Stateless evaluator applying every rule to a transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscountEngine;

impl DiscountEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, transaction: &Transaction) -> DiscountOutcome {
        let components = rules::contributions(transaction);
        let percents: Vec<f64> = components.iter().map(|c| c.percent).collect();
        let discount_percent = select_discount(&percents);

        DiscountOutcome {
            discount_percent,
            final_price: final_price(transaction, discount_percent),
            components,
        }
    }
}

/// Evaluates a transaction, returning the discount percentage and final price.
pub fn evaluate(transaction: &Transaction) -> (f64, f64) {
    let outcome = DiscountEngine::new().evaluate(transaction);
    (outcome.discount_percent, outcome.final_price)
}

/// Mean of the two largest positive values; the lone value or 0.0 when fewer apply.
pub fn select_discount(percents: &[f64]) -> f64 {
    let mut applicable: Vec<f64> = percents.iter().copied().filter(|p| *p > 0.0).collect();
    applicable.sort_by(|a, b| b.total_cmp(a));

    match applicable.as_slice() {
        [] => 0.0,
        [only] => *only,
        [first, second, ..] => (first + second) / 2.0,
    }
}

/// Not clamped: a discount above 100 would yield a negative price.
pub fn final_price(transaction: &Transaction, discount_percent: f64) -> f64 {
    transaction.unit_price * f64::from(transaction.quantity) * (1.0 - discount_percent / 100.0)
}
