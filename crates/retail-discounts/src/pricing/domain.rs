use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::rules::DiscountRule;

/// A single retail purchase as received from ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub occurred_on: NaiveDate,
    pub product_name: String,
    pub expiry_date: NaiveDate,
    pub quantity: u32,
    pub unit_price: f64,
    pub via_app: bool,
    pub payment_method: String,
}

impl Transaction {
    /// Whole days between the purchase and the product's expiry date.
    pub fn days_until_expiry(&self) -> i64 {
        (self.expiry_date - self.occurred_on).num_days()
    }

    /// Undiscounted amount for the line.
    pub fn gross_amount(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

/// Output of a single rule, kept so callers can audit how a discount was reached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleContribution {
    pub rule: DiscountRule,
    pub percent: f64,
}

impl RuleContribution {
    pub fn applies(&self) -> bool {
        self.percent > 0.0
    }
}

/// Settled discount for a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountOutcome {
    pub discount_percent: f64,
    pub final_price: f64,
    pub components: Vec<RuleContribution>,
}

impl DiscountOutcome {
    /// Rules whose contribution made it into the top-two average.
    pub fn selected_rules(&self) -> Vec<DiscountRule> {
        let mut applied: Vec<&RuleContribution> =
            self.components.iter().filter(|c| c.applies()).collect();
        applied.sort_by(|a, b| b.percent.total_cmp(&a.percent));
        applied.into_iter().take(2).map(|c| c.rule).collect()
    }
}

/// Flat record handed to persistence, one row per transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedOrder {
    #[serde(rename = "Order_Date")]
    pub order_date: NaiveDate,
    #[serde(rename = "Product_Name")]
    pub product_name: String,
    #[serde(rename = "Expiry_Date")]
    pub expiry_date: NaiveDate,
    #[serde(rename = "Quantity")]
    pub quantity: u32,
    #[serde(rename = "Unit_Price")]
    pub unit_price: f64,
    #[serde(rename = "Discount")]
    pub discount: f64,
    #[serde(rename = "Final_Price")]
    pub final_price: f64,
}

impl PricedOrder {
    pub fn from_outcome(transaction: &Transaction, outcome: &DiscountOutcome) -> Self {
        Self {
            order_date: transaction.occurred_on,
            product_name: transaction.product_name.clone(),
            expiry_date: transaction.expiry_date,
            quantity: transaction.quantity,
            unit_price: transaction.unit_price,
            discount: outcome.discount_percent,
            final_price: outcome.final_price,
        }
    }

    /// Human-readable line for the append-only trace log (timestamp added by the log).
    pub fn trace_message(&self) -> String {
        format!(
            "Discount {}% applied to {}",
            self.discount, self.product_name
        )
    }
}
