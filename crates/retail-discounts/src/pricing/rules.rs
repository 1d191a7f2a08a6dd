use chrono::Datelike;
use serde::{Deserialize, Serialize};

use super::domain::{RuleContribution, Transaction};

/// Every rule the engine evaluates, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountRule {
    Expiry,
    Product,
    SpecialDate,
    Quantity,
    App,
    Visa,
}

impl DiscountRule {
    pub const ALL: [DiscountRule; 6] = [
        DiscountRule::Expiry,
        DiscountRule::Product,
        DiscountRule::SpecialDate,
        DiscountRule::Quantity,
        DiscountRule::App,
        DiscountRule::Visa,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DiscountRule::Expiry => "Expiry",
            DiscountRule::Product => "Product",
            DiscountRule::SpecialDate => "Special date",
            DiscountRule::Quantity => "Quantity",
            DiscountRule::App => "App purchase",
            DiscountRule::Visa => "Visa card",
        }
    }

    pub fn apply(&self, transaction: &Transaction) -> f64 {
        match self {
            DiscountRule::Expiry => expiry_discount(transaction),
            DiscountRule::Product => product_discount(transaction),
            DiscountRule::SpecialDate => special_date_discount(transaction),
            DiscountRule::Quantity => quantity_discount(transaction),
            DiscountRule::App => app_discount(transaction),
            DiscountRule::Visa => visa_discount(transaction),
        }
    }
}

pub(crate) fn contributions(transaction: &Transaction) -> Vec<RuleContribution> {
    DiscountRule::ALL
        .iter()
        .map(|rule| RuleContribution {
            rule: *rule,
            percent: rule.apply(transaction),
        })
        .collect()
}

/// One percent per day short of 30 for products close to expiry.
pub fn expiry_discount(transaction: &Transaction) -> f64 {
    let days = transaction.days_until_expiry();
    if days > 0 && days < 30 {
        (30 - days) as f64
    } else {
        0.0
    }
}

/// Cheese takes precedence over wine when a name mentions both.
pub fn product_discount(transaction: &Transaction) -> f64 {
    let name = transaction.product_name.to_lowercase();
    if name.contains("cheese") {
        10.0
    } else if name.contains("wine") {
        5.0
    } else {
        0.0
    }
}

/// March 23rd of any year.
pub fn special_date_discount(transaction: &Transaction) -> f64 {
    let date = transaction.occurred_on;
    if date.month() == 3 && date.day() == 23 {
        50.0
    } else {
        0.0
    }
}

/// Bulk tiers. A quantity of exactly 15 matches no tier and earns nothing.
pub fn quantity_discount(transaction: &Transaction) -> f64 {
    match transaction.quantity {
        6..=9 => 5.0,
        10..=14 => 7.0,
        q if q > 15 => 10.0,
        _ => 0.0,
    }
}

/// App purchases earn the quantity rounded up to a multiple of five, at least 5.
pub fn app_discount(transaction: &Transaction) -> f64 {
    if !transaction.via_app {
        return 0.0;
    }

    let rounded = transaction.quantity.div_ceil(5) * 5;
    match rounded {
        0..=5 => 5.0,
        6..=10 => 10.0,
        11..=15 => 15.0,
        _ => f64::from(rounded / 5 * 5),
    }
}

pub fn visa_discount(transaction: &Transaction) -> f64 {
    if transaction.payment_method.to_lowercase().contains("visa") {
        5.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn purchase(quantity: u32) -> Transaction {
        let occurred_on = NaiveDate::from_ymd_opt(2023, 4, 18).expect("valid purchase date");
        Transaction {
            occurred_on,
            product_name: "Milk - 1L".to_string(),
            expiry_date: occurred_on + Duration::days(90),
            quantity,
            unit_price: 2.5,
            via_app: false,
            payment_method: "Cash".to_string(),
        }
    }

    fn expiring_in(days: i64) -> Transaction {
        let mut transaction = purchase(1);
        transaction.expiry_date = transaction.occurred_on + Duration::days(days);
        transaction
    }

    #[test]
    fn expiry_scales_with_days_remaining() {
        assert_eq!(expiry_discount(&expiring_in(29)), 1.0);
        assert_eq!(expiry_discount(&expiring_in(9)), 21.0);
        assert_eq!(expiry_discount(&expiring_in(1)), 29.0);
    }

    #[test]
    fn expiry_ignores_same_day_and_distant_dates() {
        assert_eq!(expiry_discount(&expiring_in(0)), 0.0);
        assert_eq!(expiry_discount(&expiring_in(30)), 0.0);
        assert_eq!(expiry_discount(&expiring_in(-3)), 0.0);
    }

    #[test]
    fn product_matches_case_insensitive_substrings() {
        let mut transaction = purchase(1);
        transaction.product_name = "Cheddar CHEESE".to_string();
        assert_eq!(product_discount(&transaction), 10.0);

        transaction.product_name = "Wine - Red".to_string();
        assert_eq!(product_discount(&transaction), 5.0);

        transaction.product_name = "Cheese and wine hamper".to_string();
        assert_eq!(product_discount(&transaction), 10.0);

        transaction.product_name = "Bread".to_string();
        assert_eq!(product_discount(&transaction), 0.0);
    }

    #[test]
    fn special_date_ignores_year() {
        let mut transaction = purchase(1);
        transaction.occurred_on = NaiveDate::from_ymd_opt(1999, 3, 23).expect("valid date");
        assert_eq!(special_date_discount(&transaction), 50.0);

        transaction.occurred_on = NaiveDate::from_ymd_opt(2023, 3, 24).expect("valid date");
        assert_eq!(special_date_discount(&transaction), 0.0);
    }

    #[test]
    fn quantity_tiers_match_boundaries() {
        assert_eq!(quantity_discount(&purchase(5)), 0.0);
        assert_eq!(quantity_discount(&purchase(6)), 5.0);
        assert_eq!(quantity_discount(&purchase(9)), 5.0);
        assert_eq!(quantity_discount(&purchase(10)), 7.0);
        assert_eq!(quantity_discount(&purchase(14)), 7.0);
        assert_eq!(quantity_discount(&purchase(16)), 10.0);
    }

    #[test]
    fn quantity_of_fifteen_earns_no_discount() {
        assert_eq!(quantity_discount(&purchase(15)), 0.0);
    }

    #[test]
    fn app_rounds_quantity_up_to_multiple_of_five() {
        let via_app = |quantity| Transaction {
            via_app: true,
            ..purchase(quantity)
        };

        assert_eq!(app_discount(&via_app(0)), 5.0);
        assert_eq!(app_discount(&via_app(3)), 5.0);
        assert_eq!(app_discount(&via_app(7)), 10.0);
        assert_eq!(app_discount(&via_app(8)), 10.0);
        assert_eq!(app_discount(&via_app(11)), 15.0);
        assert_eq!(app_discount(&via_app(20)), 20.0);
        assert_eq!(app_discount(&via_app(21)), 25.0);
    }

    #[test]
    fn app_requires_app_channel() {
        assert_eq!(app_discount(&purchase(7)), 0.0);
    }

    #[test]
    fn visa_matches_substring() {
        let mut transaction = purchase(1);
        transaction.payment_method = "VISA Debit".to_string();
        assert_eq!(visa_discount(&transaction), 5.0);

        transaction.payment_method = "Mastercard".to_string();
        assert_eq!(visa_discount(&transaction), 0.0);
    }

    #[test]
    fn contributions_cover_every_rule_in_order() {
        let components = contributions(&purchase(1));
        let rules: Vec<DiscountRule> = components.iter().map(|c| c.rule).collect();
        assert_eq!(rules, DiscountRule::ALL.to_vec());
    }
}
