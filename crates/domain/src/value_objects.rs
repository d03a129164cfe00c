//! Value objects shared by the catalog and order modules.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Money amount represented in cents to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = 10.00)
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates a new Money amount from a whole-unit value.
    pub fn from_dollars(dollars: i64) -> Self {
        Self {
            cents: dollars * 100,
        }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the whole-unit portion.
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: i64) -> Money {
        Money {
            cents: self.cents * quantity,
        }
    }

    /// Returns this amount reduced by `percent`, rounded half-up to the cent.
    pub fn discounted(&self, percent: i64) -> Money {
        if percent == 0 {
            return *self;
        }
        Money {
            cents: (self.cents * (100 - percent) + 50).div_euclid(100),
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-{}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "{}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents += rhs.cents;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// Product category tag.
///
/// Only `Premium` has pricing significance: enough premium lines in one
/// order unlock the bulk discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Premium,
    Regular,
    Budget,
}

impl Category {
    /// Returns the stored name of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Premium => "Premium",
            Category::Regular => "Regular",
            Category::Budget => "Budget",
        }
    }

    pub fn is_premium(&self) -> bool {
        matches!(self, Category::Premium)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A category name that is not one of the known tags.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown product category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Premium" => Ok(Category::Premium),
            "Regular" => Ok(Category::Regular),
            "Budget" => Ok(Category::Budget),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_cents() {
        let money = Money::from_cents(1234);
        assert_eq!(money.cents(), 1234);
        assert_eq!(money.dollars(), 12);
        assert_eq!(money.cents_part(), 34);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(1234).to_string(), "12.34");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-12.34");
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!(a.multiply(3).cents(), 3000);

        let total: Money = [a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_discount_is_exact_on_whole_amounts() {
        assert_eq!(Money::from_dollars(120).discounted(10), Money::from_dollars(108));
        assert_eq!(Money::from_dollars(120).discounted(0), Money::from_dollars(120));
    }

    #[test]
    fn test_discount_rounds_half_up() {
        // 0.15 * 0.9 = 0.135
        assert_eq!(Money::from_cents(15).discounted(10).cents(), 14);
        // 0.11 * 0.9 = 0.099
        assert_eq!(Money::from_cents(11).discounted(10).cents(), 10);
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("Premium".parse::<Category>(), Ok(Category::Premium));
        assert_eq!("Budget".parse::<Category>(), Ok(Category::Budget));
        assert_eq!(
            "premium".parse::<Category>(),
            Err(UnknownCategory("premium".to_string()))
        );
        assert!(Category::Premium.is_premium());
        assert!(!Category::Regular.is_premium());
    }
}
