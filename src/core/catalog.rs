use std::fmt;
use std::str::FromStr;

use super::error::Error;
use super::types::Allocation;

pub const MIN_AGE: u32 = 18;
pub const MAX_AGE: u32 = 100;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Strategy {
    HundredMinusAge,
    ModernPortfolioTheory,
    Balanced,
    AggressiveGrowth,
}

/// The fixed strategy table, in the order strategies are offered to the user.
pub const STRATEGIES: [Strategy; 4] = [
    Strategy::HundredMinusAge,
    Strategy::ModernPortfolioTheory,
    Strategy::Balanced,
    Strategy::AggressiveGrowth,
];

impl Strategy {
    pub fn name(self) -> &'static str {
        match self {
            Strategy::HundredMinusAge => "100-age rule",
            Strategy::ModernPortfolioTheory => "Modern Portfolio Theory",
            Strategy::Balanced => "Balanced Portfolio",
            Strategy::AggressiveGrowth => "Aggressive Growth",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Strategy::HundredMinusAge => "100-age-rule",
            Strategy::ModernPortfolioTheory => "modern-portfolio-theory",
            Strategy::Balanced => "balanced-portfolio",
            Strategy::AggressiveGrowth => "aggressive-growth",
        }
    }

    pub fn uses_age(self) -> bool {
        matches!(self, Strategy::HundredMinusAge)
    }

    /// Target allocation for `age`. Only the 100-age rule reads the age, and
    /// only it rejects an age outside `MIN_AGE..=MAX_AGE`.
    pub fn target(self, age: u32) -> Result<Allocation, Error> {
        Ok(match self {
            Strategy::HundredMinusAge => {
                if !(MIN_AGE..=MAX_AGE).contains(&age) {
                    return Err(Error::AgeOutOfRange(age));
                }
                Allocation::fixed(MAX_AGE - age, age, 0)
            }
            Strategy::ModernPortfolioTheory => Allocation::fixed(60, 30, 10),
            Strategy::Balanced => Allocation::fixed(50, 40, 10),
            Strategy::AggressiveGrowth => Allocation::fixed(80, 15, 5),
        })
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    /// Accepts either the display name or its kebab-case slug.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        STRATEGIES
            .into_iter()
            .find(|strategy| {
                strategy.name().eq_ignore_ascii_case(needle)
                    || strategy.slug().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| Error::UnknownStrategy(s.to_string()))
    }
}

pub fn list_strategies() -> Vec<&'static str> {
    STRATEGIES.iter().map(|strategy| strategy.name()).collect()
}

pub fn evaluate_strategy(name: &str, age: u32) -> Result<Allocation, Error> {
    name.parse::<Strategy>()?.target(age)
}
