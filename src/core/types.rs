use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::error::{ParseAssetError, ValidationError};

pub const FULL_ALLOCATION: u32 = 100;

pub const ALIGNED_MESSAGE: &str = "Your portfolio is perfectly aligned with the chosen strategy!";
pub const REBALANCE_HEADING: &str = "To align with the chosen strategy, consider these changes:";

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum Asset {
    #[serde(alias = "stocks")]
    Stocks,
    #[serde(alias = "bonds")]
    Bonds,
    #[serde(alias = "cash")]
    Cash,
}

impl Asset {
    /// Display order used for table rows, chart axes and recommendations.
    pub const ALL: [Asset; 3] = [Asset::Stocks, Asset::Bonds, Asset::Cash];

    pub fn name(self) -> &'static str {
        match self {
            Asset::Stocks => "Stocks",
            Asset::Bonds => "Bonds",
            Asset::Cash => "Cash",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Asset {
    type Err = ParseAssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Asset::ALL
            .into_iter()
            .find(|asset| asset.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseAssetError(s.to_string()))
    }
}

/// Percentage split across the three assets. Always sums to 100; the only
/// constructors are the validator and the strategy catalog.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Allocation {
    #[serde(rename = "Stocks")]
    stocks: u32,
    #[serde(rename = "Bonds")]
    bonds: u32,
    #[serde(rename = "Cash")]
    cash: u32,
}

impl Allocation {
    pub fn new(stocks: u32, bonds: u32, cash: u32) -> Result<Self, ValidationError> {
        let actual_sum = i128::from(stocks) + i128::from(bonds) + i128::from(cash);
        if actual_sum != i128::from(FULL_ALLOCATION) {
            return Err(ValidationError::Total { actual_sum });
        }
        Ok(Self {
            stocks,
            bonds,
            cash,
        })
    }

    /// Catalog entries are correct by construction, so they skip the sum check.
    pub(crate) const fn fixed(stocks: u32, bonds: u32, cash: u32) -> Self {
        Self {
            stocks,
            bonds,
            cash,
        }
    }

    pub fn get(&self, asset: Asset) -> u32 {
        match asset {
            Asset::Stocks => self.stocks,
            Asset::Bonds => self.bonds,
            Asset::Cash => self.cash,
        }
    }

    pub fn total(&self) -> u32 {
        self.stocks + self.bonds + self.cash
    }

    pub fn iter(&self) -> impl Iterator<Item = (Asset, u32)> + '_ {
        Asset::ALL.into_iter().map(|asset| (asset, self.get(asset)))
    }

    pub fn values(&self) -> [u32; 3] {
        [self.stocks, self.bonds, self.cash]
    }
}

/// Assumed annual percentage return per asset, e.g. `7.0` for 7%.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct HistoricalReturns(BTreeMap<Asset, f64>);

impl HistoricalReturns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, asset: Asset, annual_return: f64) -> Self {
        self.0.insert(asset, annual_return);
        self
    }

    pub fn get(&self, asset: Asset) -> Option<f64> {
        self.0.get(&asset).copied()
    }
}

impl FromIterator<(Asset, f64)> for HistoricalReturns {
    fn from_iter<I: IntoIterator<Item = (Asset, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Action {
    Buy(u32),
    Sell(u32),
    Hold,
}

/// Signed move for one asset: `strategy% - user%`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub asset: Asset,
    pub delta: i32,
}

impl Recommendation {
    pub fn action(&self) -> Action {
        match self.delta {
            d if d > 0 => Action::Buy(d.unsigned_abs()),
            d if d < 0 => Action::Sell(d.unsigned_abs()),
            _ => Action::Hold,
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action() {
            Action::Buy(pct) => write!(f, "Buy {pct}% more of {}.", self.asset),
            Action::Sell(pct) => write!(f, "Sell {pct}% of {}.", self.asset),
            Action::Hold => write!(f, "Hold {}.", self.asset),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRow {
    pub asset: Asset,
    pub user: u32,
    pub strategy: u32,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Advice {
    Aligned,
    Rebalance(Vec<Recommendation>),
}

impl Advice {
    pub fn lines(&self) -> Vec<String> {
        match self {
            Advice::Aligned => Vec::new(),
            Advice::Rebalance(moves) => moves.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ComparisonResult {
    pub user: Allocation,
    pub strategy: Allocation,
    pub rows: Vec<ComparisonRow>,
    pub advice: Advice,
}

impl ComparisonResult {
    pub fn is_aligned(&self) -> bool {
        matches!(self.advice, Advice::Aligned)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarSeries {
    pub name: &'static str,
    pub values: Vec<u32>,
}

/// Data behind the "Portfolio vs Strategy Allocation" radar chart. Styling is
/// left to whoever draws it.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarChart {
    pub title: &'static str,
    pub axes: Vec<Asset>,
    pub radial_range: [u32; 2],
    pub series: Vec<RadarSeries>,
}
