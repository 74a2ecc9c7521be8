mod catalog;
mod engine;
mod error;
mod types;

pub use catalog::{MAX_AGE, MIN_AGE, STRATEGIES, Strategy, evaluate_strategy, list_strategies};
pub use engine::{compare, future_yield, radar_chart, validate};
pub use error::{Error, ParseAssetError, ValidationError};
pub use types::{
    ALIGNED_MESSAGE, Action, Advice, Allocation, Asset, ComparisonResult, ComparisonRow,
    FULL_ALLOCATION, HistoricalReturns, REBALANCE_HEADING, RadarChart, RadarSeries,
    Recommendation,
};
