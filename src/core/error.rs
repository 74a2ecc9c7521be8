use thiserror::Error;

use super::types::Asset;

/// Every variant carries `actual_sum`, the total of all values supplied, so a
/// caller can always report what the user entered.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ValidationError {
    #[error("Portfolio allocation must total 100%, but you have {actual_sum}%.")]
    Total { actual_sum: i128 },
    #[error("Portfolio allocation is missing a share for {asset}")]
    MissingAsset { asset: Asset, actual_sum: i128 },
    #[error("Allocation for {asset} must be >= 0, got {value}")]
    NegativeShare {
        asset: Asset,
        value: i64,
        actual_sum: i128,
    },
    #[error("Unknown asset '{name}', expected one of Stocks, Bonds, Cash")]
    UnknownAsset { name: String, actual_sum: i128 },
    #[error("Allocation lists {asset} more than once")]
    DuplicateAsset { asset: Asset, actual_sum: i128 },
}

impl ValidationError {
    pub fn actual_sum(&self) -> i128 {
        match self {
            ValidationError::Total { actual_sum }
            | ValidationError::MissingAsset { actual_sum, .. }
            | ValidationError::NegativeShare { actual_sum, .. }
            | ValidationError::UnknownAsset { actual_sum, .. }
            | ValidationError::DuplicateAsset { actual_sum, .. } => *actual_sum,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("Unknown asset '{0}', expected one of Stocks, Bonds, Cash")]
pub struct ParseAssetError(pub String);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Unknown strategy '{0}'")]
    UnknownStrategy(String),
    #[error("Age must be between 18 and 100, got {0}")]
    AgeOutOfRange(u32),
    #[error("No historical return supplied for {0}")]
    MissingReturnData(Asset),
    #[error("Horizon must be a finite number of years >= 0, got {0}")]
    InvalidHorizon(f64),
}
