use log::debug;
use std::collections::BTreeMap;

use super::error::{Error, ValidationError};
use super::types::{
    Advice, Allocation, Asset, ComparisonResult, ComparisonRow, FULL_ALLOCATION, HistoricalReturns,
    RadarChart, RadarSeries, Recommendation,
};

/// Accepts a raw `name -> percent` mapping as a whole or not at all.
///
/// Asset names are matched case-insensitively, and two keys naming the same
/// asset are rejected. Every error carries `actual_sum`, the total of all
/// supplied values, widened so that no input can overflow it.
pub fn validate(raw: &BTreeMap<String, i64>) -> Result<Allocation, ValidationError> {
    let actual_sum: i128 = raw.values().map(|&value| i128::from(value)).sum();

    let mut shares: BTreeMap<Asset, i64> = BTreeMap::new();
    for (name, &value) in raw {
        let asset: Asset = name
            .parse()
            .map_err(|_| ValidationError::UnknownAsset {
                name: name.clone(),
                actual_sum,
            })?;
        if value < 0 {
            return Err(ValidationError::NegativeShare {
                asset,
                value,
                actual_sum,
            });
        }
        if shares.insert(asset, value).is_some() {
            return Err(ValidationError::DuplicateAsset { asset, actual_sum });
        }
    }

    let mut values = [0_u32; 3];
    for (slot, asset) in values.iter_mut().zip(Asset::ALL) {
        let value = *shares
            .get(&asset)
            .ok_or(ValidationError::MissingAsset { asset, actual_sum })?;
        *slot = u32::try_from(value).map_err(|_| ValidationError::Total { actual_sum })?;
    }

    if actual_sum != i128::from(FULL_ALLOCATION) {
        return Err(ValidationError::Total { actual_sum });
    }
    let [stocks, bonds, cash] = values;
    Allocation::new(stocks, bonds, cash)
}

/// Lines the user allocation up against a strategy target. Both sides are
/// already validated; rows and recommendations follow `Asset::ALL`.
pub fn compare(user: &Allocation, strategy: &Allocation) -> ComparisonResult {
    let rows: Vec<ComparisonRow> = Asset::ALL
        .into_iter()
        .map(|asset| ComparisonRow {
            asset,
            user: user.get(asset),
            strategy: strategy.get(asset),
        })
        .collect();

    let moves: Vec<Recommendation> = rows
        .iter()
        .map(|row| Recommendation {
            asset: row.asset,
            delta: row.strategy as i32 - row.user as i32,
        })
        .filter(|rec| rec.delta != 0)
        .collect();

    let advice = if moves.is_empty() {
        Advice::Aligned
    } else {
        Advice::Rebalance(moves)
    };
    debug!("compared {:?} against {:?}: {:?}", user, strategy, advice);

    ComparisonResult {
        user: *user,
        strategy: *strategy,
        rows,
        advice,
    }
}

/// Compound growth of `allocation` over `years` at the blended annual return:
/// `(1 + sum(share/100 * return/100))^years - 1`. No rounding is applied.
pub fn future_yield(
    allocation: &Allocation,
    years: f64,
    returns: &HistoricalReturns,
) -> Result<f64, Error> {
    if !years.is_finite() || years < 0.0 {
        return Err(Error::InvalidHorizon(years));
    }

    let mut blended = 0.0;
    for (asset, share) in allocation.iter() {
        let annual = returns.get(asset).ok_or(Error::MissingReturnData(asset))?;
        blended += f64::from(share) / 100.0 * annual / 100.0;
    }

    Ok((1.0 + blended).powf(years) - 1.0)
}

pub fn radar_chart(result: &ComparisonResult) -> RadarChart {
    RadarChart {
        title: "Portfolio vs Strategy Allocation",
        axes: Asset::ALL.to_vec(),
        radial_range: [0, 100],
        series: vec![
            RadarSeries {
                name: "Your Portfolio",
                values: result.user.values().to_vec(),
            },
            RadarSeries {
                name: "Strategy",
                values: result.strategy.values().to_vec(),
            },
        ],
    }
}
