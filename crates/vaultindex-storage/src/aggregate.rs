//! Daily bucketing with exact 256-bit sums, for backends that cannot sum
//! `uint256` decimal strings natively.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use alloy_primitives::U256;
use chrono::{DateTime, NaiveDate, Utc};

use vaultindex_core::error::IndexerError;
use vaultindex_core::types::{DailyAggregate, EventKind};

/// Fold `(asset, kind, timestamp, assets)` rows into per-day buckets ordered by
/// asset, day descending, then event type.
pub(crate) fn fold_daily<I, S>(rows: I) -> Result<Vec<DailyAggregate>, IndexerError>
where
    I: IntoIterator<Item = (S, EventKind, DateTime<Utc>, S)>,
    S: AsRef<str>,
{
    let mut buckets: BTreeMap<(String, Reverse<NaiveDate>, EventKind), (U256, u64)> =
        BTreeMap::new();

    for (asset, kind, ts, amount) in rows {
        let amount = parse_amount(amount.as_ref())?;
        let key = (asset.as_ref().to_string(), Reverse(ts.date_naive()), kind);
        let (sum, count) = buckets.entry(key).or_insert((U256::ZERO, 0));
        *sum = sum.checked_add(amount).ok_or_else(|| {
            IndexerError::Storage("assets sum overflowed 256 bits".into())
        })?;
        *count += 1;
    }

    Ok(buckets
        .into_iter()
        .map(|((asset, Reverse(day), event_type), (sum, count))| DailyAggregate {
            asset,
            event_type,
            day,
            total_assets: sum.to_string(),
            event_count: count,
        })
        .collect())
}

fn parse_amount(s: &str) -> Result<U256, IndexerError> {
    U256::from_str_radix(s, 10)
        .map_err(|e| IndexerError::Storage(format!("invalid stored amount '{s}': {e}")))
}
