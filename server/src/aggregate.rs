use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use shared::models::{BuoyRecord, FeedType};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::TtlCache;
use crate::diagnostics::DiagnosticSink;
use crate::feeds::{fetch_feed, FeedResult, FeedSource};
use crate::fields;
use crate::rama;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub total_buoys: usize,
    pub active_buoys: usize,
    pub buoys_with_data: usize,
    pub buoys_without_data: usize,
    /// `None` when no record carries a numeric reading.
    pub avg_temperature: Option<f64>,
    pub avg_salinity: Option<f64>,
}

impl SummaryStats {
    pub fn from_records(records: &[BuoyRecord]) -> SummaryStats {
        let with_data = records.iter().filter(|r| r.has_readings()).count();
        SummaryStats {
            total_buoys: records.len(),
            active_buoys: records.len(),
            buoys_with_data: with_data,
            buoys_without_data: records.len() - with_data,
            avg_temperature: mean_reading(records, fields::SEA_SURFACE_TEMPERATURE.name),
            avg_salinity: mean_reading(records, fields::SALINITY.name),
        }
    }
}

/// Mean of the numeric readings of `parameter`, rounded to two decimals.
fn mean_reading(records: &[BuoyRecord], parameter: &str) -> Option<f64> {
    let values: Vec<f64> = records
        .iter()
        .filter_map(|r| r.reading(parameter)?.as_f64())
        .collect();
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Some((mean * 100.0).round() / 100.0)
}

/// Everything the dashboard map needs in one response.
#[derive(Clone, Debug, Serialize)]
pub struct BuoyListing {
    pub success: bool,
    pub argo: Vec<BuoyRecord>,
    pub moored: Vec<BuoyRecord>,
    /// RAMA FeatureCollection as served upstream.
    pub rama: Value,
    /// Normalized records of every feed.
    pub records: Vec<BuoyRecord>,
    pub stats: SummaryStats,
    /// Records in each upstream payload, before normalization.
    pub networks: BTreeMap<FeedType, usize>,
    /// Records that survived normalization.
    pub survivors: BTreeMap<FeedType, usize>,
}

impl BuoyListing {
    pub fn from_results(results: Vec<FeedResult>) -> BuoyListing {
        let mut listing = BuoyListing {
            success: true,
            argo: Vec::new(),
            moored: Vec::new(),
            rama: rama::empty_collection(),
            records: Vec::new(),
            stats: SummaryStats::from_records(&[]),
            networks: FeedType::ALL.iter().map(|feed| (*feed, 0)).collect(),
            survivors: FeedType::ALL.iter().map(|feed| (*feed, 0)).collect(),
        };

        for result in results {
            listing.networks.insert(result.feed, result.normalized.raw_count);
            listing
                .survivors
                .insert(result.feed, result.normalized.records.len());

            let records = result.normalized.records;
            listing.records.extend(records.iter().cloned());
            match result.feed {
                FeedType::Argo => listing.argo = records,
                FeedType::Moored => listing.moored = records,
                FeedType::Rama => {
                    if let Some(raw) = result.raw {
                        listing.rama = raw;
                    }
                }
                FeedType::Omni => {}
            }
        }

        listing.stats = SummaryStats::from_records(&listing.records);
        listing
    }

    /// Looks a record up by its synthetic id, then by the provider id.
    pub fn find(&self, id: &str) -> Option<&BuoyRecord> {
        self.records
            .iter()
            .find(|r| r.id == id)
            .or_else(|| self.records.iter().find(|r| r.buoy_id == id))
    }
}

/// One slot per feed. Failed fetches are never stored, so a transient
/// outage of one feed is retried on the next request.
pub struct FeedCache {
    slots: BTreeMap<FeedType, TtlCache<FeedResult>>,
}

impl FeedCache {
    pub fn new(ttl: Duration) -> FeedCache {
        FeedCache {
            slots: FeedType::ALL
                .iter()
                .map(|feed| (*feed, TtlCache::new(ttl)))
                .collect(),
        }
    }

    async fn fetch(
        &self,
        source: &dyn FeedSource,
        feed: FeedType,
        sink: &dyn DiagnosticSink,
    ) -> FeedResult {
        let result = match self.slots.get(&feed) {
            Some(slot) => {
                slot.get_or_refresh_if(
                    || fetch_feed(source, feed, sink),
                    |result| result.failure.is_none(),
                )
                .await
            }
            None => Arc::new(fetch_feed(source, feed, sink).await),
        };
        Arc::try_unwrap(result).unwrap_or_else(|shared| (*shared).clone())
    }
}

/// Fetches every feed concurrently. A failing feed contributes nothing and
/// does not hold back the others; successful feeds are served from `cache`.
pub async fn list_buoys(
    source: &dyn FeedSource,
    sink: &dyn DiagnosticSink,
    cache: &FeedCache,
) -> BuoyListing {
    let results = join_all(
        FeedType::ALL
            .iter()
            .map(|feed| cache.fetch(source, *feed, sink)),
    )
    .await;
    BuoyListing::from_results(results)
}
