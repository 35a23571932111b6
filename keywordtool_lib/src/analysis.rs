//! Summary statistics and presentation filters over ranked keywords.
//!
//! All functions operate on slices of [`RankedKeywordRecord`] and never
//! change ranks. They do not perform network calls.

use std::collections::BTreeMap;

use searchad_api::types::CompetitionLevel;
use serde::Serialize;

use crate::processor::{round1, share, KeywordResultSet, RankedKeywordRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordStats {
    pub keyword_count: usize,
    pub total_searches: u64,
    /// Mean total, one decimal.
    pub mean_searches: f64,
    pub median_searches: u64,
    pub max_searches: u64,
    pub min_searches: u64,
    pub pc_share: f64,
    pub mobile_share: f64,
    /// Percent of all searches held by the busiest tenth of keywords (at
    /// least one keyword).
    pub top_decile_share: f64,
    pub competition: BTreeMap<CompetitionLevel, usize>,
}

/// Opportunity score for one keyword, 0-100. Higher means more searches
/// for less competition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordDifficulty {
    pub keyword_text: String,
    pub rank: usize,
    pub score: u8,
}

/// PC vs mobile share of all searches, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeviceDistribution {
    pub pc: f64,
    pub mobile: f64,
}

/// Aggregate statistics, or `None` for an empty slice.
pub fn keyword_stats(records: &[RankedKeywordRecord]) -> Option<KeywordStats> {
    if records.is_empty() {
        return None;
    }
    let mut totals: Vec<u64> = records.iter().map(|r| r.total_monthly_searches).collect();
    totals.sort_unstable();

    let sum = saturating_sum(totals.iter().copied());
    let mid = totals.len() / 2;
    let median = if totals.len() % 2 == 0 {
        ((totals[mid - 1] as u128 + totals[mid] as u128) / 2) as u64
    } else {
        totals[mid]
    };

    let mut competition = BTreeMap::new();
    for r in records {
        *competition.entry(r.competition_level).or_insert(0) += 1;
    }
    let device = device_distribution(records);

    Some(KeywordStats {
        keyword_count: records.len(),
        total_searches: sum,
        mean_searches: round1(sum as f64 / records.len() as f64),
        median_searches: median,
        max_searches: totals[totals.len() - 1],
        min_searches: totals[0],
        pc_share: device.pc,
        mobile_share: device.mobile,
        top_decile_share: top_decile_share(&totals, sum),
        competition,
    })
}

fn saturating_sum(values: impl Iterator<Item = u64>) -> u64 {
    values.fold(0u64, u64::saturating_add)
}

/// `sorted` ascending.
fn top_decile_share(sorted: &[u64], sum: u64) -> f64 {
    let count = (sorted.len() / 10).max(1);
    let top = saturating_sum(sorted.iter().rev().take(count).copied());
    share(top, sum)
}

pub fn device_distribution(records: &[RankedKeywordRecord]) -> DeviceDistribution {
    let pc = saturating_sum(records.iter().map(|r| r.pc_monthly_searches.value));
    let mobile = saturating_sum(records.iter().map(|r| r.mobile_monthly_searches.value));
    let total = pc.saturating_add(mobile);
    DeviceDistribution {
        pc: share(pc, total),
        mobile: share(mobile, total),
    }
}

fn competition_weight(level: CompetitionLevel) -> f64 {
    match level {
        CompetitionLevel::Low => 1.0,
        CompetitionLevel::Medium => 2.0,
        CompetitionLevel::High => 3.0,
        CompetitionLevel::Unknown => 1.5,
    }
}

/// Scores every record in rank order.
///
/// Raw score is `0.7 * ln(1 + total) / max ln(1 + total)` minus
/// `0.3 * competition / 3`, with competition weighted low 1, medium 2,
/// high 3, unknown 1.5. Raw scores are rescaled to 0-100 across the slice;
/// when they are all equal every keyword gets 50.
pub fn keyword_difficulty(records: &[RankedKeywordRecord]) -> Vec<KeywordDifficulty> {
    let log_volumes: Vec<f64> = records
        .iter()
        .map(|r| (r.total_monthly_searches as f64).ln_1p())
        .collect();
    let max_log = log_volumes.iter().copied().fold(0.0, f64::max);

    let raw: Vec<f64> = records
        .iter()
        .zip(&log_volumes)
        .map(|(r, log)| {
            let volume = if max_log > 0.0 { log / max_log } else { 0.0 };
            volume * 0.7 - competition_weight(r.competition_level) / 3.0 * 0.3
        })
        .collect();

    let min = raw.iter().copied().fold(f64::INFINITY, f64::min);
    let max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    records
        .iter()
        .zip(raw)
        .map(|(r, score)| KeywordDifficulty {
            keyword_text: r.keyword_text.clone(),
            rank: r.rank,
            score: if range > 0.0 {
                ((score - min) / range * 100.0).round_ties_even() as u8
            } else {
                50
            },
        })
        .collect()
}

/// Keeps records with at least `min_total` searches whose competition level
/// is in `competition`. An empty `competition` slice matches every level.
pub fn filter_keywords(
    records: &[RankedKeywordRecord],
    min_total: u64,
    competition: &[CompetitionLevel],
) -> Vec<RankedKeywordRecord> {
    records
        .iter()
        .filter(|r| r.total_monthly_searches >= min_total)
        .filter(|r| competition.is_empty() || competition.contains(&r.competition_level))
        .cloned()
        .collect()
}

impl KeywordResultSet {
    pub fn stats(&self) -> Option<KeywordStats> {
        keyword_stats(self.records())
    }

    pub fn device_distribution(&self) -> DeviceDistribution {
        device_distribution(self.records())
    }

    pub fn difficulty(&self) -> Vec<KeywordDifficulty> {
        keyword_difficulty(self.records())
    }

    pub fn filter(
        &self,
        min_total: u64,
        competition: &[CompetitionLevel],
    ) -> Vec<RankedKeywordRecord> {
        filter_keywords(self.records(), min_total, competition)
    }

    /// The first `n` records in rank order.
    pub fn top(&self, n: usize) -> &[RankedKeywordRecord] {
        &self.records()[..n.min(self.len())]
    }
}
