//! Normalizes, deduplicates, and ranks raw keyword records.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use searchad_api::types::CompetitionLevel;
use serde::Serialize;

use crate::record::{RawKeywordRecord, SearchVolume};

/// Value substituted for a "fewer than 10" volume: half the provider's
/// reporting threshold.
pub const SENTINEL_VOLUME: u64 = 5;

/// A search count after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NormalizedVolume {
    pub value: u64,
    /// Set when `value` is [`SENTINEL_VOLUME`] standing in for a threshold
    /// marker.
    pub was_sentinel: bool,
}

impl From<SearchVolume> for NormalizedVolume {
    fn from(volume: SearchVolume) -> Self {
        match volume {
            SearchVolume::Exact(value) => Self {
                value,
                was_sentinel: false,
            },
            SearchVolume::BelowThreshold(_) => Self {
                value: SENTINEL_VOLUME,
                was_sentinel: true,
            },
            SearchVolume::Missing => Self {
                value: 0,
                was_sentinel: false,
            },
        }
    }
}

/// Deduplication key: trimmed and lowercased.
pub fn normalize_key(text: &str) -> String {
    text.trim().to_lowercase()
}

fn compact(key: &str) -> String {
    key.chars().filter(|c| !c.is_whitespace()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedKeywordRecord {
    pub keyword_text: String,
    pub key: String,
    pub pc_monthly_searches: NormalizedVolume,
    pub mobile_monthly_searches: NormalizedVolume,
    pub total_monthly_searches: u64,
    pub competition_level: CompetitionLevel,
    pub monthly_ad_impressions: Option<f64>,
    pub monthly_avg_pc_clicks: Option<f64>,
    pub monthly_avg_mobile_clicks: Option<f64>,
    pub monthly_avg_pc_ctr: Option<f64>,
    pub monthly_avg_mobile_ctr: Option<f64>,
    pub rank: usize,
    pub is_seed: bool,
}

impl RankedKeywordRecord {
    fn normalize(raw: RawKeywordRecord, key: String) -> Self {
        let pc = NormalizedVolume::from(raw.pc_monthly_searches);
        let mobile = NormalizedVolume::from(raw.mobile_monthly_searches);
        Self {
            keyword_text: raw.keyword_text.trim().to_string(),
            key,
            total_monthly_searches: pc.value.saturating_add(mobile.value),
            pc_monthly_searches: pc,
            mobile_monthly_searches: mobile,
            competition_level: raw.competition_level.unwrap_or_default(),
            monthly_ad_impressions: raw.monthly_ad_impressions,
            monthly_avg_pc_clicks: raw.monthly_avg_pc_clicks,
            monthly_avg_mobile_clicks: raw.monthly_avg_mobile_clicks,
            monthly_avg_pc_ctr: raw.monthly_avg_pc_ctr,
            monthly_avg_mobile_ctr: raw.monthly_avg_mobile_ctr,
            rank: 0,
            is_seed: false,
        }
    }

    /// PC share of this keyword's searches in percent, one decimal.
    pub fn pc_share(&self) -> f64 {
        share(self.pc_monthly_searches.value, self.total_monthly_searches)
    }

    pub fn mobile_share(&self) -> f64 {
        share(self.mobile_monthly_searches.value, self.total_monthly_searches)
    }

    pub fn to_row(&self) -> KeywordRow {
        KeywordRow {
            keyword_text: self.keyword_text.clone(),
            pc_monthly_searches: self.pc_monthly_searches.value,
            mobile_monthly_searches: self.mobile_monthly_searches.value,
            total_monthly_searches: self.total_monthly_searches,
            competition_level: self.competition_level,
            rank: self.rank,
        }
    }
}

pub(crate) fn share(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1(part as f64 / total as f64 * 100.0)
}

pub(crate) fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// The plain record handed to exporters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordRow {
    pub keyword_text: String,
    pub pc_monthly_searches: u64,
    pub mobile_monthly_searches: u64,
    pub total_monthly_searches: u64,
    pub competition_level: CompetitionLevel,
    pub rank: usize,
}

/// A [`KeywordRow`] tagged with the seed that produced it. Flattened in JSON
/// and XML exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeededKeywordRow {
    pub seed: String,
    #[serde(flatten)]
    pub row: KeywordRow,
}

pub fn seeded_rows(seed: &str, records: &[RankedKeywordRecord]) -> Vec<SeededKeywordRow> {
    records
        .iter()
        .map(|r| SeededKeywordRow {
            seed: seed.to_string(),
            row: r.to_row(),
        })
        .collect()
}

/// Ranked, deduplicated output of one analysis. Read-only once built.
#[derive(Debug, Clone, Serialize)]
pub struct KeywordResultSet {
    seed_keyword: String,
    generated_at: DateTime<Utc>,
    records: Vec<RankedKeywordRecord>,
}

impl KeywordResultSet {
    pub fn seed_keyword(&self) -> &str {
        &self.seed_keyword
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn records(&self) -> &[RankedKeywordRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RankedKeywordRecord> {
        self.records.iter()
    }

    /// Looks a record up by its deduplication key.
    pub fn get(&self, keyword: &str) -> Option<&RankedKeywordRecord> {
        let key = normalize_key(keyword);
        self.records.iter().find(|r| r.key == key)
    }

    pub fn rows(&self) -> Vec<KeywordRow> {
        self.records.iter().map(RankedKeywordRecord::to_row).collect()
    }

    pub fn seeded_rows(&self) -> Vec<SeededKeywordRow> {
        seeded_rows(&self.seed_keyword, &self.records)
    }
}

impl<'a> IntoIterator for &'a KeywordResultSet {
    type Item = &'a RankedKeywordRecord;
    type IntoIter = std::slice::Iter<'a, RankedKeywordRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Turns raw records into a ranked result set stamped with the current time.
pub fn process(seed_keyword: &str, raw: Vec<RawKeywordRecord>) -> KeywordResultSet {
    process_at(seed_keyword, raw, Utc::now())
}

/// Like [`process`] with an explicit timestamp.
///
/// 1. Normalize: threshold markers become [`SENTINEL_VOLUME`], missing
///    volumes become 0, missing competition becomes `Unknown`.
/// 2. Deduplicate on [`normalize_key`]; the first record seen wins.
/// 3. Sort by total descending, then key ascending (byte order).
/// 4. Assign ranks 1..=n.
///
/// Records with an empty key are dropped. Zero-volume records are kept.
pub fn process_at(
    seed_keyword: &str,
    raw: Vec<RawKeywordRecord>,
    generated_at: DateTime<Utc>,
) -> KeywordResultSet {
    let seed_compact = compact(&normalize_key(seed_keyword));
    let input_len = raw.len();

    let mut seen = HashSet::with_capacity(input_len);
    let mut records: Vec<RankedKeywordRecord> = Vec::with_capacity(input_len);
    for record in raw {
        let key = normalize_key(&record.keyword_text);
        if key.is_empty() {
            tracing::debug!("Dropping keyword record with empty text");
            continue;
        }
        if !seen.insert(key.clone()) {
            continue;
        }
        let mut ranked = RankedKeywordRecord::normalize(record, key);
        ranked.is_seed = !seed_compact.is_empty() && compact(&ranked.key) == seed_compact;
        records.push(ranked);
    }

    records.sort_by(|a, b| {
        b.total_monthly_searches
            .cmp(&a.total_monthly_searches)
            .then_with(|| a.key.cmp(&b.key))
    });
    for (i, record) in records.iter_mut().enumerate() {
        record.rank = i + 1;
    }

    tracing::debug!(
        "Processed {} raw records into {} ranked keywords for {:?}",
        input_len,
        records.len(),
        seed_keyword
    );

    KeywordResultSet {
        seed_keyword: seed_keyword.trim().to_string(),
        generated_at,
        records,
    }
}
