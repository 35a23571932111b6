//! Fetches related-keyword candidates for a seed.

use std::collections::HashSet;
use std::sync::Arc;

use searchad_api::{compact_hint, Client, Credential, KeywordToolQuery, MAX_HINTS_PER_CALL};
use tokio::time::Instant;

use crate::error::KeywordToolError;
use crate::record::RawKeywordRecord;
use crate::validation::{validate_hint, validate_seed};

/// Upper bound on candidates collected for one seed.
pub const MAX_CANDIDATES: usize = 1000;

/// Turns a seed (plus optional extra hints) into raw candidate records.
///
/// The provider takes at most [`MAX_HINTS_PER_CALL`] hints per call and does
/// not paginate, so hints are sent in successive batches, one signed call
/// each, until they run out or [`MAX_CANDIDATES`] records are collected.
/// Records keep provider order.
#[derive(Clone)]
pub struct KeywordExpansionService {
    client: Arc<Client>,
    max_candidates: usize,
    show_detail: bool,
}

impl KeywordExpansionService {
    pub fn new(client: Arc<Client>) -> Self {
        Self {
            client,
            max_candidates: MAX_CANDIDATES,
            show_detail: true,
        }
    }

    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates.max(1);
        self
    }

    /// Skip click and CTR statistics.
    pub fn with_show_detail(mut self, show_detail: bool) -> Self {
        self.show_detail = show_detail;
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn expand(
        &self,
        credential: &Credential,
        seed: &str,
        deadline: Instant,
    ) -> Result<Vec<RawKeywordRecord>, KeywordToolError> {
        self.expand_with_hints(credential, seed, &[], deadline).await
    }

    pub async fn expand_with_hints(
        &self,
        credential: &Credential,
        seed: &str,
        hints: &[String],
        deadline: Instant,
    ) -> Result<Vec<RawKeywordRecord>, KeywordToolError> {
        let batches = self.batches(seed, hints)?;
        let mut records: Vec<RawKeywordRecord> = Vec::new();

        for (i, query) in batches.iter().enumerate() {
            tracing::debug!(
                "Expanding batch {}/{}: {}",
                i + 1,
                batches.len(),
                query.hint_keywords.join(",")
            );
            let resp = self.client.keyword_tool(credential, query, deadline).await?;
            records.extend(resp.keyword_list.into_iter().map(RawKeywordRecord::from));

            if records.len() >= self.max_candidates {
                tracing::debug!(
                    "Candidate cap of {} reached after batch {}",
                    self.max_candidates,
                    i + 1
                );
                records.truncate(self.max_candidates);
                break;
            }
        }

        tracing::info!("Expanded {:?} into {} candidates", seed.trim(), records.len());
        Ok(records)
    }

    /// Validates the seed and hints and groups them into provider-sized
    /// queries. The seed always leads the first batch.
    pub fn batches(
        &self,
        seed: &str,
        hints: &[String],
    ) -> Result<Vec<KeywordToolQuery>, KeywordToolError> {
        let seed = validate_seed(seed)?;
        let mut seen = HashSet::new();
        let mut compacted = Vec::with_capacity(hints.len() + 1);

        let seed_hint = compact_hint(&seed);
        seen.insert(seed_hint.to_lowercase());
        compacted.push(seed_hint);

        for hint in hints {
            let hint = compact_hint(&validate_hint(hint)?);
            if seen.insert(hint.to_lowercase()) {
                compacted.push(hint);
            }
        }

        Ok(compacted
            .chunks(MAX_HINTS_PER_CALL)
            .map(|chunk| {
                chunk
                    .iter()
                    .fold(KeywordToolQuery::default(), |q, h| q.with_hint(h))
                    .with_show_detail(self.show_detail)
            })
            .collect())
    }
}
