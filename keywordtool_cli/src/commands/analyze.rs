//! Keyword analysis for one or more seeds.
//!
//! Seeds run concurrently (Semaphore + JoinSet), sharing one resolved
//! credential and one signed client.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::SecondsFormat;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use keywordtool_lib::searchad_api::Error as ApiError;
use keywordtool_lib::types::CompetitionLevel;
use keywordtool_lib::{
    validation, CredentialResolver, KeywordAnalyzer, KeywordResultSet, KeywordToolError,
    OverrideSource, RankedKeywordRecord, SessionCredential,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::output::{format_difficulty, format_stats, print_keywords, OutputFormat};

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Seed keywords to expand and rank
    #[arg(required = true)]
    pub seeds: Vec<String>,

    /// Extra hint keyword sent with every seed (repeatable)
    #[arg(long = "hint")]
    pub hints: Vec<String>,

    /// Show only the top N keywords per seed
    #[arg(long)]
    pub top: Option<usize>,

    /// Minimum total monthly searches
    #[arg(long, default_value = "0")]
    pub min_search: u64,

    /// Competition filter: low, medium, high, unknown (repeatable)
    #[arg(long)]
    pub competition: Vec<String>,

    /// Print summary statistics to stderr
    #[arg(long)]
    pub stats: bool,

    /// Time budget per seed, in seconds
    #[arg(long, default_value = "30")]
    pub timeout_secs: u64,

    /// Seeds analyzed at once
    #[arg(long, default_value = "3")]
    pub concurrency: usize,

    /// Customer ID (overrides the secret store, environment and saved file)
    #[arg(long)]
    pub customer_id: Option<String>,

    /// API key
    #[arg(long)]
    pub api_key: Option<String>,

    /// Secret key
    #[arg(long)]
    pub secret_key: Option<String>,
}

struct Filters {
    top: Option<usize>,
    min_search: u64,
    competition: Vec<CompetitionLevel>,
}

impl Filters {
    fn apply(&self, set: &KeywordResultSet) -> Vec<RankedKeywordRecord> {
        let mut records = set.filter(self.min_search, &self.competition);
        if let Some(n) = self.top {
            records.truncate(n);
        }
        records
    }
}

pub async fn run(args: &AnalyzeArgs, format: &OutputFormat) -> Result<()> {
    let seeds = args
        .seeds
        .iter()
        .map(|s| validation::validate_seed(s))
        .collect::<Result<Vec<_>, _>>()?;
    let hints = args
        .hints
        .iter()
        .map(|h| validation::validate_hint(h))
        .collect::<Result<Vec<_>, _>>()?;
    let filters = Filters {
        top: args.top.map(validation::validate_top).transpose()?,
        min_search: args.min_search,
        competition: args
            .competition
            .iter()
            .map(|c| validation::validate_competition(c))
            .collect::<Result<Vec<_>, _>>()?,
    };
    let concurrency = validation::validate_concurrency(args.concurrency)?;

    let resolver = CredentialResolver::standard(OverrideSource::new(
        args.customer_id.clone(),
        args.api_key.clone(),
        args.secret_key.clone(),
    ));
    let session = SessionCredential::new();
    let credential = session.get_or_resolve(&resolver)?;
    tracing::debug!("Using credential from {}", credential.source());

    let analyzer = KeywordAnalyzer::from_env()?;
    let budget = Duration::from_secs(args.timeout_secs.max(1));
    let hints = Arc::new(hints);

    let pb = if seeds.len() > 1 {
        let pb = ProgressBar::new(seeds.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?,
        );
        pb.set_message("analyzing...");
        pb
    } else {
        ProgressBar::hidden()
    };

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut join_set = JoinSet::new();

    for (index, seed) in seeds.iter().cloned().enumerate() {
        let sem = Arc::clone(&semaphore);
        let analyzer = analyzer.clone();
        let credential = Arc::clone(&credential);
        let hints = Arc::clone(&hints);

        join_set.spawn(async move {
            let result = match sem.acquire_owned().await {
                Ok(_permit) => {
                    // The deadline starts once the seed gets a slot.
                    let deadline = Instant::now() + budget;
                    analyzer
                        .analyze_with_hints(&seed, &hints, &credential, deadline)
                        .await
                }
                Err(_) => Err(KeywordToolError::InvalidInput(
                    "analysis was cancelled".to_string(),
                )),
            };
            (index, seed, result)
        });
    }

    let mut results: Vec<Option<KeywordResultSet>> = vec![None; seeds.len()];
    let mut failures = 0usize;

    while let Some(joined) = join_set.join_next().await {
        pb.inc(1);
        let (index, seed, result) = match joined {
            Ok(done) => done,
            Err(e) => {
                pb.println(format!("  Warning: analysis task failed: {}", e));
                failures += 1;
                continue;
            }
        };
        match result {
            Ok(set) => {
                pb.set_message(format!("{} done", seed));
                results[index] = Some(set);
            }
            Err(KeywordToolError::Api(e @ ApiError::Auth { .. })) => {
                pb.println(format!(
                    "Fatal: credentials rejected ({}). Check them with `keywordtool credentials check`.",
                    e
                ));
                join_set.abort_all();
                pb.finish_and_clear();
                bail!("Authentication failed");
            }
            Err(e) => {
                pb.println(format!("  Warning: analysis of {:?} failed: {}", seed, e));
                failures += 1;
            }
        }
    }
    pb.finish_and_clear();

    let summary = analyzer.expansion().client().tracker().summary();
    tracing::debug!(
        "Requests: {} attempts, {} retries, {} rate-limited, {:.1}s backoff",
        summary.attempts,
        summary.retries,
        summary.rate_limited,
        summary.total_backoff_secs
    );

    let mut rendered: Vec<(String, Vec<RankedKeywordRecord>)> = Vec::new();
    for set in results.into_iter().flatten() {
        eprintln!(
            "{}: {} keywords (generated {})",
            set.seed_keyword(),
            set.len(),
            set.generated_at().to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        if args.stats {
            if let Some(stats) = set.stats() {
                eprintln!("{}", format_stats(set.seed_keyword(), &stats));
                eprintln!("{}", format_difficulty(&set.difficulty(), 5));
            }
        }
        rendered.push((set.seed_keyword().to_string(), filters.apply(&set)));
    }

    print_keywords(&rendered, format)?;

    if failures == seeds.len() {
        bail!("All {} analyses failed", failures);
    }
    if failures > 0 {
        bail!("{} of {} analyses failed", failures, seeds.len());
    }
    Ok(())
}
