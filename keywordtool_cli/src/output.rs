use anyhow::{bail, Result};
use keywordtool_lib::credentials::TierReport;
use keywordtool_lib::{
    seeded_rows, KeywordDifficulty, KeywordStats, RankedKeywordRecord, SeededKeywordRow,
};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::xml_output;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
    Markdown,
    Xml,
}

impl OutputFormat {
    pub fn parse(input: &str) -> Result<Self> {
        match input.trim().to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "md" | "markdown" => Ok(OutputFormat::Markdown),
            "xml" => Ok(OutputFormat::Xml),
            other => bail!(
                "unknown output format '{}'. Valid values: table, json, csv, md, xml",
                other
            ),
        }
    }
}

#[derive(Tabled, Serialize)]
struct KeywordTableRow {
    #[tabled(rename = "Seed")]
    #[serde(rename = "Seed")]
    seed: String,
    #[tabled(rename = "Rank")]
    #[serde(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Keyword")]
    #[serde(rename = "Keyword")]
    keyword: String,
    #[tabled(rename = "PC")]
    #[serde(rename = "PC")]
    pc: String,
    #[tabled(rename = "Mobile")]
    #[serde(rename = "Mobile")]
    mobile: String,
    #[tabled(rename = "Total")]
    #[serde(rename = "Total")]
    total: u64,
    #[tabled(rename = "Competition")]
    #[serde(rename = "Competition")]
    competition: String,
}

/// CSV keeps volumes numeric; threshold markers get their own columns.
#[derive(Serialize)]
struct KeywordCsvRow {
    #[serde(rename = "Seed")]
    seed: String,
    #[serde(rename = "Rank")]
    rank: usize,
    #[serde(rename = "Keyword")]
    keyword: String,
    #[serde(rename = "PC")]
    pc: u64,
    #[serde(rename = "Mobile")]
    mobile: u64,
    #[serde(rename = "Total")]
    total: u64,
    #[serde(rename = "Competition")]
    competition: String,
    #[serde(rename = "PC Below Threshold")]
    pc_below_threshold: bool,
    #[serde(rename = "Mobile Below Threshold")]
    mobile_below_threshold: bool,
}

#[derive(Tabled, Serialize)]
struct TierRow {
    #[tabled(rename = "Tier")]
    #[serde(rename = "Tier")]
    tier: String,
    #[tabled(rename = "Status")]
    #[serde(rename = "Status")]
    status: String,
}

// -- Row builders --

fn build_keyword_rows(seed: &str, records: &[RankedKeywordRecord]) -> Vec<KeywordTableRow> {
    records
        .iter()
        .map(|r| KeywordTableRow {
            seed: seed.to_string(),
            rank: r.rank,
            keyword: r.keyword_text.clone(),
            pc: format_volume(r.pc_monthly_searches.value, r.pc_monthly_searches.was_sentinel),
            mobile: format_volume(
                r.mobile_monthly_searches.value,
                r.mobile_monthly_searches.was_sentinel,
            ),
            total: r.total_monthly_searches,
            competition: r.competition_level.to_string(),
        })
        .collect()
}

fn build_csv_rows(seed: &str, records: &[RankedKeywordRecord]) -> Vec<KeywordCsvRow> {
    records
        .iter()
        .map(|r| KeywordCsvRow {
            seed: seed.to_string(),
            rank: r.rank,
            keyword: r.keyword_text.clone(),
            pc: r.pc_monthly_searches.value,
            mobile: r.mobile_monthly_searches.value,
            total: r.total_monthly_searches,
            competition: r.competition_level.to_string(),
            pc_below_threshold: r.pc_monthly_searches.was_sentinel,
            mobile_below_threshold: r.mobile_monthly_searches.was_sentinel,
        })
        .collect()
}

fn build_tier_rows(reports: &[TierReport]) -> Vec<TierRow> {
    reports
        .iter()
        .map(|r| TierRow {
            tier: r.source.to_string(),
            status: r.status.to_string(),
        })
        .collect()
}

/// Sentinel-backed volumes carry a `~` in tables so they are not mistaken
/// for counts.
fn format_volume(value: u64, was_sentinel: bool) -> String {
    if was_sentinel {
        format!("~{}", value)
    } else {
        value.to_string()
    }
}

// -- Keyword output --

/// Prints every seed's records in one document.
pub fn print_keywords(
    results: &[(String, Vec<RankedKeywordRecord>)],
    format: &OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&all_seeded_rows(results)),
        OutputFormat::Xml => {
            println!("{}", xml_output::keywords_to_xml(&all_seeded_rows(results))?);
        }
        OutputFormat::Csv => {
            let rows: Vec<KeywordCsvRow> = results
                .iter()
                .flat_map(|(seed, records)| build_csv_rows(seed, records))
                .collect();
            print_csv(&rows)?;
        }
        _ => {
            let rows: Vec<KeywordTableRow> = results
                .iter()
                .flat_map(|(seed, records)| build_keyword_rows(seed, records))
                .collect();
            print_rows(rows, format)?;
        }
    }
    Ok(())
}

fn all_seeded_rows(results: &[(String, Vec<RankedKeywordRecord>)]) -> Vec<SeededKeywordRow> {
    results
        .iter()
        .flat_map(|(seed, records)| seeded_rows(seed, records))
        .collect()
}

pub fn print_tiers(reports: &[TierReport], format: &OutputFormat) -> Result<()> {
    let rows = build_tier_rows(reports);
    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Xml => println!("{}", xml_output::tiers_to_xml(&rows)?),
        _ => print_rows(rows, format)?,
    }
    Ok(())
}

fn print_rows<T: Tabled + Serialize>(rows: Vec<T>, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Csv => print_csv(&rows)?,
        OutputFormat::Markdown => {
            let mut table = Table::new(rows);
            table.with(Style::markdown());
            println!("{}", table);
        }
        _ => println!("{}", Table::new(rows)),
    }
    Ok(())
}

// -- CSV output --

fn print_csv<T: Serialize>(rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

// -- JSON output --

pub fn print_json<T: serde::Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}

// -- Summary --

pub fn format_stats(seed: &str, stats: &KeywordStats) -> String {
    let competition: Vec<String> = stats
        .competition
        .iter()
        .map(|(level, count)| format!("{} {}", level, count))
        .collect();
    format!(
        "{}: {} keywords, {} searches (mean {:.1}, median {}, max {}, min {})\n  PC {:.1}% / mobile {:.1}%; top 10% of keywords hold {:.1}%; competition {}",
        seed,
        stats.keyword_count,
        stats.total_searches,
        stats.mean_searches,
        stats.median_searches,
        stats.max_searches,
        stats.min_searches,
        stats.pc_share,
        stats.mobile_share,
        stats.top_decile_share,
        competition.join(", ")
    )
}

/// Best-scoring keywords first, at most `limit` of them.
pub fn format_difficulty(scores: &[KeywordDifficulty], limit: usize) -> String {
    let mut best: Vec<&KeywordDifficulty> = scores.iter().collect();
    best.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.rank.cmp(&b.rank)));
    let parts: Vec<String> = best
        .iter()
        .take(limit)
        .map(|d| format!("{} ({})", d.keyword_text, d.score))
        .collect();
    format!("  opportunity: {}", parts.join(", "))
}
