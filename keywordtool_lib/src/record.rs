//! Raw keyword records as the expansion service returns them.

use searchad_api::types::{CompetitionLevel, KeywordStat, WireNumber};

/// A monthly search count as reported, before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchVolume {
    Exact(u64),
    /// The provider reported "fewer than N" instead of a count.
    BelowThreshold(u64),
    Missing,
}

impl SearchVolume {
    pub fn from_wire(value: Option<&WireNumber>) -> Self {
        match value {
            None => SearchVolume::Missing,
            Some(WireNumber::Int(v)) => SearchVolume::Exact(*v),
            Some(WireNumber::Float(v)) if v.is_finite() && *v >= 0.0 => {
                SearchVolume::Exact(v.trunc() as u64)
            }
            Some(WireNumber::Float(_)) => SearchVolume::Missing,
            Some(WireNumber::Text(s)) => Self::parse(s),
        }
    }

    fn parse(text: &str) -> Self {
        let text = text.trim();
        if let Some(rest) = text.strip_prefix('<') {
            return match rest.trim().replace(',', "").parse::<u64>() {
                Ok(threshold) => SearchVolume::BelowThreshold(threshold),
                Err(_) => {
                    tracing::debug!("Unrecognized threshold marker {:?}", text);
                    SearchVolume::Missing
                }
            };
        }
        match text.replace(',', "").parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => SearchVolume::Exact(v.trunc() as u64),
            _ => {
                tracing::debug!("Unrecognized search volume {:?}", text);
                SearchVolume::Missing
            }
        }
    }
}

/// One related-keyword candidate in provider order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawKeywordRecord {
    pub keyword_text: String,
    pub pc_monthly_searches: SearchVolume,
    pub mobile_monthly_searches: SearchVolume,
    pub competition_level: Option<CompetitionLevel>,
    /// Average number of ads shown per search.
    pub monthly_ad_impressions: Option<f64>,
    pub monthly_avg_pc_clicks: Option<f64>,
    pub monthly_avg_mobile_clicks: Option<f64>,
    pub monthly_avg_pc_ctr: Option<f64>,
    pub monthly_avg_mobile_ctr: Option<f64>,
}

impl RawKeywordRecord {
    pub fn new(
        keyword_text: impl Into<String>,
        pc_monthly_searches: SearchVolume,
        mobile_monthly_searches: SearchVolume,
    ) -> Self {
        Self {
            keyword_text: keyword_text.into(),
            pc_monthly_searches,
            mobile_monthly_searches,
            competition_level: None,
            monthly_ad_impressions: None,
            monthly_avg_pc_clicks: None,
            monthly_avg_mobile_clicks: None,
            monthly_avg_pc_ctr: None,
            monthly_avg_mobile_ctr: None,
        }
    }

    pub fn with_competition(mut self, level: CompetitionLevel) -> Self {
        self.competition_level = Some(level);
        self
    }
}

impl From<KeywordStat> for RawKeywordRecord {
    fn from(stat: KeywordStat) -> Self {
        let num = |v: &Option<WireNumber>| v.as_ref().and_then(WireNumber::as_f64);
        Self {
            pc_monthly_searches: SearchVolume::from_wire(stat.monthly_pc_qc_cnt.as_ref()),
            mobile_monthly_searches: SearchVolume::from_wire(stat.monthly_mobile_qc_cnt.as_ref()),
            competition_level: stat.comp_idx,
            monthly_ad_impressions: num(&stat.pl_avg_depth),
            monthly_avg_pc_clicks: num(&stat.monthly_ave_pc_clk_cnt),
            monthly_avg_mobile_clicks: num(&stat.monthly_ave_mobile_clk_cnt),
            monthly_avg_pc_ctr: num(&stat.monthly_ave_pc_ctr),
            monthly_avg_mobile_ctr: num(&stat.monthly_ave_mobile_ctr),
            keyword_text: stat.rel_keyword,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> WireNumber {
        WireNumber::Text(s.to_string())
    }

    #[test]
    fn threshold_marker_is_typed() {
        assert_eq!(
            SearchVolume::from_wire(Some(&text("< 10"))),
            SearchVolume::BelowThreshold(10)
        );
        assert_eq!(
            SearchVolume::from_wire(Some(&text("<10"))),
            SearchVolume::BelowThreshold(10)
        );
    }

    #[test]
    fn numbers_and_numeric_text_are_exact() {
        assert_eq!(
            SearchVolume::from_wire(Some(&WireNumber::Int(40200))),
            SearchVolume::Exact(40200)
        );
        assert_eq!(
            SearchVolume::from_wire(Some(&WireNumber::Float(12.7))),
            SearchVolume::Exact(12)
        );
        assert_eq!(
            SearchVolume::from_wire(Some(&text("1,200"))),
            SearchVolume::Exact(1200)
        );
    }

    #[test]
    fn absent_or_garbage_is_missing() {
        assert_eq!(SearchVolume::from_wire(None), SearchVolume::Missing);
        assert_eq!(SearchVolume::from_wire(Some(&text("n/a"))), SearchVolume::Missing);
        assert_eq!(SearchVolume::from_wire(Some(&text("< lots"))), SearchVolume::Missing);
        assert_eq!(
            SearchVolume::from_wire(Some(&WireNumber::Float(-1.0))),
            SearchVolume::Missing
        );
    }

    #[test]
    fn from_keyword_stat() {
        let stat: KeywordStat = serde_json::from_str(
            r#"{"relKeyword":"커피 원두","monthlyPcQcCnt":"< 10","monthlyMobileQcCnt":20,
                "monthlyAvePcClkCnt":1.5,"monthlyAveMobileCtr":"2.31","plAvgDepth":15,"compIdx":"낮음"}"#,
        )
        .unwrap();
        let rec = RawKeywordRecord::from(stat);
        assert_eq!(rec.keyword_text, "커피 원두");
        assert_eq!(rec.pc_monthly_searches, SearchVolume::BelowThreshold(10));
        assert_eq!(rec.mobile_monthly_searches, SearchVolume::Exact(20));
        assert_eq!(rec.competition_level, Some(CompetitionLevel::Low));
        assert_eq!(rec.monthly_ad_impressions, Some(15.0));
        assert_eq!(rec.monthly_avg_pc_clicks, Some(1.5));
        assert_eq!(rec.monthly_avg_mobile_ctr, Some(2.31));
        assert_eq!(rec.monthly_avg_mobile_clicks, None);
    }
}
