//! Response body of `GET /keywordstool`.

use serde::{Deserialize, Serialize};

use super::CompetitionLevel;

/// Top-level response: related keywords in provider order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordToolResponse {
    #[serde(default)]
    pub keyword_list: Vec<KeywordStat>,
}

/// A numeric field as the provider sends it: an integer, a float, or a
/// string such as `"< 10"` for volumes below the reporting threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireNumber {
    Int(u64),
    Float(f64),
    Text(String),
}

impl WireNumber {
    /// Numeric value, if the field holds a plain number (or a numeric string).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            WireNumber::Int(v) => Some(*v as f64),
            WireNumber::Float(v) => Some(*v),
            WireNumber::Text(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        }
    }
}

/// One related keyword with its monthly statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordStat {
    /// The related keyword text.
    #[serde(default)]
    pub rel_keyword: String,

    /// Monthly searches from PC.
    pub monthly_pc_qc_cnt: Option<WireNumber>,

    /// Monthly searches from mobile.
    pub monthly_mobile_qc_cnt: Option<WireNumber>,

    pub monthly_ave_pc_clk_cnt: Option<WireNumber>,

    pub monthly_ave_mobile_clk_cnt: Option<WireNumber>,

    pub monthly_ave_pc_ctr: Option<WireNumber>,

    pub monthly_ave_mobile_ctr: Option<WireNumber>,

    /// Average number of ads shown per search.
    pub pl_avg_depth: Option<WireNumber>,

    /// Competition index; absent on some keywords.
    pub comp_idx: Option<CompetitionLevel>,
}
