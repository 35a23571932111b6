//! Competition index attached to each related keyword.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How contested a keyword is among advertisers.
///
/// The provider sends localized labels (`낮음`, `중간`, `높음`); English
/// labels are accepted too. Anything else becomes [`CompetitionLevel::Unknown`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", from = "String")]
pub enum CompetitionLevel {
    Low,
    Medium,
    High,
    Unknown,
}

impl Default for CompetitionLevel {
    fn default() -> Self {
        CompetitionLevel::Unknown
    }
}

impl CompetitionLevel {
    pub const ALL: [CompetitionLevel; 4] = [
        CompetitionLevel::Low,
        CompetitionLevel::Medium,
        CompetitionLevel::High,
        CompetitionLevel::Unknown,
    ];

    /// Lenient parse used for wire values; never fails.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "낮음" | "low" => CompetitionLevel::Low,
            "중간" | "medium" | "mid" => CompetitionLevel::Medium,
            "높음" | "high" => CompetitionLevel::High,
            _ => CompetitionLevel::Unknown,
        }
    }
}

impl From<String> for CompetitionLevel {
    fn from(value: String) -> Self {
        CompetitionLevel::from_label(&value)
    }
}

impl std::fmt::Display for CompetitionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                CompetitionLevel::Low => "LOW",
                CompetitionLevel::Medium => "MEDIUM",
                CompetitionLevel::High => "HIGH",
                CompetitionLevel::Unknown => "UNKNOWN",
            }
        )
    }
}

/// Strict parse for user input: only the English names are accepted.
impl FromStr for CompetitionLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(CompetitionLevel::Low),
            "medium" => Ok(CompetitionLevel::Medium),
            "high" => Ok(CompetitionLevel::High),
            "unknown" => Ok(CompetitionLevel::Unknown),
            _ => Err(()),
        }
    }
}
