use url::Url;

use super::Query;

/// The provider accepts at most this many hint keywords per request.
pub const MAX_HINTS_PER_CALL: usize = 5;

/// Query for `GET /keywordstool`: related keywords and monthly volumes for
/// up to five hint keywords.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeywordToolQuery {
    pub hint_keywords: Vec<String>,
    /// Ask for click and CTR statistics along with volumes.
    pub show_detail: bool,
    /// Restrict statistics to a calendar month (1-12).
    pub month: Option<u8>,
}

impl Default for KeywordToolQuery {
    fn default() -> Self {
        Self {
            hint_keywords: Vec::new(),
            show_detail: true,
            month: None,
        }
    }
}

impl Query for KeywordToolQuery {
    fn path(&self) -> &'static str {
        "/keywordstool"
    }

    fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![(
            "hintKeywords".to_string(),
            self.hint_keywords.join(","),
        )];
        pairs.push((
            "showDetail".to_string(),
            if self.show_detail { "1" } else { "0" }.to_string(),
        ));
        if let Some(month) = self.month {
            pairs.push(("month".to_string(), month.to_string()));
        }
        pairs
    }
}

impl KeywordToolQuery {
    /// Adds a hint. Spaces are removed because the provider rejects them
    /// inside hint keywords; hints that end up empty are ignored.
    pub fn with_hint(mut self, hint: &str) -> Self {
        let compact = compact_hint(hint);
        if !compact.is_empty() {
            self.hint_keywords.push(compact);
        }
        self
    }

    pub fn with_hints(mut self, hints: &[&str]) -> Self {
        for hint in hints {
            self = self.with_hint(hint);
        }
        self
    }

    pub fn with_show_detail(mut self, show_detail: bool) -> Self {
        self.show_detail = show_detail;
        self
    }

    pub fn with_month(mut self, month: u8) -> Self {
        self.month = Some(month);
        self
    }

    /// Whether the provider would accept this query.
    pub fn is_valid(&self) -> bool {
        !self.hint_keywords.is_empty()
            && self.hint_keywords.len() <= MAX_HINTS_PER_CALL
            && self.month.map_or(true, |m| (1..=12).contains(&m))
    }

    /// Full URL for this query against `base`.
    pub fn to_url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        url.set_path(self.path());
        self.add_to_url(&url)
    }
}

/// Strips all whitespace from a hint keyword.
pub fn compact_hint(hint: &str) -> String {
    hint.chars().filter(|c| !c.is_whitespace()).collect()
}
