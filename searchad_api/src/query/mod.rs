//! Query builders for provider endpoints.

use url::Url;

mod keyword_tool;
pub use self::keyword_tool::{compact_hint, KeywordToolQuery, MAX_HINTS_PER_CALL};

/// Implemented by every query builder.
///
/// `query_pairs` is the single source of parameter order; the same pairs go
/// on the wire and into the URL.
pub trait Query {
    /// Path of the endpoint this query targets, starting with `/`.
    fn path(&self) -> &'static str;

    /// Parameters in the order the provider expects them.
    fn query_pairs(&self) -> Vec<(String, String)>;

    /// Appends this query's parameters to the given URL, returning the modified URL.
    fn add_to_url(&self, url: &Url) -> Url {
        let mut url = url.clone();
        for (key, value) in self.query_pairs() {
            url.query_pairs_mut().append_pair(&key, &value);
        }
        url
    }
}
