use searchad_api::types::CompetitionLevel;

use crate::error::KeywordToolError;

/// Longest seed or hint keyword accepted, in bytes.
pub const MAX_KEYWORD_LENGTH: usize = 100;
pub const MAX_TOP: usize = 1000;
pub const MAX_CONCURRENCY: usize = 16;

/// Strip ASCII control characters (0x00-0x1F except space 0x20), trim whitespace,
/// and enforce a byte-length limit.
pub fn sanitize_text(input: &str, max_len: usize) -> Result<String, KeywordToolError> {
    if input.len() > max_len {
        return Err(KeywordToolError::InvalidInput(format!(
            "input exceeds maximum length of {} bytes",
            max_len
        )));
    }
    let sanitized: String = input
        .chars()
        .filter(|c| !c.is_ascii_control() || *c == ' ')
        .collect::<String>()
        .trim()
        .to_string();
    if sanitized.is_empty() {
        return Err(KeywordToolError::InvalidInput(
            "input is empty after sanitization".to_string(),
        ));
    }
    Ok(sanitized)
}

/// Validate a seed keyword. Blank input is [`KeywordToolError::EmptySeed`].
pub fn validate_seed(input: &str) -> Result<String, KeywordToolError> {
    let stripped: String = input.chars().filter(|c| !c.is_control()).collect();
    if stripped.trim().is_empty() {
        return Err(KeywordToolError::EmptySeed);
    }
    sanitize_text(&stripped, MAX_KEYWORD_LENGTH)
}

/// Validate an extra hint keyword.
pub fn validate_hint(input: &str) -> Result<String, KeywordToolError> {
    sanitize_text(input, MAX_KEYWORD_LENGTH)
}

/// Validate a competition filter: low, medium, high, unknown (case-insensitive).
pub fn validate_competition(input: &str) -> Result<CompetitionLevel, KeywordToolError> {
    input.parse::<CompetitionLevel>().map_err(|_| {
        KeywordToolError::InvalidInput(format!(
            "unknown competition level '{}'. Valid values: low, medium, high, unknown",
            input
        ))
    })
}

/// Validate a top-N limit (must be 1..=1000).
pub fn validate_top(n: usize) -> Result<usize, KeywordToolError> {
    if !(1..=MAX_TOP).contains(&n) {
        return Err(KeywordToolError::InvalidInput(format!(
            "top must be between 1 and {}",
            MAX_TOP
        )));
    }
    Ok(n)
}

/// Validate the number of seeds analyzed at once (must be 1..=16).
pub fn validate_concurrency(n: usize) -> Result<usize, KeywordToolError> {
    if !(1..=MAX_CONCURRENCY).contains(&n) {
        return Err(KeywordToolError::InvalidInput(format!(
            "concurrency must be between 1 and {}",
            MAX_CONCURRENCY
        )));
    }
    Ok(n)
}
