//! Keyword classification of provider failures.

use colloquy_core::FailureClass;
use colloquy_error::ProviderError;

/// Per-provider keyword sets. Matching is case-insensitive.
#[derive(Debug, Clone, Copy)]
pub struct KeywordTable {
    /// Keywords that mark rate limiting or quota exhaustion
    pub rate_limited: &'static [&'static str],
    /// Keywords that mark provider-side failures
    pub server_error: &'static [&'static str],
}

/// OpenAI chat completions.
pub const OPENAI_KEYWORDS: KeywordTable = KeywordTable {
    rate_limited: &[
        "rate limit",
        "rate_limit",
        "429",
        "too many requests",
        "insufficient_quota",
    ],
    server_error: &[
        "500",
        "502",
        "503",
        "504",
        "server_error",
        "server error",
        "service unavailable",
        "bad gateway",
    ],
};

/// Gemini `generateContent`.
pub const GEMINI_KEYWORDS: KeywordTable = KeywordTable {
    rate_limited: &[
        "rate limit",
        "quota",
        "resource exhausted",
        "resource_exhausted",
        "429",
        "too many requests",
    ],
    server_error: &[
        "500",
        "502",
        "503",
        "504",
        "server error",
        "service unavailable",
        "unavailable",
        "deadline_exceeded",
    ],
};

/// Anthropic messages.
pub const ANTHROPIC_KEYWORDS: KeywordTable = KeywordTable {
    rate_limited: &["rate limit", "rate_limit", "429", "too many requests"],
    server_error: &[
        "500",
        "502",
        "503",
        "504",
        "529",
        "overloaded",
        "api_error",
        "server error",
        "service unavailable",
    ],
};

/// Case-insensitive keyword search over already-lowercased text.
///
/// Numeric keywords only match as whole numbers, so `"500"` matches
/// `"HTTP 500 error"` but not `"max_tokens 5000"`.
///
/// ```
/// use colloquy_models::contains_keyword;
///
/// assert!(contains_keyword("http 503 error: unavailable", "503"));
/// assert!(!contains_keyword("max_tokens must be <= 15000", "500"));
/// assert!(contains_keyword("resource exhausted", "resource exhausted"));
/// ```
pub fn contains_keyword(haystack: &str, keyword: &str) -> bool {
    if !keyword.bytes().all(|b| b.is_ascii_digit()) {
        return haystack.contains(keyword);
    }
    let bytes = haystack.as_bytes();
    haystack.match_indices(keyword).any(|(start, _)| {
        let end = start + keyword.len();
        let before = start == 0 || !bytes[start - 1].is_ascii_digit();
        let after = end == bytes.len() || !bytes[end].is_ascii_digit();
        before && after
    })
}

/// Classify a provider error against a keyword table.
///
/// Timeouts are recognised by kind, never by text. Rate-limit keywords are
/// checked before server-error keywords; anything unmatched is `Fatal`.
pub fn classify_with(table: &KeywordTable, error: &ProviderError) -> FailureClass {
    if error.is_timeout() {
        return FailureClass::Timeout;
    }
    let text = error.message().to_lowercase();
    if table
        .rate_limited
        .iter()
        .any(|keyword| contains_keyword(&text, keyword))
    {
        FailureClass::RateLimited
    } else if table
        .server_error
        .iter()
        .any(|keyword| contains_keyword(&text, keyword))
    {
        FailureClass::ServerError
    } else {
        FailureClass::Fatal
    }
}
