//! Token accounting.

use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Token usage reported by a provider for one call, or accumulated over many.
///
/// ```
/// use colloquy_core::UsageStats;
///
/// let mut total = UsageStats::default();
/// total += UsageStats::new(120, 30);
/// total += UsageStats::new(80, 20);
/// assert_eq!(total.total_tokens, 250);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct UsageStats {
    /// Prompt tokens
    pub input_tokens: u64,
    /// Completion tokens
    pub output_tokens: u64,
    /// Total as reported by the provider
    pub total_tokens: u64,
}

impl UsageStats {
    /// Usage with the total derived from input and output.
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens.saturating_add(output_tokens),
        }
    }

    /// Usage with an explicit provider-reported total.
    pub fn with_total(input_tokens: u64, output_tokens: u64, total_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

impl AddAssign for UsageStats {
    fn add_assign(&mut self, rhs: Self) {
        self.input_tokens = self.input_tokens.saturating_add(rhs.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(rhs.output_tokens);
        self.total_tokens = self.total_tokens.saturating_add(rhs.total_tokens);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_total_saturates() {
        let usage = UsageStats::new(u64::MAX, 10);
        assert_eq!(usage.total_tokens, u64::MAX);
        assert_eq!(usage.output_tokens, 10);
    }
}
