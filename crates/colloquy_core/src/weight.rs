//! Payload weight classes and their concurrency tiers.

use serde::{Deserialize, Serialize};

/// Coarse size class of a batch's payloads. Heavier payloads get a
/// smaller in-flight limit.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PayloadWeight {
    /// Long documents or verbose instructions
    Heavy,
    /// Typical conversations
    Normal,
    /// Unclassified batches
    #[default]
    Default,
}

/// Maximum in-flight requests per weight class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConcurrencyTiers {
    /// Limit for heavy payloads
    pub heavy: usize,
    /// Limit for normal payloads
    pub normal: usize,
    /// Limit when no weight is given
    pub default: usize,
}

impl Default for ConcurrencyTiers {
    fn default() -> Self {
        Self {
            heavy: 10,
            normal: 30,
            default: 40,
        }
    }
}

impl ConcurrencyTiers {
    /// Limit for a weight class.
    ///
    /// ```
    /// use colloquy_core::{ConcurrencyTiers, PayloadWeight};
    ///
    /// let tiers = ConcurrencyTiers::default();
    /// assert_eq!(tiers.limit_for(PayloadWeight::Heavy), 10);
    /// assert_eq!(tiers.limit_for(PayloadWeight::Default), 40);
    /// ```
    pub fn limit_for(&self, weight: PayloadWeight) -> usize {
        match weight {
            PayloadWeight::Heavy => self.heavy,
            PayloadWeight::Normal => self.normal,
            PayloadWeight::Default => self.default,
        }
    }
}
