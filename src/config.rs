//! Configuration for the decoder.
//!
//! Everything here is plain serde data so a host can keep decoder settings
//! next to its own configuration and load them from JSON.

use serde::{Deserialize, Serialize};

use crate::core::address_range::AddressRange;
use crate::error::{LiftError, Result};

/// Work limits for a decode run. A limit of zero disables that check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Budgets {
    pub max_functions: usize,
    pub max_blocks: usize,
    pub max_instructions: usize,
    pub timeout_ms: u64,
}

impl Default for Budgets {
    fn default() -> Self {
        Self {
            max_functions: 100_000,
            max_blocks: 1_000_000,
            max_instructions: 10_000_000,
            timeout_ms: 60_000,
        }
    }
}

impl Budgets {
    /// No limits at all.
    pub fn unlimited() -> Self {
        Self {
            max_functions: 0,
            max_blocks: 0,
            max_instructions: 0,
            timeout_ms: 0,
        }
    }
}

/// A `[start, end)` range given in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeConfig {
    pub start: u64,
    pub end: u64,
}

impl RangeConfig {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn to_range(&self) -> Option<AddressRange> {
        AddressRange::new(self.start, self.end)
    }
}

/// Settings for one decode run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Name given to the function created at the image entry point.
    pub entry_point_name: String,
    /// When non-empty, only these ranges are decodable and segment
    /// classification is ignored.
    pub decode_only: Vec<RangeConfig>,
    /// Seed entry points from image symbols that land in code.
    pub seed_symbols: bool,
    /// Let seeded targets fall back to data/unclassified ranges.
    pub use_alternative_ranges: bool,
    pub budgets: Budgets,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            entry_point_name: "entry_point".to_string(),
            decode_only: Vec::new(),
            seed_symbols: true,
            use_alternative_ranges: true,
            budgets: Budgets::default(),
        }
    }
}

impl DecoderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict decoding to `[start, end)`. May be called repeatedly.
    pub fn with_decode_only(mut self, start: u64, end: u64) -> Self {
        self.decode_only.push(RangeConfig::new(start, end));
        self
    }

    pub fn with_budgets(mut self, budgets: Budgets) -> Self {
        self.budgets = budgets;
        self
    }

    pub fn is_selected_decode_only(&self) -> bool {
        !self.decode_only.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.entry_point_name.is_empty() {
            return Err(LiftError::InvalidInput(
                "entry_point_name cannot be empty".to_string(),
            ));
        }
        if let Some(bad) = self.decode_only.iter().find(|r| r.start >= r.end) {
            return Err(LiftError::InvalidInput(format!(
                "decode_only range [{:#x}, {:#x}) is empty or inverted",
                bad.start, bad.end
            )));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json_str: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json_str)?;
        config.validate()?;
        Ok(config)
    }
}
