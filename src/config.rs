use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};

/// Default cap on the number of clauses in one boolean query
pub const DEFAULT_MAX_CLAUSE_COUNT: usize = 1024;

/// Default cap on top-level rewrite passes before giving up on a fixed point
pub const DEFAULT_MAX_REWRITE_PASSES: usize = 64;

/// Searcher configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum clauses a single boolean query may carry at weight creation.
    /// Range and multi-term expansion against a large dictionary is the
    /// usual way to hit this.
    pub max_clause_count: usize,
    /// Maximum passes of the top-level rewrite loop
    pub max_rewrite_passes: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_clause_count: DEFAULT_MAX_CLAUSE_COUNT,
            max_rewrite_passes: DEFAULT_MAX_REWRITE_PASSES,
        }
    }
}

impl SearchConfig {
    /// Parse a configuration from JSON; missing keys keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SearchConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_clause_count(mut self, max_clause_count: usize) -> Self {
        self.max_clause_count = max_clause_count;
        self
    }

    pub fn with_max_rewrite_passes(mut self, max_rewrite_passes: usize) -> Self {
        self.max_rewrite_passes = max_rewrite_passes;
        self
    }

    /// Reject limits that would make every search fail
    pub fn validate(&self) -> Result<()> {
        if self.max_clause_count == 0 {
            return Err(SearchError::invalid("max_clause_count must be positive"));
        }
        if self.max_rewrite_passes == 0 {
            return Err(SearchError::invalid("max_rewrite_passes must be positive"));
        }
        Ok(())
    }
}
