//! Configuration for schema inference

use serde::{Deserialize, Serialize};

/// BSON documents cannot nest deeper than this.
const DEFAULT_MAX_DEPTH: usize = 100;

/// Configuration for schema inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceConfig {
    /// Maximum nesting depth for documents and arrays
    pub max_depth: usize,

    /// Include observed value samples in serialized output
    pub collect_values: bool,

    /// Maximum number of values emitted per sample (0 = all)
    ///
    /// Only affects serialization; counts and uniqueness always cover every value.
    pub max_values: usize,

    /// Compute the median for numeric types
    pub compute_median: bool,

    /// Emit the value/count frequency table for strings
    pub string_frequencies: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            collect_values: true,
            max_values: 0, // All values
            compute_median: false,
            string_frequencies: true,
        }
    }
}

impl InferenceConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for custom configuration
    pub fn builder() -> InferenceConfigBuilder {
        InferenceConfigBuilder::default()
    }

    /// Truncate a value sample to the configured limit
    pub(crate) fn limit<T>(&self, mut values: Vec<T>) -> Vec<T> {
        if !self.collect_values {
            return Vec::new();
        }
        if self.max_values > 0 {
            values.truncate(self.max_values);
        }
        values
    }
}

/// Builder for InferenceConfig
#[derive(Debug, Default)]
pub struct InferenceConfigBuilder {
    config: InferenceConfig,
}

impl InferenceConfigBuilder {
    /// Set the maximum nesting depth
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    /// Enable or disable value samples in the output
    pub fn collect_values(mut self, collect: bool) -> Self {
        self.config.collect_values = collect;
        self
    }

    /// Set the maximum number of values emitted per sample (0 = all)
    pub fn max_values(mut self, max: usize) -> Self {
        self.config.max_values = max;
        self
    }

    /// Enable or disable median computation for numeric types
    pub fn compute_median(mut self, median: bool) -> Self {
        self.config.compute_median = median;
        self
    }

    /// Enable or disable string frequency tables
    pub fn string_frequencies(mut self, frequencies: bool) -> Self {
        self.config.string_frequencies = frequencies;
        self
    }

    /// Build the configuration
    pub fn build(self) -> InferenceConfig {
        self.config
    }
}
