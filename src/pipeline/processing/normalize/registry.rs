use std::collections::HashMap;

use super::RuleSet;
use crate::types::Feed;

/// Registry of feed-specific normalization rule sets
pub struct NormalizationRegistry {
    standard: RuleSet,
    overrides: HashMap<Feed, RuleSet>,
}

impl NormalizationRegistry {
    /// Create a new registry; benign gets its own rule set, every other feed
    /// falls back to the standard one
    pub fn new() -> Self {
        let mut overrides = HashMap::new();
        overrides.insert(Feed::Benign, RuleSet::benign());
        Self {
            standard: RuleSet::standard(),
            overrides,
        }
    }

    /// Register a rule set for a specific feed
    pub fn register(&mut self, feed: Feed, rules: RuleSet) {
        self.overrides.insert(feed, rules);
    }

    /// Get the rule set for a feed
    pub fn rules_for(&self, feed: Feed) -> &RuleSet {
        self.overrides.get(&feed).unwrap_or(&self.standard)
    }
}

impl Default for NormalizationRegistry {
    fn default() -> Self {
        Self::new()
    }
}
