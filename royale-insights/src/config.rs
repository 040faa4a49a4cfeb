//! Analysis configuration.

use crate::context::InsightsContextConfig;
use crate::logging::LogConfig;

/// Tunables shared by the analysis stages.
///
/// The defaults reproduce the reference report: top 20 cards, top 20 win
/// conditions per side, 10-value rarity histograms and the five most
/// popular cards in the EDA summary.
#[derive(Debug, Clone)]
pub struct InsightsConfig {
    /// Number of entries in the card usage ranking
    pub top_cards: usize,
    /// Number of entries in each win-condition ranking
    pub top_win_conditions: usize,
    /// Number of distinct values kept per rarity histogram
    pub rarity_histogram_size: usize,
    /// Number of card names listed as key findings in the EDA summary
    pub summary_popular_cards: usize,
    /// DataFusion session settings
    pub context: InsightsContextConfig,
    /// Logging verbosity for stages and catalog operations
    pub log: LogConfig,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            top_cards: 20,
            top_win_conditions: 20,
            rarity_histogram_size: 10,
            summary_popular_cards: 5,
            context: InsightsContextConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl InsightsConfig {
    /// Sets the size of the card usage ranking.
    pub fn with_top_cards(mut self, n: usize) -> Self {
        self.top_cards = n;
        self
    }

    /// Sets the size of each win-condition ranking.
    pub fn with_top_win_conditions(mut self, n: usize) -> Self {
        self.top_win_conditions = n;
        self
    }

    /// Sets the number of values kept per rarity histogram.
    pub fn with_rarity_histogram_size(mut self, n: usize) -> Self {
        self.rarity_histogram_size = n;
        self
    }

    /// Sets the logging configuration.
    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }
}
