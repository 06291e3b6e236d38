//! Insight ledger and memo synthesis

use tracing::debug;

/// Memo text for a ledger with no insights
pub const EMPTY_MEMO: &str = "No business insights have been discovered yet.";

const MEMO_HEADER: &str = "📊 Business Intelligence Memo 📊";

/// Ordered, append-only list of business insights.
///
/// Lives as long as the gateway that owns it and is never persisted.
#[derive(Debug, Clone, Default)]
pub struct InsightLedger {
    insights: Vec<String>,
}

impl InsightLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an insight. No dedup, no length limit.
    pub fn append(&mut self, insight: impl Into<String>) {
        self.insights.push(insight.into());
    }

    pub fn len(&self) -> usize {
        self.insights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insights.is_empty()
    }

    /// Insights in append order
    pub fn insights(&self) -> &[String] {
        &self.insights
    }

    /// Render the memo document for the current contents.
    ///
    /// A summary line is only added once there are at least two insights.
    pub fn synthesize(&self) -> String {
        debug!("📝 Synthesizing memo with {} insight(s)", self.insights.len());

        if self.insights.is_empty() {
            return EMPTY_MEMO.to_string();
        }

        let bullets = self
            .insights
            .iter()
            .map(|insight| format!("- {insight}"))
            .collect::<Vec<_>>()
            .join("\n");

        let mut memo = format!("{MEMO_HEADER}\n\nKey Insights Discovered:\n\n{bullets}");

        if self.insights.len() > 1 {
            memo.push_str("\nSummary:\n");
            memo.push_str(&format!(
                "Analysis has revealed {} key business insights that suggest opportunities for strategic optimization and growth.",
                self.insights.len()
            ));
        }

        memo
    }
}
